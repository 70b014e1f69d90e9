use std::fmt::{self, Display};
#[cfg(windows)]
use windows::core::GUID;

#[cfg(windows)]
pub trait GuidExt {
    fn display(&self) -> GuidDisplay;
}

#[cfg(windows)]
impl GuidExt for GUID {
    fn display(&self) -> GuidDisplay {
        GuidDisplay {
            data1: self.data1,
            data2: self.data2,
            data3: self.data3,
            data4: self.data4,
        }
    }
}

/// Renders a GUID in the registry's canonical braced, upper-case form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuidDisplay {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl GuidDisplay {
    pub const fn from_u128(value: u128) -> Self {
        Self {
            data1: (value >> 96) as u32,
            data2: (value >> 80) as u16,
            data3: (value >> 64) as u16,
            data4: (value as u64).to_be_bytes(),
        }
    }
}

impl Display for GuidDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7]
        )
    }
}
