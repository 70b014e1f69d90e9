//! Registry layout announcing an in-process COM server to the shell.
//!
//! The layout is data: an ordered list of value writes applied by
//! `DllRegisterServer`, and an ordered list of removals applied by
//! `DllUnregisterServer`. Applying it to a real registry is the job of the
//! `registry` module.

use crate::constants::{CLSID_KEY, INPROC_SERVER_KEY, THREADING_MODEL_VALUE};
use crate::guid::GuidDisplay;
use std::ffi::OsString;
use std::path::Path;

/// Logical registry location an entry lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hive {
    /// The class registration root (`HKEY_CLASSES_ROOT`).
    ClassesRoot,
    /// The shell's "Approved" extensions key.
    ApprovedExtensions,
}

/// Set `name` (or the default value when `None`) of `key` to a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub hive: Hive,
    pub key: String,
    pub name: Option<String>,
    pub data: OsString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// Delete `key` and everything below it.
    Tree { hive: Hive, key: String },
    /// Delete a single value of `key`.
    Value { hive: Hive, key: String, name: String },
}

pub struct InprocServer<'a> {
    pub clsid: GuidDisplay,
    pub path: &'a Path,
    pub friendly_name: &'a str,
    pub threading_model: &'a str,
}

impl InprocServer<'_> {
    pub fn writes(&self) -> Vec<Write> {
        let class_key = class_key(self.clsid);
        let server_key = format!("{class_key}\\{INPROC_SERVER_KEY}");

        vec![
            Write {
                hive: Hive::ClassesRoot,
                key: class_key,
                name: None,
                data: self.friendly_name.into(),
            },
            Write {
                hive: Hive::ClassesRoot,
                key: server_key.clone(),
                name: None,
                data: self.path.as_os_str().to_owned(),
            },
            Write {
                hive: Hive::ClassesRoot,
                key: server_key,
                name: Some(THREADING_MODEL_VALUE.to_owned()),
                data: self.threading_model.into(),
            },
            Write {
                hive: Hive::ApprovedExtensions,
                key: String::new(),
                name: Some(self.clsid.to_string()),
                data: self.friendly_name.into(),
            },
        ]
    }
}

pub fn removals(clsid: GuidDisplay) -> Vec<Removal> {
    vec![
        Removal::Tree {
            hive: Hive::ClassesRoot,
            key: class_key(clsid),
        },
        Removal::Value {
            hive: Hive::ApprovedExtensions,
            key: String::new(),
            name: clsid.to_string(),
        },
    ]
}

pub fn class_key(clsid: GuidDisplay) -> String {
    format!("{CLSID_KEY}\\{clsid}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CLSID, FRIENDLY_NAME, THREADING_MODEL};

    const GUID_STR: &str = "{0000004E-B15F-4277-86EA-E5B808FC0C45}";

    fn server(path: &Path) -> InprocServer<'_> {
        InprocServer {
            clsid: GuidDisplay::from_u128(CLSID),
            path,
            friendly_name: FRIENDLY_NAME,
            threading_model: THREADING_MODEL,
        }
    }

    #[test]
    fn class_key_uses_braced_clsid() {
        assert_eq!(
            class_key(GuidDisplay::from_u128(CLSID)),
            format!("CLSID\\{GUID_STR}")
        );
    }

    #[test]
    fn writes_class_server_and_approval_in_order() {
        let path = Path::new("C:\\Program Files\\ShellExt\\shellext_stub.dll");
        let writes = server(path).writes();

        let class_key = format!("CLSID\\{GUID_STR}");
        let server_key = format!("CLSID\\{GUID_STR}\\InprocServer32");
        assert_eq!(
            writes,
            vec![
                Write {
                    hive: Hive::ClassesRoot,
                    key: class_key,
                    name: None,
                    data: FRIENDLY_NAME.into(),
                },
                Write {
                    hive: Hive::ClassesRoot,
                    key: server_key.clone(),
                    name: None,
                    data: path.as_os_str().to_owned(),
                },
                Write {
                    hive: Hive::ClassesRoot,
                    key: server_key,
                    name: Some("ThreadingModel".to_owned()),
                    data: "Apartment".into(),
                },
                Write {
                    hive: Hive::ApprovedExtensions,
                    key: String::new(),
                    name: Some(GUID_STR.to_owned()),
                    data: FRIENDLY_NAME.into(),
                },
            ]
        );
    }

    #[test]
    fn threading_model_is_passed_through_unvalidated() {
        let path = Path::new("x.dll");
        let server = InprocServer {
            threading_model: "Whatever You Like",
            ..server(path)
        };
        let writes = server.writes();
        assert_eq!(writes[2].data, OsString::from("Whatever You Like"));
    }

    #[test]
    fn removes_class_tree_then_approval() {
        assert_eq!(
            removals(GuidDisplay::from_u128(CLSID)),
            vec![
                Removal::Tree {
                    hive: Hive::ClassesRoot,
                    key: format!("CLSID\\{GUID_STR}"),
                },
                Removal::Value {
                    hive: Hive::ApprovedExtensions,
                    key: String::new(),
                    name: GUID_STR.to_owned(),
                },
            ]
        );
    }
}
