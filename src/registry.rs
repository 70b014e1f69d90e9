use crate::constants::APPROVED_EXTENSIONS_KEY;
use crate::guid::GuidDisplay;
use crate::registration::{self, Hive, InprocServer, Removal, Write};
use crate::string::{encode_utf16_null_terminated, encode_utf16_null_terminated_as_bytes};
use std::ffi::OsStr;
use windows::Win32::Foundation::{E_INVALIDARG, ERROR_FILE_NOT_FOUND, ERROR_SUCCESS, WIN32_ERROR};
use windows::Win32::System::Registry::{
    HKEY, HKEY_CLASSES_ROOT, HKEY_LOCAL_MACHINE, KEY_WRITE, REG_OPTION_NON_VOLATILE, REG_SZ,
    RegCloseKey, RegCreateKeyExW, RegDeleteKeyValueW, RegDeleteTreeW, RegSetValueExW,
};
use windows::core::{Error, PCWSTR, Result};

/// A predefined key plus a path prefix below it.
pub struct Root {
    hkey: HKEY,
    prefix: String,
}

impl Root {
    pub fn new(hkey: HKEY, prefix: impl Into<String>) -> Self {
        Self {
            hkey,
            prefix: prefix.into(),
        }
    }

    fn path(&self, key: &str) -> String {
        match (self.prefix.is_empty(), key.is_empty()) {
            (true, _) => key.to_owned(),
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}\\{}", self.prefix, key),
        }
    }
}

/// Where each logical hive of the registration layout lives.
pub struct RegistryRoots {
    pub classes: Root,
    pub approved: Root,
}

impl RegistryRoots {
    pub fn system() -> Self {
        Self {
            classes: Root::new(HKEY_CLASSES_ROOT, ""),
            approved: Root::new(HKEY_LOCAL_MACHINE, APPROVED_EXTENSIONS_KEY),
        }
    }

    fn root(&self, hive: Hive) -> &Root {
        match hive {
            Hive::ClassesRoot => &self.classes,
            Hive::ApprovedExtensions => &self.approved,
        }
    }
}

/// Represents an open HKEY, which can be used to set values in the registry
pub struct Key {
    // SAFETY: must never be exposed outside this module, or closed before the Key is dropped
    hkey: HKEY,
}

impl Drop for Key {
    fn drop(&mut self) {
        // SAFETY: hkey is a valid open key handle, due to field invariant
        let err = unsafe { RegCloseKey(self.hkey) };
        if let Err(e) = err.ok() {
            log::warn!("Failed to close registry key: {}", e);
        }
    }
}

impl Key {
    /// Opens `subkey` below `root`, creating it if needed.
    pub fn create(root: &Root, subkey: &str) -> Result<Self> {
        let subkey = encode_utf16_null_terminated(root.path(subkey));

        let mut hkey = HKEY::default();
        // SAFETY: subkey is a valid utf16 null-terminated string
        unsafe {
            RegCreateKeyExW(
                root.hkey,
                PCWSTR::from_raw(subkey.as_ptr()),
                None,
                None,
                REG_OPTION_NON_VOLATILE,
                KEY_WRITE,
                None,
                &mut hkey,
                None,
            )
            .ok()?
        };

        Ok(Self { hkey })
    }

    /// Deletes `subkey` and everything below it, in the same registry view `create` writes to.
    pub fn delete_recursively(root: &Root, subkey: &str) -> Result<()> {
        let subkey = encode_utf16_null_terminated(root.path(subkey));

        // A non-empty subkey is removed along with its tree.
        debug_assert!(subkey.len() > 1);

        // SAFETY: subkey is a valid utf16 null-terminated string
        let result = unsafe { RegDeleteTreeW(root.hkey, PCWSTR::from_raw(subkey.as_ptr())) };
        tolerate_not_found(result)
    }

    pub fn delete_value(root: &Root, subkey: &str, name: &str) -> Result<()> {
        let subkey = encode_utf16_null_terminated(root.path(subkey));
        let name = encode_utf16_null_terminated(name);

        // SAFETY: subkey and name are valid utf16 null-terminated strings
        let result = unsafe {
            RegDeleteKeyValueW(
                root.hkey,
                PCWSTR::from_raw(subkey.as_ptr()),
                PCWSTR::from_raw(name.as_ptr()),
            )
        };
        tolerate_not_found(result)
    }

    pub fn set_value(&self, name: Option<&str>, data: &OsStr) -> Result<()> {
        let name = name.map(encode_utf16_null_terminated);
        let data = encode_utf16_null_terminated_as_bytes(data);

        // SAFETY: hkey is a valid open key handle; name and data are valid null terminated utf16 string
        unsafe {
            RegSetValueExW(
                self.hkey,
                match &name {
                    Some(name) => PCWSTR::from_raw(name.as_ptr()),
                    None => PCWSTR::null(),
                },
                None,
                REG_SZ,
                Some(data.as_slice()),
            )
            .ok()?;
        }

        Ok(())
    }
}

// Deletions of something already gone succeed.
fn tolerate_not_found(result: WIN32_ERROR) -> Result<()> {
    match result {
        ERROR_SUCCESS | ERROR_FILE_NOT_FOUND => Ok(()),
        e => e.ok(),
    }
}

/// Writes the class, server and approval entries for `server`.
///
/// Stops at the first failing write; earlier writes are left in place.
pub fn register_inproc_server(roots: &RegistryRoots, server: &InprocServer<'_>) -> Result<()> {
    if server.path.as_os_str().is_empty()
        || server.friendly_name.is_empty()
        || server.threading_model.is_empty()
    {
        return Err(Error::from(E_INVALIDARG));
    }

    for Write {
        hive,
        key,
        name,
        data,
    } in server.writes()
    {
        let root = roots.root(hive);

        log::info!(
            "Setting registry value (key={}, name={}, data={})",
            root.path(&key),
            name.as_deref().unwrap_or("(default)"),
            data.to_string_lossy()
        );

        Key::create(root, &key)?.set_value(name.as_deref(), &data)?;
    }

    Ok(())
}

/// Removes everything `register_inproc_server` writes for `clsid`. Missing entries are fine.
pub fn unregister_inproc_server(roots: &RegistryRoots, clsid: GuidDisplay) -> Result<()> {
    for removal in registration::removals(clsid) {
        match removal {
            Removal::Tree { hive, key } => {
                let root = roots.root(hive);
                log::info!("Deleting registry key recursively (key={})", root.path(&key));
                Key::delete_recursively(root, &key)?;
            }
            Removal::Value { hive, key, name } => {
                let root = roots.root(hive);
                log::info!(
                    "Deleting registry value (key={}, name={})",
                    root.path(&key),
                    name
                );
                Key::delete_value(root, &key, &name)?;
            }
        }
    }

    Ok(())
}
