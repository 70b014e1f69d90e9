/// Class identifier of the shell extension, `{0000004E-B15F-4277-86EA-E5B808FC0C45}`.
pub const CLSID: u128 = 0x0000004E_B15F_4277_86EA_E5B808FC0C45;

/// Written as the class's default value and as its "Approved" entry.
pub const FRIENDLY_NAME: &str = "ShellExt Stub";

pub const THREADING_MODEL: &str = "Apartment";

// Registry layout, relative to the class root hive (HKCR) and HKLM respectively.
pub const CLSID_KEY: &str = "CLSID";
pub const INPROC_SERVER_KEY: &str = "InprocServer32";
pub const THREADING_MODEL_VALUE: &str = "ThreadingModel";
pub const APPROVED_EXTENSIONS_KEY: &str =
    "Software\\Microsoft\\Windows\\CurrentVersion\\Shell Extensions\\Approved";

// Files placed next to the DLL.
pub const LOG_FILE_NAME: &str = "shellext-stub.log";
pub const SETTINGS_FILE_NAME: &str = "shellext-stub.json";
