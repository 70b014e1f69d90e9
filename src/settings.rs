use serde::Deserialize;
use std::fs::File;
use std::io;
use std::path::Path;

/// Diagnostics settings, read from an optional JSON file next to the DLL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// logging verbosity (0 info, 1 debug, 2+ trace)
    pub verbose: u8,
    /// whether to log to a file next to the DLL instead of stderr
    pub log_to_file: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbose: 0,
            log_to_file: true,
        }
    }
}

/// Returns `Ok(None)` when the file does not exist. Never creates it.
pub fn load(path: &Path) -> io::Result<Option<Settings>> {
    match File::open(path) {
        Ok(file) => Ok(Some(serde_json::from_reader(io::BufReader::new(file))?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
