/// Platform description and back-end options.
///
/// Both are plain data loaded from JSON. The back end only needs the qubit
/// and classical register counts from the platform; the rest is carried for
/// the artifacts.
///
/// ```json
/// { "name": "cc_7q", "qubit_number": 7, "creg_number": 32, "cycle_time": 20 }
/// ```
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::compiler::CcError;

/// Hardware the program is compiled for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    pub name: String,
    #[serde(alias = "qubit_number")]
    pub qubit_count: usize,
    #[serde(alias = "creg_number")]
    pub creg_count: usize,
    /// Nanoseconds per cycle.
    pub cycle_time: u64,
}

impl Default for Platform {
    fn default() -> Self {
        Self { name: "cc".into(), qubit_count: 7, creg_count: 32, cycle_time: 20 }
    }
}

impl Platform {
    pub fn new(name: impl Into<String>, qubit_count: usize, creg_count: usize) -> Self {
        Self { name: name.into(), qubit_count, creg_count, ..Self::default() }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CcError> {
        load_json(path.as_ref())
    }
}

/// Knobs controlling what the back end writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Directory receiving `<program>.vq1asm` and friends.
    pub output_dir: PathBuf,
    /// Instrument map supplied by the user. When set, no `.map` is written.
    pub map_input_file: Option<PathBuf>,
    /// Also write `<program>_scheduled.qasm`.
    pub write_scheduled_qasm: bool,
    /// Check `*Start`/`*End` kernel pairing before emitting anything.
    pub validate_nesting: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test_output"),
            map_input_file: None,
            write_scheduled_qasm: false,
            validate_nesting: false,
        }
    }
}

impl Options {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CcError> {
        load_json(path.as_ref())
    }

    /// Whether the instrument map artifact should be produced.
    pub fn writes_map(&self) -> bool {
        self.map_input_file.is_none()
    }
}

/// Read and deserialize a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, CcError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| CcError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| CcError::Config { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_platform_aliases() {
        let p = Platform::from_json_str(r#"{ "name": "cc_s7", "qubit_number": 17, "creg_number": 8 }"#).unwrap();
        assert_eq!(p.qubit_count, 17);
        assert_eq!(p.creg_count, 8);
        assert_eq!(p.cycle_time, 20, "missing fields fall back to defaults");
    }

    #[test]
    fn test_options_defaults() {
        let o: Options = serde_json::from_str("{}").unwrap();
        assert_eq!(o, Options::default());
        assert!(o.writes_map());
        let o = Options { map_input_file: Some("cc.map".into()), ..Options::default() };
        assert!(!o.writes_map());
    }

    #[test]
    fn test_load_json_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "qubit_count": 3, "creg_count": 2 }}"#).unwrap();
        let p = Platform::from_file(file.path()).unwrap();
        assert_eq!(p, Platform { qubit_count: 3, creg_count: 2, ..Platform::default() });
    }

    #[test]
    fn test_load_json_errors() {
        let missing = Platform::from_file("/nonexistent/platform.json").unwrap_err();
        assert!(matches!(missing, CcError::Read { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let bad = Options::from_file(file.path()).unwrap_err();
        assert!(matches!(bad, CcError::Config { .. }));
    }
}
