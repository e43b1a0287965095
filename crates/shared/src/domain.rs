use serde::{Deserialize, Serialize};

/// Name the remote API reports for the root environment. It can never be removed.
pub const BASE_ENVIRONMENT: &str = "base";

/// Sentinel the remote API uses for values it could not measure.
pub const NOT_AVAILABLE: &str = "N/A";

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// May be empty; `path` is the stable key.
    #[serde(default)]
    pub name: String,
    pub path: String,
    #[serde(
        rename = "python_version",
        alias = "runtime_version",
        default = "not_available"
    )]
    pub runtime_version: String,
    #[serde(rename = "size", alias = "size_on_disk", default = "not_available")]
    pub size_on_disk: String,
    #[serde(default = "not_available")]
    pub last_modified: String,
}

impl Environment {
    pub fn is_base(&self) -> bool {
        self.name == BASE_ENVIRONMENT
    }

    pub fn is_deletable(&self) -> bool {
        !self.is_base()
    }

    pub fn size_bytes(&self) -> u64 {
        parse_size_bytes(&self.size_on_disk)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub build_string: String,
}

/// Opaque manifest payload (environment descriptor or requirements list).
///
/// The console never looks inside `contents`; it is forwarded to the API as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl ManifestFile {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    /// No file was chosen. Zero-byte contents still count as a file.
    pub fn is_missing(&self) -> bool {
        self.file_name.trim().is_empty()
    }

    /// Requirements lists carry no interpreter version of their own.
    pub fn is_requirements_list(&self) -> bool {
        self.file_name.to_ascii_lowercase().ends_with(".txt")
    }
}

/// Converts a `du -h` style magnitude (`"512K"`, `"1.2G"`, `"0"`) into bytes.
///
/// Unknown or malformed values count as zero.
pub fn parse_size_bytes(raw: &str) -> u64 {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case(NOT_AVAILABLE) {
        return 0;
    }

    let (number, multiplier) = match raw.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('B') => (&raw[..raw.len() - 1], 1u64),
        Some('K') => (&raw[..raw.len() - 1], 1024),
        Some('M') => (&raw[..raw.len() - 1], 1024 * 1024),
        Some('G') => (&raw[..raw.len() - 1], 1024 * 1024 * 1024),
        _ => (raw, 1),
    };

    match number.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => (value * multiplier as f64) as u64,
        _ => 0,
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
