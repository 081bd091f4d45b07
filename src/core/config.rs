//! Session configuration.
//!
//! Defaults can be overridden from a JSON file or from `RESIO_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::util::{Result, ValueType};

/// Largest id that still fits the fixed-width virtual file name.
pub const MAX_VIRTUAL_ID: u32 = 999_999;

/// Session behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeFlags {
    /// Matrices produced by the engine are column-major
    pub col_major: bool,
    /// Session is driven by an external environment; reports go only to the print callback
    pub external: bool,
    /// Errors never terminate the host process
    pub no_exit: bool,
    /// Report end-of-file between record sources by default
    pub log_file_boundaries: bool,
}

/// Byte order of binary records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Layout of fixed-width binary records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryLayout {
    pub n_columns: usize,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub endian: Endian,
}

impl BinaryLayout {
    pub const fn new(n_columns: usize, value_type: ValueType, endian: Endian) -> Self {
        Self { n_columns, value_type, endian }
    }

    /// Bytes per record.
    #[inline]
    pub const fn record_bytes(&self) -> usize {
        self.n_columns * self.value_type.num_bytes()
    }
}

/// A jump larger than `max_step` in `column` starts a new segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapRule {
    pub column: usize,
    pub max_step: f64,
}

/// Everything a session needs to know up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name used in reports
    pub tag: String,
    /// Pad (in nodes) given to grids the engine allocates
    pub default_pad: usize,
    pub flags: ModeFlags,
    /// Binary layout for record input, text when absent
    pub binary_input: Option<BinaryLayout>,
    /// Binary layout for record output, text when absent
    pub binary_output: Option<BinaryLayout>,
    /// Gap detection on record input
    pub gap: Option<GapRule>,
    /// Upper bound on ids that can be published as virtual files
    pub max_virtual_id: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tag: "resio".to_string(),
            default_pad: 2,
            flags: ModeFlags::default(),
            binary_input: None,
            binary_output: None,
            gap: None,
            max_virtual_id: MAX_VIRTUAL_ID,
        }
    }
}

impl SessionConfig {
    /// Config with the given tag and pad, everything else default.
    pub fn new(tag: impl Into<String>, default_pad: usize, flags: ModeFlags) -> Self {
        Self {
            tag: tag.into(),
            default_pad,
            flags,
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing keys take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| crate::util::Error::open_failed(path, e))?;
        Self::from_json(&text)
    }

    /// Parse from a JSON string.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(text)?;
        config.clamp();
        Ok(config)
    }

    /// Defaults with `RESIO_TAG`, `RESIO_PAD` and `RESIO_COLMAJOR` applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from a key lookup (environment in production).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(tag) = lookup("RESIO_TAG") {
            self.tag = tag;
        }
        if let Some(pad) = lookup("RESIO_PAD").and_then(|v| v.trim().parse().ok()) {
            self.default_pad = pad;
        }
        if let Some(v) = lookup("RESIO_COLMAJOR") {
            self.flags.col_major = matches!(v.trim(), "1" | "true" | "yes");
        }
        self.clamp();
    }

    fn clamp(&mut self) {
        if self.max_virtual_id == 0 || self.max_virtual_id > MAX_VIRTUAL_ID {
            self.max_virtual_id = MAX_VIRTUAL_ID;
        }
    }
}
