use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_MAX_DEPTH: usize = 1000;
pub const DEFAULT_MAX_COMPONENTS: usize = 100_000;
pub const DEFAULT_MAX_STRING_LENGTH: usize = 1024 * 1024;
pub const DEFAULT_MAX_FILE_SIZE: usize = 64 * 1024 * 1024;

/// Caps that bound the cost of every operation over untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_max_components")]
    pub max_components: usize,

    /// Longest string payload, in bytes.
    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,

    /// Largest encoded artifact, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_components() -> usize {
    DEFAULT_MAX_COMPONENTS
}

fn default_max_string_length() -> usize {
    DEFAULT_MAX_STRING_LENGTH
}

fn default_max_file_size() -> usize {
    DEFAULT_MAX_FILE_SIZE
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_components: DEFAULT_MAX_COMPONENTS,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Limits {
    pub fn check_depth(&self, depth: usize) -> Result<(), ResourceLimitExceeded> {
        ResourceLimitExceeded::check(LimitKind::Depth, depth, self.max_depth)
    }

    pub fn check_components(&self, count: usize) -> Result<(), ResourceLimitExceeded> {
        ResourceLimitExceeded::check(LimitKind::ComponentCount, count, self.max_components)
    }

    pub fn check_string(&self, len: usize) -> Result<(), ResourceLimitExceeded> {
        ResourceLimitExceeded::check(LimitKind::StringLength, len, self.max_string_length)
    }

    pub fn check_file_size(&self, len: usize) -> Result<(), ResourceLimitExceeded> {
        ResourceLimitExceeded::check(LimitKind::FileSize, len, self.max_file_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Depth,
    ComponentCount,
    StringLength,
    FileSize,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LimitKind::Depth => "tree depth",
            LimitKind::ComponentCount => "component count",
            LimitKind::StringLength => "string length",
            LimitKind::FileSize => "file size",
        })
    }
}

/// A configured cap was exceeded. Always fatal: the input is rejected, never truncated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{kind} {actual} exceeds limit {max}")]
pub struct ResourceLimitExceeded {
    pub kind: LimitKind,
    pub actual: usize,
    pub max: usize,
}

impl ResourceLimitExceeded {
    pub fn check(kind: LimitKind, actual: usize, max: usize) -> Result<(), Self> {
        if actual > max {
            Err(Self { kind, actual, max })
        } else {
            Ok(())
        }
    }
}
