use kir_model::{ComponentId, ResourceLimitExceeded, StructuralError};
use std::io;
use thiserror::Error;

pub type ReadResult<T> = Result<T, ReadError>;
pub type WriteResult<T> = Result<T, WriteError>;

/// The input is not a well-formed KIRB file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid magic {found:02x?}, expected \"KIRB\"")]
    InvalidMagic { found: [u8; 4] },

    #[error("unsupported format version {major}.{minor}, this reader handles {supported}.x")]
    VersionMismatch { major: u8, minor: u8, supported: u8 },

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CorruptChecksum { stored: u32, computed: u32 },

    #[error("input truncated at byte {offset}: {needed} more bytes expected")]
    Truncated { offset: usize, needed: usize },

    #[error("invalid structure{}: {message}", .offset.map(|o| format!(" at byte {}", o)).unwrap_or_default())]
    InvalidStructure {
        offset: Option<usize>,
        message: String,
    },
}

impl FormatError {
    pub fn invalid_structure(offset: usize, message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            offset: Some(offset),
            message: message.into(),
        }
    }

    pub fn offset(&self) -> Option<usize> {
        match self {
            FormatError::InvalidMagic { .. } => Some(0),
            FormatError::VersionMismatch { .. } => Some(4),
            FormatError::CorruptChecksum { .. } => None,
            FormatError::Truncated { offset, .. } => Some(*offset),
            FormatError::InvalidStructure { offset, .. } => *offset,
        }
    }
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Always fatal, whatever the recovery mode.
    #[error("input rejected: {0}")]
    ResourceLimit(#[from] ResourceLimitExceeded),

    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
}

impl ReadError {
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, ReadError::ResourceLimit(_))
    }

    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            ReadError::Format(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("component {component}: {field} holds {count} entries, cap is {cap}")]
    CapExceeded {
        component: ComponentId,
        field: &'static str,
        count: usize,
        cap: usize,
    },

    #[error("tree rejected: {0}")]
    ResourceLimit(#[from] ResourceLimitExceeded),

    #[error("invalid tree: {0}")]
    Structural(StructuralError),

    #[error("cannot write minor version {requested}, newest supported is {current}")]
    UnsupportedMinor { requested: u8, current: u8 },

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl WriteError {
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, WriteError::ResourceLimit(_))
    }
}

impl From<StructuralError> for WriteError {
    fn from(err: StructuralError) -> Self {
        match err {
            StructuralError::CapExceeded {
                component,
                field,
                count,
                cap,
            } => WriteError::CapExceeded {
                component,
                field,
                count,
                cap,
            },
            StructuralError::ResourceLimit(limit) => WriteError::ResourceLimit(limit),
            other => WriteError::Structural(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("cannot read source file: {0}")]
    Read(#[from] ReadError),

    #[error("cannot write upgraded file: {0}")]
    Write(#[from] WriteError),
}
