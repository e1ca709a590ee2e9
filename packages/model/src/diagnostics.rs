use crate::ids::ComponentId;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Recovered with a documented default.
    Warning,
    /// Data was lost or could not be verified.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningCode {
    UnknownComponentType,
    UnknownEnumTag,
    ValueOutOfRange,
    DroppedEntry,
    UnhandledExtension,
    DanglingReference,
    ChecksumMismatch,
    PartialTree,
    NewerMinorVersion,
    ReservedBits,
    TrailingBytes,
}

/// A recovered problem found while reading, validating or expanding a tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationWarning {
    pub severity: Severity,
    pub code: WarningCode,
    pub message: String,
    pub component_id: Option<ComponentId>,
    pub offset: Option<usize>,
}

impl ValidationWarning {
    pub fn warning(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            component_id: None,
            offset: None,
        }
    }

    pub fn error(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::warning(code, message)
        }
    }

    pub fn with_component(mut self, id: ComponentId) -> Self {
        self.component_id = Some(id);
        self
    }

    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}[{:?}]: {}", level, self.code, self.message)?;
        if let Some(id) = self.component_id {
            write!(f, " (component {})", id)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " at byte {}", offset)?;
        }
        Ok(())
    }
}
