use kir_model::{ManifestError, ResourceLimitExceeded};
use kir_parser::ParseError;
use std::fmt;
use thiserror::Error;

pub type ExpandResult<T> = Result<T, CompileError>;

/// `file:line:col`, 1-based
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Byte offset to line/column lookup for one source file
#[derive(Debug, Clone)]
pub struct LineIndex {
    file: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(file: impl Into<String>, source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            file: file.into(),
            line_starts,
        }
    }

    pub fn renamed(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn locate(&self, offset: usize) -> SourceLocation {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        SourceLocation {
            file: self.file.clone(),
            line: line + 1,
            column: offset - self.line_starts[line] + 1,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{location}: unresolved reference '{name}'{}", hint.as_ref().map(|h| format!(" ({})", h)).unwrap_or_default())]
    UnresolvedReference {
        name: String,
        location: SourceLocation,
        hint: Option<String>,
    },

    #[error("{location}: circular inheritance: {}", chain.join(" → "))]
    CircularInheritance {
        chain: Vec<String>,
        location: SourceLocation,
    },

    #[error("{location}: recursive component '{component}'\nCall stack: {}", call_stack.join(" → "))]
    RecursiveComponent {
        component: String,
        call_stack: Vec<String>,
        location: SourceLocation,
    },

    #[error("{location}: static directive depends on non-constant '{name}'")]
    NonStaticCondition {
        name: String,
        location: SourceLocation,
    },

    #[error("{location}: component '{component}' has no slot named '{slot}'")]
    UnknownSlot {
        component: String,
        slot: String,
        location: SourceLocation,
    },

    #[error("{location}: too many {field} (more than {cap})")]
    CapExceeded {
        field: &'static str,
        cap: usize,
        location: SourceLocation,
    },

    #[error("{location}: invalid value for '{name}': {message}")]
    InvalidProperty {
        name: String,
        message: String,
        location: SourceLocation,
    },

    #[error("{location}: {message}")]
    InvalidExpression {
        message: String,
        location: SourceLocation,
    },

    #[error("{location}: invalid component '{name}': {message}")]
    InvalidComponent {
        name: String,
        message: String,
        location: SourceLocation,
    },

    #[error("{location}: state '{name}': {source}")]
    State {
        name: String,
        source: ManifestError,
        location: SourceLocation,
    },

    #[error("document has no root element")]
    MissingRoot,

    #[error(transparent)]
    ResourceLimit(#[from] ResourceLimitExceeded),
}

impl CompileError {
    pub fn invalid_property(
        name: impl Into<String>,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        CompileError::InvalidProperty {
            name: name.into(),
            message: message.into(),
            location,
        }
    }

    pub fn invalid_expression(message: impl Into<String>, location: SourceLocation) -> Self {
        CompileError::InvalidExpression {
            message: message.into(),
            location,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            CompileError::UnresolvedReference { location, .. }
            | CompileError::CircularInheritance { location, .. }
            | CompileError::RecursiveComponent { location, .. }
            | CompileError::NonStaticCondition { location, .. }
            | CompileError::UnknownSlot { location, .. }
            | CompileError::CapExceeded { location, .. }
            | CompileError::InvalidProperty { location, .. }
            | CompileError::InvalidExpression { location, .. }
            | CompileError::InvalidComponent { location, .. }
            | CompileError::State { location, .. } => Some(location),
            CompileError::Parse(_) | CompileError::MissingRoot | CompileError::ResourceLimit(_) => None,
        }
    }

    /// Resource limit violations are reported with a distinct exit status by the CLI.
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, CompileError::ResourceLimit(_))
    }
}
