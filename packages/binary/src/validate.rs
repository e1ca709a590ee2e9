use crate::error::ReadError;
use crate::format::Header;
use crate::reader::{peek_header, ReadOptions, Reader};
use kir_model::{TreeStats, ValidationWarning};

/// Outcome of checking a file without keeping its tree.
#[derive(Debug)]
pub struct ValidationReport {
    /// `None` when the header itself could not be parsed.
    pub header: Option<Header>,
    pub stats: Option<TreeStats>,
    pub has_manifest: bool,
    pub diagnostics: Vec<ValidationWarning>,
    /// The error that stopped the read, if any.
    pub fatal: Option<ReadError>,
}

impl ValidationReport {
    /// Readable, with no error diagnostics. Warnings are allowed.
    pub fn is_valid(&self) -> bool {
        self.fatal.is_none() && self.error_count() == 0
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count() + usize::from(self.fatal.is_some())
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| !d.is_error()).count()
    }
}

/// Run a full read under `options` and summarize what it found.
pub fn validate(bytes: &[u8], options: &ReadOptions) -> ValidationReport {
    match Reader::new(*options).read(bytes) {
        Ok(decoded) => ValidationReport {
            header: Some(decoded.header),
            stats: Some(decoded.stats),
            has_manifest: decoded.manifest.is_some(),
            diagnostics: decoded.warnings,
            fatal: None,
        },
        Err(err) => {
            let header = peek_header(bytes);
            ValidationReport {
                has_manifest: header.is_some_and(|h| h.has_manifest()),
                header,
                stats: None,
                diagnostics: Vec::new(),
                fatal: Some(err),
            }
        }
    }
}
