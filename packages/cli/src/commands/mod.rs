pub mod compile;
pub mod inspect;
pub mod reload;
pub mod upgrade;
pub mod validate;

pub use compile::{compile, CompileArgs};
pub use inspect::{inspect, InspectArgs};
pub use reload::{reload, ReloadArgs};
pub use upgrade::{upgrade, UpgradeArgs};
pub use validate::{validate, ValidateArgs};

use colored::Colorize;
use kir_binary::{MigrateError, ReadError, WriteError};
use kir_expander::CompileError;
use kir_model::{ResourceLimitExceeded, Severity, ValidationWarning};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SOURCE_EXTENSION: &str = "kry";
pub const ARTIFACT_EXTENSION: &str = "kirb";

/// Build failures exit with 1, input rejected by a resource limit with 2.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.chain().any(is_resource_limit) {
        2
    } else {
        1
    }
}

fn is_resource_limit(cause: &(dyn std::error::Error + 'static)) -> bool {
    if cause.is::<ResourceLimitExceeded>() {
        return true;
    }
    if let Some(err) = cause.downcast_ref::<CompileError>() {
        return err.is_resource_limit();
    }
    if let Some(err) = cause.downcast_ref::<ReadError>() {
        return err.is_resource_limit();
    }
    if let Some(err) = cause.downcast_ref::<WriteError>() {
        return err.is_resource_limit();
    }
    match cause.downcast_ref::<MigrateError>() {
        Some(MigrateError::Read(err)) => err.is_resource_limit(),
        Some(MigrateError::Write(err)) => err.is_resource_limit(),
        None => false,
    }
}

/// All files with `extension` under `dir`, in a stable order.
pub fn find_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file() && path.extension().and_then(|s| s.to_str()) == Some(extension))
        .collect();
    files.sort();
    files
}

/// Relative paths resolve against the working directory.
pub fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

pub fn print_warnings(label: &str, warnings: &[ValidationWarning]) {
    for warning in warnings {
        let level = match warning.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        eprintln!("  {} {}: {}", level, label.dimmed(), warning);
    }
}
