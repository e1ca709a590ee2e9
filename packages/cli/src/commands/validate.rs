use super::{find_files, print_warnings, resolve, ARTIFACT_EXTENSION};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use kir_binary::{ReadOptions, RecoveryMode, ValidationLevel, ValidationReport};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Level {
    Format,
    Structural,
    Semantic,
}

impl From<Level> for ValidationLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Format => ValidationLevel::Format,
            Level::Structural => ValidationLevel::Structural,
            Level::Semantic => ValidationLevel::Semantic,
        }
    }
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Artifacts or directories to check (defaults to the configured output directory)
    pub paths: Vec<PathBuf>,

    /// How deep to check
    #[arg(long, value_enum, default_value_t = Level::Semantic)]
    pub level: Level,

    /// Use the tight limits meant for untrusted input
    #[arg(long, conflicts_with = "permissive")]
    pub strict: bool,

    /// Use generous limits and skip the checksum
    #[arg(long)]
    pub permissive: bool,

    /// Report errors past the first instead of stopping
    #[arg(long)]
    pub best_effort: bool,
}

impl ValidateArgs {
    fn options(&self, config: &Config) -> ReadOptions {
        let base = if self.strict {
            ReadOptions::strict()
        } else if self.permissive {
            ReadOptions::permissive()
        } else {
            ReadOptions::default().with_limits(config.limits)
        };
        let mut options = base.with_level(self.level.into());
        if self.best_effort {
            options = options.with_recovery(RecoveryMode::BestEffort);
        }
        options
    }
}

pub fn validate(args: ValidateArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let options = args.options(&config);

    let roots = if args.paths.is_empty() {
        vec![config.out_dir(cwd)]
    } else {
        args.paths.iter().map(|p| resolve(cwd, p)).collect()
    };

    let mut files = Vec::new();
    for root in &roots {
        if root.is_file() {
            files.push(root.clone());
        } else if root.is_dir() {
            files.extend(find_files(root, ARTIFACT_EXTENSION));
        } else {
            return Err(anyhow!("Input path does not exist: {}", root.display()));
        }
    }

    if files.is_empty() {
        println!("{}", format!("No .{} files found", ARTIFACT_EXTENSION).yellow());
        return Ok(());
    }

    let mut invalid = 0;
    let mut limit = None;
    for file in &files {
        let bytes = fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;
        let mut report = kir_binary::validate(&bytes, &options);
        print_report(file, &report);

        if !report.is_valid() {
            invalid += 1;
        }
        if let Some(fatal) = report.fatal.take() {
            if fatal.is_resource_limit() && limit.is_none() {
                limit = Some(anyhow::Error::new(fatal).context(file.display().to_string()));
            }
        }
    }

    println!();
    if invalid == 0 {
        println!("{} {} files valid", "Done".green().bold(), files.len());
        return Ok(());
    }

    let summary = format!("{} of {} files failed validation", invalid, files.len());
    match limit {
        Some(err) => Err(err.context(summary)),
        None => Err(anyhow!(summary)),
    }
}

fn print_report(file: &Path, report: &ValidationReport) {
    let label = file.display().to_string();
    let mark = if report.is_valid() { "✓".green() } else { "✗".red() };
    let header = report
        .header
        .map(|h| h.to_string())
        .unwrap_or_else(|| "unreadable header".to_string());
    println!("  {} {} {}", mark, label, header.dimmed());

    if let Some(stats) = &report.stats {
        println!(
            "      {} components, depth {}{}",
            stats.node_count,
            stats.max_depth,
            if report.has_manifest { ", manifest" } else { "" }
        );
    }
    if let Some(fatal) = &report.fatal {
        eprintln!("  {} {}: {}", "error".red().bold(), label.dimmed(), fatal);
    }
    print_warnings(&label, &report.diagnostics);
}

#[cfg(test)]
mod tests {
    use super::*;
    use kir_model::{Component, ComponentId, ComponentType};

    fn artifact(depth: usize) -> Vec<u8> {
        let mut node = Component::new(ComponentId(depth as u32), ComponentType::Text);
        for id in (1..depth).rev() {
            node = Component::new(ComponentId(id as u32), ComponentType::Column).with_child(node);
        }
        kir_binary::write(&node, None).unwrap()
    }

    fn args(paths: &[&str]) -> ValidateArgs {
        ValidateArgs {
            paths: paths.iter().map(PathBuf::from).collect(),
            level: Level::Semantic,
            strict: false,
            permissive: false,
            best_effort: false,
        }
    }

    #[test]
    fn test_validate_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("dist/nested")).unwrap();
        fs::write(dir.path().join("dist/a.kirb"), artifact(2)).unwrap();
        fs::write(dir.path().join("dist/nested/b.kirb"), artifact(5)).unwrap();

        validate(args(&[]), dir.path()).unwrap();
    }

    #[test]
    fn test_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = artifact(3);
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0x40;
        fs::write(dir.path().join("bad.kirb"), bytes).unwrap();

        let err = validate(args(&["bad.kirb"]), dir.path()).unwrap_err();
        assert_eq!(super::super::exit_code(&err), 1);
    }

    #[test]
    fn test_strict_limits_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("deep.kirb"), artifact(300)).unwrap();

        validate(args(&["deep.kirb"]), dir.path()).unwrap();

        let mut strict = args(&["deep.kirb"]);
        strict.strict = true;
        let err = validate(strict, dir.path()).unwrap_err();
        assert_eq!(super::super::exit_code(&err), 2);
    }

    #[test]
    fn test_options_from_flags() {
        let config = Config::default();

        let mut flags = args(&[]);
        flags.level = Level::Format;
        flags.best_effort = true;
        let options = flags.options(&config);
        assert_eq!(options.level, ValidationLevel::Format);
        assert_eq!(options.recovery, RecoveryMode::BestEffort);
        assert!(options.verify_checksum);

        flags.permissive = true;
        assert!(!flags.options(&config).verify_checksum);
    }
}
