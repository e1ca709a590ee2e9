use super::{print_warnings, resolve};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use kir_binary::{ByteOrder, VERSION_MINOR};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Endian {
    Little,
    Big,
}

impl From<Endian> for ByteOrder {
    fn from(endian: Endian) -> Self {
        match endian {
            Endian::Little => ByteOrder::Little,
            Endian::Big => ByteOrder::Big,
        }
    }
}

#[derive(Debug, Args)]
pub struct UpgradeArgs {
    /// Artifact to rewrite
    pub file: PathBuf,

    /// Write here instead of replacing the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Byte order of the result (defaults to config)
    #[arg(long, value_enum)]
    pub byte_order: Option<Endian>,

    /// Minor format version of the result
    #[arg(long, default_value_t = VERSION_MINOR)]
    pub minor: u8,
}

pub fn upgrade(args: UpgradeArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let mut writer = config.writer_config();
    if let Some(endian) = args.byte_order {
        writer.byte_order = endian.into();
    }
    writer.minor_version = args.minor;

    let input = resolve(cwd, &args.file);
    let bytes = fs::read(&input).with_context(|| format!("cannot read {}", input.display()))?;
    let label = input.display().to_string();
    let upgraded = kir_binary::upgrade(&bytes, &writer).with_context(|| format!("cannot upgrade {}", label))?;
    print_warnings(&label, &upgraded.warnings);

    if !upgraded.changed() && args.output.is_none() {
        println!("{} {} is already {}", "Skip".yellow().bold(), label, upgraded.to);
        return Ok(());
    }

    let output = args.output.map(|p| resolve(cwd, &p)).unwrap_or(input);

    fs::write(&output, &upgraded.bytes).with_context(|| format!("cannot write {}", output.display()))?;
    println!(
        "{} {} → {} ({})",
        "Upgraded".green().bold(),
        upgraded.from,
        upgraded.to,
        output.display()
    );
    Ok(())
}
