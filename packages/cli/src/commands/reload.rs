use super::{print_warnings, resolve};
use crate::config::{parse_define, Config};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use kir_binary::{Reader, ReadOptions, Writer};
use kir_expander::CompileError;
use kir_model::{ReactiveManifest, ReconcileReport};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ReloadArgs {
    /// Live artifact whose reactive state is kept
    pub artifact: PathBuf,

    /// Edited source to recompile
    pub source: PathBuf,

    /// Write here instead of replacing the artifact
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Define a compile-time constant, e.g. -D theme=dark
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    pub defines: Vec<String>,
}

pub fn reload(args: ReloadArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let defines = args
        .defines
        .iter()
        .map(|d| parse_define(d))
        .collect::<Result<Vec<_>>>()?;

    let artifact = resolve(cwd, &args.artifact);
    let bytes = fs::read(&artifact).with_context(|| format!("cannot read {}", artifact.display()))?;
    let decoded = Reader::new(ReadOptions::default().with_limits(config.limits))
        .read(&bytes)
        .with_context(|| format!("cannot decode {}", artifact.display()))?;
    let mut live = decoded.manifest.unwrap_or_else(ReactiveManifest::new);

    let source_path = resolve(cwd, &args.source);
    let source = fs::read_to_string(&source_path)
        .with_context(|| format!("cannot read {}", source_path.display()))?;
    let file_name = source_path.display().to_string();
    let expansion = kir_expander::compile(&source, config.expand_options(&file_name, &defines))
        .map_err(|err| match err {
            CompileError::Parse(parse) => anyhow!("\n{}", parse.report(&file_name, &source)),
            other => anyhow::Error::new(other),
        })?;
    print_warnings(&file_name, &expansion.warnings);

    let report = live.reconcile(expansion.manifest, &expansion.tree);
    let manifest = Some(&live).filter(|m| !m.is_empty());
    let out = Writer::new(config.writer_config()).write(&expansion.tree, manifest)?;

    let output = args.output.map(|p| resolve(cwd, &p)).unwrap_or(artifact);
    fs::write(&output, out).with_context(|| format!("cannot write {}", output.display()))?;

    println!("{} {}", "Reloaded".green().bold(), output.display());
    print_report(&report, &live);
    Ok(())
}

fn print_report(report: &ReconcileReport, live: &ReactiveManifest) {
    let name = |id| {
        live.variable(id)
            .map(|v| v.name.as_str())
            .unwrap_or("?")
    };
    for id in &report.preserved {
        println!("  {} {}", "kept".green(), name(*id));
    }
    for id in &report.reset {
        println!("  {} {} (type changed)", "reset".yellow(), name(*id));
    }
    for id in &report.added {
        println!("  {} {}", "added".bright_blue(), name(*id));
    }
    for removed in &report.removed {
        println!("  {} {}", "removed".red(), removed);
    }
    for (fresh, kept) in &report.id_remap {
        println!("  {} {} → {} ({})", "renumbered".dimmed(), fresh, kept, name(*kept));
    }
    if report.dropped_bindings > 0 {
        println!("  {} {} stale bindings", "dropped".yellow(), report.dropped_bindings);
    }
    for diff in &report.loops {
        println!(
            "  loop {}: {} reused, {} created, {} removed",
            diff.parent_id,
            diff.reused.len(),
            diff.created.len(),
            diff.removed.len()
        );
    }
}
