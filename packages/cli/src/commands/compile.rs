use super::{find_files, print_warnings, resolve, ARTIFACT_EXTENSION, SOURCE_EXTENSION};
use crate::config::{parse_define, Config};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use kir_binary::Writer;
use kir_expander::{CompileError, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// File or directory to compile (defaults to the configured source directory)
    pub path: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Define a compile-time constant, e.g. -D theme=dark
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    pub defines: Vec<String>,

    /// Leave the reactive manifest out of the output
    #[arg(long)]
    pub no_manifest: bool,
}

pub fn compile(args: CompileArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let defines = args
        .defines
        .iter()
        .map(|d| parse_define(d))
        .collect::<Result<Vec<_>>>()?;

    let input = match &args.path {
        Some(path) => resolve(cwd, path),
        None => config.src_dir(cwd),
    };
    if !input.exists() {
        return Err(anyhow!("Input path does not exist: {}", input.display()));
    }

    let (root, files) = if input.is_file() {
        let root = input.parent().map(Path::to_path_buf).unwrap_or_default();
        (root, vec![input.clone()])
    } else {
        let files = find_files(&input, SOURCE_EXTENSION);
        (input.clone(), files)
    };

    if files.is_empty() {
        println!("{}", format!("No .{} files found", SOURCE_EXTENSION).yellow());
        return Ok(());
    }

    let out_dir = match &args.out_dir {
        Some(dir) => resolve(cwd, dir),
        None => config.out_dir(cwd),
    };
    let job = Job {
        config: &config,
        defines: &defines,
        root: &root,
        out_dir: &out_dir,
        manifest: config.manifest && !args.no_manifest,
    };

    println!("{} {} files", "Compiling".bright_blue().bold(), files.len());

    let mut failures = Vec::new();
    for file in &files {
        let relative = file.strip_prefix(&root).unwrap_or(file);
        match job.compile_file(file) {
            Ok(output) => println!(
                "  {} {} → {}",
                "✓".green(),
                relative.display(),
                output.display()
            ),
            Err(err) => {
                eprintln!("  {} {} - {}", "✗".red(), relative.display(), format!("{:#}", err).red());
                failures.push(err);
            }
        }
    }

    println!();
    if failures.is_empty() {
        println!("{} Compiled {} files", "Done".green().bold(), files.len());
        return Ok(());
    }

    let summary = format!("{} of {} files failed to compile", failures.len(), files.len());
    // Keep a resource-limit failure so the exit status reports it.
    match failures
        .into_iter()
        .find(|err| super::exit_code(err) == 2)
    {
        Some(limit) => Err(limit.context(summary)),
        None => Err(anyhow!(summary)),
    }
}

struct Job<'a> {
    config: &'a Config,
    defines: &'a [(String, Value)],
    root: &'a Path,
    out_dir: &'a Path,
    manifest: bool,
}

impl Job<'_> {
    fn compile_file(&self, path: &Path) -> Result<PathBuf> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let relative = path.strip_prefix(self.root).unwrap_or(path);
        let file_name = relative.display().to_string();

        let options = self.config.expand_options(&file_name, self.defines);
        let expansion = kir_expander::compile(&source, options).map_err(|err| match err {
            CompileError::Parse(parse) => anyhow!("\n{}", parse.report(&file_name, &source)),
            other => anyhow::Error::new(other),
        })?;
        print_warnings(&file_name, &expansion.warnings);

        let manifest = Some(&expansion.manifest).filter(|m| self.manifest && !m.is_empty());
        let bytes = Writer::new(self.config.writer_config()).write(&expansion.tree, manifest)?;
        debug!(
            "{}: {} components, {} bytes",
            file_name,
            expansion.tree.node_count(),
            bytes.len()
        );

        let output = self.out_dir.join(relative).with_extension(ARTIFACT_EXTENSION);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output, bytes).with_context(|| format!("cannot write {}", output.display()))?;
        Ok(output)
    }
}
