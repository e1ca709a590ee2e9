use super::print_warnings;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use kir_binary::{Decoded, ReadOptions, Reader};
use kir_model::Component;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Artifact to inspect
    pub file: PathBuf,

    /// Dump everything as JSON
    #[arg(long)]
    pub json: bool,

    /// Salvage what decodes from a damaged file
    #[arg(long)]
    pub best_effort: bool,
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let bytes = fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let options = if args.best_effort {
        ReadOptions::permissive()
    } else {
        ReadOptions::default()
    };
    let decoded = Reader::new(options)
        .read(&bytes)
        .with_context(|| format!("cannot decode {}", args.file.display()))?;

    if args.json {
        println!("{}", to_json(&decoded)?);
        return Ok(());
    }

    println!("{}", decoded.header.to_string().bright_white().bold());
    println!(
        "{} components, depth {}, {} text bytes{}",
        decoded.stats.node_count,
        decoded.stats.max_depth,
        decoded.stats.text_bytes,
        if decoded.complete { "" } else { " (partial)" }
    );
    println!();
    print!("{}", outline(&decoded.tree));

    if let Some(manifest) = &decoded.manifest {
        println!();
        print!("{}", manifest.summary());
    }

    if !decoded.warnings.is_empty() {
        println!();
        print_warnings(&args.file.display().to_string(), &decoded.warnings);
    }
    Ok(())
}

pub fn to_json(decoded: &Decoded) -> Result<String> {
    let dump = serde_json::json!({
        "header": decoded.header,
        "stats": decoded.stats,
        "complete": decoded.complete,
        "tree": decoded.tree,
        "manifest": decoded.manifest,
        "warnings": decoded.warnings,
    });
    Ok(serde_json::to_string_pretty(&dump)?)
}

/// One line per node, indented by depth.
pub fn outline(root: &Component) -> String {
    let mut out = String::new();
    for (depth, node) in root.iter_with_depth() {
        let _ = write!(out, "{}{} {}", "  ".repeat(depth - 1), node.kind, node.id);
        if let Some(text) = &node.text {
            let _ = write!(out, " {:?}", text);
        }
        if !node.events.is_empty() {
            let handlers: Vec<&str> = node.events.iter().map(|e| e.handler.as_str()).collect();
            let _ = write!(out, " [{}]", handlers.join(", "));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kir_model::{ComponentId, ComponentType, EventHandler, EventType};

    fn tree() -> Component {
        Component::new(ComponentId(1), ComponentType::Column)
            .with_child(Component::new(ComponentId(2), ComponentType::Text).with_text("hi"))
            .with_child(
                Component::new(ComponentId(3), ComponentType::Button)
                    .with_event(EventHandler::new(EventType::Click, "submit")),
            )
    }

    #[test]
    fn test_outline() {
        let text = outline(&tree());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Column"));
        assert!(lines[1].starts_with("  Text") && lines[1].ends_with("\"hi\""));
        assert!(lines[2].ends_with("[submit]"));
    }

    #[test]
    fn test_json_dump() {
        let bytes = kir_binary::write(&tree(), None).unwrap();
        let decoded = kir_binary::read(&bytes).unwrap();
        let json: serde_json::Value = serde_json::from_str(&to_json(&decoded).unwrap()).unwrap();
        assert_eq!(json["header"]["major"], 1);
        assert_eq!(json["header"]["byte_order"], "little");
        assert_eq!(json["stats"]["node_count"], 3);
        assert_eq!(json["manifest"], serde_json::Value::Null);
        assert_eq!(json["complete"], true);
    }

    #[test]
    fn test_inspect_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.kirb");
        fs::write(&path, kir_binary::write(&tree(), None).unwrap()).unwrap();

        inspect(InspectArgs {
            file: path.clone(),
            json: false,
            best_effort: false,
        })
        .unwrap();

        fs::write(&path, b"not an artifact").unwrap();
        assert!(inspect(InspectArgs {
            file: path,
            json: true,
            best_effort: false,
        })
        .is_err());
    }
}
