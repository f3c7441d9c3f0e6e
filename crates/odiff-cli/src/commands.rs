use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use tracing::debug;

use odiff_core::{DifferConfig, FilteringConfig, ObjectDiffer};
use odiff_types::json::from_json;
use odiff_types::Value;

use crate::cli::*;
use crate::report::{document_paths, render_tree, Report};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Compare(args) => cmd_compare(args, cli.format),
        Command::Paths(args) => cmd_paths(args, cli.format),
    }
}

fn cmd_compare(args: CompareArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let working = load_document(&args.working)?;
    let base = load_document(&args.base)?;

    let tree = ObjectDiffer::new(config).compare(&working, &base)?;
    match format {
        OutputFormat::Text => print!("{}", render_tree(&tree)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&Report::from_tree(&tree))?)
        }
    }
    Ok(())
}

fn cmd_paths(args: PathsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let document = load_document(&args.file)?;
    let paths = document_paths(&document);
    match format {
        OutputFormat::Text => {
            for entry in &paths {
                match &entry.alias_of {
                    Some(first) => println!("{} {} {}", entry.path, "->".dimmed(), first.to_string().cyan()),
                    None => println!("{} {}", entry.path, entry.summary.dimmed()),
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&paths)?),
    }
    Ok(())
}

/// Configuration file (if any) overlaid with command-line flags.
pub fn build_config(args: &CompareArgs) -> anyhow::Result<DifferConfig> {
    let mut config = match &args.config {
        Some(path) => DifferConfig::load(path)?,
        None => DifferConfig::default(),
    };

    if let Some(matching) = args.matching {
        config.circular_references.matching_mode = matching.into();
    }
    if let Some(max_depth) = args.max_depth {
        config.max_depth = Some(max_depth);
    }
    config.inclusion.excluded_paths.extend(args.exclude.iter().cloned());
    config
        .inclusion
        .excluded_properties
        .extend(args.exclude_property.iter().cloned());
    config.inclusion.included_paths.extend(args.include.iter().cloned());
    if args.changes_only {
        config.filtering = FilteringConfig::changes_only();
    }

    debug!(?config, "effective configuration");
    Ok(config)
}

pub fn load_document(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let value = from_json(&json).with_context(|| format!("cannot load {}", path.display()))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use odiff_core::{CircularReferenceMatchingMode, DiffState};
    use tempfile::NamedTempFile;

    use super::*;

    fn temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn compare_args(extra: &[&str]) -> CompareArgs {
        let mut argv = vec!["odiff", "compare", "w.json", "b.json"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Compare(args) => args,
            _ => panic!("expected Compare"),
        }
    }

    #[test]
    fn flags_overlay_config_file() {
        let config = temp_file(
            "max_depth = 4\n\n[inclusion]\nexcluded_properties = [\"id\"]\n",
        );
        let path = config.path().to_str().unwrap().to_string();
        let args = compare_args(&[
            "--config",
            &path,
            "--matching",
            "equality",
            "--exclude-property",
            "stamp",
            "--max-depth",
            "9",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.max_depth, Some(9));
        assert_eq!(
            config.circular_references.matching_mode,
            CircularReferenceMatchingMode::EqualityMethod
        );
        assert!(config.inclusion.excluded_properties.contains("id"));
        assert!(config.inclusion.excluded_properties.contains("stamp"));
    }

    #[test]
    fn changes_only_replaces_filtering() {
        let config = build_config(&compare_args(&["--changes-only"])).unwrap();
        assert!(!config.filtering.returnable_states.contains(&DiffState::Untouched));
        assert!(config.filtering.returnable_states.contains(&DiffState::Circular));
    }

    #[test]
    fn bad_config_file_is_reported() {
        let config = temp_file("[circular_references]\nmatching_mode = 3\n");
        let path = config.path().to_str().unwrap().to_string();
        assert!(build_config(&compare_args(&["--config", &path])).is_err());
    }

    #[test]
    fn load_document_resolves_references() {
        let file = temp_file(r#"{ "name": "foo", "child": { "$ref": "/" } }"#);
        let value = load_document(file.path()).unwrap();
        assert!(value.field("child").same_object(&value));
    }

    #[test]
    fn load_document_rejects_invalid_json() {
        let file = temp_file("{ not json");
        let err = load_document(file.path()).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn load_document_rejects_dangling_reference() {
        let file = temp_file(r#"{ "child": { "$ref": "/missing" } }"#);
        let err = load_document(file.path()).unwrap_err();
        assert!(err.to_string().contains("cannot load"));
    }

    #[test]
    fn compare_runs_on_files() {
        let working = temp_file(r#"{ "a": 1, "b": [1, 2] }"#);
        let base = temp_file(r#"{ "a": 1, "b": [1] }"#);
        let argv = [
            "odiff",
            "compare",
            working.path().to_str().unwrap(),
            base.path().to_str().unwrap(),
            "--format",
            "json",
        ];
        let cli = Cli::try_parse_from(argv).unwrap();
        run_command(cli).unwrap();
    }

    #[test]
    fn compare_reports_missing_file() {
        let base = temp_file("{}");
        let cli = Cli::try_parse_from([
            "odiff",
            "compare",
            "/definitely/not/here.json",
            base.path().to_str().unwrap(),
        ])
        .unwrap();
        let err = run_command(cli).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
