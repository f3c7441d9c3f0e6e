use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use odiff_core::CircularReferenceMatchingMode;
use odiff_types::NodePath;

#[derive(Parser)]
#[command(
    name = "odiff",
    about = "odiff -- structural diff for object graphs",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare two JSON documents
    Compare(CompareArgs),
    /// List every path of a JSON document
    Paths(PathsArgs),
}

/// How a container already open on the traversal is recognised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Matching {
    Identity,
    Equality,
}

impl From<Matching> for CircularReferenceMatchingMode {
    fn from(matching: Matching) -> Self {
        match matching {
            Matching::Identity => Self::Identity,
            Matching::Equality => Self::EqualityMethod,
        }
    }
}

#[derive(Args)]
pub struct CompareArgs {
    /// The newer document
    pub working: PathBuf,
    /// The older document
    pub base: PathBuf,
    #[arg(long, value_enum)]
    pub matching: Option<Matching>,
    /// Skip a path and everything below it (repeatable)
    #[arg(long, value_name = "PATH")]
    pub exclude: Vec<NodePath>,
    /// Skip every property with this name (repeatable)
    #[arg(long, value_name = "NAME")]
    pub exclude_property: Vec<String>,
    /// Only compare along these paths (repeatable)
    #[arg(long, value_name = "PATH")]
    pub include: Vec<NodePath>,
    /// Hide untouched and ignored leaves
    #[arg(long)]
    pub changes_only: bool,
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub max_depth: Option<usize>,
}

#[derive(Args)]
pub struct PathsArgs {
    pub file: PathBuf,
}
