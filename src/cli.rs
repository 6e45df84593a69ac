use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "uplift",
    about = "Uplift - Resolve and apply package updates from a local catalog",
    version,
    author
)]
pub struct Cli {
    /// Path to the workspace directory (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    pub path: String,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether a package has an applicable update
    Check {
        /// Package identifier
        #[arg(value_name = "ID")]
        id: String,

        /// Print the resolved update as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upgrade one package, or every package with --all
    Upgrade {
        /// Package identifier
        #[arg(value_name = "ID", required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Upgrade every installed package that has an applicable update
        #[arg(short, long)]
        all: bool,

        /// Upgrade to this exact version instead of the newest applicable one
        #[arg(long, value_name = "VERSION", conflicts_with = "all")]
        version: Option<String>,

        /// Filter packages by id using glob syntax (e.g. "contoso.*")
        #[arg(long, value_name = "GLOB", conflicts_with = "id")]
        filter: Option<String>,

        /// Resolve updates without changing the installed state
        #[arg(long, conflicts_with = "id")]
        dry_run: bool,

        /// Print the result as JSON
        #[arg(long, conflicts_with = "id")]
        json: bool,
    },

    /// List installed packages and their available updates
    List,
}
