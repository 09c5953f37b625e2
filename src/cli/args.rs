//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Build clinical codelists: resolve include/exclude decisions over a coding-system hierarchy
#[derive(Parser, Debug)]
#[command(name = "codelists")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath, env = "CODELISTS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where the draft comes from: a draft file, command-line decisions, or both.
#[derive(Args, Debug, Clone, Default)]
pub struct DraftArgs {
    /// Terminology snapshot (default: `terminology` from config)
    #[arg(value_hint = ValueHint::FilePath)]
    pub terminology: Option<PathBuf>,

    /// Draft document (TOML)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub draft: Option<PathBuf>,

    /// Explicitly include a code (repeatable)
    #[arg(short = 'i', long = "include", value_name = "CODE")]
    pub include: Vec<String>,

    /// Explicitly exclude a code (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "CODE")]
    pub exclude: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the status of every code
    Status {
        #[command(flatten)]
        draft: DraftArgs,
        /// Only codes matching: included, excluded, unresolved, in-conflict
        #[arg(long)]
        filter: Option<String>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply ordered updates and show the new statuses
    Update {
        #[command(flatten)]
        draft: DraftArgs,
        /// Update as CODE=MARK with MARK one of ?, +, - (applied in order)
        #[arg(long = "set", value_name = "CODE=MARK", required = true)]
        set: Vec<String>,
        /// Write the new decisions back to the draft file
        #[arg(long, requires = "draft")]
        write: bool,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the draft as trees, one table per code type
    Tree {
        #[command(flatten)]
        draft: DraftArgs,
        /// Show only codes returned by this search
        #[arg(long, conflicts_with = "unassigned")]
        search: Option<String>,
        /// Show only codes returned by no search
        #[arg(long)]
        unassigned: bool,
        /// Only codes matching: included, excluded, unresolved, in-conflict
        #[arg(long)]
        filter: Option<String>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Show included codes with their excluded descendants
    Definition {
        #[command(flatten)]
        draft: DraftArgs,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the codelist as CSV (code,term)
    Export {
        #[command(flatten)]
        draft: DraftArgs,
    },

    /// Add or remove the searches recorded in a draft
    Search {
        #[command(subcommand)]
        command: SearchCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum SearchCommands {
    /// Record a search and the codes it returned (creates the draft if missing)
    Add {
        /// Draft document (TOML)
        #[arg(long, value_hint = ValueHint::FilePath)]
        draft: PathBuf,
        /// Terminology snapshot (default: `terminology` from config)
        #[arg(long, value_hint = ValueHint::FilePath)]
        terminology: Option<PathBuf>,
        /// Search term
        #[arg(long)]
        term: String,
        /// Codes returned by the search
        #[arg(required = true, value_name = "CODE")]
        codes: Vec<String>,
    },

    /// Remove a search; codes no other search returned leave the draft
    Remove {
        /// Draft document (TOML)
        #[arg(long, value_hint = ValueHint::FilePath)]
        draft: PathBuf,
        /// Slug of the search
        slug: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Print a config template
    Template,
}
