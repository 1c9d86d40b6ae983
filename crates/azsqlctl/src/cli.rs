//! CLI structure and command definitions
//!
//! Commands come in three groups:
//! 1. Management (`provision`, `deprovision`)
//! 2. Data access against the provisioned database (`connect`, `insert`, `query`, `proc`, `orm`)
//! 3. The whole walkthrough end to end (`run`)

use azsqlctl_core::sql::SAMPLE_ORDER_ID;
use clap::{Parser, Subcommand};

/// Azure SQL walkthrough CLI
#[derive(Parser, Debug)]
#[command(name = "azsqlctl")]
#[command(
    version,
    about = "Provision an Azure SQL database, exercise it, and tear it down"
)]
#[command(long_about = "
Provision an Azure SQL database, exercise it, and tear it down

Management calls authenticate with a service principal taken from
AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET. Everything else
comes from a profile in the config file.

EXAMPLES:
    # Provision, run every data operation, then delete the resource group
    azsqlctl run

    # Keep the resources around afterwards
    azsqlctl run --keep

    # Provision only, carrying on past failed steps
    azsqlctl provision --best-effort

    # Individual data operations
    azsqlctl insert --parent-id 1 --name Gadgets
    azsqlctl query --order-id 71797 -o table

    # Delete the resource group and everything in it
    azsqlctl deprovision

For more help on a specific command, run:
    azsqlctl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "AZSQLCTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "AZSQLCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines, tables for lists
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision, exercise and tear down in one go
    #[command(after_help = "EXAMPLES:
    azsqlctl run
    azsqlctl run --keep --order-id 71774
    azsqlctl run --best-effort -v
")]
    Run {
        /// Record failed provisioning steps and carry on instead of stopping
        #[arg(long)]
        best_effort: bool,

        /// Do not delete the resource group at the end
        #[arg(long)]
        keep: bool,

        /// Sales order used by the query, procedure and ORM steps
        #[arg(long, default_value_t = SAMPLE_ORDER_ID)]
        order_id: i32,

        /// Parent of the product categories created along the way
        #[arg(long, default_value_t = 1)]
        parent_id: i32,
    },

    /// Create the resource group, server, firewall rule and database
    #[command(visible_alias = "up")]
    Provision {
        /// Record failed steps and carry on instead of stopping
        #[arg(long)]
        best_effort: bool,
    },

    /// Delete the resource group and everything in it
    #[command(visible_alias = "down")]
    Deprovision,

    /// Open a connection and ping the database
    Connect,

    /// Insert a product category with named parameters
    Insert {
        /// Parent product category
        #[arg(long, default_value_t = 1)]
        parent_id: i32,

        /// Category name (random when omitted)
        #[arg(long)]
        name: Option<String>,
    },

    /// Query the lines of a sales order
    Query {
        #[arg(long, default_value_t = SAMPLE_ORDER_ID)]
        order_id: i32,
    },

    /// Recreate the spGetOrder stored procedure and invoke it
    #[command(name = "proc", visible_alias = "procedure")]
    Proc {
        #[arg(long, default_value_t = SAMPLE_ORDER_ID)]
        order_id: i32,
    },

    /// Read an order through mapped entities and run create/update/delete on a category
    Orm {
        #[arg(long, default_value_t = SAMPLE_ORDER_ID)]
        order_id: i32,

        #[arg(long, default_value_t = 1)]
        parent_id: i32,

        /// Category name (random when omitted)
        #[arg(long)]
        name: Option<String>,
    },

    /// Profile management
    #[command(subcommand, visible_alias = "prof", visible_alias = "pr")]
    Profile(ProfileCommands),

    /// Version information
    #[command(visible_alias = "ver", visible_alias = "v")]
    Version,

    /// Generate shell completions
    #[command(visible_alias = "comp")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion generation
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bourne Again Shell
    Bash,
    /// Z Shell
    Zsh,
    /// Friendly Interactive Shell
    Fish,
    /// PowerShell
    #[value(name = "powershell", alias = "power-shell")]
    PowerShell,
    /// Elvish
    Elvish,
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls", visible_alias = "l")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show details of a profile (the active one when no name is given)
    #[command(visible_alias = "sh", visible_alias = "get")]
    Show {
        /// Profile name to show
        name: Option<String>,
    },

    /// Check every profile for missing fields
    #[command(visible_alias = "check")]
    Validate,

    /// Remove a profile
    #[command(visible_alias = "rm", visible_alias = "del", visible_alias = "delete")]
    Remove {
        /// Profile name to remove
        name: String,
    },

    /// Set the default profile
    #[command(name = "default", visible_alias = "def")]
    Default {
        /// Profile name to use when --profile is not given
        name: String,
    },
}
