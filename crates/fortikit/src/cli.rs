//! Clap derive structures for the `fortikit` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fortikit_config::AssetType;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fortikit -- inventory-driven toolbox for Fortinet management APIs
#[derive(Debug, Parser)]
#[command(
    name = "fortikit",
    version,
    about = "Query and configure Fortinet products from the command line",
    long_about = "Drives FortiGate, FortiManager, FortiAnalyzer, FortiClient EMS and\n\
        FortiCloud asset management through their REST and JSON-RPC APIs.\n\n\
        Hosts are looked up by name in the inventory file.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "FORTIKIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Console log level (error, warn, info, debug, trace)
    #[arg(long, short = 'l', global = true)]
    pub loglevel: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress console logging and non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(
        long,
        short = 'f',
        env = "FORTIKIT_FORMAT",
        default_value = "table",
        global = true
    )]
    pub format: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// FortiClient EMS commands
    Ems(EmsArgs),

    /// FortiManager commands
    Fmg(FmgArgs),

    /// FortiAnalyzer commands
    Faz(FazArgs),

    /// FortiGate commands
    Fgt(FgtArgs),

    /// FortiCloud commands
    Cloud(CloudArgs),

    /// Inventory, configuration and tool information
    Get(GetArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared argument groups ───────────────────────────────────────────

/// Output options for commands whose data can be rendered with a template.
#[derive(Debug, Args)]
pub struct TemplateOutput {
    /// Write the output to this file
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Tera template to render the output with (use with -o)
    #[arg(long, short = 't', value_name = "FILE", requires = "output")]
    pub template: Option<PathBuf>,

    /// Print the raw response
    #[arg(long, short = 'r')]
    pub raw: bool,
}

// ── FortiClient EMS ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EmsArgs {
    #[command(subcommand)]
    pub command: EmsCommand,
}

#[derive(Debug, Subcommand)]
pub enum EmsCommand {
    /// Read data from FortiClient EMS
    #[command(subcommand)]
    Get(EmsGet),

    /// Monitor FortiClient EMS dashboards
    #[command(subcommand)]
    Monitor(EmsMonitor),
}

#[derive(Debug, Subcommand)]
pub enum EmsGet {
    /// Get the FortiClient EMS version
    Version {
        /// Inventory name of the FortiClient EMS
        #[arg(default_value = "ems")]
        host: String,
    },

    /// Get the FortiClient EMS workgroups
    Workgroups {
        /// Inventory name of the FortiClient EMS
        #[arg(default_value = "ems")]
        host: String,

        /// Only show custom groups
        #[arg(long)]
        custom: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum EmsMonitor {
    /// Monitor the FortiClient EMS connections
    Connections {
        #[arg(default_value = "ems")]
        host: String,

        #[command(flatten)]
        output: TemplateOutput,
    },

    /// Monitor the endpoint management status
    EndpointManagementStatus {
        #[arg(default_value = "ems")]
        host: String,

        #[command(flatten)]
        output: TemplateOutput,
    },

    /// Monitor the endpoint OS versions
    EndpointOsVersions {
        #[arg(default_value = "ems")]
        host: String,

        #[command(flatten)]
        output: TemplateOutput,
    },
}

// ── FortiManager ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FmgArgs {
    #[command(subcommand)]
    pub command: FmgCommand,
}

#[derive(Debug, Subcommand)]
pub enum FmgCommand {
    /// Read data from FortiManager
    #[command(subcommand)]
    Get(FmgGet),

    /// Assign the global policy package objects to ADOMs
    Assign {
        /// ADOMs to assign to ('adom1' or 'adom1,adom2')
        adoms: String,

        /// Global policy package to assign
        policy: String,

        /// Inventory name of the FortiManager
        #[arg(default_value = "fmg")]
        host: String,

        /// Give up waiting for the task after this long (e.g. 90s, 10m)
        #[arg(long, default_value = "10m", value_parser = humantime::parse_duration)]
        timeout: Duration,

        /// Interval between task polls
        #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
        poll_interval: Duration,
    },

    /// POST JSON-RPC envelopes from a file to one or more ADOMs
    Post {
        /// JSON file with one envelope or an array of envelopes
        file: PathBuf,

        /// ADOMs to post to ('adom1', 'adom1,adom2' or 'global')
        adom: String,

        /// Inventory name of the FortiManager
        #[arg(default_value = "fmg")]
        host: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum FmgGet {
    /// Get the FortiManager version
    Version {
        #[arg(default_value = "fmg")]
        host: String,
    },

    /// List the FortiManager ADOMs
    Adoms {
        #[arg(default_value = "fmg")]
        host: String,
    },
}

// ── FortiAnalyzer ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FazArgs {
    #[command(subcommand)]
    pub command: FazCommand,
}

#[derive(Debug, Subcommand)]
pub enum FazCommand {
    /// Read data from FortiAnalyzer
    #[command(subcommand)]
    Get(FazGet),
}

#[derive(Debug, Subcommand)]
pub enum FazGet {
    /// Get the FortiAnalyzer version
    Version {
        #[arg(default_value = "faz")]
        host: String,
    },
}

// ── FortiGate ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FgtArgs {
    #[command(subcommand)]
    pub command: FgtCommand,
}

#[derive(Debug, Subcommand)]
pub enum FgtCommand {
    /// Read data from FortiGates
    #[command(subcommand)]
    Get(FgtGet),

    /// Back up the configuration of one or all FortiGates
    Backup {
        /// Inventory name of the FortiGate; all FortiGates when omitted
        host: Option<String>,

        /// Directory to save the backups to
        #[arg(long, short = 'b', default_value = ".")]
        backup_dir: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum FgtGet {
    /// Get the FortiOS version of one or all FortiGates
    Version {
        /// Inventory name of the FortiGate; all FortiGates when omitted
        host: Option<String>,
    },

    /// Get firewall address objects
    Address {
        /// Inventory name of the FortiGate
        host: String,

        /// The address object to get; all objects when omitted
        name: Option<String>,

        /// The VDOM to query ('vdom1', 'vdom1,vdom2' or '*')
        #[arg(long, default_value = "*")]
        vdom: String,

        /// Output file (format by extension: .json, .yaml, .yml)
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

// ── FortiCloud ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CloudArgs {
    #[command(subcommand)]
    pub command: CloudCommand,
}

#[derive(Debug, Subcommand)]
pub enum CloudCommand {
    /// FortiCloud asset management
    #[command(subcommand)]
    Asset(CloudAsset),
}

#[derive(Debug, Subcommand)]
pub enum CloudAsset {
    /// Read data from FortiCloud asset management
    #[command(subcommand)]
    Get(CloudAssetGet),
}

#[derive(Debug, Subcommand)]
pub enum CloudAssetGet {
    /// Get the asset management API version
    Version {
        #[arg(default_value = "forticloudasset")]
        host: String,
    },
}

// ── Get ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GetArgs {
    #[command(subcommand)]
    pub command: GetCommand,
}

#[derive(Debug, Subcommand)]
pub enum GetCommand {
    /// List the inventory
    Inventory {
        /// Only list assets of this type
        #[arg(long = "type", value_parser = parse_asset_type)]
        kind: Option<AssetType>,
    },

    /// Show the effective configuration
    Config,

    /// Show the fortikit version
    Version,
}

fn parse_asset_type(value: &str) -> Result<AssetType, String> {
    value.parse().map_err(|_| {
        format!(
            "unknown asset type '{value}' (fortigate, fortimanager, fortianalyzer, \
             forticlientems, forticloudasset)"
        )
    })
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
