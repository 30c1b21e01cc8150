//! Clap derive structures for the `metalport` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// metalport -- declarative bonding, layer mode and VLANs for Metal ports
#[derive(Debug, Parser)]
#[command(
    name = "metalport",
    version,
    about = "Reconcile Equinix Metal server ports with a declared configuration",
    long_about = "Reads a server port, works out the ordered API calls that bring its\n\
        bonding, layer mode, VLAN membership and native VLAN to the declared\n\
        state, and issues them one stage at a time.",
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
    /// Config profile to use
    #[arg(long, short = 'p', env = "METALPORT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, env = "METALPORT_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Metal API auth token
    #[arg(long, env = "METALPORT_AUTH_TOKEN", global = true, hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Project for VXLAN resolution and VLAN commands
    #[arg(long, env = "METALPORT_PROJECT", global = true)]
    pub project: Option<String>,

    /// Metro for VXLAN resolution and VLAN creation
    #[arg(long, env = "METALPORT_METRO", global = true)]
    pub metro: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "METALPORT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "METALPORT_INSECURE", global = true)]
    pub insecure: bool,

    /// Reconciliation budget in seconds
    #[arg(long, env = "METALPORT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect and reconcile server ports
    Port(PortArgs),

    /// Manage project VLANs
    Vlan(VlanArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Ports ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PortArgs {
    #[command(subcommand)]
    pub command: PortCommand,
}

#[derive(Debug, Subcommand)]
pub enum PortCommand {
    /// Show a port as the API reports it
    Show {
        /// Port ID (UUID)
        port_id: String,
    },

    /// Show the calls `apply` would make, without making them
    Plan {
        /// Port ID (UUID)
        port_id: String,

        #[command(flatten)]
        declaration: DeclarationArgs,
    },

    /// Reconcile a port with a declaration
    Apply {
        /// Port ID (UUID)
        port_id: String,

        #[command(flatten)]
        declaration: DeclarationArgs,
    },

    /// Return a port to bonded layer3 with no VLANs
    Reset {
        /// Port ID (UUID)
        port_id: String,
    },

    /// Stop managing a port, resetting it only if its declaration asks to
    Release {
        /// Port ID (UUID)
        port_id: String,

        #[command(flatten)]
        release: ReleaseArgs,
    },
}

/// Release policy, from the port's declaration file or a flag.
#[derive(Debug, Args)]
pub struct ReleaseArgs {
    /// Read `reset_on_delete` from a TOML declaration file
    #[arg(long, short = 'f', conflicts_with = "reset_on_delete")]
    pub file: Option<PathBuf>,

    /// Return the port to bonded layer3 with no VLANs on release
    #[arg(long)]
    pub reset_on_delete: bool,
}

/// Declared port state, from flags or a TOML file.
#[derive(Debug, Args)]
pub struct DeclarationArgs {
    /// Read the declaration from a TOML file
    #[arg(
        long,
        short = 'f',
        conflicts_with_all = ["bonded", "layer2", "native_vlan", "vlan", "vxlan", "reset_on_delete"]
    )]
    pub file: Option<PathBuf>,

    /// Whether the port should be bonded
    #[arg(long, required_unless_present = "file", action = clap::ArgAction::Set)]
    pub bonded: Option<bool>,

    /// true for layer2, false for layer3; unset leaves the layer alone
    #[arg(long, action = clap::ArgAction::Set)]
    pub layer2: Option<bool>,

    /// Native VLAN ID (must also be listed in --vlan)
    #[arg(long)]
    pub native_vlan: Option<String>,

    /// VLAN IDs to carry (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub vlan: Vec<String>,

    /// VXLAN tags to carry, resolved in --project / --metro
    #[arg(long, value_delimiter = ',', conflicts_with = "vlan")]
    pub vxlan: Vec<u16>,

    /// Reset the port to defaults when it is released
    #[arg(long)]
    pub reset_on_delete: bool,
}

// ── VLANs ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VlanArgs {
    #[command(subcommand)]
    pub command: VlanCommand,
}

#[derive(Debug, Subcommand)]
pub enum VlanCommand {
    /// List VLANs in the project (narrowed by --metro)
    #[command(alias = "ls")]
    List,

    /// Show VLAN details
    Show {
        /// VLAN ID (UUID)
        id: String,
    },

    /// Create a VLAN in the project
    Create {
        /// Free-form description
        #[arg(long)]
        description: Option<String>,

        /// Legacy facility code (instead of --metro)
        #[arg(long)]
        facility: Option<String>,

        /// VXLAN tag (metro VLANs only)
        #[arg(long, value_parser = clap::value_parser!(u16).range(2..=3999))]
        vxlan: Option<u16>,
    },

    /// Detach a VLAN from every port, then delete it
    Delete {
        /// VLAN ID (UUID)
        id: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an auth token in the system keyring
    SetToken {
        /// Token value (prompted for when omitted)
        #[arg(long)]
        token: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
