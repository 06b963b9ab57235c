use canonry_engine::{MissingReferencePolicy, RepairMode};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "canonry",
    about = "Canonry: identity and referential-integrity checks over a definition corpus",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate identifier form, schema rules, and references
    Validate {
        /// Corpus root directory
        #[arg(long, default_value = "corpus")]
        corpus: String,

        /// Engine configuration file
        #[arg(long, default_value = "canonry.toml")]
        config: String,

        /// Also flag legacy identifiers recorded in the compatibility catalog
        #[arg(long)]
        strict: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a repair pass over the corpus
    Repair {
        /// Corpus root directory
        #[arg(long, default_value = "corpus")]
        corpus: String,

        /// Engine configuration file
        #[arg(long, default_value = "canonry.toml")]
        config: String,

        /// Run mode
        #[arg(long, value_enum, default_value_t = RepairModeArg::Validate)]
        mode: RepairModeArg,

        /// Missing-reference policy (overrides the configured one)
        #[arg(long, value_enum)]
        policy: Option<MissingPolicyArg>,

        /// Cap on reported missing references (overrides the configured one)
        #[arg(long)]
        max_missing: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename a definition id and rewrite allow-listed references to it
    Rename {
        /// Current id of the definition to rename
        current_id: String,

        /// Proposed replacement id
        new_id: String,

        /// Corpus root directory
        #[arg(long, default_value = "corpus")]
        corpus: String,

        /// Engine configuration file
        #[arg(long, default_value = "canonry.toml")]
        config: String,

        /// Write the plan to disk instead of printing it
        #[arg(long)]
        apply: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Normalize every definition id that can be rewritten without collision
    Normalize {
        /// Corpus root directory
        #[arg(long, default_value = "corpus")]
        corpus: String,

        /// Write clean normalizations to disk
        #[arg(long)]
        apply: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query the reference graph
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },

    /// Scaffold a corpus directory and starter configuration
    Init {
        /// Directory to scaffold into
        #[arg(default_value = ".")]
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum GraphCommands {
    /// List the references one definition holds
    Outgoing {
        /// Definition id
        id: String,

        /// Corpus root directory
        #[arg(long, default_value = "corpus")]
        corpus: String,

        /// Engine configuration file
        #[arg(long, default_value = "canonry.toml")]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the definitions referencing one definition
    Incoming {
        /// Definition id
        id: String,

        /// Corpus root directory
        #[arg(long, default_value = "corpus")]
        corpus: String,

        /// Engine configuration file
        #[arg(long, default_value = "canonry.toml")]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Trace one inbound dependency chain from a definition
    Chain {
        /// Definition id
        id: String,

        /// Maximum chain depth
        #[arg(long, default_value_t = 10)]
        max_depth: usize,

        /// Corpus root directory
        #[arg(long, default_value = "corpus")]
        corpus: String,

        /// Engine configuration file
        #[arg(long, default_value = "canonry.toml")]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report whether a definition can be deleted without dangling references
    CanDelete {
        /// Definition id
        id: String,

        /// Corpus root directory
        #[arg(long, default_value = "corpus")]
        corpus: String,

        /// Engine configuration file
        #[arg(long, default_value = "canonry.toml")]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List definitions nothing references
    Orphans {
        /// Corpus root directory
        #[arg(long, default_value = "corpus")]
        corpus: String,

        /// Engine configuration file
        #[arg(long, default_value = "canonry.toml")]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List references whose target definition does not exist
    Missing {
        /// Cap on reported dangling references
        #[arg(long, default_value_t = 100)]
        max: usize,

        /// Corpus root directory
        #[arg(long, default_value = "corpus")]
        corpus: String,

        /// Engine configuration file
        #[arg(long, default_value = "canonry.toml")]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RepairModeArg {
    /// Report findings and the plan, touch nothing
    Validate,
    /// Write safe fixes to disk
    Apply,
    /// Render the planned fixes as a migration script
    Preview,
}

impl RepairModeArg {
    pub fn label(self) -> &'static str {
        match self {
            RepairModeArg::Validate => "validate",
            RepairModeArg::Apply => "apply",
            RepairModeArg::Preview => "preview",
        }
    }
}

impl From<RepairModeArg> for RepairMode {
    fn from(arg: RepairModeArg) -> Self {
        match arg {
            RepairModeArg::Validate => RepairMode::ValidateOnly,
            RepairModeArg::Apply => RepairMode::ApplySafeFixes,
            RepairModeArg::Preview => RepairMode::PreviewScript,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MissingPolicyArg {
    /// Suggest the nearest known id, never write it
    SuggestNearest,
    /// Clear fields whose reference cannot be resolved
    ClearField,
}

impl From<MissingPolicyArg> for MissingReferencePolicy {
    fn from(arg: MissingPolicyArg) -> Self {
        match arg {
            MissingPolicyArg::SuggestNearest => MissingReferencePolicy::SuggestNearest,
            MissingPolicyArg::ClearField => MissingReferencePolicy::ClearField,
        }
    }
}
