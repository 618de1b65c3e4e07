//! Command-line interface definition for the `adowork` binary.
//!
//! Argument parsing lives in the library so conversions from arguments to
//! client inputs can be tested without spawning the binary.

use clap::{Parser, Subcommand, ValueEnum};
use secrecy::SecretString;

use crate::error::ConfigError;
use crate::models::{
    AssigneeFilter, SortOrder, WorkItemCreatePayload, WorkItemListFilters, WorkItemType,
    WorkItemUpdatePatch,
};
use crate::secret::SecretStore;

/// Version string shown by `--version`, including the git revision.
pub const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(
    author,
    version = LONG_VERSION,
    about = "Browse, create and edit Azure DevOps work items",
    long_about = "Browse, filter, create and edit Azure DevOps work items from the terminal.\n\n\
        Connection settings are read from ~/.config/adowork/config.toml (or ADOWORK_* \
        environment variables). The PAT is kept in the OS keyring, or read from ADOWORK_PAT.\n\
        Every command prints JSON on stdout.",
    after_help = "EXAMPLES:\n    \
        adowork configure --organization-url https://dev.azure.com/myorg --project MyProject\n    \
        adowork pat set <PAT>\n    \
        adowork list --type user-story --me --state Active\n    \
        adowork create --type task --title \"Write docs\" --parent 123"
)]
pub struct Args {
    /// Log level (trace, debug, info, warn, error); logging is off by default
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_file: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Work item type as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TypeArg {
    Epic,
    Feature,
    UserStory,
    Task,
}

impl From<TypeArg> for WorkItemType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Epic => WorkItemType::Epic,
            TypeArg::Feature => WorkItemType::Feature,
            TypeArg::UserStory => WorkItemType::UserStory,
            TypeArg::Task => WorkItemType::Task,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortArg {
    #[default]
    Changed,
    Created,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Changed => SortOrder::ChangedDesc,
            SortArg::Created => SortOrder::CreatedDesc,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save organization URL, project and default area path
    Configure(ConfigureArgs),

    /// Manage the stored Personal Access Token
    #[command(subcommand)]
    Pat(PatCommand),

    /// Check that the configuration and PAT work
    Test,

    /// List work items matching filters
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Show one work item with description, tags and parent
    Show { id: i64 },

    /// List the direct children of a work item
    Children { id: i64 },

    /// Create a work item
    Create(CreateArgs),

    /// Change fields of a work item
    Update(UpdateArgs),

    /// Move a work item under another one, or detach it
    SetParent {
        id: i64,
        /// New parent id; omit to remove the current parent
        #[arg(long)]
        parent: Option<i64>,
    },

    /// List open work items that could become the parent of a work item
    Parents { id: i64 },

    /// List the states of a work item type
    States {
        #[arg(value_enum)]
        work_item_type: TypeArg,
    },

    /// List current and recent iterations
    Iterations,

    /// List area paths
    Areas,

    /// Look up users
    #[command(subcommand)]
    Users(UsersCommand),

    /// Show the user the PAT belongs to
    Whoami,
}

#[derive(clap::Args, Debug)]
pub struct ConfigureArgs {
    /// e.g. https://dev.azure.com/my-org
    #[arg(long)]
    pub organization_url: String,

    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub default_area_path: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum PatCommand {
    /// Store a PAT
    Set { pat: String },
    /// Remove the stored PAT
    Clear,
    /// Report whether a PAT is available
    Status,
}

impl PatCommand {
    /// Apply the command and report whether a PAT is configured afterwards.
    ///
    /// `set` and `clear` always act on `persistent`, even when `effective`
    /// (the store the client reads) is an environment override. `status`
    /// reports on `effective`.
    pub fn run(
        self,
        persistent: &dyn SecretStore,
        effective: &dyn SecretStore,
    ) -> Result<bool, ConfigError> {
        match self {
            Self::Set { pat } => {
                persistent.set_secret(SecretString::from(pat))?;
                Ok(true)
            }
            Self::Clear => {
                persistent.clear_secret()?;
                Ok(effective.has_secret())
            }
            Self::Status => Ok(effective.has_secret()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// Search users in the organization
    Search { query: String },
    /// Users recently assigned to work items in the project
    Project,
}

#[derive(clap::Args, Debug, Default)]
pub struct ListArgs {
    /// Work item type; repeat for several
    #[arg(long = "type", value_enum)]
    pub types: Vec<TypeArg>,

    /// Only items assigned to the PAT owner
    #[arg(long, conflicts_with = "assignee")]
    pub me: bool,

    /// Only items assigned to this identity id
    #[arg(long)]
    pub assignee: Option<String>,

    /// Unique name (e-mail) of --assignee, matched in preference to the id
    #[arg(long, requires = "assignee")]
    pub assignee_name: Option<String>,

    /// State; repeat for several
    #[arg(long = "state")]
    pub states: Vec<String>,

    /// Text contained in the title
    #[arg(long)]
    pub text: Option<String>,

    #[arg(long)]
    pub area: Option<String>,

    #[arg(long)]
    pub iteration: Option<String>,

    /// Only items changed within this many days
    #[arg(long)]
    pub changed_since: Option<u32>,

    #[arg(long, value_enum, default_value_t = SortArg::Changed)]
    pub sort: SortArg,
}

impl ListArgs {
    pub fn to_filters(&self) -> WorkItemListFilters {
        let assigned_to = if self.me {
            Some(AssigneeFilter::Me)
        } else {
            self.assignee
                .clone()
                .map(|identity_id| AssigneeFilter::Identity {
                    identity_id,
                    unique_name: self.assignee_name.clone(),
                })
        };
        WorkItemListFilters {
            types: self.types.iter().copied().map(Into::into).collect(),
            assigned_to,
            states: self.states.clone(),
            text: self.text.clone(),
            area_path: self.area.clone(),
            iteration_path: self.iteration.clone(),
            changed_since_days: self.changed_since,
            sort: self.sort.into(),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    #[arg(long = "type", value_enum)]
    pub work_item_type: TypeArg,

    #[arg(long)]
    pub title: String,

    /// HTML description
    #[arg(long)]
    pub description: Option<String>,

    /// Unique name or display name of the assignee
    #[arg(long)]
    pub assign_to: Option<String>,

    #[arg(long)]
    pub parent: Option<i64>,

    /// Defaults to the configured default area path
    #[arg(long)]
    pub area: Option<String>,

    #[arg(long)]
    pub iteration: Option<String>,
}

impl CreateArgs {
    /// Payload for the client; `default_area_path` fills in a missing area.
    pub fn to_payload(&self, default_area_path: Option<&str>) -> WorkItemCreatePayload {
        WorkItemCreatePayload {
            description: self.description.clone(),
            assigned_to: self.assign_to.clone(),
            parent_id: self.parent,
            area_path: self
                .area
                .clone()
                .or_else(|| default_area_path.map(String::from)),
            iteration_path: self.iteration.clone(),
            ..WorkItemCreatePayload::new(self.work_item_type.into(), self.title.clone())
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub state: Option<String>,

    #[arg(long)]
    pub assign_to: Option<String>,

    #[arg(long)]
    pub area: Option<String>,

    #[arg(long)]
    pub iteration: Option<String>,
}

impl UpdateArgs {
    pub fn to_patch(&self) -> WorkItemUpdatePatch {
        WorkItemUpdatePatch {
            title: self.title.clone(),
            description: self.description.clone(),
            state: self.state.clone(),
            assigned_to: self.assign_to.clone(),
            area_path: self.area.clone(),
            iteration_path: self.iteration.clone(),
        }
    }
}
