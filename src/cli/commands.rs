use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "trl",
    about = concat!("trellis v", env!("CARGO_PKG_VERSION"), " - grouped task lists you can drag into shape"),
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "workspace-dir", global = true)]
    pub workspace_dir: Option<String>,

    /// Log more (repeatable); TRELLIS_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a workspace in the current directory and create its first list
    Init(InitArgs),
    /// Open (creating if needed) the list for a widget instance
    Open(OpenArgs),
    /// List all lists
    Lists,
    /// Show a list as a tree
    Show(ShowArgs),
    /// Add a group, task or subtask
    #[command(subcommand)]
    Add(AddCmd),
    /// Set the title or text of a group, task or subtask
    Text(TextArgs),
    /// Toggle completion of a task or subtask
    Toggle(ItemArgs),
    /// Toggle collapsed state of a group or task
    Collapse(ItemArgs),
    /// Delete a group, task or subtask
    Rm(ItemArgs),
    /// Rename a list
    Rename(RenameArgs),
    /// Drag an item onto a target and commit the result
    Mv(MvArgs),
    /// Print the canonical form of a groups JSON file
    Normalize(NormalizeArgs),
    /// Print a list again whenever it changes
    Watch(WatchArgs),
}

// ---------------------------------------------------------------------------
// Lifecycle args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Name of the first list (default: "Tasks")
    #[arg(long)]
    pub name: Option<String>,
    /// Widget instance the first list belongs to
    #[arg(long, default_value = "default")]
    pub instance: String,
}

#[derive(Args)]
pub struct OpenArgs {
    /// Widget instance key
    pub instance: String,
    /// Name used if the list has to be created (default: from config)
    #[arg(long)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Read args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShowArgs {
    /// List id
    pub list: String,
    /// Also show the contents of collapsed groups and tasks
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct WatchArgs {
    /// List id
    pub list: String,
}

#[derive(Args)]
pub struct NormalizeArgs {
    /// JSON file holding groups, or `-` for stdin
    pub file: String,
}

// ---------------------------------------------------------------------------
// Write args
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum AddCmd {
    /// Append a group
    Group {
        /// List id
        list: String,
        /// Group title (default: placeholder)
        title: Option<String>,
    },
    /// Append a task to a group
    Task {
        /// List id
        list: String,
        /// Group id
        group: String,
        /// Task text
        text: Option<String>,
    },
    /// Append a subtask to a task
    Subtask {
        /// List id
        list: String,
        /// Task id
        task: String,
        /// Subtask text
        text: Option<String>,
    },
}

#[derive(Args)]
pub struct TextArgs {
    /// List id
    pub list: String,
    /// Group, task or subtask id
    pub id: String,
    /// New title or text
    pub text: String,
}

#[derive(Args)]
pub struct ItemArgs {
    /// List id
    pub list: String,
    /// Group, task or subtask id
    pub id: String,
}

#[derive(Args)]
pub struct RenameArgs {
    /// List id
    pub list: String,
    /// New list title
    pub title: String,
}

#[derive(Args)]
pub struct MvArgs {
    /// List id
    pub list: String,
    /// Item to drag: group:ID, task:ID or subtask:ID
    pub active: String,
    /// Drop target: group:ID, task:ID, subtask:ID, tasks:GROUP_ID or subtasks:TASK_ID
    pub over: String,
}
