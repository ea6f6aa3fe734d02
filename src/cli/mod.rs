//! CLI argument definitions for BugBoard.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::models::query::{IssueFilter, SortKey};
use crate::models::{IssueId, IssueType, Priority, Role, Status, UserId};

/// BugBoard - a terminal frontend for the BugBoard issue tracker.
///
/// Start with `bb login`, then `bb issue list` or `bb dashboard`.
#[derive(Parser, Debug)]
#[command(name = "bb")]
#[command(author, version = crate::VERSION, about = "Terminal frontend for the BugBoard issue tracker", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Backend base URL, including the /api prefix.
    /// Can also be set via BUGBOARD_API_URL or `bb config set api-url`.
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session token
    Login {
        /// Account email (e.g., anna.rossi@bugboard.it)
        email: String,

        /// Password. Read from stdin when omitted.
        #[arg(long, env = "BUGBOARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session (no server call)
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Request password recovery instructions by email
    RecoverPassword {
        /// Account email
        email: String,
    },

    /// Issue statistics and the most recent issues
    Dashboard,

    /// Issue commands
    Issue {
        #[command(subcommand)]
        command: IssueCommands,
    },

    /// Attachment commands
    Attachment {
        #[command(subcommand)]
        command: AttachmentCommands,
    },

    /// User administration commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Configuration and stored preferences
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Filter and sort options shared by the issue lists.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Case-insensitive title substring
    #[arg(short, long)]
    pub search: Option<String>,

    /// Filter by status (todo, inprogress, done)
    #[arg(long)]
    pub status: Option<Status>,

    /// Filter by type (bug, feature, question, documentation)
    #[arg(long = "type", short = 't')]
    pub issue_type: Option<IssueType>,

    /// Filter by priority (none, low, medium, high, critical)
    #[arg(long, short)]
    pub priority: Option<Priority>,

    /// Sort order (newest, oldest, title, title-desc, priority, priority-low)
    #[arg(long, default_value = "newest")]
    pub sort: SortKey,
}

impl FilterArgs {
    pub fn into_filter(self, archived: bool) -> IssueFilter {
        IssueFilter {
            search: self.search.unwrap_or_default(),
            status: self.status,
            issue_type: self.issue_type,
            priority: self.priority,
            sort: self.sort,
            archived,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum IssueCommands {
    /// List active issues (filtered by the server)
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List archived issues (filtered locally)
    Archived {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show issue details, attachments and available actions
    Show {
        /// Issue ID
        id: IssueId,

        /// List the issue was opened from (active, archived)
        #[arg(long, value_parser = ["active", "archived"])]
        from: Option<String>,
    },

    /// Create a new issue (status is always todo)
    Create {
        /// Issue title (max 200 characters)
        title: String,

        /// Issue description (max 5000 characters)
        #[arg(short, long)]
        description: String,

        /// Issue type (bug, feature, question, documentation)
        #[arg(long = "type", short = 't')]
        issue_type: IssueType,

        /// Priority (none, low, medium, high, critical)
        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Files to attach: images, PDF or Word documents up to 5 MB
        #[arg(short, long = "attach")]
        attach: Vec<PathBuf>,
    },

    /// Update an issue
    Update {
        /// Issue ID
        id: IssueId,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New type
        #[arg(long = "type")]
        issue_type: Option<IssueType>,

        /// New priority
        #[arg(long)]
        priority: Option<Priority>,

        /// New status (todo, inprogress, done)
        #[arg(long)]
        status: Option<Status>,
    },

    /// Archive a done issue (administrators)
    Archive {
        /// Issue ID
        id: IssueId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Restore an archived issue (administrators)
    Unarchive {
        /// Issue ID
        id: IssueId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Permanently delete an issue (administrators)
    Delete {
        /// Issue ID
        id: IssueId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Issue counts by status
    Stats,

    /// Search issues by title
    Search {
        /// Title substring
        term: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AttachmentCommands {
    /// List the attachments of an issue
    List {
        /// Issue ID
        issue: IssueId,
    },

    /// Upload images (jpeg, png, gif, webp, up to 5 MB each)
    Upload {
        /// Issue ID
        issue: IssueId,

        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Download an attachment
    Download {
        /// Issue ID
        issue: IssueId,

        /// Attachment ID
        attachment: u64,

        /// Directory to save into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Delete an attachment
    Delete {
        /// Issue ID
        issue: IssueId,

        /// Attachment ID
        attachment: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Number of attachments of an issue
    Count {
        /// Issue ID
        issue: IssueId,
    },

    /// Total attachment size of an issue
    Size {
        /// Issue ID
        issue: IssueId,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List registered users (administrators)
    List {
        /// Full-name substring
        #[arg(short, long)]
        name: Option<String>,

        /// Account status (all, active, inactive)
        #[arg(long, default_value = "all", value_parser = ["all", "active", "inactive"])]
        status: String,
    },

    /// Create a user; the email is generated from name and surname
    Create {
        /// First name
        name: String,

        /// Surname
        surname: String,

        /// Role (user, admin)
        #[arg(short, long, default_value = "user")]
        role: Role,

        /// Password (min 6 characters). Prompted on stdin when omitted.
        #[arg(long, env = "BUGBOARD_NEW_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Change a user's role
    Role {
        /// User ID
        id: UserId,

        /// New role (user, admin)
        role: Role,
    },

    /// Activate an account
    Activate {
        /// User ID
        id: UserId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Deactivate an account
    Deactivate {
        /// User ID
        id: UserId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Change your own password (prompted twice on stdin)
    Passwd,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings and their sources
    Show,

    /// Set a config.kdl value (api-url, output-format)
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show or store the sidebar preference
    Sidebar {
        /// New state (open, closed)
        #[arg(value_parser = ["open", "closed"])]
        state: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_issue_list_parses_filters() {
        let cli = Cli::try_parse_from([
            "bb", "issue", "list", "--status", "inprogress", "-t", "bug", "--sort", "priority",
        ])
        .unwrap();
        let Commands::Issue {
            command: IssueCommands::List { filter },
        } = cli.command
        else {
            panic!("expected issue list");
        };
        let filter = filter.into_filter(false);
        assert_eq!(filter.status, Some(Status::InProgress));
        assert_eq!(filter.issue_type, Some(IssueType::Bug));
        assert_eq!(filter.sort, SortKey::PriorityHighFirst);
        assert!(!filter.archived);
    }

    #[test]
    fn test_human_flag_is_global() {
        let cli = Cli::try_parse_from(["bb", "issue", "stats", "-H"]).unwrap();
        assert!(cli.human_readable);
    }
}
