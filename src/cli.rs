use clap::{Parser, Subcommand};

use crate::models::{Priority, Role, TaskStatus};

#[derive(Parser)]
#[command(author, version, about = "Terminal client for the task manager backend", long_about = None)]
pub struct Cli {
    /// Backend base URL, overriding config and TASKFLOW_API_BASE
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and report which dashboard the session belongs to
    Login {
        #[arg(value_name = "EMAIL")]
        email: String,
        #[arg(value_name = "PASSWORD")]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show the identity of the current session
    Me,
    /// Create an account
    Register {
        #[arg(value_name = "EMAIL")]
        email: String,
        #[arg(value_name = "PASSWORD")]
        password: String,
        #[arg(long, value_enum, default_value_t = Role::User)]
        role: Role,
    },
    /// List the tasks visible to the current session, with stats
    Tasks,
    /// Create a task (admin)
    Create {
        #[arg(long)]
        title: String,
        /// Email of the assignee
        #[arg(long = "assign", value_name = "EMAIL")]
        assigned_to: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
    },
    /// Edit a task (admin); unspecified fields keep their current value
    Edit {
        /// Task id or title
        #[arg(value_name = "TASK")]
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,
        #[arg(long = "assign", value_name = "EMAIL")]
        assigned_to: Option<String>,
    },
    /// Delete a task (admin)
    Delete {
        /// Task id or title
        #[arg(value_name = "TASK")]
        task: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Change a task's status
    Status {
        /// Task id or title
        #[arg(value_name = "TASK")]
        task: String,
        #[arg(value_enum, value_name = "STATUS")]
        status: TaskStatus,
    },
    /// List registered users (admin)
    Users,
    /// Read or change local settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_name = "SHELL")]
        shell: clap_complete::Shell,
    },
    /// Launch TUI interface
    Tui,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Set a config value
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Get a config value
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// List all config values
    List,
    /// Delete a config value
    Delete {
        #[arg(value_name = "KEY")]
        key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_status_accepts_snake_case_values() {
        let cli = Cli::try_parse_from(["taskflow", "status", "Write report", "in_progress"]).unwrap();
        match cli.command {
            Some(Commands::Status { task, status }) => {
                assert_eq!(task, "Write report");
                assert_eq!(status, TaskStatus::InProgress);
            }
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_create_defaults_priority_to_medium() {
        let cli = Cli::try_parse_from([
            "taskflow", "create", "--title", "Write report", "--assign", "b@x.com",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Create { priority, description, .. }) => {
                assert_eq!(priority, Priority::Medium);
                assert!(description.is_empty());
            }
            _ => panic!("expected create command"),
        }
    }

    #[test]
    fn test_no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["taskflow"]).unwrap();
        assert!(cli.command.is_none());
    }
}
