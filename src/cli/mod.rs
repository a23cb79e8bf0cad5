//! Command-line interface for tasksync
//!
//! This module defines the CLI structure using clap derive macros.
//! Task commands live in `task`, config commands in `config`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::http::HttpGateway;
use crate::output::OutputOptions;
use crate::store::{StoreOptions, TaskStore};
use crate::task::TaskId;

mod config;
mod task;

/// tasksync - task list client
///
/// Lists and edits tasks on a task API, applying completion toggles and
/// reorders optimistically.
#[derive(Parser, Debug)]
#[command(name = "tasksync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to tasksync.toml (defaults to the platform config dir)
    #[arg(long, global = true, env = "TASKSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// API base URL, overriding api.base_url
    #[arg(long, global = true, env = "TASKSYNC_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token, overriding api.token
    #[arg(long, global = true, env = "TASKSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tasks
    List {
        /// Only tasks due on this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Only completed tasks
        #[arg(long, conflicts_with = "pending")]
        completed: bool,

        /// Only pending tasks
        #[arg(long)]
        pending: bool,

        /// Case-insensitive search over title and description (searches all tasks)
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one task
    Show {
        /// Task ID
        id: TaskId,
    },

    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Task description
        #[arg(short, long)]
        description: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Create the task already completed
        #[arg(long)]
        completed: bool,
    },

    /// Update fields of a task
    Edit {
        /// Task ID
        id: TaskId,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Remove the description
        #[arg(long)]
        clear_description: bool,

        /// New due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// New sort order (>= 1)
        #[arg(long)]
        order: Option<i64>,

        /// Set completion explicitly (true/false)
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: TaskId,
    },

    /// Toggle a task's completion
    Toggle {
        /// Task ID
        id: TaskId,
    },

    /// Assign sort orders to tasks
    Reorder {
        /// Assignments as ID=ORDER
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Everything a task command needs, built once per invocation.
pub struct AppContext {
    pub store: TaskStore<HttpGateway>,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        let gateway = HttpGateway::new(&config.api)?;
        let store = TaskStore::new(gateway, StoreOptions::from(&config.tasks));
        Ok(Self { store })
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Config(cmd) => {
                config::run(cmd, self.config, self.api_url, self.token, output)
            }
            command => {
                let config = Config::resolve(self.config.as_deref())?
                    .with_overrides(self.api_url, self.token)?;
                let context = AppContext::new(&config)?;
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(task::run(command, &context, output))
            }
        }
    }
}
