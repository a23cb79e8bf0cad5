//! tasksync config commands

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{self as cfg, Config};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

use super::ConfigCommands;

#[derive(Serialize)]
struct ConfigReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    config: &'a Config,
}

pub fn run(
    command: ConfigCommands,
    path: Option<PathBuf>,
    api_url: Option<String>,
    token: Option<String>,
    output: OutputOptions,
) -> Result<()> {
    match command {
        ConfigCommands::Show => show(path, api_url, token, output),
        ConfigCommands::Init { force } => init(path, force, output),
    }
}

fn show(
    path: Option<PathBuf>,
    api_url: Option<String>,
    token: Option<String>,
    output: OutputOptions,
) -> Result<()> {
    let source = path.clone().or_else(cfg::default_path);
    let mut config = Config::resolve(path.as_deref())?.with_overrides(api_url, token)?;
    if config.api.token.is_some() {
        config.api.token = Some("********".to_string());
    }

    let mut human = HumanOutput::new("tasksync config");
    if let Some(source) = &source {
        human.push_summary("file", source.display().to_string());
    }
    human.push_summary("api.base_url", config.api.base_url.clone());
    human.push_summary(
        "api.token",
        if config.api.token.is_some() { "set" } else { "unset" },
    );
    human.push_summary("api.timeout_secs", config.api.timeout_secs.to_string());
    human.push_summary(
        "tasks.per_page",
        config
            .tasks
            .per_page
            .map(|n| n.to_string())
            .unwrap_or_else(|| "server default".to_string()),
    );

    let report = ConfigReport {
        path: source.map(|p| p.display().to_string()),
        config: &config,
    };
    emit_success(output, "config show", &report, Some(&human))
}

fn init(path: Option<PathBuf>, force: bool, output: OutputOptions) -> Result<()> {
    let path = path.or_else(cfg::default_path).ok_or_else(|| {
        Error::InvalidConfig("no config directory available; pass --config".to_string())
    })?;
    if path.exists() && !force {
        return Err(Error::ConfigExists(path));
    }

    let config = Config::default();
    config.save(&path)?;
    tracing::debug!(path = %path.display(), "wrote default config");

    let mut human = HumanOutput::new("tasksync config init: wrote defaults");
    human.push_summary("file", path.display().to_string());
    human.push_next_step("set api.base_url and api.token");
    let report = ConfigReport {
        path: Some(path.display().to_string()),
        config: &config,
    };
    emit_success(output, "config init", &report, Some(&human))
}
