//! One-shot PowerShell invocation for the cache administration cmdlets
//!
//! Every command runs in a fresh `powershell` process and pipes its result through
//! `ConvertTo-Json`, so callers only ever deal with `serde_json::Value` records.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub const ADMIN_MODULE: &str = "DistributedCacheAdministration";
pub const CLIENT_ASSEMBLY: &str = "Microsoft.ApplicationServer.Caching.Client";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{command} failed: {message}")]
    Failed { command: String, message: String },
    #[error("{command} could not be launched: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} returned unreadable output: {source}")]
    Output {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CommandError {
    pub fn failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn command(&self) -> &str {
        match self {
            Self::Failed { command, .. }
            | Self::Spawn { command, .. }
            | Self::Output { command, .. } => command,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PsParam {
    Text(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    Switch,
}

#[derive(Debug, Clone)]
pub struct PsCommand {
    name: &'static str,
    params: Vec<(&'static str, PsParam)>,
    pipeline: Vec<&'static str>,
}

impl PsCommand {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
            pipeline: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn text(mut self, param: &'static str, value: impl Into<String>) -> Self {
        self.params.push((param, PsParam::Text(value.into())));
        self
    }

    pub fn int(mut self, param: &'static str, value: i64) -> Self {
        self.params.push((param, PsParam::Int(value)));
        self
    }

    pub fn bool(mut self, param: &'static str, value: bool) -> Self {
        self.params.push((param, PsParam::Bool(value)));
        self
    }

    pub fn list(mut self, param: &'static str, values: Vec<String>) -> Self {
        self.params.push((param, PsParam::List(values)));
        self
    }

    pub fn switch(mut self, param: &'static str) -> Self {
        self.params.push((param, PsParam::Switch));
        self
    }

    pub fn pipe(mut self, stage: &'static str) -> Self {
        self.pipeline.push(stage);
        self
    }

    pub fn render(&self) -> String {
        let mut rendered = self.name.to_string();
        for (param, value) in &self.params {
            rendered.push_str(" -");
            rendered.push_str(param);
            match value {
                PsParam::Text(text) => {
                    rendered.push(' ');
                    rendered.push_str(&quote(text));
                }
                PsParam::Int(number) => {
                    rendered.push(' ');
                    rendered.push_str(&number.to_string());
                }
                PsParam::Bool(flag) => {
                    rendered.push_str(if *flag { ":$true" } else { ":$false" });
                }
                PsParam::List(items) => {
                    let quoted = items.iter().map(|item| quote(item)).collect::<Vec<_>>();
                    rendered.push_str(" @(");
                    rendered.push_str(&quoted.join(","));
                    rendered.push(')');
                }
                PsParam::Switch => {}
            }
        }

        for stage in &self.pipeline {
            rendered.push_str(" | ");
            rendered.push_str(stage);
        }

        rendered
    }
}

/// Single-quoted PowerShell literal. PowerShell also treats the typographic single
/// quotes as delimiters, so those are doubled as well.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for character in value.chars() {
        if matches!(character, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
            quoted.push(character);
        }
        quoted.push(character);
    }
    quoted.push('\'');
    quoted
}

#[derive(Debug, Clone, Default)]
pub struct PsSession {
    pub provider: Option<String>,
    pub connection_string: Option<String>,
}

impl PsSession {
    pub fn new(provider: Option<String>, connection_string: Option<String>) -> Self {
        Self {
            provider,
            connection_string,
        }
    }

    pub fn admin_script(&self, command: &PsCommand) -> String {
        let mut use_cluster = PsCommand::new("Use-CacheCluster");
        if let (Some(provider), Some(connection_string)) =
            (self.provider.as_deref(), self.connection_string.as_deref())
        {
            use_cluster = use_cluster
                .text("Provider", provider)
                .text("ConnectionString", connection_string);
        }

        format!(
            "$ErrorActionPreference = 'Stop'; Import-Module {ADMIN_MODULE}; {}; {} | ConvertTo-Json -Depth 6 -Compress",
            use_cluster.render(),
            command.render()
        )
    }

    pub fn client_script(&self, body: &str) -> String {
        format!(
            "$ErrorActionPreference = 'Stop'; [void][Reflection.Assembly]::LoadWithPartialName({}); & {{ {body} }} | ConvertTo-Json -Depth 6 -Compress",
            quote(CLIENT_ASSEMBLY)
        )
    }
}

#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, command: &str, script: &str) -> Result<String, CommandError>;
}

#[derive(Debug, Clone)]
pub struct PowerShellRunner {
    binary: String,
}

impl PowerShellRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ScriptRunner for PowerShellRunner {
    async fn run(&self, command: &str, script: &str) -> Result<String, CommandError> {
        let started_at = Instant::now();
        let output = Command::new(&self.binary)
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                script,
            ])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: command.to_string(),
                source,
            })?;

        debug!(
            command = %command,
            status = ?output.status.code(),
            duration_ms = started_at.elapsed().as_millis(),
            "powershell command finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("powershell exited with {}", output.status)
            } else {
                stderr
            };
            return Err(CommandError::failed(command, message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// `ConvertTo-Json` emits nothing for an empty pipeline, a bare object for a single
/// result and an array otherwise.
pub fn parse_output(command: &str, stdout: &str) -> Result<Vec<Value>, CommandError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|source| CommandError::Output {
        command: command.to_string(),
        source,
    })?;

    Ok(match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().filter(|item| !item.is_null()).collect(),
        other => vec![other],
    })
}
