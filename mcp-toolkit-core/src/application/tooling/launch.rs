//! Turns a [`ServerConfig`] into the parameters used to spawn a tool server.

use super::error::ToolkitError;
use crate::config::ServerConfig;
use crate::constants::{PACKAGE_RUNNER, WINDOWS_PACKAGE_RUNNER};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Host operating system family, as far as command resolution cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    Other,
}

impl HostPlatform {
    pub fn current() -> Self {
        if cfg!(windows) {
            HostPlatform::Windows
        } else {
            HostPlatform::Other
        }
    }
}

/// Resolved command, arguments and merged environment for one subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub server: String,
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub workdir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Build a launch spec against the current process environment and host.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ToolkitError> {
        Self::resolve(config, inherited_env(), HostPlatform::current())
    }

    pub fn resolve<I>(
        config: &ServerConfig,
        inherited: I,
        platform: HostPlatform,
    ) -> Result<Self, ToolkitError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let command = config
            .command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty())
            .ok_or_else(|| ToolkitError::Configuration {
                server: config.name.clone(),
                reason: "'command' is required and must not be empty".to_string(),
            })?;

        Ok(Self {
            server: config.name.clone(),
            program: resolve_program(command, platform).to_string(),
            args: config.args.clone(),
            env: merge_env(inherited, &config.env),
            workdir: config.workdir.clone(),
        })
    }

    /// Command with piped stdio, ready to be spawned by a [`super::Connection`].
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }
        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }
        command
    }
}

/// Swap the package runner for its `.cmd` shim on Windows; everything else passes through.
pub fn resolve_program(command: &str, platform: HostPlatform) -> &str {
    if platform == HostPlatform::Windows && command == PACKAGE_RUNNER {
        WINDOWS_PACKAGE_RUNNER
    } else {
        command
    }
}

/// Inherited variables overridden key-by-key by `overrides`.
pub fn merge_env<I>(inherited: I, overrides: &HashMap<String, String>) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut merged: BTreeMap<String, String> = inherited.into_iter().collect();
    merged.extend(
        overrides
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    merged
}

// Non UTF-8 variables are skipped here; the child still inherits them because
// `command()` layers the merged map over the inherited environment.
fn inherited_env() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}
