use anyhow::Result;
use std::path::Path;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Parse stdout as a single JSON event.
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(self.stdout.trim())?)
    }
}

pub fn run_pkgmap_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    run_pkgmap_command_with_env(env, args, &[])
}

pub fn run_pkgmap_command_with_env(
    env: &TestEnvironment,
    args: &[&str],
    vars: &[(&str, &str)],
) -> Result<CommandOutput> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pkgmap"));
    cmd.args(args)
        .current_dir(env.path())
        .env("HOME", env.home())
        .env("XDG_CONFIG_HOME", env.config_home())
        .env_remove("PKGMAP_DATA_DIR")
        .env_remove("PKGMAP_DEBUG");
    for (key, value) in vars {
        cmd.env(key, value);
    }

    let output = cmd.output()?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Run against a data directory, colors off.
pub fn run_with_data(env: &TestEnvironment, data_dir: &Path, args: &[&str]) -> Result<CommandOutput> {
    let data_dir = data_dir.to_string_lossy().into_owned();
    let mut full = vec!["--no-color", "--data-dir", data_dir.as_str()];
    full.extend_from_slice(args);
    run_pkgmap_command(env, &full)
}
