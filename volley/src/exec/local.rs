//! Local command execution on the controller machine

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::errors::VolleyError;

/// Runs a command string on the controller and returns captured stdout.
#[async_trait]
pub trait LocalExec: Send + Sync {
    async fn run(&self, command: &str) -> Result<String, VolleyError>;
}

/// Production executor spawning the command directly.
///
/// The command line is split on whitespace into program and arguments, which
/// is enough for the git/docker invocations this tool issues. There is no
/// retry: a failed step aborts the branch it belongs to.
#[derive(Debug, Clone, Default)]
pub struct ShellExec;

#[async_trait]
impl LocalExec for ShellExec {
    async fn run(&self, command: &str) -> Result<String, VolleyError> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| VolleyError::CommandError("empty command".to_string()))?;

        debug!(command, "running local command");
        let output = Command::new(program)
            .args(parts)
            .output()
            .await
            .map_err(|e| VolleyError::CommandError(format!("cannot run {}: {}", command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VolleyError::CommandError(format!(
                "{} failed (exit {}): {}",
                command,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
