//! Remote command execution over SSH
//!
//! Commands are run through the system `ssh` binary rather than an in-process
//! SSH implementation, so key resolution, known_hosts and agent forwarding
//! all behave exactly as they do for the operator's own shell. Authentication
//! material is assumed to be configured externally.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::Target;
use crate::errors::VolleyError;

/// Remote log file that receives a record of every command and its output.
pub const REMOTE_LOG: &str = "/var/log/volley.log";

/// SSH exit code that signals a transport or authentication failure,
/// as opposed to a remote command failing on its own.
const SSH_CONNECTION_EXIT: i32 = 255;

/// Connection details for one target host.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user: String,
    pub host: String,
    pub port: u16,
}

impl Credential {
    pub fn from_target(target: &Target) -> Self {
        Self {
            user: target.user.clone(),
            host: target.host.clone(),
            port: target.port,
        }
    }
}

/// Runs a command string against a remote host and returns captured output.
#[async_trait]
pub trait RemoteExec: Send + Sync {
    async fn run(&self, command: &str, cred: &Credential) -> Result<String, VolleyError>;
}

/// Production executor shelling out to `ssh`.
#[derive(Debug, Clone, Default)]
pub struct SshExec;

impl SshExec {
    fn ssh_args(cred: &Credential, command: &str) -> Vec<String> {
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-p".to_string(),
            cred.port.to_string(),
            format!("{}@{}", cred.user, cred.host),
            command.to_string(),
        ]
    }

    async fn session(&self, command: &str, cred: &Credential) -> Result<(String, i32), VolleyError> {
        let output = Command::new("ssh")
            .args(Self::ssh_args(cred, command))
            .output()
            .await
            .map_err(|e| VolleyError::ConnectionError(format!("cannot run ssh: {}", e)))?;

        let code = output.status.code().unwrap_or(-1);
        if code == SSH_CONNECTION_EXIT {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VolleyError::ConnectionError(format!(
                "{}: {}",
                cred.host,
                stderr.trim()
            )));
        }

        Ok((String::from_utf8_lossy(&output.stdout).to_string(), code))
    }
}

#[async_trait]
impl RemoteExec for SshExec {
    /// Run `command` on the target and return its combined output.
    ///
    /// The command's stdout and stderr are folded together and also appended
    /// to the remote log file, preceded by a timestamped record of the
    /// command itself. Failure of the record write is swallowed. A non-zero
    /// remote exit is not an error here: some commands exit zero with an
    /// embedded error message and some exit non-zero harmlessly, so textual
    /// interpretation is left to the caller.
    async fn run(&self, command: &str, cred: &Credential) -> Result<String, VolleyError> {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f");
        let record = format!(r#"echo '{}: "{}"' >> {}"#, stamp, command, REMOTE_LOG);
        let _ = self.session(&record, cred).await;

        debug!(host = %cred.host, command, "running remote command");
        let logged = format!("{} 2>&1 | tee -a {}", command, REMOTE_LOG);
        let (output, _code) = self.session(&logged, cred).await?;

        if !output.trim().is_empty() {
            debug!(host = %cred.host, output = %output.trim(), "remote output");
        }

        Ok(output)
    }
}
