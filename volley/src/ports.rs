//! Remote port allocation
//!
//! Each target carries a durable counter: a text file holding the next host
//! port to hand out. The file is created by `setup`, read once per target at
//! the start of a deploy, and advanced after each successful branch deploy.
//! There is no remote locking primitive; serializing concurrent access is the
//! orchestrator's job.

use tracing::{info, warn};

use crate::errors::VolleyError;
use crate::exec::{Credential, RemoteExec};

/// First host port handed out on a freshly initialized target.
pub const BASE_PORT: u16 = 8900;

/// Remote path of the port marker file. Absence means uninitialized.
pub const MARKER_PATH: &str = "/opt/volley/port";

/// Owns the marker protocol for one target.
pub struct PortAllocator<'a> {
    exec: &'a dyn RemoteExec,
    cred: Credential,
}

impl<'a> PortAllocator<'a> {
    pub fn new(exec: &'a dyn RemoteExec, cred: Credential) -> Self {
        Self { exec, cred }
    }

    async fn marker_exists(&self) -> Result<bool, VolleyError> {
        let probe = format!(r#"if test -f "{}"; then echo "Found"; fi"#, MARKER_PATH);
        let out = self.exec.run(&probe, &self.cred).await?;
        Ok(out.trim() == "Found")
    }

    /// Create the marker with the base value if it is absent. Idempotent: an
    /// existing marker is left untouched with a warning.
    pub async fn initialize(&self) -> Result<(), VolleyError> {
        if self.marker_exists().await? {
            warn!(host = %self.cred.host, "port marker already exists, leaving it untouched");
            return Ok(());
        }

        let create = format!(
            "mkdir -p {} && echo {} > {}",
            parent_dir(MARKER_PATH),
            BASE_PORT,
            MARKER_PATH
        );
        self.exec.run(&create, &self.cred).await?;
        info!(host = %self.cred.host, port = BASE_PORT, "port marker created");
        Ok(())
    }

    /// Read the next available port, healing the marker first.
    ///
    /// If no running container on the target carries `container_prefix` in
    /// its name, everything volley once deployed there has been cleaned up
    /// externally, so the marker is reset to the base value. A missing or
    /// unparsable marker means `setup` was never run for this target and
    /// fails the whole target.
    pub async fn read_with_reset(&self, container_prefix: &str) -> Result<u16, VolleyError> {
        if !self.marker_exists().await? {
            return Err(VolleyError::StateError(format!(
                "port marker missing on {}; run setup first",
                self.cred.host
            )));
        }

        let raw = self
            .exec
            .run(&format!("cat {}", MARKER_PATH), &self.cred)
            .await?;
        let port: u16 = raw.trim().parse().map_err(|_| {
            VolleyError::StateError(format!(
                "port marker on {} is not a number: {:?}",
                self.cred.host,
                raw.trim()
            ))
        })?;

        let probe = format!(r#"docker ps --filter "name={}" -q"#, container_prefix);
        let running = self.exec.run(&probe, &self.cred).await?;
        if running.trim().is_empty() {
            info!(host = %self.cred.host, "no matching containers running, resetting port marker");
            self.persist(BASE_PORT).await?;
            return Ok(BASE_PORT);
        }

        Ok(port)
    }

    /// Write `value` to the marker.
    pub async fn persist(&self, value: u16) -> Result<(), VolleyError> {
        let write = format!("echo {} > {}", value, MARKER_PATH);
        self.exec.run(&write, &self.cred).await?;
        Ok(())
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(path)
}
