//! Deploy pipeline: pull the image on the target and start the container
//!
//! `docker` frequently exits zero while printing an error, so remote output
//! is screened against a table of known daemon-error phrases. The table
//! deliberately contains only the phrase the daemon actually emits for
//! pull/run failures; see DESIGN.md before extending or replacing it.

use tracing::info;

use crate::deploy::BranchDeployment;
use crate::errors::VolleyError;
use crate::exec::{Credential, RemoteExec};

/// Phrases that mark an exit-success response as a failure.
const DAEMON_ERROR_PHRASES: &[&str] = &["docker: Error response from daemon"];

fn screen_output(step: &str, output: &str) -> Result<(), VolleyError> {
    if output.trim().is_empty() {
        return Err(VolleyError::CommandError(format!(
            "{} produced no output where some was expected",
            step
        )));
    }

    for phrase in DAEMON_ERROR_PHRASES {
        if output.contains(phrase) {
            return Err(VolleyError::CommandError(format!(
                "{} failed: {}",
                step,
                output.trim()
            )));
        }
    }

    Ok(())
}

/// Pull `deployment.image` on the target and run it detached, binding
/// `host_port` to the project's declared `container_port`.
pub async fn pull_and_run(
    remote: &dyn RemoteExec,
    cred: &Credential,
    deployment: &BranchDeployment,
    host_port: u16,
    container_port: u16,
) -> Result<(), VolleyError> {
    let pull = format!("docker pull {}", deployment.image);
    let output = remote.run(&pull, cred).await?;
    screen_output(&pull, &output)?;

    let run = format!(
        "docker run -d -p {}:{} --name {} {}",
        host_port, container_port, deployment.container, deployment.image
    );
    let output = remote.run(&run, cred).await?;
    screen_output(&run, &output)?;

    info!(
        container = %deployment.container,
        host = %cred.host,
        port = host_port,
        "container started"
    );
    Ok(())
}
