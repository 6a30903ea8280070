//! Teardown pipeline: remove a branch's containers from a target
//!
//! Zero matches is success, not an error — `xargs -r` skips the removal
//! entirely when the filter finds nothing.

use tracing::info;

use crate::deploy::BranchDeployment;
use crate::errors::VolleyError;
use crate::exec::{Credential, RemoteExec};

pub async fn remove_containers(
    remote: &dyn RemoteExec,
    cred: &Credential,
    deployment: &BranchDeployment,
) -> Result<(), VolleyError> {
    let cmd = format!(
        r#"docker ps -aq --filter "name={}" | xargs -r docker rm -f"#,
        deployment.container
    );
    let output = remote.run(&cmd, cred).await?;

    if output.trim().is_empty() {
        info!(container = %deployment.container, host = %cred.host, "no containers to remove");
    } else {
        info!(container = %deployment.container, host = %cred.host, "containers removed");
    }

    Ok(())
}
