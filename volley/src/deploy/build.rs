//! Build & push pipeline
//!
//! Runs on the controller: check out the branch, build the image, push it to
//! the registry. The first failing step aborts the remaining steps for this
//! branch only; sibling branches and other targets are unaffected.

use tracing::info;

use crate::deploy::BranchDeployment;
use crate::errors::VolleyError;
use crate::exec::LocalExec;

pub async fn build_and_push(
    local: &dyn LocalExec,
    deployment: &BranchDeployment,
) -> Result<(), VolleyError> {
    let steps = [
        format!("git checkout {}", deployment.branch),
        format!("docker build -t {} .", deployment.image),
        format!("docker push {}", deployment.image),
    ];

    for cmd in &steps {
        info!(command = %cmd, "build step");
        local.run(cmd).await?;
    }

    info!(image = %deployment.image, "image pushed");
    Ok(())
}
