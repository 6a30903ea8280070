//! Deployment pipelines
//!
//! One `BranchDeployment` exists per (target, branch) attempt and carries the
//! derived names used by every pipeline stage.

pub mod build;
pub mod release;
pub mod teardown;

/// Replace `/` with `-` so branch and project names are usable inside image
/// tags and container names. Two distinct branches that sanitize identically
/// collide; that is accepted, not an error.
pub fn sanitize(name: &str) -> String {
    name.replace('/', "-")
}

/// Derived values for one branch deployment. Ephemeral: lives only for the
/// duration of one branch task.
#[derive(Debug, Clone)]
pub struct BranchDeployment {
    /// Branch name as configured
    pub branch: String,

    /// Image tag: `registry/project:sanitized-branch`
    pub image: String,

    /// Container name: `sanitized-project__sanitized-branch`
    pub container: String,
}

impl BranchDeployment {
    pub fn new(registry: &str, project_name: &str, branch: &str) -> Self {
        let image = format!("{}/{}:{}", registry, project_name, sanitize(branch));
        let container = format!("{}__{}", sanitize(project_name), sanitize(branch));
        Self {
            branch: branch.to_string(),
            image,
            container,
        }
    }

    /// Name prefix shared by every container this project deploys on a
    /// target, used for the port marker's reset probe.
    pub fn container_prefix(project_name: &str) -> String {
        format!("{}__", sanitize(project_name))
    }
}
