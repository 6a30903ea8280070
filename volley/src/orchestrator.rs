//! Deployment orchestration
//!
//! Two fan-out levels: one task per target, one nested task per branch. Each
//! parent joins all of its children, so an operation completes exactly when
//! the whole tree does. Nothing is cancelled mid-flight: a failing branch
//! skips only its own remaining steps, a failing target only its own
//! branches, and every other task keeps going.
//!
//! The remote port counter has no locking of its own. The target task owns
//! it instead: the counter is read once per target, branch ports are assigned
//! sequentially in branch-list order before the branch tasks start, and the
//! marker is persisted through a mutex-guarded high-water mark so branches
//! finishing out of order never move it backwards. Build/push and pull/run
//! still run in parallel across branches.

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::{Config, Target};
use crate::deploy::{build, release, teardown, BranchDeployment};
use crate::errors::VolleyError;
use crate::exec::remote::REMOTE_LOG;
use crate::exec::{Credential, LocalExec, RemoteExec};
use crate::notify::Notifier;
use crate::ports::PortAllocator;

/// Orchestrator options
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Cap on simultaneously working branch tasks across the whole run, and
    /// therefore on open remote connections.
    pub max_concurrency: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { max_concurrency: 16 }
    }
}

/// Aggregated per-branch outcomes of one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpSummary {
    pub succeeded: u32,
    pub failed: u32,
}

impl OpSummary {
    pub fn ok(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, success: bool) {
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    fn merge(&mut self, other: OpSummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<Config>,
    remote: Arc<dyn RemoteExec>,
    local: Arc<dyn LocalExec>,
    notifier: Arc<Notifier>,
    options: Options,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        remote: Arc<dyn RemoteExec>,
        local: Arc<dyn LocalExec>,
        notifier: Arc<Notifier>,
        options: Options,
    ) -> Self {
        Self {
            config,
            remote,
            local,
            notifier,
            options,
        }
    }

    /// Prepare every target: create the remote log file (best effort) and the
    /// port marker. Sequential; both side effects are idempotent per target.
    pub async fn setup(&self) -> OpSummary {
        let mut summary = OpSummary::default();

        for target in &self.config.targets {
            let cred = Credential::from_target(target);

            if let Err(e) = self.remote.run(&format!("touch {}", REMOTE_LOG), &cred).await {
                warn!(host = %cred.host, error = %e, "cannot create remote log file");
            }

            let allocator = PortAllocator::new(self.remote.as_ref(), cred.clone());
            match allocator.initialize().await {
                Ok(()) => summary.record(true),
                Err(e) => {
                    error!(host = %cred.host, error = %e, "cannot initialize target");
                    summary.record(false);
                }
            }
        }

        summary
    }

    /// Deploy every configured branch to every target.
    pub async fn deploy(&self) -> OpSummary {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency));
        let mut handles = Vec::with_capacity(self.config.targets.len());

        for target in self.config.targets.clone() {
            let this = self.clone();
            let permits = Arc::clone(&semaphore);
            let span = info_span!("target", host = %target.host);
            handles.push(tokio::spawn(
                async move { this.deploy_target(target, permits).await }.instrument(span),
            ));
        }

        let mut summary = OpSummary::default();
        for handle in handles {
            match handle.await {
                Ok(target_summary) => summary.merge(target_summary),
                Err(e) => {
                    error!(error = %e, "target task panicked");
                    summary.record(false);
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "deploy finished"
        );
        summary
    }

    async fn deploy_target(&self, target: Target, permits: Arc<Semaphore>) -> OpSummary {
        let cred = Credential::from_target(&target);
        let branch_count = target.branches.len() as u32;
        let prefix = BranchDeployment::container_prefix(&self.config.project.name);

        // Counter read happens once, before any branch task exists.
        let base = {
            let _permit = permits.acquire().await;
            let allocator = PortAllocator::new(self.remote.as_ref(), cred.clone());
            match allocator.read_with_reset(&prefix).await {
                Ok(port) => port,
                Err(e) => {
                    error!(error = %e, "cannot allocate ports, skipping target");
                    return OpSummary {
                        succeeded: 0,
                        failed: branch_count,
                    };
                }
            }
        };

        let high_water = Arc::new(Mutex::new(base));
        let mut handles = Vec::with_capacity(target.branches.len());

        for (index, branch) in target.branches.iter().enumerate() {
            let this = self.clone();
            let cred = cred.clone();
            let branch = branch.clone();
            let port = base + index as u16;
            let high_water = Arc::clone(&high_water);
            let permits = Arc::clone(&permits);
            let span = info_span!("branch", host = %cred.host, branch = %branch);

            handles.push(tokio::spawn(
                async move {
                    let _permit = permits.acquire().await;
                    match this.deploy_branch(&cred, &branch, port, high_water).await {
                        Ok(()) => true,
                        Err(e) => {
                            error!(error = %e, "branch deploy failed");
                            false
                        }
                    }
                }
                .instrument(span),
            ));
        }

        let mut summary = OpSummary::default();
        for handle in handles {
            match handle.await {
                Ok(success) => summary.record(success),
                Err(e) => {
                    error!(error = %e, "branch task panicked");
                    summary.record(false);
                }
            }
        }
        summary
    }

    async fn deploy_branch(
        &self,
        cred: &Credential,
        branch: &str,
        port: u16,
        high_water: Arc<Mutex<u16>>,
    ) -> Result<(), VolleyError> {
        let project = &self.config.project;
        let deployment = BranchDeployment::new(&self.config.registry, &project.name, branch);

        build::build_and_push(self.local.as_ref(), &deployment).await?;
        release::pull_and_run(self.remote.as_ref(), cred, &deployment, port, project.port).await?;

        let subject = format!("Deployed {} to server with PR {}", project.name, branch);
        let message = format!(
            "Deployed ({}:{}) to server {}:{}",
            project.name, branch, cred.host, port
        );
        self.notifier.broadcast(&subject, &message).await;

        // Persisted only after notification completes; a crash in between
        // leaves the marker stale for this branch (known gap, next deploy
        // reuses the port).
        let next = port + 1;
        let mut persisted = high_water.lock().await;
        if next > *persisted {
            let allocator = PortAllocator::new(self.remote.as_ref(), cred.clone());
            allocator.persist(next).await?;
            *persisted = next;
        }

        Ok(())
    }

    /// Remove every configured branch's containers from every target.
    pub async fn down(&self) -> OpSummary {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency));
        let mut handles = Vec::with_capacity(self.config.targets.len());

        for target in self.config.targets.clone() {
            let this = self.clone();
            let permits = Arc::clone(&semaphore);
            let span = info_span!("target", host = %target.host);
            handles.push(tokio::spawn(
                async move { this.down_target(target, permits).await }.instrument(span),
            ));
        }

        let mut summary = OpSummary::default();
        for handle in handles {
            match handle.await {
                Ok(target_summary) => summary.merge(target_summary),
                Err(e) => {
                    error!(error = %e, "target task panicked");
                    summary.record(false);
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "down finished"
        );
        summary
    }

    async fn down_target(&self, target: Target, permits: Arc<Semaphore>) -> OpSummary {
        let cred = Credential::from_target(&target);
        let mut handles = Vec::with_capacity(target.branches.len());

        for branch in &target.branches {
            let this = self.clone();
            let cred = cred.clone();
            let branch = branch.clone();
            let permits = Arc::clone(&permits);
            let span = info_span!("branch", host = %cred.host, branch = %branch);

            handles.push(tokio::spawn(
                async move {
                    let _permit = permits.acquire().await;
                    match this.down_branch(&cred, &branch).await {
                        Ok(()) => true,
                        Err(e) => {
                            error!(error = %e, "branch teardown failed");
                            false
                        }
                    }
                }
                .instrument(span),
            ));
        }

        let mut summary = OpSummary::default();
        for handle in handles {
            match handle.await {
                Ok(success) => summary.record(success),
                Err(e) => {
                    error!(error = %e, "branch task panicked");
                    summary.record(false);
                }
            }
        }
        summary
    }

    async fn down_branch(&self, cred: &Credential, branch: &str) -> Result<(), VolleyError> {
        let project = &self.config.project;
        let deployment = BranchDeployment::new(&self.config.registry, &project.name, branch);

        // Notification always follows, whatever the removal outcome was.
        let result = teardown::remove_containers(self.remote.as_ref(), cred, &deployment).await;

        let message = format!(
            "Shutdown ({}:{}) from server {}",
            project.name, branch, cred.host
        );
        // the shutdown notice doubles as its own subject line
        self.notifier.broadcast(&message, &message).await;

        result
    }
}
