//! Shared fakes for the unit suite
//!
//! `FakeRemote` models one port marker and one container list per host and
//! answers the exact command strings the production code issues.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use volley::config::{
    ChatConfig, Config, EmailConfig, NotificationConfig, Project, Target,
};
use volley::errors::VolleyError;
use volley::exec::{Credential, LocalExec, RemoteExec};
use volley::notify::{ChatPoster, EmailSender, Notifier};
use volley::orchestrator::{Options, Orchestrator};

#[derive(Default)]
struct HostState {
    marker: Option<String>,
    running: Vec<String>,
    stopped: Vec<String>,
    commands: Vec<String>,
}

#[derive(Default)]
struct RemoteState {
    hosts: HashMap<String, HostState>,
    unreachable: Vec<String>,
    failing_pulls: Vec<String>,
}

/// In-memory stand-in for a fleet of ssh targets.
#[derive(Clone, Default)]
pub struct FakeRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_marker(&self, host: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        state.hosts.entry(host.to_string()).or_default().marker = Some(value.to_string());
    }

    pub fn add_running(&self, host: &str, container: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .hosts
            .entry(host.to_string())
            .or_default()
            .running
            .push(container.to_string());
    }

    pub fn add_stopped(&self, host: &str, container: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .hosts
            .entry(host.to_string())
            .or_default()
            .stopped
            .push(container.to_string());
    }

    pub fn make_unreachable(&self, host: &str) {
        self.state.lock().unwrap().unreachable.push(host.to_string());
    }

    pub fn fail_pull(&self, image: &str) {
        self.state.lock().unwrap().failing_pulls.push(image.to_string());
    }

    pub fn marker(&self, host: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.hosts.get(host).and_then(|h| h.marker.clone())
    }

    pub fn running(&self, host: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.hosts.get(host).map(|h| h.running.clone()).unwrap_or_default()
    }

    pub fn commands(&self, host: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.hosts.get(host).map(|h| h.commands.clone()).unwrap_or_default()
    }
}

fn between<'a>(s: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = s.find(start)? + start.len();
    let len = s[from..].find(end)?;
    Some(&s[from..from + len])
}

#[async_trait]
impl RemoteExec for FakeRemote {
    async fn run(&self, command: &str, cred: &Credential) -> Result<String, VolleyError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable.contains(&cred.host) {
            return Err(VolleyError::ConnectionError(format!(
                "{}: connection refused",
                cred.host
            )));
        }

        let failing_pulls = state.failing_pulls.clone();
        let host = state.hosts.entry(cred.host.clone()).or_default();
        host.commands.push(command.to_string());

        if command.starts_with("touch ") {
            return Ok(String::new());
        }

        if command.starts_with("if test -f") {
            return Ok(if host.marker.is_some() {
                "Found\n".to_string()
            } else {
                String::new()
            });
        }

        if command.starts_with("cat ") {
            return Ok(host.marker.clone().unwrap_or_default());
        }

        // marker creation and rewrite both end in `echo N > path`
        if command.starts_with("mkdir -p") || command.starts_with("echo ") {
            if let Some(value) = between(command, "echo ", " >") {
                host.marker = Some(value.to_string());
            }
            return Ok(String::new());
        }

        // teardown: list-and-remove, checked before the plain running probe
        if command.starts_with("docker ps -aq --filter") {
            let name = between(command, "name=", "\"").unwrap_or_default();
            let matched: Vec<String> = host
                .running
                .iter()
                .chain(host.stopped.iter())
                .filter(|c| c.contains(name))
                .cloned()
                .collect();
            host.running.retain(|c| !c.contains(name));
            host.stopped.retain(|c| !c.contains(name));
            return Ok(matched.join("\n"));
        }

        if command.starts_with("docker ps --filter") {
            let name = between(command, "name=", "\"").unwrap_or_default();
            let matched: Vec<&String> =
                host.running.iter().filter(|c| c.contains(name)).collect();
            let ids: Vec<String> = matched
                .iter()
                .enumerate()
                .map(|(i, _)| format!("f{:011x}", i))
                .collect();
            return Ok(ids.join("\n"));
        }

        if let Some(image) = command.strip_prefix("docker pull ") {
            if failing_pulls.iter().any(|f| f == image) {
                return Ok(format!(
                    "docker: Error response from daemon: manifest for {} not found",
                    image
                ));
            }
            return Ok(format!("Status: Downloaded newer image for {}\n", image));
        }

        if command.starts_with("docker run ") {
            if let Some(name) = between(command, "--name ", " ") {
                host.running.push(name.to_string());
            }
            return Ok("4f5e6d7c8b9a0f1e2d3c4b5a69788796a5b4c3d2e1f0\n".to_string());
        }

        Ok(String::new())
    }
}

/// Records local commands; fails any command containing a scripted substring.
#[derive(Clone, Default)]
pub struct FakeLocal {
    commands: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl FakeLocal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, fragment: &str) {
        self.failing.lock().unwrap().push(fragment.to_string());
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocalExec for FakeLocal {
    async fn run(&self, command: &str) -> Result<String, VolleyError> {
        self.commands.lock().unwrap().push(command.to_string());
        let failing = self.failing.lock().unwrap();
        if failing.iter().any(|f| command.contains(f.as_str())) {
            return Err(VolleyError::CommandError(format!("{} failed (exit 1)", command)));
        }
        Ok(String::new())
    }
}

/// Records every send; fails for scripted recipients.
#[derive(Clone, Default)]
pub struct RecordingEmail {
    sent: Arc<Mutex<Vec<(String, String, String)>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl RecordingEmail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: &str) {
        self.failing.lock().unwrap().push(recipient.to_string());
    }

    /// (recipient, subject, body) triples in dispatch-completion order.
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmail {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), VolleyError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        if self.failing.lock().unwrap().iter().any(|f| f == to) {
            return Err(VolleyError::NotificationError(format!("mailbox {} unavailable", to)));
        }
        Ok(())
    }
}

/// Records every post; fails for scripted channels.
#[derive(Clone, Default)]
pub struct RecordingChat {
    posts: Arc<Mutex<Vec<(String, String)>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, channel: &str) {
        self.failing.lock().unwrap().push(channel.to_string());
    }

    /// (channel, text) pairs in dispatch-completion order.
    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPoster for RecordingChat {
    async fn post(&self, channel: &str, text: &str) -> Result<(), VolleyError> {
        self.posts
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        if self.failing.lock().unwrap().iter().any(|f| f == channel) {
            return Err(VolleyError::NotificationError(format!("webhook {} rejected", channel)));
        }
        Ok(())
    }
}

pub fn target(host: &str, branches: &[&str]) -> Target {
    Target {
        host: host.to_string(),
        user: "deploy".to_string(),
        port: 22,
        branches: branches.iter().map(|b| b.to_string()).collect(),
    }
}

pub fn notification_config(recipients: &[&str], channels: &[&str]) -> NotificationConfig {
    NotificationConfig {
        email: EmailConfig {
            enable: !recipients.is_empty(),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            smtp: None,
        },
        chat: ChatConfig {
            enable: !channels.is_empty(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
        },
    }
}

pub fn config(targets: Vec<Target>, notification: NotificationConfig) -> Config {
    Config {
        targets,
        project: Project {
            name: "webapp".to_string(),
            port: 3000,
        },
        notification,
        registry: "registry.example.com/team".to_string(),
    }
}

pub fn orchestrator(
    config: Config,
    remote: FakeRemote,
    local: FakeLocal,
    email: RecordingEmail,
    chat: RecordingChat,
) -> Orchestrator {
    let notifier = Notifier::with_senders(
        config.notification.clone(),
        Some(Arc::new(email)),
        Arc::new(chat),
    );
    Orchestrator::new(
        Arc::new(config),
        Arc::new(remote),
        Arc::new(local),
        Arc::new(notifier),
        Options::default(),
    )
}
