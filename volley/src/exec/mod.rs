//! Command execution, local and remote

pub mod local;
pub mod remote;

pub use local::{LocalExec, ShellExec};
pub use remote::{Credential, RemoteExec, SshExec};
