//! Volley - branch deployment over SSH
//!
//! Deploys named git branches of one project as docker containers onto a
//! fleet of remote hosts, handing each deployment a stable host port from a
//! durable per-host counter, and fans out notifications as branches come up
//! or go down.

pub mod config;
pub mod deploy;
pub mod errors;
pub mod exec;
pub mod logs;
pub mod notify;
pub mod orchestrator;
pub mod ports;
