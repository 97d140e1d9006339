//! Transport layer: CLI commands and the HTTP forwarding proxy

pub mod cli;
pub mod http;
