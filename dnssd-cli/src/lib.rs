//! # dnssd-cli: `dns-sd` command-line tool
//!
//! Thin front end over `dnssd-core`: browse, resolve, query and register
//! services through the local discovery daemon, plus offline helpers for
//! TXT records and service names.
//!
//! ## Modules
//!
//! - **config**: TOML tool configuration.
//! - **output**: text and JSON rendering of replies.
//! - **txt_args**: TXT records from `key=value` arguments.
//! - **runner**: drives one daemon session (Unix only).

pub mod config;
pub mod output;
pub mod txt_args;

#[cfg(unix)]
pub mod runner;
