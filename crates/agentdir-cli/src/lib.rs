//! agentdir CLI - command-line interface for the agent directory
//!
//! This crate provides the CLI application that ties together the core
//! selection logic and the HTTP clients.

pub mod config;

pub use config::{Command, Config, EditArgs, FilterArgs, OutputFormat};
