//! CLI commands

pub mod config;
pub mod doctor;
pub mod shell;
pub mod simulate;
