pub mod build;
pub mod commands;
pub mod config;
