pub mod browser;
pub mod cli;
pub mod client;
pub mod config;
pub mod discover;
pub mod download;
pub mod error;
pub mod handoff;
pub mod interrupt;
pub mod locate;
pub mod orchestrator;
pub mod platform;
pub mod poll;
pub mod report;
