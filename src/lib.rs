pub mod ai;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod jenkins;
pub mod platform;
pub mod polarion;
pub mod report;
pub mod runbook;
pub mod selection;
pub mod workflow;
pub mod workspace;
