//! Student job-application tracking: job records with filterable listings,
//! plus student accounts with salted password credentials and bearer sessions.

pub mod accounts;
pub mod config;
pub mod error;
pub mod jobs;
pub mod telemetry;
