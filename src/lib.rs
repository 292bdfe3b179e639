//! Bulk directory administration for Microsoft 365 tenants.
//!
//! CSV-driven UPN and proxy-address updates with per-row confirmation, and an
//! inbox rules report. The `dirbulk` binary is a thin clap front end over
//! [`cmd`].

pub mod audit;
pub mod bulk;
pub mod cmd;
pub mod config;
pub mod directory;
pub mod error;
pub mod graph;
pub mod ui;
