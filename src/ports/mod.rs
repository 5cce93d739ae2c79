//! Collaborator traits the domain is driven through.

pub mod config_port;
pub mod data_port;
pub mod optimizer_port;
pub mod report_port;
