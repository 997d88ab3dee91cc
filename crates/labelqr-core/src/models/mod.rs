//! Configuration and output data models.

pub mod config;
pub mod record;
