//! Data Module
//!
//! Flat-file persistence.
//! - JSON document load/save
//! - Last-transaction log

pub mod json_file;
pub mod transaction_log;
