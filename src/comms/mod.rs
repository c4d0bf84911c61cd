//! Communications Module
//!
//! - Inbound interaction payloads and responses
//! - Outbound message model and transport trait
//! - Discord REST client
//! - Bot metrics

pub mod interaction;
pub mod message;
pub mod transport;
pub mod discord;
pub mod monitor;
