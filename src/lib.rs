//! Kaufbot Library
//!
//! A guild economy bot for Discord's HTTP interactions model.
//!
//! # Features
//!
//! - Cash and bank balances per guild, persisted as JSON
//! - Timed four-stage purchase auctions that transfer ownership
//! - An ownership forest with role labels and cycle protection

pub mod config;
pub mod core;
pub mod data;
pub mod comms;
pub mod bot;
pub mod server;
