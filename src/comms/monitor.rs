//! Bot Monitor
//!
//! Counts handled interactions and auction outcomes.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub type SharedMonitor = Arc<Mutex<Monitor>>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BotMetrics {
    pub uptime_secs: u64,
    /// Seconds since the last command, component or modal
    pub idle_secs: Option<u64>,
    pub interactions: u64,
    pub commands: u64,
    pub components: u64,
    pub modals: u64,
    pub auctions_started: u64,
    pub auctions_settled: u64,
    pub auctions_cancelled: u64,
    pub auctions_failed: u64,
    pub render_failures: u64,
    pub errors: u64,
}

pub struct Monitor {
    start_time: Instant,
    last_interaction: Option<Instant>,
    metrics: BotMetrics,
}

impl Monitor {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            last_interaction: None,
            metrics: BotMetrics::default(),
        }
    }

    pub fn shared() -> SharedMonitor {
        Arc::new(Mutex::new(Self::new()))
    }

    fn touch(&mut self) {
        self.metrics.interactions += 1;
        self.last_interaction = Some(Instant::now());
    }

    pub fn record_command(&mut self) {
        self.touch();
        self.metrics.commands += 1;
    }

    pub fn record_component(&mut self) {
        self.touch();
        self.metrics.components += 1;
    }

    pub fn record_modal(&mut self) {
        self.touch();
        self.metrics.modals += 1;
    }

    pub fn record_auction_started(&mut self) {
        self.metrics.auctions_started += 1;
    }

    pub fn record_auction_settled(&mut self) {
        self.metrics.auctions_settled += 1;
    }

    pub fn record_auction_cancelled(&mut self) {
        self.metrics.auctions_cancelled += 1;
    }

    pub fn record_auction_failed(&mut self) {
        self.metrics.auctions_failed += 1;
    }

    pub fn record_render_failure(&mut self) {
        self.metrics.render_failures += 1;
    }

    pub fn record_error(&mut self) {
        self.metrics.errors += 1;
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn get_metrics(&self) -> BotMetrics {
        let mut m = self.metrics.clone();
        m.uptime_secs = self.start_time.elapsed().as_secs();
        m.idle_secs = self.last_interaction.map(|t| t.elapsed().as_secs());
        m
    }

    pub fn summary(&self) -> String {
        let m = self.get_metrics();
        format!(
            "Uptime: {}h {}m | Interactions: {} (idle {}) | Auctions: {} started, {} settled, {} cancelled, {} failed | Render failures: {} | Errors: {}",
            m.uptime_secs / 3600,
            (m.uptime_secs % 3600) / 60,
            m.interactions,
            m.idle_secs.map(|s| format!("{}s", s)).unwrap_or_else(|| "-".to_string()),
            m.auctions_started,
            m.auctions_settled,
            m.auctions_cancelled,
            m.auctions_failed,
            m.render_failures,
            m.errors
        )
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}
