//! Transport abstraction
//!
//! Renders that happen after the immediate interaction response: auction
//! countdown edits and follow-up notices.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::comms::message::Reply;

/// Transport trait - every chat backend must implement this
#[async_trait]
pub trait Transport: Send + Sync {
    /// Replace the original response of the interaction behind `token`
    async fn edit_original(&self, token: &str, reply: &Reply) -> Result<()>;

    /// Post an additional message on the interaction behind `token`
    async fn follow_up(&self, token: &str, reply: &Reply) -> Result<()>;
}

pub type SharedTransport = Arc<dyn Transport>;

/// In-memory transport that keeps every render for inspection
#[cfg(test)]
pub mod recording {
    use super::*;
    use anyhow::bail;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Sent {
        Edit(Reply),
        FollowUp(Reply),
    }

    #[derive(Default)]
    pub struct RecordingTransport {
        sent: StdMutex<Vec<Sent>>,
        fail_edits: bool,
    }

    impl RecordingTransport {
        pub fn failing_edits() -> Self {
            Self {
                fail_edits: true,
                ..Self::default()
            }
        }

        pub fn edits(&self) -> Vec<Reply> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter_map(|s| match s {
                    Sent::Edit(r) => Some(r.clone()),
                    Sent::FollowUp(_) => None,
                })
                .collect()
        }

        pub fn follow_ups(&self) -> Vec<Reply> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter_map(|s| match s {
                    Sent::FollowUp(r) => Some(r.clone()),
                    Sent::Edit(_) => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn edit_original(&self, _token: &str, reply: &Reply) -> Result<()> {
            if self.fail_edits {
                bail!("edit rejected");
            }
            self.sent.lock().unwrap().push(Sent::Edit(reply.clone()));
            Ok(())
        }

        async fn follow_up(&self, _token: &str, reply: &Reply) -> Result<()> {
            self.sent.lock().unwrap().push(Sent::FollowUp(reply.clone()));
            Ok(())
        }
    }
}
