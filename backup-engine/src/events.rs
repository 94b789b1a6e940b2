//! Fire-and-forget backup events.
//!
//! Events are pushed onto a broadcast channel; a push-notification bridge (or
//! anything else) subscribes. Sending never waits and never fails the caller.

use crate::models::Cadence;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BackupEvent {
    #[serde(rename = "backup:started")]
    Started { filename: String, cadence: Cadence },

    #[serde(rename = "backup:progress")]
    Progress {
        filename: String,
        #[serde(rename = "sizeText")]
        size_text: String,
        status: String,
    },

    #[serde(rename = "backup:completed")]
    Completed {
        filename: String,
        #[serde(rename = "sizeText")]
        size_text: String,
        cadence: Cadence,
        verified: bool,
    },

    #[serde(rename = "backup:error")]
    Error { filename: String, error: String },
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<BackupEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BackupEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: BackupEvent) {
        match self.tx.send(event) {
            Ok(count) => debug!("Event delivered to {} subscriber(s)", count),
            Err(broadcast::error::SendError(event)) => {
                debug!("No event subscribers, dropped {:?}", event)
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
