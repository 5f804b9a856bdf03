//! Progress event types and broadcast channel for harvest telemetry.
//!
//! The harvester emits `ProgressEvent`s as entities move through their
//! stages. Events flow through a `tokio::sync::broadcast` channel to every
//! subscriber; with no subscriber they are dropped.

use serde::{Deserialize, Serialize};

/// A progress event emitted during a harvest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Monotonically increasing sequence number.
    pub seq: u64,
    /// The kind of progress event.
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// The index page was parsed into seed records.
    ListingParsed { url: String, seeds: u32 },
    /// An entity finished one fetch+extract stage.
    StageCompleted { link: String, stage: StageKind },
    /// An entity's pipeline stopped on a transport failure; nothing is
    /// emitted for it.
    EntityHalted {
        link: String,
        stage: StageKind,
        reason: String,
    },
    /// A portrait was stored for an entity.
    ImageStored { link: String, reference: String },
    /// A completed record reached the sink.
    RecordEmitted { link: String, name: String },
    /// Every entity has been processed.
    HarvestComplete {
        seeded: u32,
        emitted: u32,
        halted: u32,
        elapsed_ms: u64,
    },
    /// A non-fatal warning occurred.
    Warning { message: String },
}

/// Which fetch+extract stage an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    Listing,
    Biography,
    StructuredData,
    Image,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listing => write!(f, "listing"),
            Self::Biography => write!(f, "biography"),
            Self::StructuredData => write!(f, "structured data"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
///
/// Slow receivers lag rather than block the harvest.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(1024)
}

/// Emits events with a shared sequence counter. Cheap to clone into every
/// entity pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<ProgressSender>,
    seq: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl ProgressReporter {
    pub fn new(tx: Option<ProgressSender>) -> Self {
        Self {
            tx,
            seq: Default::default(),
        }
    }

    /// Emit an event, ignoring send errors (which occur when no receivers
    /// are listening).
    pub fn emit(&self, event: ProgressEventKind) {
        if let Some(ref sender) = self.tx {
            let seq = self
                .seq
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
                + 1;
            let _ = sender.send(ProgressEvent { seq, event });
        }
    }
}
