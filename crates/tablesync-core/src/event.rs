//! Sync lifecycle events
//!
//! Fire-and-forget notifications emitted around an extraction job. Delivery
//! is left to an [`EventSink`]; the default sink writes each event to the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the event payload layout
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SyncStart,
    SyncComplete,
}

/// A lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    /// When the event was created (UTC)
    pub timestamp: DateTime<Utc>,

    pub event_type: EventType,

    /// Payload layout version
    pub version: u32,

    /// Freeform key/value payload
    pub payload: BTreeMap<String, String>,
}

impl SyncEvent {
    fn new(event_type: EventType, payload: BTreeMap<String, String>) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            version: SCHEMA_VERSION,
            payload,
        }
    }

    pub fn sync_start(payload: BTreeMap<String, String>) -> Self {
        Self::new(EventType::SyncStart, payload)
    }

    pub fn sync_complete(payload: BTreeMap<String, String>) -> Self {
        Self::new(EventType::SyncComplete, payload)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Receiver of lifecycle events
pub trait EventSink: Send + Sync {
    /// Deliver an event. Must not fail the job.
    fn emit(&self, event: &SyncEvent);
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &SyncEvent) {}
}

/// Logs every event as JSON at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &SyncEvent) {
        match event.to_json() {
            Ok(json) => tracing::info!(target: "tablesync::events", "{}", json),
            Err(e) => tracing::warn!(target: "tablesync::events", "Cannot serialize event: {}", e),
        }
    }
}
