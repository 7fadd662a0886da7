//! Fire-and-forget trace persistence.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::traits::TraceStore;
use crate::types::Trace;

/// Hands completed traces to the store off the response path.
#[derive(Clone)]
pub struct TraceRecorder {
    store: Arc<dyn TraceStore>,
}

impl TraceRecorder {
    pub fn new(store: Arc<dyn TraceStore>) -> Self {
        Self { store }
    }

    /// Spawn the write and return immediately. A failed write is logged
    /// and dropped; it never reaches the caller. The handle is only useful
    /// to tests that need to wait for the write.
    pub fn record(&self, trace: Trace) -> JoinHandle<()> {
        let store = self.store.clone();
        tokio::spawn(async move {
            match store.save(&trace).await {
                Ok(()) => debug!(trace_id = %trace.trace_id, "Trace recorded"),
                Err(e) => error!(trace_id = %trace.trace_id, error = %e, "Failed to record trace"),
            }
        })
    }
}
