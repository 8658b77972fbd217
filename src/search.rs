//! Debounced autocomplete for link and select inputs.
//!
//! Every [`Suggester::query`] waits out the configured delay first; a query
//! superseded while waiting resolves to `None` without touching the source.
//! Queries are numbered, and a response older than one already applied is
//! dropped, so a slow early lookup can never overwrite a newer result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::domain::FieldDescriptor;
use crate::ports::{RemoteError, SearchSource, Suggestion};
use crate::settings::ControlOptions;

pub struct Suggester {
    source: Arc<dyn SearchSource>,
    doctype: String,
    delay: Duration,
    issued: AtomicU64,
    applied: Mutex<Applied>,
}

#[derive(Debug, Default)]
struct Applied {
    seq: u64,
    results: Vec<Suggestion>,
}

impl Suggester {
    pub fn new(source: Arc<dyn SearchSource>, doctype: impl Into<String>, delay: Duration) -> Self {
        Self {
            source,
            doctype: doctype.into(),
            delay,
            issued: AtomicU64::new(0),
            applied: Mutex::new(Applied::default()),
        }
    }

    /// Suggester for a link field, or `None` when it has no target doctype.
    pub fn for_link(
        descriptor: &FieldDescriptor,
        source: Arc<dyn SearchSource>,
        options: &ControlOptions,
    ) -> Option<Self> {
        let doctype = descriptor.link_target()?;
        Some(Self::new(source, doctype, options.search_delay()))
    }

    pub fn doctype(&self) -> &str {
        &self.doctype
    }

    /// Resolves to `Some` only for the newest response; superseded or
    /// stale lookups resolve to `None`.
    pub async fn query(&self, text: &str) -> Result<Option<Vec<Suggestion>>, RemoteError> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        if self.issued.load(Ordering::SeqCst) != seq {
            tracing::trace!(seq, "query superseded during debounce");
            return Ok(None);
        }

        let results = self.source.search(&self.doctype, text).await?;

        let mut applied = self.applied.lock();
        if seq < applied.seq {
            tracing::debug!(seq, newest = applied.seq, "discarding stale suggestions");
            return Ok(None);
        }
        applied.seq = seq;
        applied.results = results.clone();
        Ok(Some(results))
    }

    /// The most recently applied suggestions.
    pub fn latest(&self) -> Vec<Suggestion> {
        self.applied.lock().results.clone()
    }
}

impl std::fmt::Debug for Suggester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suggester")
            .field("doctype", &self.doctype)
            .field("delay", &self.delay)
            .field("issued", &self.issued.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
