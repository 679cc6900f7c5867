//! The RPC surface as plain, serde-serializable Rust types. Transport is
//! deliberately out of scope - a real server wires these onto gRPC, a
//! WebSocket, or anything else; this crate only defines the shapes and
//! the narrow [`StreamPublisher`] trait used to emit them.

use serde::{Deserialize, Serialize};

use crate::ids::{AppRunId, WidgetId};
use crate::query::Span;

/// A `{start, end, message}` diagnostic, one per `Error` node in the parsed
/// query, used by the UI to underline bad ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSpan {
    pub start: usize,
    pub end: usize,
    pub message: String,
}

impl ErrorSpan {
    pub fn from_span(span: Span, message: String) -> Self {
        Self {
            start: span.start,
            end: span.end,
            message,
        }
    }
}

/// One page of a filtered window, addressed by logical page number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page_num: i64,
    pub lines: Vec<u64>,
}

/// Request for [`crate::search::SearchManager::search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub app_run_id: AppRunId,
    pub widget_id: WidgetId,
    pub search_term: String,
    pub system_query: String,
    pub page_size: usize,
    pub request_pages: Vec<i64>,
    pub streaming: bool,
    /// The route the subscriber's outbound stream updates should be
    /// addressed to; recorded as the manager's `subscriber_route`.
    pub subscriber_route: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub filtered_count: usize,
    pub searched_count: usize,
    pub total_count: usize,
    pub max_count: usize,
    pub pages: Vec<Page>,
    pub error_spans: Vec<ErrorSpan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMarksRequest {
    pub app_run_id: AppRunId,
    pub widget_id: WidgetId,
    pub marks: Vec<(u64, bool)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMarkedRequest {
    pub app_run_id: AppRunId,
    pub widget_id: WidgetId,
}

/// Response to `getMarked`: the marked records' ids, resolved against the
/// peer's current snapshot at call time (marked ids can outlive the
/// records they were set on if a record has since been trimmed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMarkedResponse {
    pub record_ids: Vec<u64>,
}

/// An outgoing, fire-and-forget stream update pushed to exactly one
/// subscriber after a matching record is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamUpdate {
    pub widget_id: WidgetId,
    pub filtered_count: usize,
    pub searched_count: usize,
    pub total_count: usize,
    pub trimmed_lines: usize,
    pub offset: usize,
    pub lines: Vec<u64>,
}

/// Narrow outbound-transport seam: given a route and an update, deliver it
/// with no expectation of a response. Implementations may drop updates on
/// a detached/closed route - publish failure is silently swallowed.
pub trait StreamPublisher: Send + Sync {
    fn publish(&self, route: &str, update: StreamUpdate);
}

/// A [`StreamPublisher`] backed by a `tokio::sync::mpsc` channel per route,
/// useful for tests and as a reference implementation.
#[derive(Default)]
pub struct ChannelPublisher {
    senders: dashmap::DashMap<String, tokio::sync::mpsc::UnboundedSender<StreamUpdate>>,
}

impl ChannelPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route and return the receiving end. Re-registering the
    /// same route replaces the previous sender (and silently drops it).
    pub fn subscribe(&self, route: impl Into<String>) -> tokio::sync::mpsc::UnboundedReceiver<StreamUpdate> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.senders.insert(route.into(), tx);
        rx
    }
}

impl StreamPublisher for ChannelPublisher {
    fn publish(&self, route: &str, update: StreamUpdate) {
        if let Some(sender) = self.senders.get(route) {
            // A closed receiver is exactly the best-effort case this
            // trait documents; drop the update silently.
            let _ = sender.send(update);
        }
    }
}
