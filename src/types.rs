//! Cross-module value types: fetch requests issued by the state machines and
//! the completion events flowing back through the app channel.

use crate::adapter::Dataset;
use crate::error::ApiError;
use crate::models::{DetailView, ListPage, Record, TriggerResponse};

/// A list or search fetch the browser wants issued. Sequence numbers rise
/// monotonically per browser so stale completions can be discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    List { seq: u64, offset: usize, limit: usize },
    Search { seq: u64, term: String, limit: usize },
}

impl FetchRequest {
    pub fn seq(&self) -> u64 {
        match self {
            FetchRequest::List { seq, .. } | FetchRequest::Search { seq, .. } => *seq,
        }
    }
}

/// A detail fetch for the drawer. The epoch pins the drawer instance the
/// result belongs to; results for a closed drawer are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub id: String,
    pub epoch: u64,
}

/// Which surface asked for a derived-function invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOrigin {
    Row,
    Drawer,
}

/// A cache-or-compute invocation for one `(id, function)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    pub id: String,
    pub function: String,
    pub context_text: Option<String>,
    pub refresh: bool,
    pub origin: TriggerOrigin,
    /// Drawer epoch at issue time; 0 for row-level triggers.
    pub epoch: u64,
}

/// Completions and control events consumed by the app loop.
#[derive(Debug)]
pub enum AppEvent {
    ListLoaded {
        dataset: Dataset,
        seq: u64,
        result: Result<ListPage, ApiError>,
    },
    SearchLoaded {
        dataset: Dataset,
        seq: u64,
        term: String,
        result: Result<Vec<Record>, ApiError>,
    },
    DetailLoaded {
        dataset: Dataset,
        epoch: u64,
        result: Result<DetailView, ApiError>,
    },
    TriggerDone {
        dataset: Dataset,
        origin: TriggerOrigin,
        epoch: u64,
        id: String,
        function: String,
        result: Result<TriggerResponse, ApiError>,
    },
    /// Observability line for the debug panel.
    Net(String),
    Quit,
}
