//! Async fetch tasks: every adapter operation runs as a spawned task and
//! reports back through the app event channel. The UI thread never blocks on
//! the network.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::adapter::Dataset;
use crate::client::{ApiClient, RequestEntry, RequestObserver};
use crate::types::{AppEvent, DetailRequest, FetchRequest, InvokeRequest};

#[derive(Clone)]
pub struct Fetcher {
    client: Arc<ApiClient>,
    tx: UnboundedSender<AppEvent>,
}

impl Fetcher {
    pub fn new(client: Arc<ApiClient>, tx: UnboundedSender<AppEvent>) -> Self {
        Self { client, tx }
    }

    /// Run a browser-issued list or search call.
    pub fn spawn_fetch(&self, dataset: Dataset, req: FetchRequest) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let adapter = dataset.adapter();
            match req {
                FetchRequest::List { seq, offset, limit } => {
                    let result = adapter.list(&client, offset, limit).await;
                    let _ = tx.send(AppEvent::ListLoaded { dataset, seq, result });
                }
                FetchRequest::Search { seq, term, limit } => {
                    let result = adapter.search(&client, &term, limit).await;
                    let _ = tx.send(AppEvent::SearchLoaded { dataset, seq, term, result });
                }
            }
        });
    }

    /// Run the drawer's one-shot detail fetch.
    pub fn spawn_details(&self, dataset: Dataset, req: DetailRequest) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = dataset.adapter().get_details(&client, &req.id).await;
            let _ = tx.send(AppEvent::DetailLoaded { dataset, epoch: req.epoch, result });
        });
    }

    /// Run a cache-or-compute invocation. Distinct `(id, function)` pairs may
    /// be in flight concurrently; this layer does not deduplicate.
    pub fn spawn_invoke(&self, dataset: Dataset, req: InvokeRequest) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let adapter = dataset.adapter();
            let result = match adapter.function(&req.function) {
                Some(function) => {
                    adapter
                        .invoke(&client, function, &req.id, req.context_text.as_deref(), req.refresh)
                        .await
                }
                None => Err(crate::error::ApiError::Validation {
                    detail: format!("unknown function '{}' for {}", req.function, adapter.dataset),
                }),
            };
            let _ = tx.send(AppEvent::TriggerDone {
                dataset,
                origin: req.origin,
                epoch: req.epoch,
                id: req.id,
                function: req.function,
                result,
            });
        });
    }
}

/// Observer that mirrors every client attempt into the debug panel, on top of
/// the `log` facade.
pub struct ChannelObserver {
    tx: UnboundedSender<AppEvent>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }
}

impl RequestObserver for ChannelObserver {
    fn record(&self, entry: &RequestEntry) {
        log::info!("[client] {}", entry.summary());
        let _ = self.tx.send(AppEvent::Net(entry.summary()));
    }
}
