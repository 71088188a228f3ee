//! End-to-end exercise of the trigger protocol against a stub service that
//! implements the server side of cache-or-compute: first invocation computes
//! and stores, repeats serve the stored result, `refresh=true` recomputes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use riskcat::adapter::{Dataset, CONTROLS};
use riskcat::client::{ApiClient, LogObserver};
use riskcat::error::ApiError;
use riskcat::models::TriggerSource;
use riskcat::session::{SessionContext, SESSION_HEADER, USER_HEADER};
use riskcat::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

/// Stub dashboard API with a per-(id, slug) result store.
struct FakeService {
    /// (id, slug) -> stored payload
    store: Mutex<HashMap<(String, String), serde_json::Value>>,
    computes: AtomicUsize,
    requests: AtomicUsize,
    /// Respond 503 to this many requests before behaving normally.
    overloaded_for: AtomicUsize,
    missing_headers: AtomicUsize,
}

impl FakeService {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(HashMap::new()),
            computes: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
            overloaded_for: AtomicUsize::new(0),
            missing_headers: AtomicUsize::new(0),
        })
    }

    fn overloaded_for(self: &Arc<Self>, n: usize) -> Arc<Self> {
        self.overloaded_for.store(n, Ordering::SeqCst);
        self.clone()
    }

    fn computes(&self) -> usize {
        self.computes.load(Ordering::SeqCst)
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn check_headers(&self, req: &HttpRequest) {
        let has = |name: &str| req.headers.iter().any(|(k, v)| *k == name && !v.is_empty());
        if !has(SESSION_HEADER) || !has(USER_HEADER) {
            self.missing_headers.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// POST path shape: {base}/{ns}/{id}/{slug}?refresh={bool}
    fn handle_invoke(&self, req: &HttpRequest) -> HttpResponse {
        let url = req.url.strip_prefix("http://api.test/").unwrap();
        let (path, query) = url.split_once('?').unwrap();
        let refresh = query == "refresh=true";

        let mut segments = path.rsplitn(3, '/');
        let slug = segments.next().unwrap().to_string();
        let id = segments.next().unwrap().to_string();

        let key = (id.clone(), slug.clone());
        let mut store = self.store.lock().unwrap();
        let (source, payload) = match store.get(&key) {
            Some(cached) if !refresh => ("cache", cached.clone()),
            _ => {
                let n = self.computes.fetch_add(1, Ordering::SeqCst) + 1;
                let payload = json!({"function": slug, "id": id, "revision": n});
                store.insert(key, payload.clone());
                ("computed", payload)
            }
        };

        HttpResponse {
            status: 200,
            body: json!({
                "status": "ok",
                "source": source,
                "payload": payload,
                "created_at": "2026-04-01T12:00:00Z"
            })
            .to_string(),
        }
    }
}

#[async_trait]
impl Transport for FakeService {
    async fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.check_headers(req);

        let remaining = self.overloaded_for.load(Ordering::SeqCst);
        if remaining > 0 {
            self.overloaded_for.store(remaining - 1, Ordering::SeqCst);
            return Ok(HttpResponse {
                status: 503,
                body: json!({"detail": "resolver pool exhausted"}).to_string(),
            });
        }

        match req.method {
            Method::Post => Ok(self.handle_invoke(req)),
            Method::Get => Ok(HttpResponse {
                status: 404,
                body: json!({"detail": "not wired in this stub"}).to_string(),
            }),
        }
    }
}

fn client(service: Arc<FakeService>) -> ApiClient {
    ApiClient::new(
        "http://api.test",
        8000,
        SessionContext::new(Some("sess-it".into()), Some("tester".into())),
        service,
        Arc::new(LogObserver),
    )
}

#[tokio::test(start_paused = true)]
async fn repeat_invocation_serves_from_cache() {
    let service = FakeService::new();
    let c = client(service.clone());
    let adapter = Dataset::Controls.adapter();
    let f = adapter.primary();

    let first = adapter
        .invoke(&c, f, "CTRL-100005", Some("Access review"), false)
        .await
        .unwrap();
    assert_eq!(first.source, TriggerSource::Computed);

    let second = adapter
        .invoke(&c, f, "CTRL-100005", Some("Access review"), false)
        .await
        .unwrap();
    assert_eq!(second.source, TriggerSource::Cache);
    assert_eq!(second.payload, first.payload);
    assert_eq!(service.computes(), 1);
}

#[tokio::test(start_paused = true)]
async fn refresh_forces_recomputation() {
    let service = FakeService::new();
    let c = client(service.clone());
    let adapter = Dataset::Controls.adapter();
    let f = adapter.primary();

    let first = adapter.invoke(&c, f, "CTRL-7", None, false).await.unwrap();
    let second = adapter.invoke(&c, f, "CTRL-7", None, true).await.unwrap();
    assert_eq!(second.source, TriggerSource::Computed);
    assert_ne!(second.payload, first.payload);
    assert_eq!(service.computes(), 2);

    // The refreshed result is what subsequent plain invocations now see
    let third = adapter.invoke(&c, f, "CTRL-7", None, false).await.unwrap();
    assert_eq!(third.source, TriggerSource::Cache);
    assert_eq!(third.payload, second.payload);
    assert_eq!(service.computes(), 2);
}

#[tokio::test(start_paused = true)]
async fn distinct_functions_cache_independently() {
    let service = FakeService::new();
    let c = client(service.clone());
    let adapter = &CONTROLS;

    let taxonomy = adapter.primary();
    let root_cause = adapter.function("root_cause").unwrap();

    adapter.invoke(&c, taxonomy, "CTRL-1", None, false).await.unwrap();
    adapter.invoke(&c, root_cause, "CTRL-1", None, false).await.unwrap();
    assert_eq!(service.computes(), 2);

    // Each pair is now cached on its own
    let a = adapter.invoke(&c, taxonomy, "CTRL-1", None, false).await.unwrap();
    let b = adapter.invoke(&c, root_cause, "CTRL-1", None, false).await.unwrap();
    assert_eq!(a.source, TriggerSource::Cache);
    assert_eq!(b.source, TriggerSource::Cache);
    assert_eq!(service.computes(), 2);
}

#[tokio::test(start_paused = true)]
async fn transient_overload_is_retried_through_to_success() {
    let service = FakeService::new();
    let c = client(service.overloaded_for(2));
    let adapter = Dataset::Controls.adapter();

    let resp = adapter
        .invoke(&c, adapter.primary(), "CTRL-9", None, false)
        .await
        .unwrap();
    assert_eq!(resp.source, TriggerSource::Computed);
    assert_eq!(service.requests(), 3); // 2 overloaded + 1 success
    assert_eq!(service.computes(), 1);
}

#[tokio::test(start_paused = true)]
async fn persistent_overload_gives_up_after_the_retry_cap() {
    let service = FakeService::new();
    let c = client(service.overloaded_for(10));
    let adapter = Dataset::Controls.adapter();

    let err = adapter
        .invoke(&c, adapter.primary(), "CTRL-9", None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Overload { status: 503, .. }));
    assert_eq!(service.requests(), 3); // 1 original + 2 retries
    assert_eq!(service.computes(), 0);
}

#[tokio::test(start_paused = true)]
async fn every_request_carries_session_headers() {
    let service = FakeService::new();
    let c = client(service.clone());
    let adapter = Dataset::Controls.adapter();

    adapter.invoke(&c, adapter.primary(), "CTRL-1", None, false).await.unwrap();
    adapter.invoke(&c, adapter.primary(), "CTRL-1", None, true).await.unwrap();
    let _ = adapter.get_details(&c, "CTRL-1").await; // stub 404s, headers still checked

    assert!(service.requests() >= 3);
    assert_eq!(service.missing_headers.load(Ordering::SeqCst), 0);
}
