//! Riskcat - NFR Dataset Terminal Browser
//!
//! This library provides the core functionality for Riskcat, a terminal UI
//! for exploring the four NFR record datasets (controls, external losses,
//! internal losses, issues) served by the dashboard API, and for lazily
//! materializing their expensive AI-derived attributes.
//!
//! ## Architecture
//!
//! One generic record browser drives all four datasets through a single
//! adapter contract; derived attributes follow one cache-or-compute trigger
//! protocol routed through a resilient HTTP client.

// Core value types and the dataset adapter contract
pub mod adapter;
pub mod models;
pub mod types;

// Networking stack: typed errors, transport seam, resilient client
pub mod client;
pub mod error;
pub mod session;
pub mod transport;

// UI engine: browser state machine, detail drawer, orchestration
pub mod app;
pub mod browser;
pub mod drawer;
pub mod fetch;

// Rendering and presentation helpers
pub mod json_pretty;
pub mod theme;
pub mod ui;

// Configuration (CLI args > env > defaults)
pub mod config;

// Re-export commonly used types
pub use adapter::{Dataset, DatasetAdapter};
pub use app::{App, InputMode};
pub use browser::{Browser, DisplayMode, TriggerState};
pub use client::ApiClient;
pub use config::Config;
pub use error::ApiError;
pub use models::{DetailView, ListPage, Record, TriggerResponse};
pub use session::SessionContext;
pub use types::AppEvent;
