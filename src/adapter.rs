//! Dataset adapter contract.
//!
//! One immutable configuration per dataset binds its identifier, display
//! fields and derived-function set to the generic browser. The browser and
//! drawer only ever hold a `&'static DatasetAdapter`; nothing above this
//! module names a concrete dataset.
//!
//! Paths mirror the server surface exactly:
//! - `GET  {ns}?id={term}&limit={n}`          search
//! - `GET  {ns}/list?offset={o}&limit={n}`    page
//! - `GET  {ns}/{id}/details`                 full record + cached AI results
//! - `POST {ns}/{id}/{slug}?refresh={bool}`   cache-or-compute trigger

use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{DetailView, ListEnvelope, ListPage, Record, TriggerResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Controls,
    ExternalLoss,
    InternalLoss,
    Issues,
}

impl Dataset {
    pub const ALL: [Dataset; 4] = [
        Dataset::Controls,
        Dataset::ExternalLoss,
        Dataset::InternalLoss,
        Dataset::Issues,
    ];

    pub fn adapter(self) -> &'static DatasetAdapter {
        match self {
            Dataset::Controls => &CONTROLS,
            Dataset::ExternalLoss => &EXTERNAL_LOSS,
            Dataset::InternalLoss => &INTERNAL_LOSS,
            Dataset::Issues => &ISSUES,
        }
    }

    pub fn label(self) -> &'static str {
        self.adapter().label
    }
}

impl std::str::FromStr for Dataset {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "controls" => Ok(Dataset::Controls),
            "external_loss" => Ok(Dataset::ExternalLoss),
            "internal_loss" => Ok(Dataset::InternalLoss),
            "issues" => Ok(Dataset::Issues),
            _ => Err(anyhow::anyhow!(
                "Invalid dataset '{s}'. Valid options: controls, external-loss, internal-loss, issues"
            )),
        }
    }
}

/// A named, potentially expensive attribute computation keyed by record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedFunction {
    /// Wire name, as it appears in `ai_status` and detail `ai` maps.
    pub name: &'static str,
    /// URL path segment of the trigger endpoint.
    pub slug: &'static str,
    /// Human label for the UI.
    pub label: &'static str,
}

/// Immutable per-dataset configuration. Created once, never mutated.
#[derive(Debug)]
pub struct DatasetAdapter {
    pub dataset: &'static str,
    pub label: &'static str,
    /// Namespace segment of every endpoint, e.g. `api/controls`.
    pub namespace: &'static str,
    pub id_field: &'static str,
    pub title_field: &'static str,
    /// Optional category/type badge column.
    pub type_field: Option<&'static str>,
    pub theme_field: &'static str,
    pub subtheme_field: &'static str,
    pub functions: &'static [DerivedFunction],
    /// The one function surfaced as a row-level action; the rest live in the
    /// drawer only.
    pub primary_function: &'static str,
}

pub static CONTROLS: DatasetAdapter = DatasetAdapter {
    dataset: "controls",
    label: "Controls",
    namespace: "api/controls",
    id_field: "control_id",
    title_field: "control_title",
    type_field: Some("key_control"),
    theme_field: "risk_theme",
    subtheme_field: "risk_subtheme",
    functions: &[
        DerivedFunction { name: "controls_taxonomy", slug: "controls-taxonomy", label: "Taxonomy" },
        DerivedFunction { name: "root_cause", slug: "root-cause", label: "Root cause" },
        DerivedFunction { name: "enrichment", slug: "enrichment", label: "Enrichment" },
    ],
    primary_function: "controls_taxonomy",
};

pub static EXTERNAL_LOSS: DatasetAdapter = DatasetAdapter {
    dataset: "external_loss",
    label: "External Losses",
    namespace: "api/external-loss",
    id_field: "reference_id_code",
    title_field: "description_of_event",
    type_field: Some("parent_name"),
    theme_field: "risk_theme",
    subtheme_field: "risk_subtheme",
    functions: &[
        DerivedFunction { name: "issue_taxonomy", slug: "issue-taxonomy", label: "Taxonomy" },
        DerivedFunction { name: "root_cause", slug: "root-cause", label: "Root cause" },
        DerivedFunction { name: "enrichment", slug: "enrichment", label: "Enrichment" },
    ],
    primary_function: "issue_taxonomy",
};

pub static INTERNAL_LOSS: DatasetAdapter = DatasetAdapter {
    dataset: "internal_loss",
    label: "Internal Losses",
    namespace: "api/internal-loss",
    id_field: "event_id",
    title_field: "event_title",
    type_field: Some("event_type"),
    theme_field: "risk_theme",
    subtheme_field: "risk_subtheme",
    functions: &[
        DerivedFunction { name: "issue_taxonomy", slug: "issue-taxonomy", label: "Taxonomy" },
        DerivedFunction { name: "root_cause", slug: "root-cause", label: "Root cause" },
        DerivedFunction { name: "enrichment", slug: "enrichment", label: "Enrichment" },
    ],
    primary_function: "issue_taxonomy",
};

pub static ISSUES: DatasetAdapter = DatasetAdapter {
    dataset: "issues",
    label: "Issues",
    namespace: "api/issues",
    id_field: "issue_id",
    title_field: "issue_title",
    type_field: Some("issues_type"),
    theme_field: "risk_theme",
    subtheme_field: "risk_subtheme",
    functions: &[
        DerivedFunction { name: "issue_taxonomy", slug: "issue-taxonomy", label: "Taxonomy" },
        DerivedFunction { name: "root_cause", slug: "root-cause", label: "Root cause" },
        DerivedFunction { name: "enrichment", slug: "enrichment", label: "Enrichment" },
    ],
    primary_function: "issue_taxonomy",
};

impl DatasetAdapter {
    pub fn function(&self, name: &str) -> Option<&'static DerivedFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn primary(&self) -> &'static DerivedFunction {
        self.functions
            .iter()
            .find(|f| f.name == self.primary_function)
            .expect("primary function present in function set")
    }

    /// Identifier value of a record, per this dataset's key field.
    pub fn record_id<'a>(&self, record: &'a Record) -> Option<&'a str> {
        record.field_str(self.id_field)
    }

    /// Best-available context text of a record (its title/description).
    pub fn context_text(&self, record: &Record) -> Option<String> {
        record.field_str(self.title_field).map(str::to_string)
    }

    // ----- path construction -----

    pub fn search_path(&self, term: &str, limit: usize) -> String {
        format!("{}?id={}&limit={}", self.namespace, urlencoding::encode(term), limit)
    }

    pub fn list_path(&self, offset: usize, limit: usize) -> String {
        format!("{}/list?offset={}&limit={}", self.namespace, offset, limit)
    }

    pub fn details_path(&self, id: &str) -> String {
        format!("{}/{}/details", self.namespace, urlencoding::encode(id))
    }

    pub fn invoke_path(&self, function: &DerivedFunction, id: &str, refresh: bool) -> String {
        format!(
            "{}/{}/{}?refresh={}",
            self.namespace,
            urlencoding::encode(id),
            function.slug,
            refresh
        )
    }

    // ----- operations -----

    /// One stable-ordered page plus the dataset's total count.
    pub async fn list(
        &self,
        client: &ApiClient,
        offset: usize,
        limit: usize,
    ) -> Result<ListPage, ApiError> {
        let v = client.get(&self.list_path(offset, limit)).await?;
        let env: ListEnvelope =
            serde_json::from_value(v).map_err(|e| ApiError::Decode(e.to_string()))?;
        let total = env.total.unwrap_or(env.items.len());
        Ok(ListPage { items: env.items, total })
    }

    /// Identifier/token lookup. No `total` guarantee; the result set itself
    /// is the effective total. A 404 is an empty result, not an error.
    pub async fn search(
        &self,
        client: &ApiClient,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Record>, ApiError> {
        match client.get(&self.search_path(term, limit)).await {
            Ok(v) => {
                let env: ListEnvelope =
                    serde_json::from_value(v).map_err(|e| ApiError::Decode(e.to_string()))?;
                Ok(env.items)
            }
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Full record plus already-cached derived results. Never computes.
    pub async fn get_details(&self, client: &ApiClient, id: &str) -> Result<DetailView, ApiError> {
        let v = client.get(&self.details_path(id)).await?;
        serde_json::from_value(v).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Cache-or-compute trigger. The service returns a cached result unless
    /// `refresh` forces recomputation; this side only passes the flag through
    /// and must not assume the call is side-effect free when `refresh=true`.
    pub async fn invoke(
        &self,
        client: &ApiClient,
        function: &DerivedFunction,
        id: &str,
        context_text: Option<&str>,
        refresh: bool,
    ) -> Result<TriggerResponse, ApiError> {
        let body = match context_text.filter(|s| !s.trim().is_empty()) {
            Some(text) => json!({ "description": text }),
            None => json!({}),
        };
        let v = client.post(&self.invoke_path(function, id, refresh), body).await?;
        serde_json::from_value::<TriggerResponse>(v)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}
