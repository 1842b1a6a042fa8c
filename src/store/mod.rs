//! Typed CRUD over the service's REST collection API.
//!
//! Collections live at `<base>/v1/store/<collection>`. Reads use a small
//! builder (`from(...).eq(...).order(...).fetch()`); inserts echo the
//! created row back; updates and deletes take the same equality filters.
//! Idempotent reads are retried on connect/timeout failures, mutations are
//! sent exactly once and surface the service's error classification.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Instant;

use crate::auth::AuthProvider;
use crate::error::{CampusLinkError, Result};
use crate::models::StoreErrorBody;

/// Sort direction for `order` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

impl OrderDirection {
    fn suffix(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Handles request/response CRUD against named collections.
#[derive(Clone)]
pub struct StoreClient {
    base_url: String,
    http: reqwest::Client,
    auth: AuthProvider,
    max_retries: u32,
}

impl StoreClient {
    pub(crate) fn new(
        base_url: String,
        http: reqwest::Client,
        auth: AuthProvider,
        max_retries: u32,
    ) -> Self {
        Self {
            base_url,
            http,
            auth,
            max_retries,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/v1/store/{}", self.base_url, collection)
    }

    /// Start a read query against a collection.
    pub fn from(&self, collection: &str) -> SelectBuilder<'_> {
        SelectBuilder {
            store: self,
            collection: collection.to_string(),
            projection: None,
            filters: Vec::new(),
            order: None,
            limit: None,
            offset: None,
        }
    }

    /// Insert a row and deserialize the representation echoed back.
    ///
    /// `projection` optionally asks the service to expand embeds on the
    /// returned row (e.g. `*, users!user_id(name, avatar_url)`).
    pub async fn insert<T, R>(
        &self,
        collection: &str,
        row: &T,
        projection: Option<&str>,
    ) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.collection_url(collection);
        debug!("[STORE] insert into {}", collection);

        let mut request = self.http.post(&url).json(row);
        if let Some(projection) = projection {
            request = request.query(&[("select", projection)]);
        }
        let request = self.auth.apply_to_request(request)?;

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<R>().await?)
    }

    /// Start an update against a collection; `patch` is the partial row.
    pub fn update(&self, collection: &str, patch: serde_json::Value) -> MutationBuilder<'_> {
        MutationBuilder {
            store: self,
            collection: collection.to_string(),
            filters: Vec::new(),
            kind: MutationKind::Update(patch),
        }
    }

    /// Start a delete against a collection.
    pub fn delete(&self, collection: &str) -> MutationBuilder<'_> {
        MutationBuilder {
            store: self,
            collection: collection.to_string(),
            filters: Vec::new(),
            kind: MutationKind::Delete,
        }
    }

    /// Send an idempotent GET, retrying connect/timeout failures.
    async fn get_with_retry(
        &self,
        url: &str,
        pairs: &[(String, String)],
    ) -> Result<reqwest::Response> {
        let mut retries = 0;
        let overall_start = Instant::now();

        loop {
            // Build the request fresh on each attempt.
            let request = self.auth.apply_to_request(self.http.get(url).query(pairs))?;

            match request.send().await {
                Ok(response) => {
                    debug!(
                        "[STORE] GET {} status={} total_ms={}",
                        url,
                        response.status(),
                        overall_start.elapsed().as_millis()
                    );
                    if response.status().is_success() {
                        return Ok(response);
                    }
                    return Err(error_from_response(response).await);
                },
                Err(e) if retries < self.max_retries && is_retriable(&e) => {
                    warn!(
                        "[STORE] retriable error (attempt {}/{}): {}",
                        retries + 1,
                        self.max_retries + 1,
                        e
                    );
                    retries += 1;
                    tokio::time::sleep(std::time::Duration::from_millis(100 * retries as u64))
                        .await;
                    continue;
                },
                Err(e) => {
                    warn!(
                        "[STORE] fatal error: {} total_ms={}",
                        e,
                        overall_start.elapsed().as_millis()
                    );
                    return Err(e.into());
                },
            }
        }
    }
}

fn is_retriable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Map a non-2xx response to a [`CampusLinkError`], preserving the
/// service's error classification when the body parses.
async fn error_from_response(response: reqwest::Response) -> CampusLinkError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let body = serde_json::from_str::<StoreErrorBody>(&text).unwrap_or_else(|_| StoreErrorBody {
        code: format!("http_{}", status.as_u16()),
        message: if text.is_empty() {
            status.to_string()
        } else {
            text
        },
        details: None,
    });

    warn!("[STORE] request rejected: {}", body);
    CampusLinkError::StoreError(body)
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

/// Builder for read queries.
pub struct SelectBuilder<'a> {
    store: &'a StoreClient,
    collection: String,
    projection: Option<String>,
    filters: Vec<(String, String)>,
    order: Option<(String, OrderDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl<'a> SelectBuilder<'a> {
    /// Set the column projection, including foreign-table embeds.
    pub fn select(mut self, projection: impl Into<String>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    /// Add an equality filter.
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    /// Order the result by a column.
    pub fn order(mut self, column: &str, direction: OrderDirection) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    /// Limit the number of returned rows.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Select an inclusive row range (pagination).
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.offset = Some(from);
        self.limit = Some(to.saturating_sub(from) + 1);
        self
    }

    fn query_pairs(&self, count: bool) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(projection) = &self.projection {
            pairs.push(("select".to_string(), projection.clone()));
        }
        for (column, value) in &self.filters {
            pairs.push((column.clone(), format!("eq.{}", value)));
        }
        if let Some((column, direction)) = &self.order {
            pairs.push((
                "order".to_string(),
                format!("{}.{}", column, direction.suffix()),
            ));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        if count {
            pairs.push(("count".to_string(), "exact".to_string()));
        }
        pairs
    }

    /// Fetch all matching rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let url = self.store.collection_url(&self.collection);
        let pairs = self.query_pairs(false);
        let response = self.store.get_with_retry(&url, &pairs).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    /// Fetch at most one row (point reads, existence checks).
    pub async fn maybe_one<T: DeserializeOwned>(mut self) -> Result<Option<T>> {
        self.limit = Some(1);
        let mut rows = self.fetch::<T>().await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Fetch exactly one row, failing with [`CampusLinkError::NotFound`]
    /// when nothing matches.
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<T> {
        let collection = self.collection.clone();
        self.maybe_one::<T>()
            .await?
            .ok_or(CampusLinkError::NotFound(collection))
    }

    /// Count matching rows without fetching them.
    pub async fn count(mut self) -> Result<u64> {
        self.limit = Some(0);
        let url = self.store.collection_url(&self.collection);
        let pairs = self.query_pairs(true);
        let response = self.store.get_with_retry(&url, &pairs).await?;
        Ok(response.json::<CountResponse>().await?.count)
    }
}

enum MutationKind {
    Update(serde_json::Value),
    Delete,
}

/// Builder for filtered updates and deletes.
pub struct MutationBuilder<'a> {
    store: &'a StoreClient,
    collection: String,
    filters: Vec<(String, String)>,
    kind: MutationKind,
}

impl<'a> MutationBuilder<'a> {
    /// Add an equality filter.
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    /// Execute the mutation. Never retried: the caller decides how to
    /// handle a failure based on the store's classification.
    pub async fn execute(self) -> Result<()> {
        let url = self.store.collection_url(&self.collection);
        let pairs: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{}", value)))
            .collect();

        let request = match &self.kind {
            MutationKind::Update(patch) => {
                debug!("[STORE] update {}", self.collection);
                self.store.http.patch(&url).query(&pairs).json(patch)
            },
            MutationKind::Delete => {
                debug!("[STORE] delete from {}", self.collection);
                self.store.http.delete(&url).query(&pairs)
            },
        };
        let request = self.store.auth.apply_to_request(request)?;

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}
