//! Clients for the hosted backend platform.
//!
//! The marketplace stores its rows (profiles, favorites, site settings) in a
//! hosted database exposed over a REST row API, and delegates authentication
//! to the platform's auth service. Both are reached through thin `reqwest`
//! clients; nothing here owns business logic.

pub mod auth;
mod error;
pub mod stores;

pub use auth::AuthClient;
pub use error::BackendError;

use std::sync::{Arc, RwLock};

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::BackendConfig;

/// Maximum response-body length kept in error diagnostics.
const ERROR_BODY_LIMIT: usize = 200;

/// Client for the hosted backend's row API.
///
/// Speaks the platform's REST dialect: `GET/POST rest/v1/{table}` with
/// `column=eq.value` filters and `Prefer` headers for upsert semantics.
/// Cheaply cloneable; requests authenticate with the project API key plus
/// the signed-in user's bearer token when one is present.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    access_token: RwLock<Option<String>>,
}

impl BackendClient {
    /// Create a new row API client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            inner: Arc::new(BackendClientInner {
                http: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                access_token: RwLock::new(None),
            }),
        }
    }

    /// Attach (or clear) the signed-in user's access token.
    ///
    /// Row requests fall back to the project API key when no user token is
    /// set, which the backend treats as an anonymous principal.
    pub(crate) fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.inner.access_token.write() {
            *guard = token;
        }
    }

    /// Select at most one row from `table` where `column` equals `value`.
    ///
    /// "Not found" is `Ok(None)`, never an error.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request or decoding fails.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Option<T>, BackendError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair(column, &format!("eq.{value}"))
            .append_pair("limit", "1");

        let response = self.request(Method::GET, url).send().await?;
        let body = Self::success_body(response).await?;
        let mut rows: Vec<T> = serde_json::from_str(&body)?;
        Ok(rows.pop())
    }

    /// Select the first row of `table`, if any.
    ///
    /// Used for singleton tables such as `site_settings`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request or decoding fails.
    pub async fn select_first<T: DeserializeOwned>(
        &self,
        table: &str,
    ) -> Result<Option<T>, BackendError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("limit", "1");

        let response = self.request(Method::GET, url).send().await?;
        let body = Self::success_body(response).await?;
        let mut rows: Vec<T> = serde_json::from_str(&body)?;
        Ok(rows.pop())
    }

    /// Insert a row into `table`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Status` with a 409 on unique-constraint
    /// conflicts, or other `BackendError` variants for request failures.
    pub async fn insert<T: Serialize + Sync>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<(), BackendError> {
        let url = self.table_url(table)?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::success_body(response).await?;
        Ok(())
    }

    /// Idempotently upsert a row into `table`, merging on `on_conflict`.
    ///
    /// `on_conflict` names the unique column list (e.g.
    /// `investor_id,deal_id`); replays of the same row are not errors.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn upsert<T: Serialize + Sync>(
        &self,
        table: &str,
        row: &T,
        on_conflict: &str,
    ) -> Result<(), BackendError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);

        let response = self
            .request(Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await?;
        Self::success_body(response).await?;
        Ok(())
    }

    fn table_url(&self, table: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(&format!("rest/v1/{table}"))?)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let api_key = self.inner.api_key.expose_secret().to_owned();
        let bearer = self
            .inner
            .access_token
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_else(|| api_key.clone());

        self.inner
            .http
            .request(method, url)
            .header("apikey", api_key)
            .bearer_auth(bearer)
    }

    /// Read the response body, mapping non-success statuses to errors.
    pub(crate) async fn success_body(response: reqwest::Response) -> Result<String, BackendError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        tracing::debug!(
            status = %status,
            body = %body.chars().take(ERROR_BODY_LIMIT).collect::<String>(),
            "backend returned non-success status"
        );
        Err(BackendError::Status {
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        })
    }
}
