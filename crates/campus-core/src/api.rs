//! Client for the public demo API (dummyjson.com).
//!
//! Only four read-only requests are made:
//!
//! | Need            | Request                          |
//! |-----------------|----------------------------------|
//! | user count      | `GET /users?limit=1&select=id`   |
//! | one user        | `GET /users/{id}`                |
//! | page of users   | `GET /users?limit={n}`           |
//! | category labels | `GET /products/categories`       |
//!
//! Nothing is ever written upstream; edits and deletes are simulated locally.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Default base URL of the demo API.
pub const DEFAULT_API_URL: &str = "https://dummyjson.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A user record as returned by the demo API (the fields this app reads).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub id: u32,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub address: Option<RemoteAddress>,
    #[serde(default)]
    pub company: Option<RemoteCompany>,
    #[serde(default)]
    pub university: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAddress {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteCompany {
    #[serde(default)]
    pub name: String,
}

/// Envelope of `GET /users`.
#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(default)]
    users: Vec<RemoteUser>,
    #[serde(default)]
    total: u64,
}

/// Categories come back as `{slug, name, url}` objects on current versions of
/// the API and as bare strings on older ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Category {
    Object { slug: String },
    Plain(String),
}

impl Category {
    fn into_slug(self) -> String {
        match self {
            Self::Object { slug } => slug,
            Self::Plain(slug) => slug,
        }
    }
}

/// Read access to the demo API.
#[async_trait]
pub trait DemoApi: Send + Sync {
    /// Total number of users.
    async fn user_count(&self) -> Result<u64>;

    /// One user by id; `Ok(None)` when the API reports it does not exist.
    async fn user(&self, id: u32) -> Result<Option<RemoteUser>>;

    /// The first `limit` users.
    async fn users(&self, limit: usize) -> Result<Vec<RemoteUser>>;

    /// Category slugs, in API order.
    async fn categories(&self) -> Result<Vec<String>>;
}

/// [`DemoApi`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpDemoApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDemoApi {
    /// Build a client for `base_url`. Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("campus/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are made against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the body. A 404 is `Ok(None)`.
    async fn get_optional<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        let result = self.fetch(&url).await;

        let outcome = match &result {
            Ok(Some(_)) => "ok",
            Ok(None) => "not_found",
            Err(_) => "error",
        };
        counter!("upstream_requests_total", "endpoint" => endpoint, "outcome" => outcome)
            .increment(1);

        if let Err(e) = &result {
            tracing::debug!(endpoint = endpoint, url = %url, error = %e, "upstream request failed");
        }
        result
    }

    /// GET `path`, treating a 404 as an error.
    async fn get_required<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
    ) -> Result<T> {
        self.get_optional(endpoint, path)
            .await?
            .ok_or_else(|| Error::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                url: format!("{}{}", self.base_url, path),
            })
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.bytes().await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }
}

#[async_trait]
impl DemoApi for HttpDemoApi {
    async fn user_count(&self) -> Result<u64> {
        let page: UsersPage = self
            .get_required("user_count", "/users?limit=1&select=id")
            .await?;
        Ok(page.total)
    }

    async fn user(&self, id: u32) -> Result<Option<RemoteUser>> {
        self.get_optional("user", &format!("/users/{id}")).await
    }

    async fn users(&self, limit: usize) -> Result<Vec<RemoteUser>> {
        let page: UsersPage = self
            .get_required("users", &format!("/users?limit={limit}"))
            .await?;
        Ok(page.users)
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let categories: Vec<Category> = self
            .get_required("categories", "/products/categories")
            .await?;
        Ok(categories.into_iter().map(Category::into_slug).collect())
    }
}
