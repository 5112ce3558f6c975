//! Client for the Ringside REST backend.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP with `reqwest`
//! - The backend is the source of truth for catalog, auth, payments and chat
//! - Catalog reads are cached in memory via `moka` (5 minute TTL)
//! - Errors are typed so callers can decide between bundled fallback data
//!   and a user-facing message
//!
//! # Example
//!
//! ```rust,ignore
//! use ringside_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api)?;
//! let courses = client.list_courses().await?;
//! ```

mod cache;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue};
use ringside_core::{Course, CourseId, Lesson, PageRef, Product, ProductId, UserProfile};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::ApiConfig;

use cache::{CacheKey, CacheValue};
use types::{
    ChatReply, ChatRequest, ErrorBody, LoginRequest, OrderConfirmation, OrderRequest,
    ProgressResponse, PurchaseReceipt, PurchaseRequest, RecordProgressRequest, RefreshRequest,
    RegisterRequest, TokenResponse,
};

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The access token was missing, expired or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The client could not be constructed.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether the backend should be treated as down rather than as having
    /// answered. Callers fall back to bundled data in this case.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Message safe to show a visitor, if the backend supplied one.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Status { status, message } if *status < 500 && !message.is_empty() => {
                Some(message)
            }
            _ => None,
        }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Ringside REST backend.
///
/// Cheap to clone. Catalog reads (courses, lessons, products) are cached for
/// five minutes; everything user-specific goes straight to the backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the API key is not a valid header value,
    /// or [`ApiError::Http`] if the underlying client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key.expose_secret())
                .map_err(|_| ApiError::Config("API key contains invalid characters".to_string()))?;
            headers.insert("x-api-key", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str, token: Option<&str>) -> reqwest::RequestBuilder {
        let request = self.inner.client.get(self.url(path));
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let request = self.inner.client.post(self.url(path)).json(body);
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode the JSON response.
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let text = self.send_raw(request).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request, map error statuses, and return the body text.
    async fn send_raw(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        match status {
            reqwest::StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            reqwest::StatusCode::NOT_FOUND => Err(ApiError::NotFound(path)),
            _ => {
                let message = serde_json::from_str::<ErrorBody>(&text)
                    .map(|body| body.message)
                    .unwrap_or_else(|_| text.chars().take(200).collect());
                if status.is_server_error() {
                    tracing::error!(status = %status, %path, %message, "Backend returned server error");
                }
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Check that the backend answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    pub async fn health(&self) -> Result<(), ApiError> {
        self.send_raw(self.get("/health", None)).await.map(|_| ())
    }

    // =========================================================================
    // Course Methods
    // =========================================================================

    /// List all published courses.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_courses(&self) -> Result<Vec<Course>, ApiError> {
        if let Some(CacheValue::Courses(courses)) = self.inner.cache.get(&CacheKey::Courses).await {
            debug!("Cache hit for courses");
            return Ok(courses);
        }

        let courses: Vec<Course> = self.send(self.get("/courses", None)).await?;
        self.inner
            .cache
            .insert(CacheKey::Courses, CacheValue::Courses(courses.clone()))
            .await;
        Ok(courses)
    }

    /// Get a single course.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs, or another error if the
    /// API request fails.
    #[instrument(skip(self), fields(course_id = %id))]
    pub async fn get_course(&self, id: CourseId) -> Result<Course, ApiError> {
        let key = CacheKey::Course(id);
        if let Some(CacheValue::Course(course)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for course");
            return Ok(*course);
        }

        let course: Course = self.send(self.get(&format!("/courses/{id}"), None)).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Course(Box::new(course.clone())))
            .await;
        Ok(course)
    }

    /// List the lessons of a course.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(course_id = %course_id))]
    pub async fn list_lessons(&self, course_id: CourseId) -> Result<Vec<Lesson>, ApiError> {
        let key = CacheKey::Lessons(course_id);
        if let Some(CacheValue::Lessons(lessons)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for lessons");
            return Ok(lessons);
        }

        let lessons: Vec<Lesson> = self
            .send(self.get(&format!("/courses/{course_id}/lessons"), None))
            .await?;
        self.inner
            .cache
            .insert(key, CacheValue::Lessons(lessons.clone()))
            .await;
        Ok(lessons)
    }

    /// Completed pages the backend has on record for a course.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(course_id = %course_id))]
    pub async fn get_progress(&self, token: &str, course_id: CourseId) -> Result<Vec<PageRef>, ApiError> {
        let response: ProgressResponse = self
            .send(self.get(&format!("/courses/{course_id}/progress"), Some(token)))
            .await?;
        Ok(response.completed)
    }

    /// Record a completed page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(lesson_id = %at.lesson_id, page = at.page))]
    pub async fn record_progress(&self, token: &str, at: PageRef) -> Result<(), ApiError> {
        let body = RecordProgressRequest { page: at.page };
        self.send_raw(self.post(&format!("/lessons/{}/progress", at.lesson_id), &body, Some(token)))
            .await
            .map(|_| ())
    }

    /// Purchase a course for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment is rejected or the API request fails.
    #[instrument(skip(self, token), fields(course_id = %course_id))]
    pub async fn purchase_course(&self, token: &str, course_id: CourseId) -> Result<PurchaseReceipt, ApiError> {
        let body = PurchaseRequest { course_id };
        self.send(self.post("/payments/courses", &body, Some(token)))
            .await
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List merchandise.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self.send(self.get("/products", None)).await?;
        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs, or another error if the
    /// API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self.send(self.get(&format!("/products/{id}"), None)).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Submit a merch order.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is rejected or the API request fails.
    #[instrument(skip(self, token, order), fields(items = order.items.len()))]
    pub async fn create_order(
        &self,
        token: Option<&str>,
        order: &OrderRequest,
    ) -> Result<OrderConfirmation, ApiError> {
        self.send(self.post("/orders", order, token)).await
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Exchange credentials for a token pair.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for bad credentials.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<TokenResponse, ApiError> {
        self.send(self.post("/auth/login", request, None)).await
    }

    /// Create an account and receive a token pair.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with the backend's message (e.g. 409 for a
    /// taken email).
    #[instrument(skip(self, request))]
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<TokenResponse, ApiError> {
        self.send(self.post("/auth/register", request, None)).await
    }

    /// Trade a refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the refresh token is no longer valid.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ApiError> {
        let body = RefreshRequest { refresh_token };
        self.send(self.post("/auth/refresh", &body, None)).await
    }

    /// Fetch the profile behind an access token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the token is rejected.
    #[instrument(skip(self, token))]
    pub async fn me(&self, token: &str) -> Result<UserProfile, ApiError> {
        self.send(self.get("/auth/me", Some(token))).await
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Ask the AI coach for a reply to the conversation so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, request), fields(turns = request.messages.len()))]
    pub async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatReply, ApiError> {
        self.send(self.post("/ai/chat", request, None)).await
    }
}
