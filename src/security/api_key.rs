use crate::error::ErrorResponse;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, warn};

pub const API_KEY_HEADER: &str = "x-api-key";

/// User id attached to a request once its key has been accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

/// In-memory key store. Keys are held only as SHA-256 digests.
#[derive(Default)]
pub struct ApiKeyStore {
    keys: DashMap<String, ApiKeyRecord>,
}

impl ApiKeyStore {
    pub fn new() -> Self {
        Self {
            keys: DashMap::new(),
        }
    }

    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let store = Self::new();
        for (key, user_id) in pairs {
            store.register(key, user_id);
        }
        store
    }

    pub fn register(&self, key: &str, user_id: &str) {
        self.keys.insert(
            digest(key),
            ApiKeyRecord {
                user_id: user_id.to_string(),
                created_at: Utc::now(),
                last_used: None,
            },
        );
    }

    /// Create and register a random 64-hex-char key
    pub fn generate(&self, user_id: &str) -> String {
        let key = hex::encode(rand::random::<[u8; 32]>());
        self.register(&key, user_id);
        key
    }

    /// Returns the owning user and stamps `last_used`
    pub fn validate(&self, key: &str) -> Option<String> {
        let mut record = self.keys.get_mut(&digest(key))?;
        record.last_used = Some(Utc::now());
        Some(record.user_id.clone())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn digest(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[derive(Clone)]
pub struct ApiKeyLayer {
    store: Arc<ApiKeyStore>,
}

impl ApiKeyLayer {
    pub fn new(store: Arc<ApiKeyStore>) -> Self {
        Self { store }
    }
}

impl<S> Layer<S> for ApiKeyLayer {
    type Service = ApiKeyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyService {
            inner,
            store: self.store.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ApiKeyService<S> {
    inner: S,
    store: Arc<ApiKeyStore>,
}

impl<S> Service<Request<Body>> for ApiKeyService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let store = self.store.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let provided = req
                .headers()
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string);

            let Some(key) = provided else {
                warn!("Request to {} without API key", req.uri().path());
                return Ok(unauthorized(
                    "Authentication required",
                    "Please provide an API key in the X-API-Key header",
                ));
            };

            match store.validate(&key) {
                Some(user_id) => {
                    debug!("Authenticated {} for {}", user_id, req.uri().path());
                    req.extensions_mut().insert(AuthenticatedUser(user_id));
                    inner.call(req).await
                }
                None => {
                    warn!("Rejected invalid API key for {}", req.uri().path());
                    Ok(unauthorized(
                        "Invalid API key",
                        "The provided API key is invalid or expired",
                    ))
                }
            }
        })
    }
}

fn unauthorized(error: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(error, message)),
    )
        .into_response()
}
