use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::catalog::{Product, PurchaseReceipt};
use crate::shipping::{Shipment, ShippingRequest};

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client Orders uses to reach Products and Shipping
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http_client: reqwest::Client,
    products_url: String,
    shipping_url: String,
}

impl UpstreamClient {
    pub fn new(products_url: &str, shipping_url: &str) -> Result<Self, UpstreamError> {
        Self::with_timeout(products_url, shipping_url, UPSTREAM_TIMEOUT)
    }

    pub fn with_timeout(
        products_url: &str,
        shipping_url: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        Ok(Self {
            http_client,
            products_url: products_url.trim_end_matches('/').to_string(),
            shipping_url: shipping_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn products_url(&self) -> &str {
        &self.products_url
    }

    pub fn shipping_url(&self) -> &str {
        &self.shipping_url
    }

    pub async fn get_product(&self, id: u32, client_id: &str) -> Result<Product, UpstreamError> {
        let url = format!("{}/api/products/{}", self.products_url, id);

        let response = self
            .http_client
            .get(&url)
            .header("x-client-id", client_id)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        decode(response).await
    }

    /// Ask Products to reserve stock and take payment
    pub async fn purchase(
        &self,
        id: u32,
        quantity: u32,
        client_id: &str,
    ) -> Result<PurchaseReceipt, UpstreamError> {
        let url = format!("{}/api/products/{}/purchase", self.products_url, id);

        let response = self
            .http_client
            .post(&url)
            .header("x-client-id", client_id)
            .json(&serde_json::json!({ "quantity": quantity }))
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        decode(response).await
    }

    pub async fn create_shipment(&self, request: &ShippingRequest) -> Result<Shipment, UpstreamError> {
        let url = format!("{}/api/shipping/create", self.shipping_url);

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        decode(response).await
    }

    pub async fn track_shipment(&self, tracking_id: &str) -> Result<Shipment, UpstreamError> {
        let url = format!("{}/api/shipping/track/{}", self.shipping_url, tracking_id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        decode(response).await
    }

    pub async fn products_healthy(&self) -> bool {
        self.health_check(&self.products_url).await
    }

    pub async fn shipping_healthy(&self) -> bool {
        self.health_check(&self.shipping_url).await
    }

    async fn health_check(&self, base_url: &str) -> bool {
        let url = format!("{}/health", base_url);
        match self.http_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Health check failed");
                false
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let (code, message) = error_body(&body);
        return Err(UpstreamError::Rejected {
            status: status.as_u16(),
            code,
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| UpstreamError::Decode(e.to_string()))
}

/// Split a JSON error body into its `code` and `error` fields; a body
/// without an `error` field is used verbatim as the message
fn error_body(body: &str) -> (Option<String>, String) {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(|v| v.as_str())
            .map(String::from)
    };

    let message = field("error").unwrap_or_else(|| body.trim().to_string());
    (field("code"), message)
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    #[error("{message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Invalid upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
