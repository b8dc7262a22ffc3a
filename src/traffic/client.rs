use serde::Serialize;
use std::time::{Duration, Instant};

use super::TrafficError;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Base URLs of the three services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrls {
    pub products: String,
    pub orders: String,
    pub shipping: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            products: "http://127.0.0.1:3001".to_string(),
            orders: "http://127.0.0.1:5001".to_string(),
            shipping: "http://127.0.0.1:8080".to_string(),
        }
    }
}

impl ServiceUrls {
    pub fn new(products: &str, orders: &str, shipping: &str) -> Self {
        Self {
            products: products.trim_end_matches('/').to_string(),
            orders: orders.trim_end_matches('/').to_string(),
            shipping: shipping.trim_end_matches('/').to_string(),
        }
    }
}

/// Result of a single request. `status` is `None` when the request never got a response.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub method: &'static str,
    pub url: String,
    pub status: Option<u16>,
    pub latency: Duration,
    pub body: Option<serde_json::Value>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }

    /// Three-digit status, `000` for transport failures
    pub fn status_label(&self) -> String {
        match self.status {
            Some(code) => code.to_string(),
            None => "000".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrafficClient {
    http_client: reqwest::Client,
    urls: ServiceUrls,
}

impl TrafficClient {
    pub fn new(urls: ServiceUrls) -> Result<Self, TrafficError> {
        Self::with_timeout(urls, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(urls: ServiceUrls, timeout: Duration) -> Result<Self, TrafficError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrafficError::Client(e.to_string()))?;
        Ok(Self { http_client, urls })
    }

    pub fn urls(&self) -> &ServiceUrls {
        &self.urls
    }

    pub async fn get(&self, url: String, client_id: &str) -> Outcome {
        let request = self.http_client.get(&url).header("x-client-id", client_id);
        execute("GET", url, request).await
    }

    pub async fn post<T: Serialize + ?Sized>(&self, url: String, body: &T, client_id: &str) -> Outcome {
        let request = self
            .http_client
            .post(&url)
            .header("x-client-id", client_id)
            .json(body);
        execute("POST", url, request).await
    }

    pub async fn is_healthy(&self, base_url: &str) -> bool {
        self.get(format!("{}/health", base_url), "traffic-health")
            .await
            .is_success()
    }
}

async fn execute(method: &'static str, url: String, request: reqwest::RequestBuilder) -> Outcome {
    let start = Instant::now();

    match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let body = response.json::<serde_json::Value>().await.ok();
            Outcome {
                method,
                url,
                status: Some(status),
                latency: start.elapsed(),
                body,
            }
        }
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Request failed");
            Outcome {
                method,
                url,
                status: None,
                latency: start.elapsed(),
                body: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: Option<u16>) -> Outcome {
        Outcome {
            method: "GET",
            url: "http://127.0.0.1:3001/health".to_string(),
            status,
            latency: Duration::ZERO,
            body: None,
        }
    }

    #[test]
    fn test_status_label() {
        assert_eq!(outcome(None).status_label(), "000");
        assert_eq!(outcome(Some(429)).status_label(), "429");
        assert!(outcome(Some(201)).is_success());
        assert!(!outcome(Some(302)).is_success());
        assert!(!outcome(None).is_success());
    }

    #[test]
    fn test_service_urls_trim() {
        let urls = ServiceUrls::new("http://a:1/", "http://b:2", "http://c:3//");
        assert_eq!(urls.products, "http://a:1");
        assert_eq!(urls.shipping, "http://c:3");
    }

    #[tokio::test]
    async fn test_connection_refused_is_000() {
        let client = TrafficClient::with_timeout(
            ServiceUrls::new("http://127.0.0.1:9", "http://127.0.0.1:9", "http://127.0.0.1:9"),
            Duration::from_millis(500),
        )
        .unwrap();

        let outcome = client
            .get("http://127.0.0.1:9/api/products".to_string(), "tester")
            .await;
        assert_eq!(outcome.status_label(), "000");
        assert!(!client.is_healthy("http://127.0.0.1:9").await);
    }
}
