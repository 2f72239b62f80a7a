use std::fmt;
use std::time::Duration;

use nfm_schemas::{ComplianceRequest, ComplianceResponse, FetchError};
use tracing::{info, warn};

use crate::ComplianceOracle;

/// HTTP compliance oracle.
///
/// API key (if any) is resolved by the caller from the environment and passed
/// in; it is sent as a bearer token and never logged.
#[derive(Clone)]
pub struct HttpComplianceOracle {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl fmt::Debug for HttpComplianceOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpComplianceOracle")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl HttpComplianceOracle {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, endpoint, api_key))
    }

    pub fn with_client(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, address: &str) -> Result<ComplianceResponse, FetchError> {
        let mut req = self.http.post(&self.endpoint).json(&ComplianceRequest {
            address: address.to_string(),
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        resp.json::<ComplianceResponse>().await.map_err(|e| {
            if e.is_decode() {
                FetchError::Malformed(e.to_string())
            } else {
                FetchError::Network(e.to_string())
            }
        })
    }
}

#[async_trait::async_trait]
impl ComplianceOracle for HttpComplianceOracle {
    fn oracle_name(&self) -> &'static str {
        "http"
    }

    async fn check(&self, address: &str) -> Result<ComplianceResponse, FetchError> {
        let result = self.post(address).await;
        match &result {
            Ok(body) => info!(
                %address,
                success = body.success,
                is_approved = body.is_approved,
                "compliance oracle responded"
            ),
            Err(err) => warn!(%address, kind = err.kind(), %err, "compliance oracle call failed"),
        }
        result
    }
}
