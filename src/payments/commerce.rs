use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::PaymentsConfig;
use crate::error::{LedgerError, LedgerResult};

use super::{Charge, ChargeRequest, PaymentGateway};

const API_KEY_HEADER: &str = "X-CC-Api-Key";
const API_VERSION_HEADER: &str = "X-CC-Version";

/// HTTP client for the hosted crypto-commerce charges API.
#[derive(Clone)]
pub struct CommerceClient {
    http: reqwest::Client,
    charges_url: String,
    api_key: String,
    api_version: String,
    timeout: Duration,
}

impl CommerceClient {
    pub fn new(config: &PaymentsConfig) -> anyhow::Result<Self> {
        let timeout = config.request_timeout();
        assert!(!config.api_url.is_empty(), "Payment API URL must be provided");

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            charges_url: format!("{}/charges", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl PaymentGateway for CommerceClient {
    async fn create_charge(&self, request: &ChargeRequest) -> LedgerResult<Charge> {
        let response = self
            .http
            .post(&self.charges_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_VERSION_HEADER, &self.api_version)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                error!("Charge creation request failed: {err}");
                LedgerError::PaymentProvider(if err.is_timeout() {
                    "payment processor timed out".to_string()
                } else {
                    "payment processor unreachable".to_string()
                })
            })?;

        let status = response.status();
        if status != StatusCode::CREATED && status != StatusCode::OK {
            let detail = response.text().await.unwrap_or_default();
            error!(%status, "Charge creation rejected: {detail}");
            return Err(LedgerError::PaymentProvider(format!(
                "payment processor rejected charge with status {status}"
            )));
        }

        let envelope: ChargeEnvelope = response.json().await.map_err(|err| {
            error!("Charge response could not be decoded: {err}");
            LedgerError::PaymentProvider("unreadable charge response".to_string())
        })?;

        if envelope.data.code.is_empty() || envelope.data.hosted_url.is_empty() {
            return Err(LedgerError::PaymentProvider(
                "charge response missing code or hosted_url".to_string(),
            ));
        }

        info!(charge_code = %envelope.data.code, "Charge created");
        Ok(envelope.data)
    }
}

#[derive(Debug, Deserialize)]
struct ChargeEnvelope {
    data: Charge,
}
