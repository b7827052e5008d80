//! Observation delivery to the clinical record store.
//!
//! [`HttpSink`] posts each observation as JSON to
//! `<base-url>/observations`; any 2xx is success, anything else goes
//! through the retry policy. After retries are exhausted the error is
//! returned to the transformer, which logs it and moves on — the
//! observation is lost (no dead-letter store; see DESIGN.md).

use async_trait::async_trait;

use medlink_core::config::SinkConfig;
use medlink_core::observation::ClinicalObservationRequest;
use medlink_core::retry::RetryPolicy;

use crate::error::CloudError;

/// Delivery seam for one coded observation.
#[async_trait]
pub trait ObservationSink: Send + Sync {
    async fn deliver(&self, request: &ClinicalObservationRequest) -> Result<(), CloudError>;
}

/// HTTP sink client with retry and backoff.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl HttpSink {
    pub fn new(config: &SinkConfig, retry: RetryPolicy) -> Result<Self, CloudError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/observations", config.base_url.trim_end_matches('/')),
            retry,
        })
    }

    async fn post_once(&self, request: &ClinicalObservationRequest) -> Result<(), CloudError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CloudError::SinkRejected {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl ObservationSink for HttpSink {
    async fn deliver(&self, request: &ClinicalObservationRequest) -> Result<(), CloudError> {
        let result = self.retry.run(|| self.post_once(request)).await;
        match &result {
            Ok(()) => {
                tracing::debug!(
                    code = %request.code,
                    patient_id = %request.patient_id,
                    "observation stored"
                );
            }
            Err(err) => {
                tracing::warn!(
                    code = %request.code,
                    patient_id = %request.patient_id,
                    %err,
                    "observation delivery failed after retries"
                );
            }
        }
        result
    }
}
