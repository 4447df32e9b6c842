use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::domain::{DecisionResult, FeatureSet};
use crate::config::ScoringConfig;

const API_KEY_HEADER: &str = "x-api-key";

/// Seam over the external scoring model so the service can be exercised in isolation.
#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn score(&self, features: &FeatureSet) -> Result<DecisionResult, ScoringError>;
}

/// Failure talking to the scoring model. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("scoring service did not answer within {}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("scoring service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("scoring request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("scoring response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    features: &'a FeatureSet,
}

/// HTTP client for the scoring model's predict endpoint.
#[derive(Clone)]
pub struct HttpScoringClient {
    client: Client,
    config: ScoringConfig,
}

impl HttpScoringClient {
    pub fn new(config: ScoringConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> ScoringError {
        if err.is_timeout() {
            ScoringError::Timeout(self.config.timeout)
        } else {
            ScoringError::Transport(err)
        }
    }
}

#[async_trait]
impl ScoringService for HttpScoringClient {
    async fn score(&self, features: &FeatureSet) -> Result<DecisionResult, ScoringError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&ScoreRequest { features })
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Status { status, body });
        }

        response.json::<DecisionResult>().await.map_err(|err| {
            if err.is_timeout() {
                ScoringError::Timeout(self.config.timeout)
            } else {
                ScoringError::Decode(err)
            }
        })
    }
}
