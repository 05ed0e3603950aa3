use crate::config::{HttpMethod, HttpPushConfig};
use crate::error::TransportError;
use crate::pose::PosePayload;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{info, trace};

/// HTTP pose pusher with a bounded per-request timeout
pub struct HttpPoseSender {
    client: Client,
    url: Url,
    method: HttpMethod,
    param: String,
    timeout: Duration,
}

impl HttpPoseSender {
    pub fn new(config: &HttpPushConfig) -> Result<Self, TransportError> {
        let url = Url::parse(&config.url).map_err(|e| TransportError::InvalidTarget {
            target: config.url.clone(),
            details: e.to_string(),
        })?;

        let client = Client::builder().timeout(config.timeout()).build()?;

        info!(
            "Pushing pose payloads to {} via {:?} (timeout {:?})",
            url,
            config.method,
            config.timeout()
        );

        Ok(Self {
            client,
            url,
            method: config.method,
            param: config.param.clone(),
            timeout: config.timeout(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one payload, returning the response status on success
    pub async fn send(&self, payload: &PosePayload) -> Result<u16, TransportError> {
        let body = serde_json::to_string(payload)?;

        let request = match self.method {
            HttpMethod::Get => self
                .client
                .get(self.url.clone())
                .query(&[(self.param.as_str(), body.as_str())]),
            HttpMethod::Post => self
                .client
                .post(self.url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
            });
        }

        trace!("Pose push to {} answered {}", self.url, status);
        Ok(status.as_u16())
    }
}
