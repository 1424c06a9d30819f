use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::email::{EmailError, HttpResponse, HttpTransport, MandrillConfig};

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &MandrillConfig) -> Result<Self, EmailError> {
        let mut builder = reqwest::Client::builder();

        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        let client = builder
            .build()
            .map_err(|e| EmailError::ConfigError(format!("HTTP client error: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_form(
        &self,
        url: &Url,
        form: &[(String, String)],
    ) -> Result<HttpResponse, EmailError> {
        debug!("POST {} ({} form fields)", url, form.len());

        // Send the form; connection failures are fatal
        let response = self
            .client
            .post(url.clone())
            .form(form)
            .send()
            .await
            .map_err(|e| {
                error!("Mandrill request to {} failed: {}", url, e);
                EmailError::Transport(e.to_string())
            })?;

        // Status and raw body go back unchecked
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }

    fn name(&self) -> &str {
        "Mandrill HTTP API"
    }
}
