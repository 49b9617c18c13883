use crate::domain::config::ApiConfig;
use crate::domain::error::{WalletGuardError, WalletGuardResult};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Remote logout endpoint
#[async_trait]
pub trait LogoutApi: Send + Sync {
    async fn logout(&self, email: &str, token: Option<&str>) -> WalletGuardResult<()>;
}

#[derive(Debug, Serialize)]
struct LogoutRequest<'a> {
    email: &'a str,
}

/// `POST {"email"}` to the backend logout endpoint
#[derive(Debug, Clone)]
pub struct HttpLogoutClient {
    client: reqwest::Client,
    url: String,
}

impl HttpLogoutClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> WalletGuardResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LogoutApi for HttpLogoutClient {
    async fn logout(&self, email: &str, token: Option<&str>) -> WalletGuardResult<()> {
        let mut request = self.client.post(&self.url).json(&LogoutRequest { email });
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WalletGuardError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Remote logout accepted with status {}", status);
        Ok(())
    }
}

/// Used when no backend is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLogoutApi;

#[async_trait]
impl LogoutApi for DisabledLogoutApi {
    async fn logout(&self, email: &str, _token: Option<&str>) -> WalletGuardResult<()> {
        debug!("No backend configured, skipping remote logout for {}", email);
        Ok(())
    }
}

/// Build the logout client described by the configuration
pub fn logout_api_from_config(config: &ApiConfig) -> WalletGuardResult<Arc<dyn LogoutApi>> {
    match config.logout_url() {
        Some(url) => Ok(Arc::new(HttpLogoutClient::new(url, config.timeout())?)),
        None => Ok(Arc::new(DisabledLogoutApi)),
    }
}
