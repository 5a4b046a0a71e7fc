use crate::config::RelayConfig;
use crate::relay::provider::{ProviderToken, normalize_servers};
use parley_core::IceServerConfig;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
enum ProviderError {
    #[error("provider credentials are not configured")]
    NotConfigured,

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider answered {0}")]
    Status(reqwest::StatusCode),

    #[error("provider returned no usable servers")]
    Empty,
}

/// Resolves the STUN/TURN servers handed to peers.
///
/// Asks the token provider when credentials are configured, and falls back
/// to a public STUN server plus the static TURN entry otherwise.
#[derive(Clone)]
pub struct RelayDirectory {
    http: reqwest::Client,
    config: RelayConfig,
}

impl RelayDirectory {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Never fails; provider problems are logged and answered with the
    /// fallback set.
    pub async fn resolve(&self) -> Vec<IceServerConfig> {
        match self.fetch_from_provider().await {
            Ok(servers) => {
                debug!(count = servers.len(), "Relay servers issued by provider");
                servers
            }
            Err(ProviderError::NotConfigured) => self.fallback(),
            Err(e) => {
                warn!(error = %e, "Falling back to static relay servers");
                self.fallback()
            }
        }
    }

    async fn fetch_from_provider(&self) -> Result<Vec<IceServerConfig>, ProviderError> {
        let (Some(sid), Some(token)) = (
            non_empty(&self.config.provider_sid),
            non_empty(&self.config.provider_token),
        ) else {
            return Err(ProviderError::NotConfigured);
        };

        let url = format!(
            "{}/2010-04-01/Accounts/{sid}/Tokens.json",
            self.config.provider_base_url.trim_end_matches('/')
        );
        let resp = self
            .http
            .post(url)
            .basic_auth(sid, Some(token))
            .form(&HashMap::<String, String>::new())
            .timeout(Duration::from_secs(self.config.provider_timeout_secs.max(1)))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderError::Status(resp.status()));
        }

        let servers = normalize_servers(resp.json::<ProviderToken>().await?);
        if servers.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(servers)
    }

    pub fn fallback(&self) -> Vec<IceServerConfig> {
        let mut servers = vec![IceServerConfig::stun(self.config.stun_url.clone())];

        let turn_urls: Vec<String> = self
            .config
            .turn_urls
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_owned)
            .collect();

        if !turn_urls.is_empty() {
            servers.push(IceServerConfig {
                urls: turn_urls,
                username: non_empty(&self.config.turn_username).map(str::to_owned),
                credential: non_empty(&self.config.turn_credential).map(str::to_owned),
            });
        }
        servers
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
