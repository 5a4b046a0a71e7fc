//! Response shape of the token-issuing provider and its normalization.

use parley_core::IceServerConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ProviderToken {
    #[serde(default)]
    pub ice_servers: Vec<ProviderServer>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderServer {
    /// Legacy single-address field.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub urls: Option<ProviderUrls>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

/// `urls` arrives as a string, a list, or something unusable.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProviderUrls {
    One(String),
    Many(Vec<serde_json::Value>),
    Unusable(serde_json::Value),
}

impl ProviderUrls {
    fn into_addresses(self) -> Vec<String> {
        match self {
            ProviderUrls::One(url) => vec![url],
            ProviderUrls::Many(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(url) => Some(url),
                    _ => None,
                })
                .collect(),
            ProviderUrls::Unusable(_) => Vec::new(),
        }
    }
}

impl ProviderServer {
    fn normalize(self) -> Option<IceServerConfig> {
        let mut urls: Vec<String> = self
            .urls
            .map(ProviderUrls::into_addresses)
            .unwrap_or_default()
            .into_iter()
            .filter(|url| !url.is_empty())
            .collect();

        if urls.is_empty() {
            urls.extend(self.url.filter(|url| !url.is_empty()));
        }
        if urls.is_empty() {
            return None;
        }

        Some(IceServerConfig {
            urls,
            username: self.username.filter(|s| !s.is_empty()),
            credential: self.credential.filter(|s| !s.is_empty()),
        })
    }
}

/// Drops entries without a usable address and flattens `urls` to a list.
pub fn normalize_servers(token: ProviderToken) -> Vec<IceServerConfig> {
    token
        .ice_servers
        .into_iter()
        .filter_map(ProviderServer::normalize)
        .collect()
}
