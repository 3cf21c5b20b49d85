//! Static API-key authenticator.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::auth::authenticator::{Authenticator, Principal, GATEWAY_KEY_HEADER};
use crate::config::schema::AuthConfig;
use crate::error::{GatewayError, GatewayResult};

/// Authenticator backed by the static key table in the gateway config.
pub struct ApiKeyAuthenticator {
    enabled: bool,
    keys: HashMap<String, Principal>,
}

impl ApiKeyAuthenticator {
    pub fn from_config(config: &AuthConfig) -> Self {
        let keys = config
            .api_keys
            .iter()
            .map(|(key, entry)| {
                (
                    key.clone(),
                    Principal {
                        id: entry.principal.clone(),
                        scopes: entry.scopes.clone(),
                    },
                )
            })
            .collect();

        Self {
            enabled: config.enabled,
            keys,
        }
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> GatewayResult<Principal> {
        // Passthrough mode: every caller is the anonymous principal.
        if !self.enabled {
            return Ok(Principal::anonymous());
        }

        let key = headers
            .get(GATEWAY_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                GatewayError::AuthenticationFailed("missing gateway key".to_string())
            })?;

        self.keys.get(key).cloned().ok_or_else(|| {
            tracing::warn!("Rejected request with unknown gateway key");
            GatewayError::AuthenticationFailed("unknown gateway key".to_string())
        })
    }
}
