use poem_openapi::{payload::Json, OpenApi};

use crate::config::ProviderSettings;
use crate::domain::{Provider, ProviderStatus};
use crate::providers::ProviderRegistry;

pub struct ProvidersApi {
    registry: ProviderRegistry,
}

impl ProvidersApi {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    /// `active` or `not_implemented`
    pub status: String,
    /// Whether an adapter is running for this provider
    pub configured: bool,
    pub signature_scheme: Option<String>,
    pub signature_header: Option<String>,
    pub circuit_state: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct ProviderList {
    pub providers: Vec<ProviderInfo>,
}

impl ProvidersApi {
    fn describe(&self, provider: Provider) -> ProviderInfo {
        let adapter = self.registry.get(provider);
        let (scheme, header) = match &adapter {
            Some(adapter) => {
                let auth = adapter.webhook_auth();
                (auth.scheme.as_str().to_string(), auth.header.clone())
            }
            None => {
                let defaults = ProviderSettings::defaults(provider);
                (defaults.signature_scheme.as_str().to_string(), defaults.signature_header)
            }
        };
        let implemented = provider.status() == ProviderStatus::Active;

        ProviderInfo {
            id: provider.as_str().to_string(),
            name: provider.display_name().to_string(),
            status: provider.status().to_string(),
            configured: adapter.is_some(),
            signature_scheme: implemented.then_some(scheme),
            signature_header: implemented.then_some(header),
            circuit_state: adapter.map(|a| a.circuit_state().as_str().to_string()),
        }
    }
}

#[OpenApi]
impl ProvidersApi {
    /// Known print providers and their integration state
    #[oai(path = "/providers", method = "get")]
    async fn list_providers(&self) -> Json<ProviderList> {
        Json(ProviderList {
            providers: Provider::ALL.into_iter().map(|p| self.describe(p)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::build_registry;
    use std::time::Duration;

    #[tokio::test]
    async fn test_list_providers() {
        let mut settings = ProviderSettings::defaults(Provider::Lulu);
        settings.api_key = "token".to_string();
        let (registry, _) = build_registry(&[settings], Duration::from_secs(1));

        let Json(list) = ProvidersApi::new(registry).list_providers().await;
        assert_eq!(list.providers.len(), 3);

        let lulu = list.providers.iter().find(|p| p.id == "lulu").unwrap();
        assert_eq!(lulu.status, "active");
        assert!(lulu.configured);
        assert_eq!(lulu.signature_scheme.as_deref(), Some("hmac-sha1-hex"));
        assert_eq!(lulu.circuit_state.as_deref(), Some("closed"));

        let prodigi = list.providers.iter().find(|p| p.id == "prodigi").unwrap();
        assert!(!prodigi.configured);
        assert!(prodigi.circuit_state.is_none());
        assert_eq!(prodigi.signature_header.as_deref(), Some("X-Prodigi-Signature"));

        let peecho = list.providers.iter().find(|p| p.id == "peecho").unwrap();
        assert_eq!(peecho.status, "not_implemented");
        assert!(peecho.signature_scheme.is_none());
    }
}
