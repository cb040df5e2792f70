use std::time::Duration;
use tracing::error;

use crate::domain::Provider;
use crate::webhooks::signature::{SignatureScheme, VerificationMode};

/// Deployment environment the process runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Connection and webhook settings for one print provider
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub provider: Provider,
    pub api_url: String,
    pub api_key: String,
    pub webhook_secret: Option<String>,
    pub signature_header: String,
    pub signature_scheme: SignatureScheme,
}

impl ProviderSettings {
    /// Defaults for a provider, before environment overrides
    pub fn defaults(provider: Provider) -> Self {
        let (api_url, signature_header, signature_scheme) = match provider {
            Provider::Prodigi => (
                "https://api.sandbox.prodigi.com",
                "X-Prodigi-Signature",
                SignatureScheme::HmacSha256Hex,
            ),
            Provider::Lulu => (
                "https://api.sandbox.lulu.com",
                "X-Lulu-Signature",
                SignatureScheme::HmacSha1Hex,
            ),
            Provider::Peecho => ("", "X-Peecho-Signature", SignatureScheme::HmacSha256Hex),
        };
        Self {
            provider,
            api_url: api_url.to_string(),
            api_key: String::new(),
            webhook_secret: None,
            signature_header: signature_header.to_string(),
            signature_scheme,
        }
    }

    fn from_env(provider: Provider) -> Self {
        let prefix = provider.env_prefix();
        let mut settings = Self::defaults(provider);
        if let Some(url) = non_empty_var(&format!("{}_API_URL", prefix)) {
            settings.api_url = url;
        }
        if let Some(key) = non_empty_var(&format!("{}_API_KEY", prefix)) {
            settings.api_key = key;
        }
        settings.webhook_secret = non_empty_var(&format!("{}_WEBHOOK_SECRET", prefix));
        if let Some(header) = non_empty_var(&format!("{}_SIGNATURE_HEADER", prefix)) {
            settings.signature_header = header;
        }
        settings
    }
}

pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    /// Explicit opt-in to skip webhook signature checks outside production
    pub allow_unsigned_webhooks: bool,
    pub quote_timeout: Duration,
    pub providers: Vec<ProviderSettings>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or(Environment::Development),
            log_format: match std::env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            allow_unsigned_webhooks: std::env::var("PRINTGATE_ALLOW_UNSIGNED_WEBHOOKS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            quote_timeout: Duration::from_millis(
                std::env::var("QUOTE_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            ),
            providers: [Provider::Prodigi, Provider::Lulu]
                .into_iter()
                .map(ProviderSettings::from_env)
                .collect(),
        }
    }

    pub fn provider(&self, provider: Provider) -> Option<&ProviderSettings> {
        self.providers.iter().find(|s| s.provider == provider)
    }

    /// Unsigned webhooks are only ever accepted outside production
    pub fn verification_mode(&self) -> VerificationMode {
        if !self.allow_unsigned_webhooks {
            return VerificationMode::Enforce;
        }
        if self.environment == Environment::Production {
            error!("PRINTGATE_ALLOW_UNSIGNED_WEBHOOKS is ignored in production; signatures stay enforced");
            return VerificationMode::Enforce;
        }
        VerificationMode::AcceptAll
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
