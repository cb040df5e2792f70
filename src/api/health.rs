use poem_openapi::{payload::Json, ApiResponse, OpenApi};

use crate::providers::ProviderRegistry;
use crate::resilience::CircuitState;

pub struct HealthApi {
    registry: ProviderRegistry,
}

impl HealthApi {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, poem_openapi::Object)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    /// Providers with a closed or half-open circuit
    pub providers_available: u32,
    pub providers_registered: u32,
}

#[derive(ApiResponse)]
pub enum ReadinessResponse {
    #[oai(status = 200)]
    Ready(Json<HealthStatus>),

    #[oai(status = 503)]
    NotReady(Json<HealthStatus>),
}

impl HealthApi {
    fn snapshot(&self) -> HealthStatus {
        let adapters = self.registry.adapters();
        let available = adapters
            .iter()
            .filter(|a| a.circuit_state() != CircuitState::Open)
            .count() as u32;
        let registered = adapters.len() as u32;

        let status = if available == 0 {
            "unavailable"
        } else if available < registered {
            "degraded"
        } else {
            "healthy"
        };

        HealthStatus {
            status: status.to_string(),
            service: "PrintGate".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            providers_available: available,
            providers_registered: registered,
        }
    }
}

#[OpenApi]
impl HealthApi {
    /// Liveness check
    ///
    /// Always 200 while the process is serving. Provider reachability is
    /// reported in the body as `healthy`, `degraded` or `unavailable`.
    #[oai(path = "/health", method = "get")]
    async fn health(&self) -> Json<HealthStatus> {
        Json(self.snapshot())
    }

    /// Readiness check
    ///
    /// 503 while no provider can be reached.
    #[oai(path = "/ready", method = "get")]
    async fn ready(&self) -> ReadinessResponse {
        let health = self.snapshot();
        if health.providers_available == 0 {
            ReadinessResponse::NotReady(Json(health))
        } else {
            ReadinessResponse::Ready(Json(health))
        }
    }
}
