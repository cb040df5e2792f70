use poem::http::HeaderValue;
use poem::{Endpoint, IntoResponse, Middleware, Request, Response, Result as PoemResult};
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

/// Wraps each request in an `http_request` span and echoes the request id back
pub struct RequestTracingMiddleware;

impl<E: Endpoint> Middleware<E> for RequestTracingMiddleware {
    type Output = RequestTracingEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        RequestTracingEndpoint { ep }
    }
}

pub struct RequestTracingEndpoint<E> {
    ep: E,
}

#[poem::async_trait]
impl<E: Endpoint> Endpoint for RequestTracingEndpoint<E> {
    type Output = Response;

    async fn call(&self, mut req: Request) -> PoemResult<Self::Output> {
        let request_id = Uuid::new_v4().to_string();
        // Providers that retry reuse their delivery id; keep it as the correlation id
        let correlation_id = extract_correlation_id(&req).unwrap_or_else(|| request_id.clone());

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            req.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        let span = info_span!(
            "http_request",
            request_id = %request_id,
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        let mut resp = self.ep.call(req).instrument(span).await?.into_response();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            resp.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        Ok(resp)
    }
}

pub fn extract_request_id(req: &Request) -> Option<String> {
    req.header(REQUEST_ID_HEADER).map(|s| s.to_string())
}

pub fn extract_correlation_id(req: &Request) -> Option<String> {
    req.header(CORRELATION_ID_HEADER).map(|s| s.to_string())
}
