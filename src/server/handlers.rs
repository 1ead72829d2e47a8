use axum::extract::State;
use axum::response::{IntoResponse, Response};
use std::any::Any;
use tracing::{error, info};

use super::AppState;
use super::error::ApiError;
use super::form::FormFields;
use crate::core::ManualConversion;
use crate::core::conversion::{format_amount, parse_amount, parse_rate};
use crate::core::rates::normalize_code;

/// `GET /currencies`: comma separated, sorted codes.
pub async fn currencies(State(state): State<AppState>) -> String {
    state.cache.list_codes().join(",")
}

/// `POST /convert`: `amount`, `from`, `to`.
pub async fn convert(State(state): State<AppState>, body: String) -> Result<String, ApiError> {
    let form = FormFields::parse(&body)?;
    let amount = form.require("amount")?;
    let from = normalize_code(form.require("from")?);
    let to = normalize_code(form.require("to")?);

    let amount = parse_amount(amount)?;
    let result = state.cache.convert(amount, &from, &to)?;

    info!("Conversion: {amount:.2} {from} = {result:.2} {to}");
    Ok(format_amount(result))
}

/// `POST /manual-convert`: `amount`, `rate`.
pub async fn manual_convert(body: String) -> Result<String, ApiError> {
    let form = FormFields::parse(&body)?;
    let amount = form.require("amount")?;
    let rate = form.require("rate")?;

    let conversion = ManualConversion::new(parse_amount(amount)?, parse_rate(rate)?)?;

    info!("Manual conversion: {conversion}");
    Ok(conversion.to_string())
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Turns a handler panic into a plain 500 response.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Handler panicked");
    ApiError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::super::router;
    use super::*;
    use crate::core::RateCache;
    use crate::core::cache::tests::populated_cache;
    use crate::core::cache::tests::ScriptedProvider;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn populated_state() -> AppState {
        AppState {
            cache: Arc::new(populated_cache().await),
        }
    }

    fn empty_state() -> AppState {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        AppState {
            cache: Arc::new(RateCache::new(provider, "USD", Duration::from_secs(1))),
        }
    }

    async fn send(state: AppState, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_currencies() {
        let (status, body) = send(populated_state().await, "GET", "/currencies", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "EUR,GBP,USD");
    }

    #[tokio::test]
    async fn test_currencies_content_type() {
        let request = Request::builder()
            .uri("/currencies")
            .body(Body::empty())
            .unwrap();
        let response = router(populated_state().await)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_currencies_when_empty() {
        let (status, body) = send(empty_state(), "GET", "/currencies", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "");
    }

    #[tokio::test]
    async fn test_currencies_wrong_method() {
        let (status, body) = send(populated_state().await, "POST", "/currencies", "").await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, "Method not allowed");
    }

    #[tokio::test]
    async fn test_convert() {
        let state = populated_state().await;

        let (status, body) = send(state.clone(), "POST", "/convert", "amount=100&from=USD&to=EUR").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "90.00");

        let (status, body) = send(state, "POST", "/convert", "amount=100&from=EUR&to=GBP").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "88.89");
    }

    #[tokio::test]
    async fn test_convert_accepts_lowercase_codes() {
        let (status, body) = send(
            populated_state().await,
            "POST",
            "/convert",
            "amount=10&from=usd&to=gbp",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "8.00");
    }

    #[tokio::test]
    async fn test_convert_unknown_currency() {
        let (status, body) = send(
            populated_state().await,
            "POST",
            "/convert",
            "amount=100&from=XYZ&to=EUR",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.to_lowercase().contains("invalid currency"));
    }

    #[tokio::test]
    async fn test_convert_before_first_refresh() {
        let (status, body) = send(empty_state(), "POST", "/convert", "amount=1&from=USD&to=EUR").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid currency: USD");
    }

    #[tokio::test]
    async fn test_convert_missing_and_invalid_fields() {
        let state = populated_state().await;

        let (status, body) = send(state.clone(), "POST", "/convert", "amount=100&from=USD").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing field: to");

        let (status, body) = send(state.clone(), "POST", "/convert", "amount=&from=USD&to=EUR").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing field: amount");

        let (status, body) = send(state.clone(), "POST", "/convert", "amount=ten&from=USD&to=EUR").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid number format: ten");

        let (status, body) = send(state, "POST", "/convert", "amount=1&from&to=EUR").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Malformed form field: from");
    }

    #[tokio::test]
    async fn test_convert_wrong_method() {
        let (status, _) = send(populated_state().await, "GET", "/convert", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_manual_convert() {
        let (status, body) = send(empty_state(), "POST", "/manual-convert", "amount=50&rate=1.1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "50.00 * 1.1000 = 55.00");
    }

    #[tokio::test]
    async fn test_manual_convert_errors() {
        let (status, body) = send(empty_state(), "POST", "/manual-convert", "amount=50").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing field: rate");

        let (status, body) = send(empty_state(), "POST", "/manual-convert", "amount=50&rate=x1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid number format: x1");

        let (status, _) = send(empty_state(), "PUT", "/manual-convert", "amount=50&rate=1").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (status, body) = send(empty_state(), "GET", "/rates", "").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Not found");
    }

    #[test]
    fn test_panic_response_is_internal_error() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
