//! HTTP plumbing shared by the remote providers.

use std::time::Duration;

use fxswitch_common::{ErrorKind, ErrorLog};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::error::{FxError, FxResult};

/// Build a client whose requests fail after `timeout`.
pub(crate) fn client(timeout: Duration) -> FxResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| FxError::Configuration(format!("HTTP client: {e}")))
}

/// Issue one GET and parse the body as JSON.
///
/// Transport errors, timeouts and non-JSON bodies are recorded as
/// `ERR_EXCEPTION_OCCURRED`. The status is returned so the caller can look
/// for a remote error block before judging it.
pub(crate) async fn get_json(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    query: &[(&str, String)],
    errors: &ErrorLog,
) -> FxResult<(StatusCode, Value)> {
    let exception = |detail: String| {
        let message = format!(
            "Exception occurred while retrieving the exchange rates from {provider}. \
             Error message: {detail}."
        );
        errors.add_error(ErrorKind::ExceptionOccurred, message);
        FxError::Transport(detail)
    };

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| exception(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| exception(e.to_string()))?;

    debug!(provider, status = %status, bytes = body.len(), "Rate provider responded");

    let value = serde_json::from_str(&body)
        .map_err(|e| exception(format!("malformed payload (HTTP {status}): {e}")))?;

    Ok((status, value))
}

/// Extract an error block from a provider payload.
///
/// Understands `{"error": {"description": ..}}` and
/// `{"error": true, "status": .., "message": .., "description": ..}`.
pub(crate) fn remote_error(body: &Value) -> Option<(String, String)> {
    let text = |value: Option<&Value>| -> Option<String> {
        match value? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    let describe = |block: &Value| -> String {
        match (text(block.get("message")), text(block.get("description"))) {
            (Some(message), Some(description)) => format!("{message} - {description}"),
            (Some(message), None) => message,
            (None, Some(description)) => description,
            (None, None) => "no details".to_string(),
        }
    };

    match body.get("error")? {
        Value::Bool(true) => {
            let code = text(body.get("status")).unwrap_or_else(|| "unknown".to_string());
            Some((code, describe(body)))
        }
        block @ Value::Object(_) => {
            let code = text(block.get("status"))
                .or_else(|| text(block.get("code")))
                .unwrap_or_else(|| "unknown".to_string());
            Some((code, describe(block)))
        }
        Value::String(message) => Some(("unknown".to_string(), message.clone())),
        _ => None,
    }
}

/// Record and return the error for a remote error block.
pub(crate) fn error_returned(
    provider: &str,
    code: String,
    message: String,
    errors: &ErrorLog,
) -> FxError {
    errors.add_error(
        ErrorKind::ErrorReturned,
        format!("Error returned by {provider}. Error code: {code}. Error message: {message}."),
    );
    FxError::RemoteError { code, message }
}

/// Record and return the error for a non-2xx status without an error block.
pub(crate) fn unexpected_status(provider: &str, status: StatusCode, errors: &ErrorLog) -> FxError {
    let detail = format!("HTTP status {status}");
    errors.add_error(
        ErrorKind::ExceptionOccurred,
        format!(
            "Exception occurred while retrieving the exchange rates from {provider}. \
             Error message: {detail}."
        ),
    );
    FxError::Transport(detail)
}

/// Record an unusable payload. Callers then return an empty set.
pub(crate) fn unexpected_payload(provider: &str, detail: impl std::fmt::Display, errors: &ErrorLog) {
    errors.add_error(
        ErrorKind::UnexpectedErrorFetchingExchangeRates,
        format!(
            "An unexpected error occurred while fetching exchange rates from {provider}: {detail}."
        ),
    );
}

/// Parse a provider rate, rejecting anything that is not a positive finite number.
pub(crate) fn parse_rate(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|rate| rate.is_finite() && *rate > 0.0)
}
