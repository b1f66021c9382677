//! HTTP provider integration tests.
//!
//! Starts an axum server standing in for the remote rate APIs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};

use fxswitch_common::{Currency, ErrorKind, ErrorLog};
use fxswitch_fx::{
    ExchangeRateCache, FxError, OpenExchangeRatesProvider, ProviderConfig, ProviderKind,
    RateProvider, YahooFinanceProvider,
};

/// Canned response plus request bookkeeping.
struct Upstream {
    status: StatusCode,
    body: String,
    delay: Duration,
    hits: AtomicUsize,
    last_query: Mutex<HashMap<String, String>>,
}

impl Upstream {
    fn new(status: StatusCode, body: impl Into<String>) -> Arc<Self> {
        Self::delayed(status, body, Duration::ZERO)
    }

    fn delayed(status: StatusCode, body: impl Into<String>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.into(),
            delay,
            hits: AtomicUsize::new(0),
            last_query: Mutex::new(HashMap::new()),
        })
    }

    fn json(status: StatusCode, body: Value) -> Arc<Self> {
        Self::new(status, body.to_string())
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn respond(
    State(upstream): State<Arc<Upstream>>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    upstream.hits.fetch_add(1, Ordering::SeqCst);
    *upstream.last_query.lock() = query;
    if !upstream.delay.is_zero() {
        tokio::time::sleep(upstream.delay).await;
    }
    (upstream.status, upstream.body.clone())
}

/// Bind to port 0 and return the actual address.
async fn start_server(upstream: Arc<Upstream>) -> String {
    let app = Router::new()
        .route("/yql", get(respond))
        .route("/api/latest.json", get(respond))
        .with_state(upstream);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn yahoo_config(base: &str) -> ProviderConfig {
    ProviderConfig {
        kind: ProviderKind::YahooFinance,
        endpoint: Some(format!("{base}/yql")),
        enabled_currencies: vec![Currency::eur(), Currency::gbp()],
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

fn oxr_config(base: &str) -> ProviderConfig {
    ProviderConfig {
        kind: ProviderKind::OpenExchangeRates,
        endpoint: Some(format!("{base}/api")),
        app_id: Some("test-app".to_string()),
        enabled_currencies: vec![Currency::eur()],
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

fn yahoo_rates() -> Value {
    json!({"query": {"count": 2, "created": "2024-01-31T12:00:00Z", "results": {"rate": [
        {"id": "USDEUR", "Name": "USD/EUR", "Rate": "0.9000"},
        {"id": "USDGBP", "Name": "USD/GBP", "Rate": "0.8000"}
    ]}}})
}

#[tokio::test]
async fn yahoo_fetches_all_pairs_in_one_request() {
    let upstream = Upstream::json(StatusCode::OK, yahoo_rates());
    let base = start_server(upstream.clone()).await;
    let provider = YahooFinanceProvider::new(&yahoo_config(&base)).unwrap();
    let errors = ErrorLog::new();

    let rates = provider.fetch_rates(&Currency::eur(), &errors).await.unwrap();

    assert_eq!(upstream.hits(), 1);
    assert_eq!(rates.base(), &Currency::usd());
    assert_eq!(rates.get(&Currency::usd()), Some(1.0));
    assert_eq!(rates.get(&Currency::eur()), Some(0.9));
    assert_eq!(rates.get(&Currency::gbp()), Some(0.8));
    assert!(errors.is_empty());

    let query = upstream.last_query.lock().clone();
    assert_eq!(
        query["q"],
        "select * from yahoo.finance.xchange where pair in (\"USDEUR\",\"USDGBP\")"
    );
    assert_eq!(query["format"], "json");
}

#[tokio::test]
async fn yahoo_remote_error_is_recorded_once() {
    let upstream = Upstream::json(
        StatusCode::BAD_REQUEST,
        json!({"error": {"lang": "en-US", "description": "Query syntax error(s)"}}),
    );
    let base = start_server(upstream).await;
    let provider = YahooFinanceProvider::new(&yahoo_config(&base)).unwrap();
    let errors = ErrorLog::new();

    let result = provider.fetch_rates(&Currency::usd(), &errors).await;

    assert!(matches!(result, Err(FxError::RemoteError { .. })));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.count(ErrorKind::ErrorReturned), 1);
    assert!(errors.errors()[0].message.contains("Query syntax error(s)"));
}

#[tokio::test]
async fn yahoo_unexpected_structure_yields_empty_set() {
    let upstream = Upstream::json(StatusCode::OK, json!({"query": {"results": {"quote": []}}}));
    let base = start_server(upstream).await;
    let provider = YahooFinanceProvider::new(&yahoo_config(&base)).unwrap();
    let errors = ErrorLog::new();

    let rates = provider.fetch_rates(&Currency::usd(), &errors).await.unwrap();

    assert!(rates.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.errors()[0].kind,
        ErrorKind::UnexpectedErrorFetchingExchangeRates
    );
}

#[tokio::test]
async fn non_json_body_is_a_transport_failure() {
    let upstream = Upstream::new(StatusCode::SERVICE_UNAVAILABLE, "<html>Service Unavailable</html>");
    let base = start_server(upstream).await;
    let provider = YahooFinanceProvider::new(&yahoo_config(&base)).unwrap();
    let errors = ErrorLog::new();

    let result = provider.fetch_rates(&Currency::usd(), &errors).await;

    assert!(matches!(result, Err(FxError::Transport(_))));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.count(ErrorKind::ExceptionOccurred), 1);
}

#[tokio::test]
async fn error_status_without_error_block_is_a_transport_failure() {
    let upstream = Upstream::json(StatusCode::INTERNAL_SERVER_ERROR, json!({}));
    let base = start_server(upstream).await;
    let provider = YahooFinanceProvider::new(&yahoo_config(&base)).unwrap();
    let errors = ErrorLog::new();

    let result = provider.fetch_rates(&Currency::usd(), &errors).await;

    assert!(matches!(result, Err(FxError::Transport(_))));
    assert_eq!(errors.count(ErrorKind::ExceptionOccurred), 1);
}

#[tokio::test]
async fn connection_refused_is_a_transport_failure() {
    // Nothing listens on port 1
    let provider = YahooFinanceProvider::new(&yahoo_config("http://127.0.0.1:1")).unwrap();
    let cache = ExchangeRateCache::new(Arc::new(provider));

    let rate = cache.get_rate(&Currency::usd(), &Currency::eur()).await;

    assert_eq!(rate, None);
    let errors = cache.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::ExceptionOccurred);
}

#[tokio::test]
async fn slow_provider_times_out() {
    let upstream =
        Upstream::delayed(StatusCode::OK, yahoo_rates().to_string(), Duration::from_secs(2));
    let base = start_server(upstream).await;
    let config = ProviderConfig {
        request_timeout: Duration::from_millis(100),
        ..yahoo_config(&base)
    };
    let provider = YahooFinanceProvider::new(&config).unwrap();
    let errors = ErrorLog::new();

    let result = provider.fetch_rates(&Currency::usd(), &errors).await;

    assert!(matches!(result, Err(FxError::Transport(_))));
    assert_eq!(errors.count(ErrorKind::ExceptionOccurred), 1);
}

#[tokio::test]
async fn open_exchange_rates_sends_base_and_symbols() {
    let upstream = Upstream::json(
        StatusCode::OK,
        json!({"timestamp": 1706702400, "base": "USD", "rates": {"EUR": 0.9, "GBP": 0.8}}),
    );
    let base = start_server(upstream.clone()).await;
    let provider = OpenExchangeRatesProvider::new(&oxr_config(&base)).unwrap();
    let errors = ErrorLog::new();

    let rates = provider.fetch_rates(&Currency::gbp(), &errors).await.unwrap();

    assert_eq!(rates.get(&Currency::eur()), Some(0.9));
    assert_eq!(rates.get(&Currency::usd()), Some(1.0));

    let query = upstream.last_query.lock().clone();
    assert_eq!(query["app_id"], "test-app");
    assert_eq!(query["base"], "USD");
    assert_eq!(query["symbols"], "EUR,GBP");
}

#[tokio::test]
async fn open_exchange_rates_error_payload() {
    let upstream = Upstream::json(
        StatusCode::UNAUTHORIZED,
        json!({
            "error": true,
            "status": 401,
            "message": "invalid_app_id",
            "description": "Invalid App ID provided."
        }),
    );
    let base = start_server(upstream).await;
    let provider = OpenExchangeRatesProvider::new(&oxr_config(&base)).unwrap();
    let errors = ErrorLog::new();

    let err = provider
        .fetch_rates(&Currency::usd(), &errors)
        .await
        .unwrap_err();

    match err {
        FxError::RemoteError { code, message } => {
            assert_eq!(code, "401");
            assert!(message.starts_with("invalid_app_id"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(errors.count(ErrorKind::ErrorReturned), 1);
}

#[tokio::test]
async fn end_to_end_rebase_through_cache() {
    let upstream = Upstream::json(
        StatusCode::OK,
        json!({"base": "USD", "rates": {"USD": 1.0, "EUR": 0.9}}),
    );
    let base = start_server(upstream.clone()).await;
    let provider = ProviderConfig {
        enabled_currencies: vec![Currency::usd(), Currency::eur()],
        ..oxr_config(&base)
    }
    .build()
    .unwrap();
    let cache = ExchangeRateCache::new(provider);

    let usd_in_eur = cache
        .get_rate(&Currency::eur(), &Currency::usd())
        .await
        .unwrap();
    assert!((usd_in_eur - 1.1111).abs() < 1e-4);

    let eur = cache.get_rate(&Currency::eur(), &Currency::eur()).await;
    assert_eq!(eur, Some(1.0));
    assert_eq!(upstream.hits(), 1);

    let eur_in_usd = cache.get_rate(&Currency::usd(), &Currency::eur()).await;
    assert_eq!(eur_in_usd, Some(0.9));
    assert_eq!(upstream.hits(), 2);
    assert!(cache.errors().is_empty());
}
