//! Service entry point: configuration, tracing, database pool, and the
//! axum router wiring the payment endpoints to their adapters.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use booking_payments::adapters::hosted_checkout::{HostedCheckoutAdapter, HostedCheckoutConfig};
use booking_payments::adapters::http::{health, payments_router, PaymentsAppState};
use booking_payments::adapters::postgres::{
    PostgresAuditLog, PostgresBookingRepository, PostgresPaymentSessionRepository,
};
use booking_payments::adapters::xpay::XPayAdapter;
use booking_payments::config::AppConfig;
use booking_payments::domain::payment::{CallbackProcessor, MacCodec, TransactionRegistry};
use booking_payments::domain::pricing::PriceValidator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.server.log_level)?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        checkout_test_mode = config.checkout.is_test_mode(),
        "starting booking-payments"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let sessions = Arc::new(PostgresPaymentSessionRepository::new(pool.clone()));
    let bookings = Arc::new(PostgresBookingRepository::new(pool.clone()));
    let audit = Arc::new(PostgresAuditLog::new(pool));

    let protocol = config.xpay.mac_protocol()?;
    let codec =
        || MacCodec::new(protocol, SecretString::new(config.xpay.mac_secret.clone()));

    let xpay = Arc::new(XPayAdapter::new(
        config.xpay.alias.clone(),
        config.xpay.base_url.clone(),
        config.xpay.result_url.clone(),
        codec(),
    ));
    let hosted_checkout = Arc::new(HostedCheckoutAdapter::new(
        HostedCheckoutConfig::new(
            config.checkout.api_key.clone(),
            config.checkout.webhook_secret.clone(),
        )
        .with_base_url(config.checkout.base_url.clone()),
    ));

    let registry = Arc::new(TransactionRegistry::new(
        sessions.clone(),
        bookings,
        audit.clone(),
        PriceValidator::default(),
    ));
    let processor = Arc::new(CallbackProcessor::new(
        sessions.clone(),
        audit.clone(),
        codec(),
    ));

    let state = PaymentsAppState {
        registry,
        sessions,
        audit,
        processor,
        xpay: xpay.clone(),
        fields_gateway: xpay,
        checkout: hosted_checkout.clone(),
        hosted_checkout,
        checkout_return_url: config.checkout.return_url.clone(),
    };

    let cors_origins = config.server.cors_origins_list();
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(
                cors_origins
                    .iter()
                    .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
            ))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", payments_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors)
        .with_state(state);

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
