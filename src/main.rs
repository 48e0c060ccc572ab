use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, EnvFilter};

use resq_backend::alerts::PublicSite;
use resq_backend::billing::{
    BillingProvider, MeteredUsageReporter, StripeClient, UsageReporter,
};
use resq_backend::db::Stores;
use resq_backend::notifications::{
    BulkSmsSender, LogNotificationSender, NotificationSender, TwilioSmsSender,
};
use resq_backend::{app, config, AppServices, Collaborators};

async fn root() -> &'static str {
    "ResQ API"
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    if config::JWT_SECRET.is_none() {
        tracing::warn!("JWT_SECRET is not set; authenticated routes will fail");
    }
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config::DATABASE_URL.as_str())
        .await?;

    if let Err(error) = sqlx::migrate!().run(&pool).await {
        if *config::ALLOW_MIGRATION_FAILURE {
            tracing::warn!(
                ?error,
                "Database migrations failed but continuing due to ALLOW_MIGRATION_FAILURE"
            );
        } else {
            return Err(Box::new(error) as Box<dyn std::error::Error>);
        }
    }

    let stores = Stores::postgres(pool.clone());

    let billing: Arc<dyn BillingProvider> = Arc::new(StripeClient::new(
        config::STRIPE_API_BASE.as_str(),
        config::STRIPE_SECRET_KEY.clone(),
    )?);
    if config::STRIPE_SECRET_KEY.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY is not set; provider calls will be unauthenticated");
    }
    let usage: Arc<dyn UsageReporter> = Arc::new(MeteredUsageReporter::new(
        stores.subscriptions.clone(),
        billing.clone(),
    ));
    let notifier: Arc<dyn NotificationSender> = Arc::new(LogNotificationSender);
    let bulk_sms: Arc<dyn BulkSmsSender> = match config::twilio_config_from_env() {
        Some(twilio) => Arc::new(TwilioSmsSender::new(twilio)?),
        None => {
            tracing::warn!("Twilio credentials missing; bulk SMS is logged only");
            Arc::new(LogNotificationSender)
        }
    };

    let services = AppServices::new(
        stores,
        Collaborators {
            notifier,
            bulk_sms,
            usage,
            billing,
        },
        config::price_catalog_from_env(),
        config::webhook_config_from_env(),
        PublicSite::new(config::public_app_url()?),
    );

    let (prometheus_layer, metrics_handle) = PrometheusMetricLayer::pair();
    let router = Router::new()
        .route("/", get(root))
        .route(
            "/metrics",
            get(move || async move { metrics_handle.render() }),
        )
        .merge(app(services))
        .layer(prometheus_layer)
        .layer(Extension(pool.clone()));

    let addr: SocketAddr = format!("{}:{}", config::BIND_ADDRESS.as_str(), *config::BIND_PORT)
        .parse()
        .map_err(|error| Box::new(error) as Box<dyn std::error::Error>)?;
    tracing::info!(%addr, "Listening for incoming connections");
    axum::Server::bind(&addr)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}
