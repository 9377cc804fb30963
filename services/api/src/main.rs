use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutorlink_auth::JwtService;
use tutorlink_database::{create_pool, run_migrations};

mod config;
mod handlers;
mod meet;
mod middleware;
mod models;
mod notifications;
mod payments;
mod routes;
mod services;

use config::AppConfig;
use meet::MeetService;
use notifications::NotificationService;
use payments::PaymentService;
use services::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutorlink_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Starting TutorLink API service...");

    let db_pool = create_pool(&config.database).await?;
    run_migrations(&db_pool).await?;
    tracing::info!("Database ready");

    let state = AppState {
        jwt_service: JwtService::new(&config.jwt.secret),
        payment_service: PaymentService::new(db_pool.clone(), config.fees.clone()),
        meet_service: MeetService::new(&config.meet),
        notification_service: NotificationService::new(&config.email)?,
        db_pool,
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(Any);

    let app = routes::create_routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .fallback(handler_404);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("TutorLink API listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn handler_404() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::NOT_FOUND, "Route not found")
}
