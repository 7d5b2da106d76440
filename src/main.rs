use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use video_game_store::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    payments::{PaymentState, StripeGateway},
    repository::{PostgresRepository, RepositoryState},
};

/// main
///
/// Loads configuration, installs logging, connects the store and the payment
/// processor, then serves HTTP until the process is stopped.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise a development default.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "video_game_store=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Document store (Postgres), connected once and shared by every request.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let postgres = PostgresRepository::new(pool);
    postgres
        .ensure_collections()
        .await
        .expect("FATAL: Failed to prepare document collections.");
    let repo = Arc::new(postgres) as RepositoryState;

    // 4. Payment processor
    let payments =
        Arc::new(StripeGateway::new(&config.stripe_api_base, &config.stripe_secret)) as PaymentState;

    // 5. Router and server
    let port = config.port;
    let app = create_router(AppState {
        repo,
        payments,
        config,
    });

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening to Port {}", port);
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui", port);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
