use std::{
    fs::OpenOptions,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::{
    BoxError, Router,
    error_handling::HandleErrorLayer,
    extract::{MatchedPath, Request},
    http::{HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower::{
    ServiceBuilder, buffer::BufferLayer, limit::RateLimitLayer, load_shed::LoadShedLayer,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use finance_tracker::{
    ApiResponse, AppState, ErrorKind, PaginationConfig, TokenConfig, build_router,
    graceful_shutdown, logging_middleware,
};

/// The number of requests that may wait for the rate limiter before new requests are rejected.
const RATE_LIMIT_QUEUE_SIZE: usize = 1024;

/// The REST API server for the finance tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH", default_value = "finance_tracker.db")]
    db_path: String,

    /// The address to listen on.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// The secret for signing access tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// The secret for signing refresh tokens.
    #[arg(long, env = "JWT_REFRESH_SECRET", hide_env_values = true)]
    jwt_refresh_secret: String,

    /// How long access tokens are valid for, in minutes.
    #[arg(long, env = "ACCESS_TOKEN_MINUTES", default_value_t = 15)]
    access_token_minutes: i64,

    /// How long refresh tokens are valid for, in days.
    #[arg(long, env = "REFRESH_TOKEN_DAYS", default_value_t = 7)]
    refresh_token_days: i64,

    /// The origin allowed to make cross-origin requests. Any origin is allowed if omitted.
    #[arg(long, env = "CORS_ORIGIN")]
    cors_origin: Option<String>,

    /// The number of requests allowed per rate limit window.
    #[arg(long, env = "RATE_LIMIT_REQUESTS", default_value_t = 100)]
    rate_limit_requests: u64,

    /// The length of the rate limit window in seconds.
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60)]
    rate_limit_window_secs: u64,

    /// File path for the debug log.
    #[arg(long, env = "LOG_FILE", default_value = "debug.log")]
    log_file: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logging(&args.log_file);

    let addr = SocketAddr::from((args.host, args.port));

    let mut token_config = TokenConfig::new(&args.jwt_secret, &args.jwt_refresh_secret);
    token_config.access_lifetime = time::Duration::minutes(args.access_token_minutes);
    token_config.refresh_lifetime = time::Duration::days(args.refresh_token_days);

    let conn = Connection::open(&args.db_path).expect("Could not open the database");
    let state = AppState::new(conn, &token_config, PaginationConfig::default())
        .expect("Could not initialize the database");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);
    let router = router.layer(cors_layer(args.cors_origin.as_deref()));
    let router = add_rate_limit_layer(
        router,
        args.rate_limit_requests,
        Duration::from_secs(args.rate_limit_window_secs),
    );

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly");
}

fn setup_logging(log_file: &str) {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file))
        .with_filter(filter::LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin {
        Some(origin) => AllowOrigin::exact(
            HeaderValue::from_str(origin).expect("CORS_ORIGIN is not a valid header value"),
        ),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Limit the whole API to `requests` per `window`.
///
/// Requests over the limit wait in a queue. Once the queue is full, requests are rejected with
/// 503 Service Unavailable.
fn add_rate_limit_layer(router: Router, requests: u64, window: Duration) -> Router {
    // Wrapping the router as one service makes every route share the same limit.
    let rate_limited = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_rate_limit_error))
        .layer(LoadShedLayer::new())
        .layer(BufferLayer::new(RATE_LIMIT_QUEUE_SIZE))
        .layer(RateLimitLayer::new(requests, window))
        .service(router);

    Router::new().fallback_service(rate_limited)
}

async fn handle_rate_limit_error(error: BoxError) -> impl IntoResponse {
    tracing::warn!("Rejected request: {error}");

    (
        StatusCode::SERVICE_UNAVAILABLE,
        ApiResponse::<()>::failure(
            "Too many requests, please try again later.".to_owned(),
            ErrorKind::Internal,
        ),
    )
}
