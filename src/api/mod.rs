use crate::{
    api::handlers::{auth, health, not_found, root, users},
    oauth::OAuthClient,
    password::PasswordHasher,
    token::TokenService,
    users::PgUserStore,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{get, post},
    Extension, Router,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub(crate) mod handlers;
mod openapi;
pub mod response;

pub use handlers::auth::AuthState;
pub use openapi::openapi;

/// Routes of the service with `state` attached. `/user/{id}` sits behind the
/// session middleware; everything else is public.
#[must_use]
pub fn router(state: Arc<AuthState>) -> Router {
    let protected = Router::new()
        .route("/user/:id", get(users::get_user_by_id))
        .route_layer(middleware::from_fn(auth::session::require_session));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health::health).options(health::health))
        .route("/auth", get(auth::home))
        .route("/auth/sign-up", post(auth::sign_up::sign_up))
        .route("/auth/sign-in", post(auth::sign_in::sign_in))
        .route("/auth/sign-out", post(auth::sign_out::sign_out))
        .route("/auth/oauth/:provider", get(auth::google::begin))
        .route("/auth/oauth/:provider/callback", get(auth::google::callback))
        .route("/auth/oauth/:provider/failure", get(auth::google::failure))
        .route("/user", get(users::home))
        .merge(protected)
        .fallback(not_found)
        .layer(Extension(state))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: &SecretString,
    request_timeout: Duration,
    tokens: TokenService,
    hasher: PasswordHasher,
    google: Option<OAuthClient>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let store = PgUserStore::new(pool, hasher.clone());
    store
        .migrate()
        .await
        .context("Failed to apply database schema")?;

    let mut auth_state = AuthState::new(tokens, hasher, Arc::new(store));
    if let Some(client) = google {
        auth_state = auth_state.with_google(client);
    }

    let cors = CorsLayer::new()
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .expose_headers([LINK])
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true);

    let app = router(Arc::new(auth_state)).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(TimeoutLayer::new(request_timeout)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// Resolves on Ctrl-C or SIGTERM. If a handler cannot be installed, that
/// signal is never reported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
