use axum::{routing::get, Router};
use dotenv::dotenv;
use tera::Tera;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_site::{database, health, pages, AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();
    println!("🌟 blog publishing site 🌟");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                format!(
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = database::create_pool().expect("database pool initialization failed");
    let templates = Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*"))
        .expect("template initialization failed");
    let state = AppState { pool, templates };

    let app = Router::new()
        .route("/", get(pages::index))
        .route("/posts/:slug/", get(pages::post_detail))
        .route("/tags/:title/", get(pages::tag_filter))
        .route("/contacts/", get(pages::contacts))
        .route("/api/healthcheck", get(health::health_check_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    println!("🚀 Server started");
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = TcpListener::bind(&addr).await.expect("failed to bind");
    tracing::debug!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}
