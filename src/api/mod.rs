//! JSON-over-HTTP backend for the invoice form.

use anyhow::Result;
use axum::{Extension, Json, Router, routing::get};
use serde_json::{Value, json};

use crate::db::Database;

pub mod errors;
mod routes;

pub use errors::ApiError;

pub fn router(db: Database) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/businesses", routes::businesses::router())
        .nest("/clients", routes::clients::router())
        .nest("/invoices", routes::invoices::router())
        .layer(Extension(db))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Serve the API until the process is stopped
pub async fn serve(db: Database, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router(db)).await?;

    Ok(())
}
