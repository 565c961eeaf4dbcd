use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::get,
};
use serde_json::Value;

use crate::api::ApiError;
use crate::db::Database;
use crate::models::Client;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_client_names).post(create_client))
        .route("/:name", get(get_client_details))
}

async fn list_client_names(
    Extension(db): Extension<Database>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(db.list_client_names().await?))
}

async fn get_client_details(
    Extension(db): Extension<Database>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let client = db
        .get_client_by_name(&name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("client `{name}`")))?;

    Ok(Json(client.to_json()))
}

async fn create_client(
    Extension(db): Extension<Database>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let client = Client::from_json(&body)?;
    db.create_client(&client).await?;
    tracing::info!(client_id = %client.client_id, name = %client.name, "client created");

    Ok((StatusCode::CREATED, Json(client.to_json())))
}
