use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    routing::get,
};
use serde_json::Value;

use crate::api::ApiError;
use crate::db::Database;
use crate::models::Business;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_business_names).post(create_business))
        .route("/:name", get(get_business_details))
}

async fn list_business_names(
    Extension(db): Extension<Database>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(db.list_business_names().await?))
}

async fn get_business_details(
    Extension(db): Extension<Database>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let business = db
        .get_business_by_name(&name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("business `{name}`")))?;

    Ok(Json(business.to_json()))
}

async fn create_business(
    Extension(db): Extension<Database>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let business = Business::from_json(&body)?;
    db.create_business(&business).await?;
    tracing::info!(business_id = %business.business_id, name = %business.name, "business created");

    Ok((StatusCode::CREATED, Json(business.to_json())))
}
