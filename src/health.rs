use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use mysql::prelude::Queryable;
use serde_json::json;

use crate::AppState;

pub async fn health_check_handler(State(state): State<AppState>) -> Response {
    tracing::info!("health_check started");

    let mut conn = match state.pool.get_conn() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("health_check failed to check out a connection: {:?}", &e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "fail",
                    "message": "could not check out a database connection"
                })),
            )
                .into_response();
        }
    };

    match conn.query::<u8, _>("SELECT 1") {
        Ok(result) if result.first() == Some(&1) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "message": "database connection is healthy"
            })),
        )
            .into_response(),
        Ok(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "fail",
                "message": "probe query returned an unexpected result"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("health_check probe query failed: {:?}", &e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "fail",
                    "message": format!("probe query failed: {}", e)
                })),
            )
                .into_response()
        }
    }
}
