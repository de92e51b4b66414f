use axum::{Json, extract::State};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde_json::{Value, json};

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check(State(db): State<DatabaseConnection>) -> Json<Value> {
    let database = match db.execute_unprepared("SELECT 1").await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::error!("Health check query failed: {}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": "ok",
        "service": "ferramenta",
        "database": database,
        "version": env!("CARGO_PKG_VERSION")
    }))
}
