//! # ヘルスチェックハンドラ
//!
//! サービスの稼働状態を確認するためのエンドポイント。
//!
//! ## エンドポイント
//!
//! ```text
//! GET /health        稼働確認（liveness）
//! GET /health/ready  依存サービス確認（readiness）
//! ```

use std::collections::HashMap;

use axum::{Json, extract::State, http::StatusCode};
use shinsei_shared::{
    HealthResponse,
    health::{CheckStatus, ReadinessResponse, ReadinessStatus},
};
use sqlx::PgPool;

/// ヘルスチェックエンドポイント
///
/// サーバーが正常に稼働していることを確認するためのエンドポイント。
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness Check エンドポイント
///
/// データベースへの接続を確認し、リクエストを処理できる状態か返す。
/// 接続できない場合は 503 を返す。
pub async fn readiness_check(
    State(pool): State<PgPool>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let db_status = match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => CheckStatus::Ok,
        Err(e) => {
            tracing::warn!("データベース接続チェックに失敗: {}", e);
            CheckStatus::Error
        }
    };

    let mut checks = HashMap::new();
    checks.insert("database".to_string(), db_status.clone());

    let (status, code) = match db_status {
        CheckStatus::Ok => (ReadinessStatus::Ready, StatusCode::OK),
        CheckStatus::Error => (ReadinessStatus::NotReady, StatusCode::SERVICE_UNAVAILABLE),
    };

    (code, Json(ReadinessResponse { status, checks }))
}
