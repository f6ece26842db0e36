//! # AppraisalPeriodRepository
//!
//! 評価期間マスタの読み取り専用リポジトリ。
//! 人事評価申請のペイロード検証時に設問定義を取得するために使う。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shinsei_domain::appraisal::{AppraisalPeriod, AppraisalPeriodId, AppraisalPeriodRecord};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 評価期間リポジトリトレイト
#[async_trait]
pub trait AppraisalPeriodRepository: Send + Sync {
    /// ID で評価期間を取得する
    async fn find_by_id(
        &self,
        id: &AppraisalPeriodId,
    ) -> Result<Option<AppraisalPeriod>, InfraError>;
}

/// PostgreSQL 実装の AppraisalPeriodRepository
#[derive(Debug, Clone)]
pub struct PostgresAppraisalPeriodRepository {
    pool: PgPool,
}

impl PostgresAppraisalPeriodRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// SELECT 結果の行
#[derive(Debug, sqlx::FromRow)]
struct AppraisalPeriodRow {
    id:         Uuid,
    name:       String,
    questions:  serde_json::Value,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl AppraisalPeriodRepository for PostgresAppraisalPeriodRepository {
    async fn find_by_id(
        &self,
        id: &AppraisalPeriodId,
    ) -> Result<Option<AppraisalPeriod>, InfraError> {
        let row: Option<AppraisalPeriodRow> = sqlx::query_as(
            "SELECT id, name, questions, created_at FROM appraisal_periods WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let period = AppraisalPeriod::from_db(AppraisalPeriodRecord {
            id:         AppraisalPeriodId::from_uuid(row.id),
            name:       row.name,
            questions:  serde_json::from_value(row.questions)?,
            created_at: row.created_at,
        })
        .map_err(|e| InfraError::unexpected(e.to_string()))?;

        Ok(Some(period))
    }
}
