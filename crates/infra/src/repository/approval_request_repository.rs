//! # ApprovalRequestRepository
//!
//! 承認申請の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **集約単位の永続化**: ワークフローステップとペイロードは
//!   申請行の JSONB カラムに埋め込む
//! - **導出カラムの非正規化**: `status` と `current_approver_id` は
//!   一覧クエリのために書き込み時に展開する
//! - **楽観的ロック**: 更新は `WHERE version = $expected` の CAS

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shinsei_domain::{
    approval::{ApprovalRequest, ApprovalRequestId, ApprovalRequestRecord},
    user::UserId,
    value_objects::Version,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::Page;
use crate::error::InfraError;

/// 承認申請リポジトリトレイト
#[async_trait]
pub trait ApprovalRequestRepository: Send + Sync {
    /// 申請を新規保存する
    async fn insert(&self, request: &ApprovalRequest) -> Result<(), InfraError>;

    /// ID で申請を取得する
    async fn find_by_id(
        &self,
        id: &ApprovalRequestId,
    ) -> Result<Option<ApprovalRequest>, InfraError>;

    /// 申請者の申請一覧を取得する（新しい順、ページング付き）
    ///
    /// # 戻り値
    ///
    /// `(該当ページの申請, 全件数)`
    async fn find_by_requester(
        &self,
        requester: &UserId,
        page: Page,
    ) -> Result<(Vec<ApprovalRequest>, u64), InfraError>;

    /// 指定ユーザーがアクティブステップの担当承認者である申請を取得する
    async fn find_pending_by_approver(
        &self,
        approver: &UserId,
    ) -> Result<Vec<ApprovalRequest>, InfraError>;

    /// 全申請を取得する（新しい順、ページング付き）
    async fn find_all(&self, page: Page) -> Result<(Vec<ApprovalRequest>, u64), InfraError>;

    /// バージョンチェック付きで申請を更新する
    ///
    /// # エラー
    ///
    /// DB 上のバージョンが `expected_version` と一致しない場合は
    /// `InfraError::Conflict` を返す。
    async fn update_with_version_check(
        &self,
        request: &ApprovalRequest,
        expected_version: Version,
    ) -> Result<(), InfraError>;

    /// 申請を物理削除する
    ///
    /// # 戻り値
    ///
    /// 削除された場合は `true`、該当行がない場合は `false`。
    async fn delete(&self, id: &ApprovalRequestId) -> Result<bool, InfraError>;
}

/// PostgreSQL 実装の ApprovalRequestRepository
#[derive(Debug, Clone)]
pub struct PostgresApprovalRequestRepository {
    pool: PgPool,
}

impl PostgresApprovalRequestRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// SELECT 結果の行
#[derive(Debug, sqlx::FromRow)]
struct ApprovalRequestRow {
    id:           Uuid,
    requester_id: Uuid,
    details:      String,
    payload:      serde_json::Value,
    workflow:     serde_json::Value,
    version:      i32,
    created_at:   DateTime<Utc>,
    updated_at:   DateTime<Utc>,
}

const SELECT_COLUMNS: &str =
    "id, requester_id, details, payload, workflow, version, created_at, updated_at";

impl TryFrom<ApprovalRequestRow> for ApprovalRequest {
    type Error = InfraError;

    fn try_from(row: ApprovalRequestRow) -> Result<Self, Self::Error> {
        let record = ApprovalRequestRecord {
            id:         ApprovalRequestId::from_uuid(row.id),
            requester:  UserId::from_uuid(row.requester_id),
            details:    row.details,
            payload:    serde_json::from_value(row.payload)?,
            workflow:   serde_json::from_value(row.workflow)?,
            version:    Version::try_from(row.version)
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };

        ApprovalRequest::from_db(record).map_err(|e| InfraError::unexpected(e.to_string()))
    }
}

/// 書き込みに使う非正規化カラムを含むバインド値を組み立てる
fn denormalized(
    request: &ApprovalRequest,
) -> Result<(serde_json::Value, serde_json::Value, String, Option<Uuid>), InfraError> {
    let payload = serde_json::to_value(request.payload())?;
    let workflow = serde_json::to_value(request.workflow())?;
    let status = request.overall_status().to_string();
    let current_approver = request.current_approver().map(|u| *u.as_uuid());
    Ok((payload, workflow, status, current_approver))
}

#[async_trait]
impl ApprovalRequestRepository for PostgresApprovalRequestRepository {
    async fn insert(&self, request: &ApprovalRequest) -> Result<(), InfraError> {
        let (payload, workflow, status, current_approver) = denormalized(request)?;

        sqlx::query(
            r#"
            INSERT INTO approval_requests (
                id, requester_id, request_type, details,
                payload, workflow, status, current_approver_id,
                version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(request.requester().as_uuid())
        .bind(request.request_type().to_string())
        .bind(request.details().as_str())
        .bind(payload)
        .bind(workflow)
        .bind(status)
        .bind(current_approver)
        .bind(request.version().as_i32())
        .bind(request.created_at())
        .bind(request.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ApprovalRequestId,
    ) -> Result<Option<ApprovalRequest>, InfraError> {
        let row: Option<ApprovalRequestRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM approval_requests WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ApprovalRequest::try_from).transpose()
    }

    async fn find_by_requester(
        &self,
        requester: &UserId,
        page: Page,
    ) -> Result<(Vec<ApprovalRequest>, u64), InfraError> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM approval_requests WHERE requester_id = $1")
                .bind(requester.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<ApprovalRequestRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM approval_requests
            WHERE requester_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(requester.as_uuid())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let requests = rows
            .into_iter()
            .map(ApprovalRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((requests, total as u64))
    }

    async fn find_pending_by_approver(
        &self,
        approver: &UserId,
    ) -> Result<Vec<ApprovalRequest>, InfraError> {
        let rows: Vec<ApprovalRequestRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM approval_requests
            WHERE status = 'pending' AND current_approver_id = $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(approver.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(ApprovalRequest::try_from)
            .collect()
    }

    async fn find_all(&self, page: Page) -> Result<(Vec<ApprovalRequest>, u64), InfraError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM approval_requests")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<ApprovalRequestRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM approval_requests
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let requests = rows
            .into_iter()
            .map(ApprovalRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((requests, total as u64))
    }

    async fn update_with_version_check(
        &self,
        request: &ApprovalRequest,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let (payload, workflow, status, current_approver) = denormalized(request)?;

        let result = sqlx::query(
            r#"
            UPDATE approval_requests SET
                payload = $1,
                workflow = $2,
                status = $3,
                current_approver_id = $4,
                version = $5,
                updated_at = $6
            WHERE id = $7 AND version = $8
            "#,
        )
        .bind(payload)
        .bind(workflow)
        .bind(status)
        .bind(current_approver)
        .bind(request.version().as_i32())
        .bind(request.updated_at())
        .bind(request.id().as_uuid())
        .bind(expected_version.as_i32())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "ApprovalRequest",
                request.id().to_string(),
            ));
        }
        Ok(())
    }

    async fn delete(&self, id: &ApprovalRequestId) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM approval_requests WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// トレイトオブジェクトとして使用できることを確認
    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn ApprovalRequestRepository>>();
    }
}
