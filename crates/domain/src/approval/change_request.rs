//! # 変更申請エンティティ
//!
//! 承認申請と同じ順次承認エンジンを使う別名前空間の申請。
//! ペイロードは持たず、タイトルと詳細テキストで構成される。
//! 承認申請と異なり、論理削除（ソフトデリート）と復元をサポートする。

use chrono::{DateTime, Utc};

use super::{
    engine::{self, OverallStatus},
    step::WorkflowStep,
};
use crate::{
    DomainError,
    user::{Actor, UserId},
    value_objects::{ChangeRequestTitle, RequestDetails, Version},
};

define_uuid_id! {
    /// 変更申請 ID
    pub struct ChangeRequestId;
}

/// 変更申請に対するワークフロー操作
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRequestAction {
    /// アクティブステップを承認する
    Approve { comments: Option<String> },
    /// アクティブステップを却下する（後続はスキップ）
    Reject { comments: Option<String> },
}

/// 変更申請エンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRequest {
    id:         ChangeRequestId,
    requester:  UserId,
    title:      ChangeRequestTitle,
    details:    RequestDetails,
    workflow:   Vec<WorkflowStep>,
    version:    Version,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 新規作成用パラメータ
#[derive(Debug)]
pub struct NewChangeRequest {
    pub id:        ChangeRequestId,
    pub requester: UserId,
    pub title:     ChangeRequestTitle,
    pub details:   RequestDetails,
    pub workflow:  Vec<WorkflowStep>,
    pub now:       DateTime<Utc>,
}

/// DB から復元するためのレコード
#[derive(Debug, Clone)]
pub struct ChangeRequestRecord {
    pub id:         ChangeRequestId,
    pub requester:  UserId,
    pub title:      String,
    pub details:    String,
    pub workflow:   Vec<WorkflowStep>,
    pub version:    Version,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChangeRequest {
    /// 新しい変更申請を作成する
    pub fn new(params: NewChangeRequest) -> Result<Self, DomainError> {
        engine::validate_steps(&params.workflow)?;

        Ok(Self {
            id:         params.id,
            requester:  params.requester,
            title:      params.title,
            details:    params.details,
            workflow:   params.workflow,
            version:    Version::initial(),
            deleted_at: None,
            created_at: params.now,
            updated_at: params.now,
        })
    }

    /// DB レコードからエンティティを復元する
    pub fn from_db(record: ChangeRequestRecord) -> Result<Self, DomainError> {
        engine::validate_steps(&record.workflow)?;

        Ok(Self {
            id:         record.id,
            requester:  record.requester,
            title:      ChangeRequestTitle::new(record.title)?,
            details:    RequestDetails::new(record.details)?,
            workflow:   record.workflow,
            version:    record.version,
            deleted_at: record.deleted_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn id(&self) -> &ChangeRequestId {
        &self.id
    }

    pub fn requester(&self) -> &UserId {
        &self.requester
    }

    pub fn title(&self) -> &ChangeRequestTitle {
        &self.title
    }

    pub fn details(&self) -> &RequestDetails {
        &self.details
    }

    pub fn workflow(&self) -> &[WorkflowStep] {
        &self.workflow
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn overall_status(&self) -> OverallStatus {
        engine::overall_status(&self.workflow)
    }

    pub fn active_step(&self) -> Option<&WorkflowStep> {
        engine::active_step_index(&self.workflow).map(|i| &self.workflow[i])
    }

    pub fn current_approver(&self) -> Option<&UserId> {
        self.active_step().map(WorkflowStep::approver)
    }

    /// 論理削除済みかどうか
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// 申請にワークフロー操作を適用する
    ///
    /// # エラー
    ///
    /// - 論理削除済み・完了済みの申請への操作: `DomainError::InvalidTransition`
    /// - 権限不足: `DomainError::Forbidden`
    pub fn process_action(
        self,
        actor: &Actor,
        action: ChangeRequestAction,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if self.is_deleted() {
            return Err(DomainError::InvalidTransition(
                "削除済みの変更申請は操作できません".to_string(),
            ));
        }
        if self.overall_status() != OverallStatus::Pending {
            return Err(DomainError::InvalidTransition(format!(
                "完了済み（{}）の変更申請は操作できません",
                self.overall_status()
            )));
        }

        let workflow = match action {
            ChangeRequestAction::Approve { comments } => {
                engine::approve_active(self.workflow, actor, comments, now)?
            }
            ChangeRequestAction::Reject { comments } => {
                engine::reject_active(self.workflow, actor, comments, now)?
            }
        };

        Ok(Self {
            workflow,
            version: self.version.next(),
            updated_at: now,
            id: self.id,
            requester: self.requester,
            title: self.title,
            details: self.details,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
        })
    }

    /// 論理削除する
    ///
    /// 管理者または申請者本人のみ。既に削除済みの場合はエラー。
    pub fn soft_deleted(self, actor: &Actor, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !actor.is_admin() && actor.user_id != self.requester {
            return Err(DomainError::Forbidden(
                "この変更申請を削除する権限がありません".to_string(),
            ));
        }
        if self.is_deleted() {
            return Err(DomainError::InvalidTransition(
                "既に削除済みです".to_string(),
            ));
        }

        Ok(Self {
            deleted_at: Some(now),
            version: self.version.next(),
            updated_at: now,
            ..self
        })
    }

    /// 論理削除を取り消す
    ///
    /// 管理者または申請者本人のみ。削除されていない場合はエラー。
    pub fn restored(self, actor: &Actor, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !actor.is_admin() && actor.user_id != self.requester {
            return Err(DomainError::Forbidden(
                "この変更申請を復元する権限がありません".to_string(),
            ));
        }
        if !self.is_deleted() {
            return Err(DomainError::InvalidTransition(
                "削除されていない変更申請は復元できません".to_string(),
            ));
        }

        Ok(Self {
            deleted_at: None,
            version: self.version.next(),
            updated_at: now,
            ..self
        })
    }
}
