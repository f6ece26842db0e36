//! # 承認申請エンティティ
//!
//! 申請本体とワークフロー（承認ステップ列）をひとつの集約として扱う。
//! 全体ステータスはステップ列から導出され、独立して保持しない。
//!
//! ## バージョン管理
//!
//! 状態を変更する操作が成功するたびに `version` がインクリメントされる。
//! 楽観的ロックのバージョン比較はユースケース層とリポジトリ層で行う。

use chrono::{DateTime, Utc};

use super::{
    engine::{self, OverallStatus},
    payload::{ApprovalRequestType, RequestPayload},
    step::WorkflowStep,
};
use crate::{
    DomainError,
    user::{Actor, UserId},
    value_objects::{RequestDetails, Version},
};

define_uuid_id! {
    /// 承認申請 ID
    pub struct ApprovalRequestId;
}

/// 申請に対する操作
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalAction {
    /// アクティブステップを承認する
    Approve { comments: Option<String> },
    /// アクティブステップを却下する（後続はスキップ）
    Reject { comments: Option<String> },
    /// アクティブステップの担当承認者を差し替える
    Reassign { new_approver: UserId },
    /// ワークフロー末尾にステップを追加する（管理者のみ）
    InsertStep { step_name: String, approver: UserId },
}

/// 承認申請エンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    id:         ApprovalRequestId,
    requester:  UserId,
    details:    RequestDetails,
    payload:    RequestPayload,
    workflow:   Vec<WorkflowStep>,
    version:    Version,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// 新規作成用パラメータ
#[derive(Debug)]
pub struct NewApprovalRequest {
    pub id:        ApprovalRequestId,
    pub requester: UserId,
    pub details:   RequestDetails,
    pub payload:   RequestPayload,
    pub workflow:  Vec<WorkflowStep>,
    pub now:       DateTime<Utc>,
}

/// DB から復元するためのレコード
#[derive(Debug, Clone)]
pub struct ApprovalRequestRecord {
    pub id:         ApprovalRequestId,
    pub requester:  UserId,
    pub details:    String,
    pub payload:    RequestPayload,
    pub workflow:   Vec<WorkflowStep>,
    pub version:    Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    /// 新しい申請を作成する
    ///
    /// # エラー
    ///
    /// ワークフローが空、またはステップ名が重複している場合は
    /// `DomainError::InvalidWorkflow` を返す。
    pub fn new(params: NewApprovalRequest) -> Result<Self, DomainError> {
        engine::validate_steps(&params.workflow)?;

        Ok(Self {
            id:         params.id,
            requester:  params.requester,
            details:    params.details,
            payload:    params.payload,
            workflow:   params.workflow,
            version:    Version::initial(),
            created_at: params.now,
            updated_at: params.now,
        })
    }

    /// DB レコードからエンティティを復元する
    ///
    /// # エラー
    ///
    /// ステップ列の不変条件（非空・名前一意・スキップの整合性）に
    /// 違反している場合はエラーを返す。
    pub fn from_db(record: ApprovalRequestRecord) -> Result<Self, DomainError> {
        engine::validate_steps(&record.workflow)?;

        Ok(Self {
            id:         record.id,
            requester:  record.requester,
            details:    RequestDetails::new(record.details)?,
            payload:    record.payload,
            workflow:   record.workflow,
            version:    record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn id(&self) -> &ApprovalRequestId {
        &self.id
    }

    pub fn requester(&self) -> &UserId {
        &self.requester
    }

    pub fn request_type(&self) -> ApprovalRequestType {
        self.payload.request_type()
    }

    pub fn details(&self) -> &RequestDetails {
        &self.details
    }

    pub fn payload(&self) -> &RequestPayload {
        &self.payload
    }

    pub fn workflow(&self) -> &[WorkflowStep] {
        &self.workflow
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 全体ステータス（ステップ列から導出）
    pub fn overall_status(&self) -> OverallStatus {
        engine::overall_status(&self.workflow)
    }

    /// アクティブステップ（最初の未処理ステップ）
    pub fn active_step(&self) -> Option<&WorkflowStep> {
        engine::active_step_index(&self.workflow).map(|i| &self.workflow[i])
    }

    /// アクティブステップの担当承認者
    pub fn current_approver(&self) -> Option<&UserId> {
        self.active_step().map(WorkflowStep::approver)
    }

    /// 完了済み（承認済みまたは却下済み）かどうか
    pub fn is_terminal(&self) -> bool {
        self.overall_status() != OverallStatus::Pending
    }

    /// 申請に操作を適用する
    ///
    /// 成功時は `version` をインクリメントし `updated_at` を更新した
    /// 新しいエンティティを返す。
    ///
    /// # エラー
    ///
    /// - 完了済みの申請への操作: `DomainError::InvalidTransition`
    /// - 権限不足: `DomainError::Forbidden`
    /// - ステップ名の不備: `DomainError::Validation`
    pub fn process_action(
        self,
        actor: &Actor,
        action: ApprovalAction,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if self.is_terminal() {
            return Err(DomainError::InvalidTransition(format!(
                "完了済み（{}）の申請は操作できません",
                self.overall_status()
            )));
        }

        let workflow = match action {
            ApprovalAction::Approve { comments } => {
                engine::approve_active(self.workflow, actor, comments, now)?
            }
            ApprovalAction::Reject { comments } => {
                engine::reject_active(self.workflow, actor, comments, now)?
            }
            ApprovalAction::Reassign { new_approver } => {
                engine::reassign_active(self.workflow, actor, new_approver)?
            }
            ApprovalAction::InsertStep { step_name, approver } => {
                engine::insert_step(self.workflow, actor, step_name, approver)?
            }
        };

        Ok(Self {
            workflow,
            version: self.version.next(),
            updated_at: now,
            id: self.id,
            requester: self.requester,
            details: self.details,
            payload: self.payload,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::{
        approval::{
            payload::OtherPayload,
            step::{WorkflowStepStatus, build_workflow},
        },
        user::Role,
    };

    #[fixture]
    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn member(user_id: &UserId) -> Actor {
        Actor::new(user_id.clone(), Role::Member)
    }

    fn admin() -> Actor {
        Actor::new(UserId::new(), Role::Admin)
    }

    fn other_payload() -> RequestPayload {
        RequestPayload::Other(OtherPayload {
            details: "備品購入の相談".to_string(),
        })
    }

    fn request_with_approvers(
        approvers: &[UserId],
        now: DateTime<Utc>,
    ) -> ApprovalRequest {
        ApprovalRequest::new(NewApprovalRequest {
            id: ApprovalRequestId::new(),
            requester: UserId::new(),
            details: RequestDetails::new("備品購入").unwrap(),
            payload: other_payload(),
            workflow: build_workflow(approvers).unwrap(),
            now,
        })
        .unwrap()
    }

    /// 既存エンティティから Record を作るテストヘルパー
    fn record_from(request: &ApprovalRequest) -> ApprovalRequestRecord {
        ApprovalRequestRecord {
            id:         request.id().clone(),
            requester:  request.requester().clone(),
            details:    request.details().as_str().to_string(),
            payload:    request.payload().clone(),
            workflow:   request.workflow().to_vec(),
            version:    request.version(),
            created_at: request.created_at(),
            updated_at: request.updated_at(),
        }
    }

    // === new / from_db ===

    #[rstest]
    fn test_new_は初期バージョンとpendingで作成される(now: DateTime<Utc>) {
        let approvers = vec![UserId::new(), UserId::new()];

        let request = request_with_approvers(&approvers, now);

        assert_eq!(request.version(), Version::initial());
        assert_eq!(request.overall_status(), OverallStatus::Pending);
        assert_eq!(request.current_approver(), Some(&approvers[0]));
        assert_eq!(request.request_type(), ApprovalRequestType::Other);
    }

    #[rstest]
    fn test_new_空ワークフローはエラー(now: DateTime<Utc>) {
        let result = ApprovalRequest::new(NewApprovalRequest {
            id: ApprovalRequestId::new(),
            requester: UserId::new(),
            details: RequestDetails::new("備品購入").unwrap(),
            payload: other_payload(),
            workflow: vec![],
            now,
        });

        assert!(matches!(result, Err(DomainError::InvalidWorkflow(_))));
    }

    #[rstest]
    fn test_from_db_は元のエンティティを復元する(now: DateTime<Utc>) {
        let request = request_with_approvers(&[UserId::new()], now);

        let restored = ApprovalRequest::from_db(record_from(&request)).unwrap();

        assert_eq!(restored, request);
    }

    #[rstest]
    fn test_from_db_ステップ名重複はエラー(now: DateTime<Utc>) {
        let request = request_with_approvers(&[UserId::new()], now);
        let mut record = record_from(&request);
        record.workflow.push(record.workflow[0].clone());

        let result = ApprovalRequest::from_db(record);

        assert!(matches!(result, Err(DomainError::InvalidWorkflow(_))));
    }

    // === 承認フロー（2 段階） ===

    #[rstest]
    fn test_二段階承認で全体がapprovedになる(now: DateTime<Utc>) {
        let approvers = vec![UserId::new(), UserId::new()];
        let request = request_with_approvers(&approvers, now);

        // 1 人目の承認: 全体は Pending のまま、アクティブが次へ進む
        let request = request
            .process_action(
                &member(&approvers[0]),
                ApprovalAction::Approve {
                    comments: Some("問題ありません".to_string()),
                },
                now,
            )
            .unwrap();

        assert_eq!(request.overall_status(), OverallStatus::Pending);
        assert_eq!(request.current_approver(), Some(&approvers[1]));
        assert_eq!(request.version().as_u32(), 1);

        // 2 人目の承認: 全体が Approved になる
        let request = request
            .process_action(
                &member(&approvers[1]),
                ApprovalAction::Approve { comments: None },
                now,
            )
            .unwrap();

        assert_eq!(request.overall_status(), OverallStatus::Approved);
        assert_eq!(request.current_approver(), None);
        assert_eq!(request.version().as_u32(), 2);
    }

    // === 却下カスケード ===

    #[rstest]
    fn test_却下で後続ステップがスキップされ全体がrejectedになる(
        now: DateTime<Utc>,
    ) {
        let approvers = vec![UserId::new(), UserId::new(), UserId::new()];
        let request = request_with_approvers(&approvers, now);

        let request = request
            .process_action(
                &member(&approvers[0]),
                ApprovalAction::Reject {
                    comments: Some("差し戻し".to_string()),
                },
                now,
            )
            .unwrap();

        assert_eq!(request.overall_status(), OverallStatus::Rejected);
        let statuses: Vec<WorkflowStepStatus> =
            request.workflow().iter().map(|s| s.status()).collect();
        assert_eq!(
            statuses,
            vec![
                WorkflowStepStatus::Rejected,
                WorkflowStepStatus::Skipped,
                WorkflowStepStatus::Skipped,
            ]
        );
    }

    // === 完了済み申請 ===

    #[rstest]
    fn test_完了済み申請への操作はinvalid_transition(now: DateTime<Utc>) {
        let approvers = vec![UserId::new()];
        let request = request_with_approvers(&approvers, now);
        let request = request
            .process_action(
                &member(&approvers[0]),
                ApprovalAction::Reject { comments: None },
                now,
            )
            .unwrap();

        let result = request.clone().process_action(
            &member(&approvers[0]),
            ApprovalAction::Approve { comments: None },
            now,
        );
        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));

        let result = request.process_action(
            &admin(),
            ApprovalAction::InsertStep {
                step_name: "再確認".to_string(),
                approver:  UserId::new(),
            },
            now,
        );
        assert!(matches!(result, Err(DomainError::InvalidTransition(_))));
    }

    // === ステップ挿入 ===

    #[rstest]
    fn test_管理者のステップ挿入でバージョンが上がる(now: DateTime<Utc>) {
        let request = request_with_approvers(&[UserId::new()], now);
        let approver = UserId::new();

        let request = request
            .process_action(
                &admin(),
                ApprovalAction::InsertStep {
                    step_name: "部長確認".to_string(),
                    approver:  approver.clone(),
                },
                now,
            )
            .unwrap();

        assert_eq!(request.workflow().len(), 2);
        assert_eq!(request.workflow()[1].step_name(), "部長確認");
        assert_eq!(request.version().as_u32(), 1);
        assert_eq!(request.overall_status(), OverallStatus::Pending);
    }

    #[rstest]
    fn test_一般ユーザーのステップ挿入はforbidden(now: DateTime<Utc>) {
        let approvers = vec![UserId::new()];
        let request = request_with_approvers(&approvers, now);

        let result = request.process_action(
            &member(&approvers[0]),
            ApprovalAction::InsertStep {
                step_name: "部長確認".to_string(),
                approver:  UserId::new(),
            },
            now,
        );

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    // === 担当変更 ===

    #[rstest]
    fn test_担当変更後は新担当者が承認できる(now: DateTime<Utc>) {
        let approvers = vec![UserId::new()];
        let request = request_with_approvers(&approvers, now);
        let replacement = UserId::new();

        let request = request
            .process_action(
                &admin(),
                ApprovalAction::Reassign {
                    new_approver: replacement.clone(),
                },
                now,
            )
            .unwrap();

        assert_eq!(request.current_approver(), Some(&replacement));

        // 旧担当者はもう承認できない
        let result = request.clone().process_action(
            &member(&approvers[0]),
            ApprovalAction::Approve { comments: None },
            now,
        );
        assert!(matches!(result, Err(DomainError::Forbidden(_))));

        let request = request
            .process_action(
                &member(&replacement),
                ApprovalAction::Approve { comments: None },
                now,
            )
            .unwrap();
        assert_eq!(request.overall_status(), OverallStatus::Approved);
    }
}
