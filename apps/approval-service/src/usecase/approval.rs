//! # 承認申請ユースケース
//!
//! 申請の作成・照会・承認操作に関するビジネスロジックを実装する。
//!
//! ## 楽観的ロック
//!
//! 状態を変更する操作はクライアントが提示した `expected_version` と
//! 読み込んだエンティティのバージョンを比較し、さらにリポジトリの
//! CAS 更新で二重に保護する。

use std::sync::Arc;

use shinsei_domain::{
    approval::{
        ApprovalAction, ApprovalRequest, ApprovalRequestId, ApprovalRequestType,
        NewApprovalRequest, RequestPayload, build_workflow,
    },
    clock::Clock,
    user::{Actor, UserId},
    value_objects::{RequestDetails, Version},
};
use shinsei_infra::{
    notification::{ApprovalNotifier, Notification},
    repository::{AppraisalPeriodRepository, ApprovalRequestRepository, Page},
};

use crate::{error::ServiceError, usecase::helpers::FindResultExt};

/// 申請作成の入力
pub struct CreateApprovalInput {
    pub requester:    UserId,
    pub request_type: ApprovalRequestType,
    pub details:      String,
    pub payload:      serde_json::Value,
    pub approvers:    Vec<UserId>,
}

/// 承認操作の入力
pub struct ApprovalActionInput {
    pub id:               ApprovalRequestId,
    pub actor:            Actor,
    pub action:           ApprovalAction,
    pub expected_version: Version,
}

/// 承認申請ユースケース実装
///
/// R: ApprovalRequestRepository, P: AppraisalPeriodRepository
pub struct ApprovalUseCaseImpl<R, P> {
    request_repo: R,
    period_repo:  P,
    notifier:     Arc<dyn ApprovalNotifier>,
    clock:        Arc<dyn Clock>,
}

impl<R, P> ApprovalUseCaseImpl<R, P>
where
    R: ApprovalRequestRepository,
    P: AppraisalPeriodRepository,
{
    pub fn new(
        request_repo: R,
        period_repo: P,
        notifier: Arc<dyn ApprovalNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            request_repo,
            period_repo,
            notifier,
            clock,
        }
    }

    /// 申請を作成する
    ///
    /// ペイロードは申請種別に応じてパース・検証される。
    /// 人事評価申請の場合は評価期間の設問定義に対して回答を検証する。
    pub async fn create(
        &self,
        input: CreateApprovalInput,
    ) -> Result<ApprovalRequest, ServiceError> {
        let payload = RequestPayload::parse(input.request_type, &input.payload)?;

        if let RequestPayload::Appraisal(appraisal) = &payload {
            let period = self
                .period_repo
                .find_by_id(&appraisal.period_id)
                .await
                .or_not_found("評価期間")?;
            appraisal.validate_responses(&period)?;
        }

        let request = ApprovalRequest::new(NewApprovalRequest {
            id: ApprovalRequestId::new(),
            requester: input.requester,
            details: RequestDetails::new(input.details)?,
            payload,
            workflow: build_workflow(&input.approvers)?,
            now: self.clock.now(),
        })?;

        self.request_repo.insert(&request).await?;

        self.notify_step_assignment(&request).await;

        Ok(request)
    }

    /// 自分の申請一覧を取得する（新しい順、ページング付き）
    pub async fn list_my(
        &self,
        requester: UserId,
        page: Page,
    ) -> Result<(Vec<ApprovalRequest>, u64), ServiceError> {
        Ok(self.request_repo.find_by_requester(&requester, page).await?)
    }

    /// 自分が承認者であるアクティブな申請一覧を取得する
    pub async fn list_pending(
        &self,
        approver: UserId,
    ) -> Result<Vec<ApprovalRequest>, ServiceError> {
        Ok(self.request_repo.find_pending_by_approver(&approver).await?)
    }

    /// 全申請一覧を取得する（管理者のみ、新しい順、ページング付き）
    pub async fn list_all(
        &self,
        actor: Actor,
        page: Page,
    ) -> Result<(Vec<ApprovalRequest>, u64), ServiceError> {
        if !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "全申請を閲覧する権限がありません".to_string(),
            ));
        }
        Ok(self.request_repo.find_all(page).await?)
    }

    /// 申請を取得する
    pub async fn get(&self, id: ApprovalRequestId) -> Result<ApprovalRequest, ServiceError> {
        self.request_repo.find_by_id(&id).await.or_not_found("承認申請")
    }

    /// 申請に承認操作を適用する
    ///
    /// # エラー
    ///
    /// - 申請が存在しない: `ServiceError::NotFound`
    /// - バージョン不一致: `ServiceError::Conflict`
    /// - 権限不足・遷移違反: ドメインエラーから変換
    pub async fn act(
        &self,
        input: ApprovalActionInput,
    ) -> Result<ApprovalRequest, ServiceError> {
        let request = self
            .request_repo
            .find_by_id(&input.id)
            .await
            .or_not_found("承認申請")?;

        if request.version() != input.expected_version {
            return Err(ServiceError::Conflict(format!(
                "バージョンが一致しません: 期待 {}, 実際 {}",
                input.expected_version,
                request.version()
            )));
        }

        // ステップ挿入はアクティブステップが変わらないため、
        // 挿入されたステップの承認者へ割り当て通知を送る
        let inserted_step = match &input.action {
            ApprovalAction::InsertStep { step_name, approver } => {
                Some((step_name.clone(), approver.clone()))
            }
            _ => None,
        };
        let notify_assignment = matches!(
            input.action,
            ApprovalAction::Approve { .. } | ApprovalAction::Reassign { .. }
        );

        let updated = request.process_action(&input.actor, input.action, self.clock.now())?;

        self.request_repo
            .update_with_version_check(&updated, input.expected_version)
            .await?;

        if updated.is_terminal() {
            self.notify(Notification::RequestCompleted {
                recipient:  updated.requester().clone(),
                request_id: updated.id().clone(),
                outcome:    updated.overall_status(),
            })
            .await;
        } else if let Some((step_name, approver)) = inserted_step {
            self.notify(Notification::StepAssigned {
                recipient: approver,
                request_id: updated.id().clone(),
                step_name,
            })
            .await;
        } else if notify_assignment {
            self.notify_step_assignment(&updated).await;
        }

        Ok(updated)
    }

    /// 申請を物理削除する
    ///
    /// 管理者のみ。
    pub async fn delete(
        &self,
        id: ApprovalRequestId,
        actor: Actor,
    ) -> Result<(), ServiceError> {
        if !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "この申請を削除する権限がありません".to_string(),
            ));
        }

        let deleted = self.request_repo.delete(&id).await?;
        if !deleted {
            return Err(ServiceError::NotFound(
                "承認申請が見つかりません".to_string(),
            ));
        }
        Ok(())
    }

    /// アクティブステップの承認者に割り当て通知を送る
    async fn notify_step_assignment(&self, request: &ApprovalRequest) {
        let Some(step) = request.active_step() else {
            return;
        };
        self.notify(Notification::StepAssigned {
            recipient:  step.approver().clone(),
            request_id: request.id().clone(),
            step_name:  step.step_name().to_string(),
        })
        .await;
    }

    /// 通知を送信する（失敗しても業務処理は失敗させない）
    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(notification).await {
            tracing::warn!("通知の送信に失敗しました: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use shinsei_domain::{
        appraisal::{
            AppraisalPeriod, AppraisalPeriodId, AppraisalPeriodRecord, AppraisalQuestion,
            QuestionKind,
        },
        approval::OverallStatus,
        clock::FixedClock,
        user::Role,
    };
    use shinsei_infra::mock::{
        MockAppraisalPeriodRepository, MockApprovalRequestRepository, MockNotifier,
    };

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    struct TestContext {
        usecase: ApprovalUseCaseImpl<MockApprovalRequestRepository, MockAppraisalPeriodRepository>,
        request_repo: MockApprovalRequestRepository,
        period_repo: MockAppraisalPeriodRepository,
        notifier: MockNotifier,
    }

    fn context(now: DateTime<Utc>) -> TestContext {
        let request_repo = MockApprovalRequestRepository::new();
        let period_repo = MockAppraisalPeriodRepository::new();
        let notifier = MockNotifier::new();
        let usecase = ApprovalUseCaseImpl::new(
            request_repo.clone(),
            period_repo.clone(),
            Arc::new(notifier.clone()),
            Arc::new(FixedClock::new(now)),
        );
        TestContext {
            usecase,
            request_repo,
            period_repo,
            notifier,
        }
    }

    fn leave_input(requester: UserId, approvers: Vec<UserId>) -> CreateApprovalInput {
        CreateApprovalInput {
            requester,
            request_type: ApprovalRequestType::Leave,
            details: "年次有給休暇".to_string(),
            payload: serde_json::json!({
                "leaveType": "有給",
                "startDate": "2026-05-01",
                "endDate": "2026-05-02",
                "reason": "私用のため"
            }),
            approvers,
        }
    }

    fn member(user_id: &UserId) -> Actor {
        Actor::new(user_id.clone(), Role::Member)
    }

    fn admin() -> Actor {
        Actor::new(UserId::new(), Role::Admin)
    }

    // === 作成 ===

    #[tokio::test]
    async fn test_休暇申請を作成すると最初の承認者に通知される() {
        let now = fixed_now();
        let ctx = context(now);
        let approver = UserId::new();

        let request = ctx
            .usecase
            .create(leave_input(UserId::new(), vec![approver.clone()]))
            .await
            .unwrap();

        assert_eq!(request.overall_status(), OverallStatus::Pending);
        assert_eq!(request.current_approver(), Some(&approver));

        let sent = ctx.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            Notification::StepAssigned {
                recipient:  approver,
                request_id: request.id().clone(),
                step_name:  "Step 1".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_経費申請の全フィールドエラーが収集される() {
        let now = fixed_now();
        let ctx = context(now);

        let result = ctx
            .usecase
            .create(CreateApprovalInput {
                requester:    UserId::new(),
                request_type: ApprovalRequestType::Expense,
                details:      "出張費".to_string(),
                payload:      serde_json::json!({ "receipt": "receipt-001.pdf" }),
                approvers:    vec![UserId::new()],
            })
            .await;

        let Err(ServiceError::Validation(errors)) = result else {
            panic!("Validation エラーを期待した");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"amount"));
        assert!(fields.contains(&"currency"));
        assert!(fields.contains(&"expenseCategory"));
    }

    #[tokio::test]
    async fn test_承認者なしの申請はbad_request() {
        let now = fixed_now();
        let ctx = context(now);

        let result = ctx.usecase.create(leave_input(UserId::new(), vec![])).await;

        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_評価期間が存在しない評価申請はnot_found() {
        let now = fixed_now();
        let ctx = context(now);

        let result = ctx
            .usecase
            .create(CreateApprovalInput {
                requester:    UserId::new(),
                request_type: ApprovalRequestType::Appraisal,
                details:      "上期評価".to_string(),
                payload:      serde_json::json!({
                    "periodId": AppraisalPeriodId::new(),
                    "comments": "自己評価です",
                    "responses": {}
                }),
                approvers:    vec![UserId::new()],
            })
            .await;

        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_必須設問の未回答は設問idのフィールドエラーになる() {
        let now = fixed_now();
        let ctx = context(now);
        let period_id = AppraisalPeriodId::new();
        let period = AppraisalPeriod::from_db(AppraisalPeriodRecord {
            id:         period_id.clone(),
            name:       "2026 年上期".to_string(),
            questions:  vec![AppraisalQuestion {
                id:       "q1".to_string(),
                text:     "達成度を 5 段階で評価してください".to_string(),
                required: true,
                kind:     QuestionKind::Rating { min: 1, max: 5 },
            }],
            created_at: now,
        })
        .unwrap();
        ctx.period_repo.add_period(period);

        let result = ctx
            .usecase
            .create(CreateApprovalInput {
                requester:    UserId::new(),
                request_type: ApprovalRequestType::Appraisal,
                details:      "上期評価".to_string(),
                payload:      serde_json::json!({
                    "periodId": period_id,
                    "comments": "自己評価です",
                    "responses": {}
                }),
                approvers:    vec![UserId::new()],
            })
            .await;

        let Err(ServiceError::Validation(errors)) = result else {
            panic!("Validation エラーを期待した");
        };
        assert_eq!(errors[0].field, "q1");
    }

    // === 承認操作 ===

    #[tokio::test]
    async fn test_承認で次ステップの承認者に通知される() {
        let now = fixed_now();
        let ctx = context(now);
        let approvers = vec![UserId::new(), UserId::new()];
        let request = ctx
            .usecase
            .create(leave_input(UserId::new(), approvers.clone()))
            .await
            .unwrap();

        let updated = ctx
            .usecase
            .act(ApprovalActionInput {
                id:               request.id().clone(),
                actor:            member(&approvers[0]),
                action:           ApprovalAction::Approve { comments: None },
                expected_version: Version::initial(),
            })
            .await
            .unwrap();

        assert_eq!(updated.overall_status(), OverallStatus::Pending);
        assert_eq!(updated.current_approver(), Some(&approvers[1]));
        assert_eq!(updated.version().as_u32(), 1);

        let sent = ctx.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[1],
            Notification::StepAssigned {
                recipient:  approvers[1].clone(),
                request_id: request.id().clone(),
                step_name:  "Step 2".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_却下で申請者に完了通知される() {
        let now = fixed_now();
        let ctx = context(now);
        let requester = UserId::new();
        let approver = UserId::new();
        let request = ctx
            .usecase
            .create(leave_input(requester.clone(), vec![approver.clone()]))
            .await
            .unwrap();

        let updated = ctx
            .usecase
            .act(ApprovalActionInput {
                id:               request.id().clone(),
                actor:            member(&approver),
                action:           ApprovalAction::Reject {
                    comments: Some("日程を再調整してください".to_string()),
                },
                expected_version: Version::initial(),
            })
            .await
            .unwrap();

        assert_eq!(updated.overall_status(), OverallStatus::Rejected);

        let sent = ctx.notifier.sent();
        assert_eq!(
            sent[1],
            Notification::RequestCompleted {
                recipient:  requester,
                request_id: request.id().clone(),
                outcome:    OverallStatus::Rejected,
            }
        );
    }

    #[tokio::test]
    async fn test_作成直後の申請はexpected_version_0で操作できる() {
        let now = fixed_now();
        let ctx = context(now);
        let approver = UserId::new();
        let request = ctx
            .usecase
            .create(leave_input(UserId::new(), vec![approver.clone()]))
            .await
            .unwrap();

        assert_eq!(request.version().as_u32(), 0);

        let updated = ctx
            .usecase
            .act(ApprovalActionInput {
                id:               request.id().clone(),
                actor:            member(&approver),
                action:           ApprovalAction::Approve { comments: None },
                expected_version: Version::new(0),
            })
            .await
            .unwrap();

        assert_eq!(updated.version().as_u32(), 1);
    }

    #[tokio::test]
    async fn test_バージョン不一致はconflict() {
        let now = fixed_now();
        let ctx = context(now);
        let approvers = vec![UserId::new(), UserId::new()];
        let request = ctx
            .usecase
            .create(leave_input(UserId::new(), approvers.clone()))
            .await
            .unwrap();

        // 1 回目の承認でバージョンが 1 になる
        ctx.usecase
            .act(ApprovalActionInput {
                id:               request.id().clone(),
                actor:            member(&approvers[0]),
                action:           ApprovalAction::Approve { comments: None },
                expected_version: Version::initial(),
            })
            .await
            .unwrap();

        // 古いバージョンでの操作は競合
        let result = ctx
            .usecase
            .act(ApprovalActionInput {
                id:               request.id().clone(),
                actor:            member(&approvers[1]),
                action:           ApprovalAction::Approve { comments: None },
                expected_version: Version::initial(),
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_管理者は代理承認できない() {
        let now = fixed_now();
        let ctx = context(now);
        let request = ctx
            .usecase
            .create(leave_input(UserId::new(), vec![UserId::new()]))
            .await
            .unwrap();

        let result = ctx
            .usecase
            .act(ApprovalActionInput {
                id:               request.id().clone(),
                actor:            admin(),
                action:           ApprovalAction::Approve { comments: None },
                expected_version: Version::initial(),
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_管理者はステップを追加できる() {
        let now = fixed_now();
        let ctx = context(now);
        let inserted_approver = UserId::new();
        let request = ctx
            .usecase
            .create(leave_input(UserId::new(), vec![UserId::new()]))
            .await
            .unwrap();

        let updated = ctx
            .usecase
            .act(ApprovalActionInput {
                id:               request.id().clone(),
                actor:            admin(),
                action:           ApprovalAction::InsertStep {
                    step_name: "部長確認".to_string(),
                    approver:  inserted_approver.clone(),
                },
                expected_version: Version::initial(),
            })
            .await
            .unwrap();

        assert_eq!(updated.workflow().len(), 2);
        assert_eq!(updated.workflow()[1].step_name(), "部長確認");

        // 挿入されたステップの承認者にも割り当て通知が届く
        let sent = ctx.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[1],
            Notification::StepAssigned {
                recipient:  inserted_approver,
                request_id: request.id().clone(),
                step_name:  "部長確認".to_string(),
            }
        );
    }

    // === 一覧・削除 ===

    #[tokio::test]
    async fn test_自分の申請一覧はページングされる() {
        let now = fixed_now();
        let ctx = context(now);
        let requester = UserId::new();
        for _ in 0..3 {
            ctx.usecase
                .create(leave_input(requester.clone(), vec![UserId::new()]))
                .await
                .unwrap();
        }

        let (requests, total) = ctx
            .usecase
            .list_my(requester, Page::new(1, 2))
            .await
            .unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_承認待ち一覧は担当申請のみ返す() {
        let now = fixed_now();
        let ctx = context(now);
        let approver = UserId::new();
        ctx.usecase
            .create(leave_input(UserId::new(), vec![approver.clone()]))
            .await
            .unwrap();
        ctx.usecase
            .create(leave_input(UserId::new(), vec![UserId::new()]))
            .await
            .unwrap();

        let pending = ctx.usecase.list_pending(approver).await.unwrap();

        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_全申請一覧は管理者のみ閲覧できる() {
        let now = fixed_now();
        let ctx = context(now);
        ctx.usecase
            .create(leave_input(UserId::new(), vec![UserId::new()]))
            .await
            .unwrap();

        let result = ctx
            .usecase
            .list_all(member(&UserId::new()), Page::default())
            .await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));

        let (requests, total) = ctx.usecase.list_all(admin(), Page::default()).await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_一般ユーザーの申請削除はforbidden() {
        let now = fixed_now();
        let ctx = context(now);
        let requester = UserId::new();
        let request = ctx
            .usecase
            .create(leave_input(requester.clone(), vec![UserId::new()]))
            .await
            .unwrap();

        let result = ctx
            .usecase
            .delete(request.id().clone(), member(&requester))
            .await;

        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_管理者は申請を削除できる() {
        let now = fixed_now();
        let ctx = context(now);
        let request = ctx
            .usecase
            .create(leave_input(UserId::new(), vec![UserId::new()]))
            .await
            .unwrap();

        ctx.usecase
            .delete(request.id().clone(), admin())
            .await
            .unwrap();

        let result = ctx.usecase.get(request.id().clone()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(ctx
            .request_repo
            .find_by_id(request.id())
            .await
            .unwrap()
            .is_none());
    }
}
