//! # 変更申請ユースケース
//!
//! 変更申請の作成・照会・承認操作と、論理削除ライフサイクル
//! （削除・復元・完全削除）を実装する。

use std::sync::Arc;

use shinsei_domain::{
    approval::{
        ChangeRequest, ChangeRequestAction, ChangeRequestId, NewChangeRequest, build_workflow,
    },
    clock::Clock,
    user::{Actor, UserId},
    value_objects::{ChangeRequestTitle, RequestDetails, Version},
};
use shinsei_infra::repository::ChangeRequestRepository;

use crate::{error::ServiceError, usecase::helpers::FindResultExt};

/// 変更申請作成の入力
pub struct CreateChangeRequestInput {
    pub requester: UserId,
    pub title:     String,
    pub details:   String,
    pub approvers: Vec<UserId>,
}

/// 変更申請への承認操作の入力
pub struct ChangeRequestActionInput {
    pub id:               ChangeRequestId,
    pub actor:            Actor,
    pub action:           ChangeRequestAction,
    pub expected_version: Version,
}

/// 変更申請ユースケース実装
pub struct ChangeRequestUseCaseImpl<R> {
    repo:  R,
    clock: Arc<dyn Clock>,
}

impl<R> ChangeRequestUseCaseImpl<R>
where
    R: ChangeRequestRepository,
{
    pub fn new(repo: R, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// 変更申請を作成する
    pub async fn create(
        &self,
        input: CreateChangeRequestInput,
    ) -> Result<ChangeRequest, ServiceError> {
        let request = ChangeRequest::new(NewChangeRequest {
            id: ChangeRequestId::new(),
            requester: input.requester,
            title: ChangeRequestTitle::new(input.title)?,
            details: RequestDetails::new(input.details)?,
            workflow: build_workflow(&input.approvers)?,
            now: self.clock.now(),
        })?;

        self.repo.insert(&request).await?;

        Ok(request)
    }

    /// 論理削除されていない変更申請の一覧を取得する（新しい順）
    pub async fn list_active(&self) -> Result<Vec<ChangeRequest>, ServiceError> {
        Ok(self.repo.find_active().await?)
    }

    /// 変更申請を取得する（論理削除済みは対象外）
    pub async fn get(&self, id: ChangeRequestId) -> Result<ChangeRequest, ServiceError> {
        self.repo.find_by_id(&id, false).await.or_not_found("変更申請")
    }

    /// 変更申請に承認操作を適用する
    pub async fn act(
        &self,
        input: ChangeRequestActionInput,
    ) -> Result<ChangeRequest, ServiceError> {
        let request = self
            .repo
            .find_by_id(&input.id, false)
            .await
            .or_not_found("変更申請")?;

        if request.version() != input.expected_version {
            return Err(ServiceError::Conflict(format!(
                "バージョンが一致しません: 期待 {}, 実際 {}",
                input.expected_version,
                request.version()
            )));
        }

        let updated = request.process_action(&input.actor, input.action, self.clock.now())?;

        self.repo
            .update_with_version_check(&updated, input.expected_version)
            .await?;

        Ok(updated)
    }

    /// 変更申請を論理削除する
    ///
    /// 管理者または申請者本人のみ。
    pub async fn soft_delete(
        &self,
        id: ChangeRequestId,
        actor: Actor,
    ) -> Result<ChangeRequest, ServiceError> {
        let request = self
            .repo
            .find_by_id(&id, false)
            .await
            .or_not_found("変更申請")?;
        let expected = request.version();

        let deleted = request.soft_deleted(&actor, self.clock.now())?;

        self.repo.update_with_version_check(&deleted, expected).await?;

        Ok(deleted)
    }

    /// 論理削除された変更申請を復元する
    ///
    /// 管理者または申請者本人のみ。
    pub async fn restore(
        &self,
        id: ChangeRequestId,
        actor: Actor,
    ) -> Result<ChangeRequest, ServiceError> {
        let request = self
            .repo
            .find_by_id(&id, true)
            .await
            .or_not_found("変更申請")?;
        let expected = request.version();

        let restored = request.restored(&actor, self.clock.now())?;

        self.repo.update_with_version_check(&restored, expected).await?;

        Ok(restored)
    }

    /// 変更申請を完全削除する
    ///
    /// 管理者のみ。論理削除済みの申請のみ対象。
    pub async fn delete_permanently(
        &self,
        id: ChangeRequestId,
        actor: Actor,
    ) -> Result<(), ServiceError> {
        if !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "変更申請を完全削除する権限がありません".to_string(),
            ));
        }

        let request = self
            .repo
            .find_by_id(&id, true)
            .await
            .or_not_found("変更申請")?;

        if !request.is_deleted() {
            return Err(ServiceError::Conflict(
                "論理削除されていない変更申請は完全削除できません".to_string(),
            ));
        }

        let deleted = self.repo.delete_permanently(&id).await?;
        if !deleted {
            return Err(ServiceError::NotFound(
                "変更申請が見つかりません".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use shinsei_domain::{approval::OverallStatus, clock::FixedClock, user::Role};
    use shinsei_infra::mock::MockChangeRequestRepository;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    struct TestContext {
        usecase: ChangeRequestUseCaseImpl<MockChangeRequestRepository>,
        repo:    MockChangeRequestRepository,
    }

    fn context() -> TestContext {
        let repo = MockChangeRequestRepository::new();
        let usecase =
            ChangeRequestUseCaseImpl::new(repo.clone(), Arc::new(FixedClock::new(fixed_now())));
        TestContext { usecase, repo }
    }

    fn input(requester: UserId, approvers: Vec<UserId>) -> CreateChangeRequestInput {
        CreateChangeRequestInput {
            requester,
            title: "承認ルートの変更".to_string(),
            details: "経費申請の承認ルートに経理部を追加する".to_string(),
            approvers,
        }
    }

    fn member(user_id: &UserId) -> Actor {
        Actor::new(user_id.clone(), Role::Member)
    }

    fn admin() -> Actor {
        Actor::new(UserId::new(), Role::Admin)
    }

    // === 作成・承認 ===

    #[tokio::test]
    async fn test_作成した変更申請はpendingで保存される() {
        let ctx = context();
        let approver = UserId::new();

        let request = ctx
            .usecase
            .create(input(UserId::new(), vec![approver.clone()]))
            .await
            .unwrap();

        assert_eq!(request.overall_status(), OverallStatus::Pending);
        assert_eq!(request.current_approver(), Some(&approver));
        assert_eq!(ctx.usecase.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_タイトルが空の場合はbad_request() {
        let ctx = context();

        let result = ctx
            .usecase
            .create(CreateChangeRequestInput {
                requester: UserId::new(),
                title:     "  ".to_string(),
                details:   "詳細".to_string(),
                approvers: vec![UserId::new()],
            })
            .await;

        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_却下で後続ステップがスキップされる() {
        let ctx = context();
        let approvers = vec![UserId::new(), UserId::new()];
        let request = ctx
            .usecase
            .create(input(UserId::new(), approvers.clone()))
            .await
            .unwrap();

        let updated = ctx
            .usecase
            .act(ChangeRequestActionInput {
                id:               request.id().clone(),
                actor:            member(&approvers[0]),
                action:           ChangeRequestAction::Reject { comments: None },
                expected_version: Version::initial(),
            })
            .await
            .unwrap();

        assert_eq!(updated.overall_status(), OverallStatus::Rejected);
        assert_eq!(updated.current_approver(), None);
    }

    #[tokio::test]
    async fn test_バージョン不一致はconflict() {
        let ctx = context();
        let approvers = vec![UserId::new(), UserId::new()];
        let request = ctx
            .usecase
            .create(input(UserId::new(), approvers.clone()))
            .await
            .unwrap();

        ctx.usecase
            .act(ChangeRequestActionInput {
                id:               request.id().clone(),
                actor:            member(&approvers[0]),
                action:           ChangeRequestAction::Approve { comments: None },
                expected_version: Version::initial(),
            })
            .await
            .unwrap();

        let result = ctx
            .usecase
            .act(ChangeRequestActionInput {
                id:               request.id().clone(),
                actor:            member(&approvers[1]),
                action:           ChangeRequestAction::Approve { comments: None },
                expected_version: Version::initial(),
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    // === 論理削除ライフサイクル ===

    #[tokio::test]
    async fn test_論理削除後は取得と一覧の対象外になる() {
        let ctx = context();
        let requester = UserId::new();
        let request = ctx
            .usecase
            .create(input(requester.clone(), vec![UserId::new()]))
            .await
            .unwrap();

        let deleted = ctx
            .usecase
            .soft_delete(request.id().clone(), member(&requester))
            .await
            .unwrap();

        assert!(deleted.is_deleted());
        assert!(ctx.usecase.list_active().await.unwrap().is_empty());
        let result = ctx.usecase.get(request.id().clone()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_他人による論理削除はforbidden() {
        let ctx = context();
        let request = ctx
            .usecase
            .create(input(UserId::new(), vec![UserId::new()]))
            .await
            .unwrap();

        let result = ctx
            .usecase
            .soft_delete(request.id().clone(), member(&UserId::new()))
            .await;

        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_復元後は再び取得できる() {
        let ctx = context();
        let requester = UserId::new();
        let request = ctx
            .usecase
            .create(input(requester.clone(), vec![UserId::new()]))
            .await
            .unwrap();
        ctx.usecase
            .soft_delete(request.id().clone(), member(&requester))
            .await
            .unwrap();

        let restored = ctx
            .usecase
            .restore(request.id().clone(), admin())
            .await
            .unwrap();

        assert!(!restored.is_deleted());
        assert!(ctx.usecase.get(request.id().clone()).await.is_ok());
    }

    #[tokio::test]
    async fn test_削除されていない申請の復元はconflict() {
        let ctx = context();
        let request = ctx
            .usecase
            .create(input(UserId::new(), vec![UserId::new()]))
            .await
            .unwrap();

        let result = ctx.usecase.restore(request.id().clone(), admin()).await;

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_完全削除は管理者のみ() {
        let ctx = context();
        let requester = UserId::new();
        let request = ctx
            .usecase
            .create(input(requester.clone(), vec![UserId::new()]))
            .await
            .unwrap();
        ctx.usecase
            .soft_delete(request.id().clone(), member(&requester))
            .await
            .unwrap();

        let result = ctx
            .usecase
            .delete_permanently(request.id().clone(), member(&requester))
            .await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));

        ctx.usecase
            .delete_permanently(request.id().clone(), admin())
            .await
            .unwrap();
        assert!(ctx
            .repo
            .find_by_id(request.id(), true)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_論理削除されていない申請の完全削除はconflict() {
        let ctx = context();
        let request = ctx
            .usecase
            .create(input(UserId::new(), vec![UserId::new()]))
            .await
            .unwrap();

        let result = ctx
            .usecase
            .delete_permanently(request.id().clone(), admin())
            .await;

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_論理削除済みの申請への承認操作はnot_found() {
        let ctx = context();
        let requester = UserId::new();
        let approver = UserId::new();
        let request = ctx
            .usecase
            .create(input(requester.clone(), vec![approver.clone()]))
            .await
            .unwrap();
        ctx.usecase
            .soft_delete(request.id().clone(), member(&requester))
            .await
            .unwrap();

        let result = ctx
            .usecase
            .act(ChangeRequestActionInput {
                id:               request.id().clone(),
                actor:            member(&approver),
                action:           ChangeRequestAction::Approve { comments: None },
                expected_version: Version::new(1),
            })
            .await;

        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
