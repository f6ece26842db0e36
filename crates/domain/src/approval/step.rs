//! # ワークフローステップ
//!
//! 申請に埋め込まれる承認ステップの値オブジェクトと、
//! 承認者リストからワークフローを組み立てるビルダー。
//!
//! ステップは申請エンティティの一部として JSONB に永続化されるため、
//! 独立した ID やバージョンは持たない。ステップ名が申請内で一意。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{DomainError, user::UserId};

/// ステップのステータス
///
/// 「アクティブ」は独立したステータスではなく、
/// ワークフロー内で最初の `Pending` ステップとして導出される。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowStepStatus {
    /// 未処理
    Pending,
    /// 承認済み
    Approved,
    /// 却下済み
    Rejected,
    /// スキップ（先行ステップの却下により処理不要になった）
    Skipped,
}

/// 承認ステップ
///
/// 状態遷移メソッドは自身を消費して新しいステップを返す。
/// `skipped` は `Pending` からのみ許可される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    step_name: String,
    approver:  UserId,
    status:    WorkflowStepStatus,
    comments:  Option<String>,
    acted_at:  Option<DateTime<Utc>>,
}

impl WorkflowStep {
    /// 未処理のステップを作成する
    pub fn new(step_name: impl Into<String>, approver: UserId) -> Self {
        Self {
            step_name: step_name.into(),
            approver,
            status: WorkflowStepStatus::Pending,
            comments: None,
            acted_at: None,
        }
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    pub fn approver(&self) -> &UserId {
        &self.approver
    }

    pub fn status(&self) -> WorkflowStepStatus {
        self.status
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    pub fn acted_at(&self) -> Option<DateTime<Utc>> {
        self.acted_at
    }

    /// 承認済みに遷移する
    pub(crate) fn approved(self, comments: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: WorkflowStepStatus::Approved,
            comments,
            acted_at: Some(now),
            ..self
        }
    }

    /// 却下済みに遷移する
    pub(crate) fn rejected(self, comments: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: WorkflowStepStatus::Rejected,
            comments,
            acted_at: Some(now),
            ..self
        }
    }

    /// スキップに遷移する
    ///
    /// # エラー
    ///
    /// `Pending` 以外からの遷移は `DomainError::InvalidTransition` を返す。
    pub(crate) fn skipped(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if self.status != WorkflowStepStatus::Pending {
            return Err(DomainError::InvalidTransition(format!(
                "スキップは未処理ステップでのみ可能です（現在: {}）",
                self.status
            )));
        }
        Ok(Self {
            status: WorkflowStepStatus::Skipped,
            acted_at: Some(now),
            ..self
        })
    }

    /// 担当承認者を差し替える
    pub(crate) fn with_approver(self, approver: UserId) -> Self {
        Self { approver, ..self }
    }
}

/// 承認者リストからワークフローを組み立てる
///
/// ステップ名は位置から `"Step 1"`, `"Step 2"`, ... と採番される。
/// 全ステップが `Pending` で開始する。
///
/// # エラー
///
/// 承認者リストが空の場合は `DomainError::InvalidWorkflow` を返す。
///
/// # 使用例
///
/// ```rust
/// use shinsei_domain::{approval::build_workflow, user::UserId};
///
/// let workflow = build_workflow(&[UserId::new(), UserId::new()]).unwrap();
/// assert_eq!(workflow.len(), 2);
/// assert_eq!(workflow[0].step_name(), "Step 1");
/// ```
pub fn build_workflow(approvers: &[UserId]) -> Result<Vec<WorkflowStep>, DomainError> {
    if approvers.is_empty() {
        return Err(DomainError::InvalidWorkflow(
            "承認者を 1 人以上指定する必要があります".to_string(),
        ));
    }

    Ok(approvers
        .iter()
        .enumerate()
        .map(|(i, approver)| WorkflowStep::new(format!("Step {}", i + 1), approver.clone()))
        .collect())
}
