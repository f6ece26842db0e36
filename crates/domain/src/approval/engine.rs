//! # ステップ列エンジン
//!
//! 順次承認ワークフローの中核ロジック。ステップ列（`Vec<WorkflowStep>`）に
//! 対する操作をここに集約し、承認申請と変更申請で共有する。
//!
//! ## ルール
//!
//! - アクティブステップ = 最初の `Pending` ステップ
//! - 承認/却下はアクティブステップの担当承認者のみ（管理者でも代行不可）
//! - 却下時、後続の `Pending` ステップは全て `Skipped` になる
//! - 担当変更は管理者またはアクティブステップの担当承認者
//! - ステップ挿入は管理者のみ（末尾に追加）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::step::{WorkflowStep, WorkflowStepStatus};
use crate::{DomainError, user::Actor, user::UserId};

/// 申請全体のステータス（ステップ列から導出される）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OverallStatus {
    /// 処理中（未処理のステップが残っている）
    Pending,
    /// 全ステップ承認済み
    Approved,
    /// いずれかのステップで却下された
    Rejected,
}

/// 全体ステータスを導出する
///
/// 1 件でも `Rejected` があれば `Rejected`、
/// 全ステップが `Approved` なら `Approved`、それ以外は `Pending`。
pub(crate) fn overall_status(steps: &[WorkflowStep]) -> OverallStatus {
    if steps
        .iter()
        .any(|s| s.status() == WorkflowStepStatus::Rejected)
    {
        return OverallStatus::Rejected;
    }
    if steps
        .iter()
        .all(|s| s.status() == WorkflowStepStatus::Approved)
    {
        return OverallStatus::Approved;
    }
    OverallStatus::Pending
}

/// アクティブステップ（最初の `Pending` ステップ）の位置を返す
pub(crate) fn active_step_index(steps: &[WorkflowStep]) -> Option<usize> {
    steps
        .iter()
        .position(|s| s.status() == WorkflowStepStatus::Pending)
}

/// アクティブステップの位置を取得し、担当承認者を検証する
fn active_index_for(
    steps: &[WorkflowStep],
    actor: &Actor,
    action: &str,
) -> Result<usize, DomainError> {
    let index = active_step_index(steps).ok_or_else(|| {
        DomainError::InvalidTransition("処理可能なステップがありません".to_string())
    })?;

    if steps[index].approver() != &actor.user_id {
        return Err(DomainError::Forbidden(format!(
            "このステップを{}する権限がありません",
            action
        )));
    }
    Ok(index)
}

/// アクティブステップを承認する
pub(crate) fn approve_active(
    mut steps: Vec<WorkflowStep>,
    actor: &Actor,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> Result<Vec<WorkflowStep>, DomainError> {
    let index = active_index_for(&steps, actor, "承認")?;

    steps[index] = steps[index].clone().approved(comments, now);
    Ok(steps)
}

/// アクティブステップを却下し、後続の `Pending` ステップをスキップする
pub(crate) fn reject_active(
    mut steps: Vec<WorkflowStep>,
    actor: &Actor,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> Result<Vec<WorkflowStep>, DomainError> {
    let index = active_index_for(&steps, actor, "却下")?;

    steps[index] = steps[index].clone().rejected(comments, now);
    for step in steps.iter_mut().skip(index + 1) {
        if step.status() == WorkflowStepStatus::Pending {
            *step = step.clone().skipped(now)?;
        }
    }
    Ok(steps)
}

/// アクティブステップの担当承認者を差し替える
///
/// 管理者、またはアクティブステップの現担当者のみが実行できる。
pub(crate) fn reassign_active(
    mut steps: Vec<WorkflowStep>,
    actor: &Actor,
    new_approver: UserId,
) -> Result<Vec<WorkflowStep>, DomainError> {
    let index = active_step_index(&steps).ok_or_else(|| {
        DomainError::InvalidTransition("処理可能なステップがありません".to_string())
    })?;

    if !actor.is_admin() && steps[index].approver() != &actor.user_id {
        return Err(DomainError::Forbidden(
            "このステップの担当を変更する権限がありません".to_string(),
        ));
    }

    steps[index] = steps[index].clone().with_approver(new_approver);
    Ok(steps)
}

/// ワークフロー末尾に未処理ステップを追加する
///
/// 管理者のみ。ステップ名は空であってはならず、申請内で一意。
pub(crate) fn insert_step(
    mut steps: Vec<WorkflowStep>,
    actor: &Actor,
    step_name: String,
    approver: UserId,
) -> Result<Vec<WorkflowStep>, DomainError> {
    if !actor.is_admin() {
        return Err(DomainError::Forbidden(
            "ステップを追加する権限がありません".to_string(),
        ));
    }

    let step_name = step_name.trim().to_string();
    if step_name.is_empty() {
        return Err(DomainError::Validation(
            "ステップ名は必須です".to_string(),
        ));
    }
    if steps.iter().any(|s| s.step_name() == step_name) {
        return Err(DomainError::Validation(format!(
            "ステップ名が重複しています: {}",
            step_name
        )));
    }

    steps.push(WorkflowStep::new(step_name, approver));
    Ok(steps)
}

/// ステップ列の構造を検証する（構築・復元時の不変条件）
///
/// - 空であってはならない
/// - ステップ名は一意
/// - `Skipped` ステップは却下ステップなしには存在しない
pub(crate) fn validate_steps(steps: &[WorkflowStep]) -> Result<(), DomainError> {
    if steps.is_empty() {
        return Err(DomainError::InvalidWorkflow(
            "ワークフローには 1 件以上のステップが必要です".to_string(),
        ));
    }

    let mut seen = std::collections::BTreeSet::new();
    for step in steps {
        if !seen.insert(step.step_name()) {
            return Err(DomainError::InvalidWorkflow(format!(
                "ステップ名が重複しています: {}",
                step.step_name()
            )));
        }
    }

    let has_skipped = steps
        .iter()
        .any(|s| s.status() == WorkflowStepStatus::Skipped);
    let has_rejected = steps
        .iter()
        .any(|s| s.status() == WorkflowStepStatus::Rejected);
    if has_skipped && !has_rejected {
        return Err(DomainError::InvalidWorkflow(
            "却下ステップなしにスキップ済みステップは存在できません".to_string(),
        ));
    }

    Ok(())
}
