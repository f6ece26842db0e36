//! # 承認通知ポート
//!
//! ステップ割り当てや申請完了をユーザーへ通知するためのポート。
//! 通知の失敗は業務処理を失敗させない（呼び出し側で警告ログに留める）。

use async_trait::async_trait;
use shinsei_domain::{
    approval::{ApprovalRequestId, OverallStatus},
    user::UserId,
};

use crate::error::InfraError;

/// 送信する通知の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// 承認ステップが割り当てられた
    StepAssigned {
        recipient:  UserId,
        request_id: ApprovalRequestId,
        step_name:  String,
    },
    /// 申請が完了した（承認または却下）
    RequestCompleted {
        recipient:  UserId,
        request_id: ApprovalRequestId,
        outcome:    OverallStatus,
    },
}

/// 承認通知トレイト
#[async_trait]
pub trait ApprovalNotifier: Send + Sync {
    /// 通知を送信する
    async fn notify(&self, notification: Notification) -> Result<(), InfraError>;
}

/// ログ出力のみ行う Notifier
///
/// メール等の送信基盤が未接続の環境で使用する。
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl NoopNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ApprovalNotifier for NoopNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), InfraError> {
        match &notification {
            Notification::StepAssigned {
                recipient,
                request_id,
                step_name,
            } => {
                tracing::info!(
                    recipient = %recipient,
                    request_id = %request_id,
                    step_name = %step_name,
                    "承認ステップ割り当て通知"
                );
            }
            Notification::RequestCompleted {
                recipient,
                request_id,
                outcome,
            } => {
                tracing::info!(
                    recipient = %recipient,
                    request_id = %request_id,
                    outcome = %outcome,
                    "申請完了通知"
                );
            }
        }
        Ok(())
    }
}
