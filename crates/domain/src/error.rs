//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## 設計方針
//!
//! - **型による分類**: エラーの種類を列挙型で明示し、パターンマッチで処理可能に
//! - **thiserror 活用**: `#[error(...)]` マクロでエラーメッセージを自動生成
//! - **HTTP ステータスへのマッピング**: API 層でステータスコードに変換可能
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗（単一メッセージ） |
//! | `FieldValidation` | 400 Bad Request | ペイロード検証失敗（全フィールドを列挙） |
//! | `InvalidWorkflow` | 400 Bad Request | ワークフロー構築の失敗 |
//! | `NotFound` | 404 Not Found | エンティティが存在しない |
//! | `Conflict` | 409 Conflict | 楽観的ロックの失敗 |
//! | `InvalidTransition` | 409 Conflict | 現在の状態では許可されない操作 |
//! | `Forbidden` | 403 Forbidden | 権限不足 |
//!
//! ## 使用例
//!
//! ```rust
//! use shinsei_domain::DomainError;
//!
//! fn validate_details(details: &str) -> Result<(), DomainError> {
//!     if details.is_empty() {
//!         return Err(DomainError::Validation("申請内容は必須です".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// フィールド単位のバリデーションエラー
///
/// ペイロード検証は最初の失敗で打ち切らず、失敗した全フィールドを
/// `FieldError` のリストとして収集する。`field` にはペイロードの
/// フィールド名（評価の場合は設問 ID）を指定する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// 失敗したフィールド名（評価の場合は設問 ID）
    pub field:   String,
    /// 人間可読なエラーメッセージ
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field:   field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// ドメイン層で発生するエラー
///
/// ビジネスロジックの実行中に発生する例外状態を表現する。
/// API 層でこのエラーを受け取り、適切な HTTP レスポンスに変換する。
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー（単一メッセージ）
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    ///
    /// # 例
    ///
    /// - 必須フィールドが未入力
    /// - 文字数制限の超過
    /// - 不正なフォーマット
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// ペイロードのバリデーションエラー（全フィールド収集）
    ///
    /// 申請ペイロードの検証は最初の失敗で打ち切らず、
    /// 失敗した全フィールドをまとめて返す。
    #[error("入力値の検証に失敗しました: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    FieldValidation(Vec<FieldError>),

    /// ワークフロー構築エラー
    ///
    /// 承認者リストが空など、ワークフローとして成立しない定義を表す。
    #[error("ワークフローが不正です: {0}")]
    InvalidWorkflow(String),

    /// 状態遷移エラー
    ///
    /// 現在の状態では許可されない操作を表す。
    /// 完了済み（承認済み/却下済み）の申請への操作が典型例。
    #[error("この状態では操作できません: {0}")]
    InvalidTransition(String),

    /// エンティティが見つからない
    ///
    /// 指定された ID のエンティティがデータベースに存在しない場合に使用する。
    /// `entity_type` にはエンティティの種類（"ApprovalRequest" など）を指定し、
    /// エラーメッセージを具体的にする。
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"ApprovalRequest", "ChangeRequest" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 競合エラー（楽観的ロック失敗など）
    ///
    /// 同時更新による競合が発生した場合に使用する。
    /// このエラーが発生した場合、クライアントは最新データを再取得してから
    /// 再度更新を試みる必要がある。
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 権限エラー
    ///
    /// ユーザーに操作の実行権限がない場合に使用する。
    /// 認証（Authentication）ではなく認可（Authorization）の失敗を表す。
    #[error("権限がありません: {0}")]
    Forbidden(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_field_validation_は全フィールドをメッセージに含める() {
        let err = DomainError::FieldValidation(vec![
            FieldError::new("amount", "0 より大きい必要があります"),
            FieldError::new("currency", "必須です"),
        ]);

        let msg = err.to_string();

        assert!(msg.contains("amount: 0 より大きい必要があります"));
        assert!(msg.contains("currency: 必須です"));
    }

    #[test]
    fn test_not_found_のメッセージ形式() {
        let err = DomainError::NotFound {
            entity_type: "ApprovalRequest",
            id:          "abc".to_string(),
        };

        assert_eq!(err.to_string(), "ApprovalRequest が見つかりません: abc");
    }
}
