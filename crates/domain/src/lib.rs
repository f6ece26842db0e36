//! # shinsei-domain
//!
//! 承認ワークフローサービスのドメイン層。
//! 外部依存（DB・HTTP）を持たず、ビジネスルールのみを表現する。
//!
//! ## モジュール構成
//!
//! | モジュール | 責務 |
//! |-----------|------|
//! | [`approval`] | 申請ペイロード・ワークフローエンジン・申請エンティティ |
//! | [`appraisal`] | 評価期間と設問定義（ペイロード検証用マスタ） |
//! | [`user`] | 操作主体（ユーザー ID・ロール） |
//! | [`value_objects`] | バージョン番号などの共通値オブジェクト |
//! | [`clock`] | 時刻プロバイダの抽象化 |
//! | [`error`] | ドメインエラー定義 |

#[macro_use]
mod macros;

pub mod appraisal;
pub mod approval;
pub mod clock;
pub mod error;
pub mod user;
pub mod value_objects;

pub use error::{DomainError, FieldError};
