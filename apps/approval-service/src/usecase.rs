//! # ユースケース層
//!
//! Approval Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリはジェネリクス、通知と時刻は
//!   `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースと
//!   ドメイン層に集約

pub(crate) mod helpers;

pub mod approval;
pub mod change_request;

pub use approval::{ApprovalActionInput, ApprovalUseCaseImpl, CreateApprovalInput};
pub use change_request::{
    ChangeRequestActionInput, ChangeRequestUseCaseImpl, CreateChangeRequestInput,
};
