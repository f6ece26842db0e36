//! # 承認申請
//!
//! 申請ペイロード、ワークフローステップ、申請エンティティを管理する。
//!
//! ## 概念モデル
//!
//! - **RequestPayload**: 申請種別ごとに型付けされたペイロード
//! - **WorkflowStep**: 申請に埋め込まれる承認ステップ（値オブジェクト）
//! - **ApprovalRequest**: 申請本体とステップ列をまとめた集約
//! - **ChangeRequest**: 同じエンジンを使う変更申請（論理削除つき）
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use shinsei_domain::approval::{
//!     ApprovalRequest, ApprovalRequestId, NewApprovalRequest, OverallStatus,
//!     RequestPayload, OtherPayload, build_workflow,
//! };
//! use shinsei_domain::{user::UserId, value_objects::RequestDetails};
//!
//! let request = ApprovalRequest::new(NewApprovalRequest {
//!     id: ApprovalRequestId::new(),
//!     requester: UserId::new(),
//!     details: RequestDetails::new("備品購入")?,
//!     payload: RequestPayload::Other(OtherPayload {
//!         details: "モニターの購入".to_string(),
//!     }),
//!     workflow: build_workflow(&[UserId::new()])?,
//!     now: chrono::Utc::now(),
//! })?;
//! assert_eq!(request.overall_status(), OverallStatus::Pending);
//! # Ok(())
//! # }
//! ```

mod change_request;
mod engine;
mod payload;
mod request;
mod step;

pub use change_request::*;
pub use engine::OverallStatus;
pub use payload::*;
pub use request::*;
pub use step::*;
