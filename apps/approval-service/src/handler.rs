//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックはユースケースとドメイン層に委譲

pub mod approval;
pub mod change_request;
pub mod health;

pub use approval::{
    ApprovalState,
    act_on_approval,
    create_approval,
    delete_approval,
    get_approval,
    list_all_approvals,
    list_my_approvals,
    list_pending_approvals,
};
pub use change_request::{
    ChangeRequestState,
    act_on_change_request,
    create_change_request,
    get_change_request,
    list_change_requests,
    permanently_delete_change_request,
    restore_change_request,
    soft_delete_change_request,
};
pub use health::{health_check, readiness_check};
