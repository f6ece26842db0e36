//! # shinsei 共有ユーティリティ
//!
//! このクレートは、プロジェクト全体で使用される共通の
//! レスポンス型を提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なデータ型のみを配置
//! - 外部クレートへの依存は serde のみに抑える

pub mod api_response;
pub mod error_response;
pub mod health;
pub mod page_response;

pub use api_response::ApiResponse;
pub use error_response::{ErrorResponse, FieldErrorDetail};
pub use health::HealthResponse;
pub use page_response::PageResponse;
