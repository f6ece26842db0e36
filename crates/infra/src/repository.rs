//! # リポジトリ実装
//!
//! 各エンティティの永続化操作を提供する。
//!
//! ## 設計方針
//!
//! - **トレイトによる抽象化**: ユースケース層はトレイトに依存し、
//!   テストではモック実装（[`crate::mock`]）に差し替える
//! - **楽観的ロック**: 更新は `version` カラムの CAS で保護する
//! - **JSONB 永続化**: ワークフローステップとペイロードは申請行の
//!   JSONB カラムに埋め込み、申請単位の更新を単一行の UPDATE にする

pub mod appraisal_period_repository;
pub mod approval_request_repository;
pub mod change_request_repository;

pub use appraisal_period_repository::{
    AppraisalPeriodRepository, PostgresAppraisalPeriodRepository,
};
pub use approval_request_repository::{
    ApprovalRequestRepository, PostgresApprovalRequestRepository,
};
pub use change_request_repository::{ChangeRequestRepository, PostgresChangeRequestRepository};

/// ページ指定（1 始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page:     u32,
    per_page: u32,
}

impl Page {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    /// ページ指定を作成する（範囲外の値はクランプ）
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page:     page.max(1),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// SQL の OFFSET 値
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    /// SQL の LIMIT 値
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PER_PAGE)
    }
}
