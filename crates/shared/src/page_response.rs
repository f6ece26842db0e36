//! # ページネーション付きレスポンス
//!
//! ページ番号ベースのページネーションに対応した API レスポンス型。

use serde::{Deserialize, Serialize};

/// ページネーション付きレスポンス
///
/// `ApiResponse<T>` が単一データ用であるのに対し、
/// `PageResponse<T>` はリスト + ページ情報の形式。
///
/// ## JSON 形式
///
/// ```json
/// {
///   "data": [...],
///   "total": 42,
///   "page": 2,
///   "pages": 3
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub data:  Vec<T>,
    /// 条件に合致する全件数
    pub total: u64,
    /// 現在のページ番号（1 始まり）
    pub page:  u32,
    /// 総ページ数
    pub pages: u64,
}

impl<T> PageResponse<T> {
    /// ページレスポンスを作成する
    ///
    /// `pages` は `total` を `per_page` で切り上げ除算した値。
    pub fn new(data: Vec<T>, total: u64, page: u32, per_page: u32) -> Self {
        let pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(u64::from(per_page))
        };
        Self {
            data,
            total,
            page,
            pages,
        }
    }
}
