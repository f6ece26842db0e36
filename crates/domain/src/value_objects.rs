//! # 共通値オブジェクト
//!
//! 複数のエンティティで共有される値オブジェクトを定義する。
//!
//! ## 設計方針
//!
//! - **Newtype パターン**: プリミティブ型をラップし、型安全性を確保
//! - **バリデーション**: 生成時に検証し、不正な値の存在を型レベルで排除
//! - **不変性**: 一度作成したら変更不可
//!
//! ## 含まれる型
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`Version`] | `u32` | エンティティのバージョン番号（楽観的ロック） |
//! | [`RequestDetails`] | `String` | 申請の概要テキスト |
//! | [`ChangeRequestTitle`] | `String` | 変更申請のタイトル |

use serde::{Deserialize, Serialize};

use crate::DomainError;

// =========================================================================
// Version（バージョン番号）
// =========================================================================

/// バージョン番号（値オブジェクト）
///
/// 申請エンティティの楽観的ロックに使用。
/// 0 から始まり、状態を変更する操作が成功するたびにインクリメントされる。
///
/// # 使用例
///
/// ```rust
/// use shinsei_domain::value_objects::Version;
///
/// let v0 = Version::initial();
/// assert_eq!(v0.as_u32(), 0);
///
/// let v1 = v0.next();
/// assert_eq!(v1.as_u32(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u32);

impl Version {
    /// 初期バージョン（0）を作成する
    pub fn initial() -> Self {
        Self(0)
    }

    /// 指定した値からバージョンを作成する
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// 次のバージョンを返す
    ///
    /// # パニック
    ///
    /// u32 の最大値を超える場合はパニックする。
    /// 実運用では到達しない想定。
    pub fn next(&self) -> Self {
        Self(
            self.0
                .checked_add(1)
                .expect("バージョン番号がオーバーフローしました"),
        )
    }

    /// 内部の u32 値を取得する
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// i32 に変換する（DB 互換用）
    ///
    /// # パニック
    ///
    /// i32 の範囲を超える場合はパニックする。
    pub fn as_i32(&self) -> i32 {
        i32::try_from(self.0).expect("バージョン番号が i32 の範囲を超えています")
    }
}

impl TryFrom<i32> for Version {
    type Error = DomainError;

    /// i32 から Version への変換を試みる
    ///
    /// # エラー
    ///
    /// 値が負の場合は `DomainError::Validation` を返す。
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(DomainError::Validation(
                "バージョン番号は 0 以上である必要があります".to_string(),
            ));
        }
        Ok(Self(value as u32))
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// =========================================================================
// 文字列値オブジェクト
// =========================================================================

define_validated_string! {
    /// 申請の概要テキスト
    ///
    /// 申請一覧に表示される自由記述の概要。ペイロード本体とは別。
    pub struct RequestDetails {
        label: "申請内容",
        max_length: 2000,
    }
}

define_validated_string! {
    /// 変更申請のタイトル
    pub struct ChangeRequestTitle {
        label: "タイトル",
        max_length: 200,
    }
}
