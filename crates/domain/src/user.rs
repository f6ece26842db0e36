//! # ユーザー関連の型
//!
//! 本サービスは内部 API であり、認証は上流で完了している前提。
//! ここでは操作主体を識別するための最小限の型だけを持つ。

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

define_uuid_id! {
    /// ユーザー ID
    pub struct UserId;
}

/// ユーザーのロール
///
/// 管理者は申請の全件閲覧・ステップ挿入・削除系の操作が可能。
/// 承認そのものは担当承認者のみが行える（管理者でも代行不可）。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// 管理者
    Admin,
    /// 一般ユーザー
    Member,
}

/// 操作主体
///
/// ハンドラがリクエストから組み立て、ユースケース・ドメイン層へ渡す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role:    Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// 管理者かどうか
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
