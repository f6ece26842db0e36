//! ユースケース層の共通ヘルパー
//!
//! リポジトリ呼び出し結果の変換など、複数のユースケースで
//! 繰り返されるパターンを共通化する。

use shinsei_infra::InfraError;

use crate::error::ServiceError;

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, ServiceError>` に変換する
///
/// `find_by_id` 等の `Option` を返すリポジトリメソッドの結果を、
/// `ServiceError::NotFound` または `ServiceError::Internal` に変換する。
///
/// ```ignore
/// let request = self.request_repo.find_by_id(&id).await.or_not_found("承認申請")?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `ServiceError::NotFound`、`InfraError` の場合は
    /// `ServiceError::Internal` を返す
    fn or_not_found(self, entity_name: &str) -> Result<T, ServiceError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity_name: &str) -> Result<T, ServiceError> {
        self.map_err(|e| ServiceError::Internal(format!("{}の取得に失敗: {}", entity_name, e)))?
            .ok_or_else(|| ServiceError::NotFound(format!("{}が見つかりません", entity_name)))
    }
}
