//! # Approval Service 設定
//!
//! 環境変数から Approval Service サーバーの設定を読み込む。

use std::env;

use anyhow::Context as _;

/// Approval Service サーバーの設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL
    pub database_url: String,
}

impl AppConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # エラー
    ///
    /// `APP_PORT` / `DATABASE_URL` が未設定、または `APP_PORT` が
    /// ポート番号としてパースできない場合はエラーを返す。
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("APP_PORT")
                .context("APP_PORT が設定されていません")?
                .parse()
                .context("APP_PORT は有効なポート番号である必要があります")?,
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL が設定されていません")?,
        })
    }
}
