//! # shinsei-infra
//!
//! インフラストラクチャ層。DB 接続、リポジトリ実装、通知ポート、
//! テスト用モックを提供する。
//!
//! | モジュール        | 役割                                   |
//! |-------------------|----------------------------------------|
//! | [`db`]            | コネクションプールとマイグレーション   |
//! | [`error`]         | インフラ層のエラー型                   |
//! | [`repository`]    | PostgreSQL リポジトリ実装              |
//! | [`notification`]  | 承認通知ポート                         |
//! | [`mock`]          | テスト用インメモリ実装                 |

pub mod db;
pub mod error;
pub mod mock;
pub mod notification;
pub mod repository;

pub use error::InfraError;
