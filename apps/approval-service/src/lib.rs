//! # Approval Service ライブラリ
//!
//! Approval Service のユースケースとハンドラを公開する。

pub mod error;
pub mod handler;
pub mod usecase;
