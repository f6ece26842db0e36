//! # 申請ペイロード
//!
//! 申請種別ごとに型付けされたペイロードと、そのバリデーション。
//!
//! ## 設計方針
//!
//! - **二段階パース**: まず全フィールド `Option` の Raw 構造体に
//!   デシリアライズし、その後の検証で **失敗した全フィールドを収集** する。
//!   serde に直接必須フィールドを解決させると最初の欠落で打ち切られ、
//!   クライアントに全エラーを返せないため。
//! - **未知フィールド拒否**: `deny_unknown_fields` により、宣言した
//!   申請種別と食い違うペイロードはパース段階で弾かれる。
//! - **評価ペイロード**: 設問定義（[`AppraisalPeriod`]）に対する検証は
//!   マスタ取得が必要なため、パースとは別メソッドに分離している。

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    DomainError,
    appraisal::{AppraisalPeriod, AppraisalPeriodId, QuestionKind},
    error::FieldError,
};

/// 申請種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalRequestType {
    /// 休暇申請
    Leave,
    /// 経費申請
    Expense,
    /// 人事評価申請
    Appraisal,
    /// その他
    Other,
}

/// 申請種別ごとの型付きペイロード
///
/// `type` タグ付きで JSONB に永続化される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RequestPayload {
    Leave(LeavePayload),
    Expense(ExpensePayload),
    Appraisal(AppraisalPayload),
    Other(OtherPayload),
}

impl RequestPayload {
    /// ペイロードの申請種別を返す
    pub fn request_type(&self) -> ApprovalRequestType {
        match self {
            Self::Leave(_) => ApprovalRequestType::Leave,
            Self::Expense(_) => ApprovalRequestType::Expense,
            Self::Appraisal(_) => ApprovalRequestType::Appraisal,
            Self::Other(_) => ApprovalRequestType::Other,
        }
    }

    /// 申請種別に応じて生 JSON をパース・検証する
    ///
    /// 評価申請の設問回答の検証は設問定義の取得が必要なため、
    /// ここでは行わない（[`AppraisalPayload::validate_responses`] を参照）。
    ///
    /// # エラー
    ///
    /// - JSON の形式が不正（型不一致・未知フィールド）:
    ///   `DomainError::Validation`
    /// - 必須フィールドの欠落やビジネスルール違反:
    ///   `DomainError::FieldValidation`（失敗した全フィールドを収集）
    pub fn parse(
        request_type: ApprovalRequestType,
        value: &serde_json::Value,
    ) -> Result<Self, DomainError> {
        match request_type {
            ApprovalRequestType::Leave => LeavePayload::parse(value).map(Self::Leave),
            ApprovalRequestType::Expense => ExpensePayload::parse(value).map(Self::Expense),
            ApprovalRequestType::Appraisal => {
                AppraisalPayload::parse(value).map(Self::Appraisal)
            }
            ApprovalRequestType::Other => OtherPayload::parse(value).map(Self::Other),
        }
    }
}

/// Raw 構造体へのデシリアライズ（形式エラーの変換を共通化）
fn deserialize_raw<'de, T: Deserialize<'de>>(
    value: &'de serde_json::Value,
) -> Result<T, DomainError> {
    T::deserialize(value)
        .map_err(|e| DomainError::Validation(format!("ペイロードの形式が不正です: {}", e)))
}

/// 収集したフィールドエラーを結果に変換する
fn into_result<T>(value: T, errors: Vec<FieldError>) -> Result<T, DomainError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(DomainError::FieldValidation(errors))
    }
}

/// `Option<String>` の必須チェック（trim 後に空なら欠落扱い）
fn require_text(
    value: Option<&str>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            errors.push(FieldError::new(field, "必須です"));
            String::new()
        }
    }
}

// =========================================================================
// 休暇申請
// =========================================================================

/// 休暇申請ペイロード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LeavePayload {
    /// 休暇種別（有給・慶弔など。自由記述）
    pub leave_type: String,
    /// 開始日
    pub start_date: NaiveDate,
    /// 終了日（開始日以降）
    pub end_date:   NaiveDate,
    /// 理由
    pub reason:     String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawLeavePayload {
    leave_type: Option<String>,
    start_date: Option<NaiveDate>,
    end_date:   Option<NaiveDate>,
    reason:     Option<String>,
}

impl LeavePayload {
    fn parse(value: &serde_json::Value) -> Result<Self, DomainError> {
        let raw: RawLeavePayload = deserialize_raw(value)?;
        let mut errors = Vec::new();

        let leave_type = require_text(raw.leave_type.as_deref(), "leaveType", &mut errors);
        let reason = require_text(raw.reason.as_deref(), "reason", &mut errors);

        if raw.start_date.is_none() {
            errors.push(FieldError::new("startDate", "必須です"));
        }
        if raw.end_date.is_none() {
            errors.push(FieldError::new("endDate", "必須です"));
        }
        if let (Some(start), Some(end)) = (raw.start_date, raw.end_date)
            && start > end
        {
            errors.push(FieldError::new(
                "endDate",
                "終了日は開始日以降である必要があります",
            ));
        }

        into_result(
            Self {
                leave_type,
                start_date: raw.start_date.unwrap_or_default(),
                end_date: raw.end_date.unwrap_or_default(),
                reason,
            },
            errors,
        )
    }
}

// =========================================================================
// 経費申請
// =========================================================================

/// 経費申請ペイロード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExpensePayload {
    /// 金額（0 より大きい）
    pub amount:           Decimal,
    /// 通貨コード
    pub currency:         String,
    /// 領収書の参照（ファイルキー等）
    pub receipt:          String,
    /// 経費カテゴリ
    pub expense_category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawExpensePayload {
    amount:           Option<Decimal>,
    currency:         Option<String>,
    receipt:          Option<String>,
    expense_category: Option<String>,
}

impl ExpensePayload {
    fn parse(value: &serde_json::Value) -> Result<Self, DomainError> {
        let raw: RawExpensePayload = deserialize_raw(value)?;
        let mut errors = Vec::new();

        match raw.amount {
            None => errors.push(FieldError::new("amount", "必須です")),
            Some(amount) if amount <= Decimal::ZERO => {
                errors.push(FieldError::new("amount", "0 より大きい必要があります"));
            }
            Some(_) => {}
        }

        let currency = require_text(raw.currency.as_deref(), "currency", &mut errors);
        let receipt = require_text(raw.receipt.as_deref(), "receipt", &mut errors);
        let expense_category =
            require_text(raw.expense_category.as_deref(), "expenseCategory", &mut errors);

        into_result(
            Self {
                amount: raw.amount.unwrap_or_default(),
                currency,
                receipt,
                expense_category,
            },
            errors,
        )
    }
}

// =========================================================================
// 人事評価申請
// =========================================================================

/// 人事評価申請ペイロード
///
/// `responses` は設問 ID をキーとする回答のマップ。
/// 設問定義に対する検証は [`Self::validate_responses`] で行う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppraisalPayload {
    /// 評価期間 ID
    pub period_id: AppraisalPeriodId,
    /// 総評コメント
    pub comments:  String,
    /// 設問 ID → 回答
    pub responses: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawAppraisalPayload {
    period_id: Option<AppraisalPeriodId>,
    comments:  Option<String>,
    responses: Option<BTreeMap<String, String>>,
}

impl AppraisalPayload {
    fn parse(value: &serde_json::Value) -> Result<Self, DomainError> {
        let raw: RawAppraisalPayload = deserialize_raw(value)?;
        let mut errors = Vec::new();

        if raw.period_id.is_none() {
            errors.push(FieldError::new("periodId", "必須です"));
        }
        let comments = require_text(raw.comments.as_deref(), "comments", &mut errors);

        into_result(
            Self {
                period_id: raw.period_id.unwrap_or_default(),
                comments,
                responses: raw.responses.unwrap_or_default(),
            },
            errors,
        )
    }

    /// 設問定義に対して回答を検証する
    ///
    /// 失敗した全設問を収集する:
    /// - 必須設問に回答がない（または空文字）
    /// - Rating 回答が整数でない、または範囲外
    /// - MultipleChoice 回答が選択肢にない
    /// - 定義にない設問 ID への回答
    ///
    /// # エラー
    ///
    /// 1 件でも失敗があれば `DomainError::FieldValidation`
    /// （`field` は設問 ID）を返す。
    pub fn validate_responses(&self, period: &AppraisalPeriod) -> Result<(), DomainError> {
        let mut errors = Vec::new();

        for question in period.questions() {
            let response = self
                .responses
                .get(&question.id)
                .map(|r| r.trim())
                .filter(|r| !r.is_empty());

            let Some(response) = response else {
                if question.required {
                    errors.push(FieldError::new(&question.id, "回答は必須です"));
                }
                continue;
            };

            match &question.kind {
                QuestionKind::Rating { min, max } => match response.parse::<i64>() {
                    Ok(rating) if (*min..=*max).contains(&rating) => {}
                    Ok(_) => errors.push(FieldError::new(
                        &question.id,
                        format!("評価は {} 〜 {} の範囲で入力してください", min, max),
                    )),
                    Err(_) => errors.push(FieldError::new(
                        &question.id,
                        "評価は整数で入力してください",
                    )),
                },
                QuestionKind::MultipleChoice { options } => {
                    if !options.iter().any(|o| o == response) {
                        errors.push(FieldError::new(
                            &question.id,
                            "選択肢にない回答です",
                        ));
                    }
                }
                QuestionKind::Text => {}
            }
        }

        for question_id in self.responses.keys() {
            if period.find_question(question_id).is_none() {
                errors.push(FieldError::new(question_id, "定義されていない設問です"));
            }
        }

        into_result((), errors)
    }
}

// =========================================================================
// その他
// =========================================================================

/// その他申請ペイロード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OtherPayload {
    /// 申請内容の詳細
    pub details: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawOtherPayload {
    details: Option<String>,
}

impl OtherPayload {
    fn parse(value: &serde_json::Value) -> Result<Self, DomainError> {
        let raw: RawOtherPayload = deserialize_raw(value)?;
        let mut errors = Vec::new();

        let details = require_text(raw.details.as_deref(), "details", &mut errors);

        into_result(Self { details }, errors)
    }
}
