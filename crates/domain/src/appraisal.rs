//! # 評価期間
//!
//! 人事評価申請（Appraisal）のペイロード検証に使う設問定義を持つ。
//! 評価期間はマスタデータであり、本サービスでは読み取りのみ。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DomainError;

define_uuid_id! {
    /// 評価期間 ID
    pub struct AppraisalPeriodId;
}

/// 設問の回答形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    /// 数値評価（`min` 〜 `max` の整数）
    Rating { min: i64, max: i64 },
    /// 選択式（`options` のいずれか）
    MultipleChoice { options: Vec<String> },
    /// 自由記述
    Text,
}

/// 評価設問
///
/// 回答は設問 ID をキーとする文字列で提出される。
/// `required` な設問に回答がない場合、ペイロード検証が失敗する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppraisalQuestion {
    /// 設問 ID（期間内で一意）
    pub id:       String,
    /// 設問文
    pub text:     String,
    /// 回答必須かどうか
    pub required: bool,
    /// 回答形式
    #[serde(flatten)]
    pub kind:     QuestionKind,
}

/// 評価期間エンティティ
///
/// 設問定義の集合。申請ペイロードはこの定義に対して検証される。
#[derive(Debug, Clone, PartialEq)]
pub struct AppraisalPeriod {
    id:         AppraisalPeriodId,
    name:       String,
    questions:  Vec<AppraisalQuestion>,
    created_at: DateTime<Utc>,
}

/// DB から復元するためのレコード
#[derive(Debug, Clone)]
pub struct AppraisalPeriodRecord {
    pub id:         AppraisalPeriodId,
    pub name:       String,
    pub questions:  Vec<AppraisalQuestion>,
    pub created_at: DateTime<Utc>,
}

impl AppraisalPeriod {
    /// DB レコードからエンティティを復元する
    ///
    /// # エラー
    ///
    /// 設問 ID が重複している場合は `DomainError::Validation` を返す。
    pub fn from_db(record: AppraisalPeriodRecord) -> Result<Self, DomainError> {
        let mut seen = std::collections::BTreeSet::new();
        for question in &record.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(DomainError::Validation(format!(
                    "設問 ID が重複しています: {}",
                    question.id
                )));
            }
        }

        Ok(Self {
            id:         record.id,
            name:       record.name,
            questions:  record.questions,
            created_at: record.created_at,
        })
    }

    pub fn id(&self) -> &AppraisalPeriodId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn questions(&self) -> &[AppraisalQuestion] {
        &self.questions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 設問 ID から設問を検索する
    pub fn find_question(&self, question_id: &str) -> Option<&AppraisalQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}
