//! Technical Quote Editor
//! 要求 1 件ごとの技術フィールド入力と完了率の算出。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::requirements::Requirement;
use crate::schema;

/// 技術見積データ（要求 1 件分）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalQuoteData {
    /// 読み込み時点の顧客要求値のコピー。ここでの編集はローカルな作業コピーで、
    /// Requirement 側には書き戻さない
    #[serde(default)]
    pub customer_requirements: BTreeMap<String, String>,
    /// 技術フィールドラベル → 入力値
    #[serde(default)]
    pub technical_fields: BTreeMap<String, String>,
}

impl TechnicalQuoteData {
    /// 要求と保存済みデータから編集状態を作る。
    /// technical_fields は保存済みがあればそのまま、なければスキーマ全
    /// フィールドを空文字で初期化する。customer_requirements は常に要求の
    /// 現在値から取る（技術見積が古くても最新の顧客回答を映す）。
    pub fn load(requirement: &Requirement, existing: Option<&TechnicalQuoteData>) -> Self {
        let technical_fields = match existing {
            Some(quote) if !quote.technical_fields.is_empty() => quote.technical_fields.clone(),
            _ => schema::technical_fields(&requirement.part_type)
                .iter()
                .map(|f| (f.label.to_string(), String::new()))
                .collect(),
        };
        TechnicalQuoteData {
            customer_requirements: requirement.field_values.clone(),
            technical_fields,
        }
    }

    pub fn set_technical_field(&mut self, label: &str, value: &str) {
        self.technical_fields.insert(label.to_string(), value.to_string());
    }

    pub fn set_customer_requirement_field(&mut self, label: &str, value: &str) {
        self.customer_requirements.insert(label.to_string(), value.to_string());
    }
}

/// 完了率 (0–100)。分母はその部品タイプのスキーマ定義フィールド数。
/// フィールド定義の無い部品タイプは 0（エラーにしない）。
pub fn progress(part_type: &str, technical_fields: &BTreeMap<String, String>) -> u8 {
    let total = schema::technical_fields(part_type).len();
    if total == 0 {
        return 0;
    }
    let filled = technical_fields
        .values()
        .filter(|v| !v.trim().is_empty())
        .count();
    ((filled as f64 / total as f64) * 100.0).round() as u8
}

/// 保存・参照に使うキー。id があれば id 文字列、無ければ部品タイプ。
/// 保存時と参照時で同じフォールバックを使わないと、保存済みの見積を
/// 黙って取りこぼす。
pub fn quote_key(requirement: &Requirement) -> String {
    if requirement.id > 0 {
        requirement.id.to_string()
    } else {
        requirement.part_type.clone()
    }
}
