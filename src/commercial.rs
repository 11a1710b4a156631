//! Commercial Quote Editor
//! 商用見積の明細テーブルとヘッダ。total_price は常に
//! unit_price * unit から導出され、単独で編集されることはない。

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::requirements::Requirement;

/// 明細 1 行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommercialLineItem {
    /// 1 始まりの連番。削除後も必ず 1..n で振り直す
    pub sr_no: i64,
    #[serde(default)]
    pub part_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit_price: f64,
    /// 数量
    #[serde(default)]
    pub unit: f64,
    #[serde(default)]
    pub total_price: f64,
}

impl CommercialLineItem {
    fn blank(sr_no: i64) -> Self {
        CommercialLineItem {
            sr_no,
            part_type: String::new(),
            description: String::new(),
            unit_price: 0.0,
            unit: 0.0,
            total_price: 0.0,
        }
    }
}

/// 編集対象フィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    PartType,
    Description,
    UnitPrice,
    Unit,
}

/// 商用見積の全体状態（ヘッダ + 明細）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommercialQuoteState {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub attn: String,
    #[serde(default)]
    pub email_to: String,
    #[serde(default)]
    pub your_inquiry_ref: String,
    #[serde(default = "default_pages")]
    pub pages: i64,
    #[serde(default)]
    pub your_partner: String,
    #[serde(default)]
    pub mobile_no: String,
    #[serde(default)]
    pub fax_no: String,
    #[serde(default)]
    pub email_partner: String,
    #[serde(default)]
    pub inquiry_date: String,
    #[serde(default)]
    pub quotation_date: String,
    #[serde(default)]
    pub items: Vec<CommercialLineItem>,
}

fn default_pages() -> i64 {
    1
}

impl CommercialQuoteState {
    /// 顧客要求から新規作成。要求 1 件につき明細 1 行。
    /// 要求が空のときは空行 2 行から始める（入力しやすさのための既定）。
    pub fn from_requirements(requirements: &[Requirement], customer_name: &str) -> Self {
        let mut items: Vec<CommercialLineItem> = requirements
            .iter()
            .enumerate()
            .map(|(idx, req)| {
                let part_type = if req.part_type.is_empty() { "N/A" } else { &req.part_type };
                CommercialLineItem {
                    sr_no: idx as i64 + 1,
                    part_type: part_type.to_string(),
                    description: format!(
                        "Customer: {} - Products: {}",
                        customer_name, part_type
                    ),
                    unit_price: 0.0,
                    unit: 0.0,
                    total_price: 0.0,
                }
            })
            .collect();

        if items.is_empty() {
            items.push(CommercialLineItem::blank(1));
            items.push(CommercialLineItem::blank(2));
        }

        CommercialQuoteState { items, ..Default::default() }
    }

    /// 明細フィールドを更新する。unit_price / unit の場合は同じ更新の中で
    /// total_price を再計算する（呼び出し側が省略できる別ステップにしない）。
    /// 数値フィールドの解釈不能な入力は 0 として扱う。
    pub fn set_item_field(&mut self, index: usize, field: ItemField, value: &str) {
        let Some(item) = self.items.get_mut(index) else {
            return;
        };
        match field {
            ItemField::PartType => item.part_type = value.to_string(),
            ItemField::Description => item.description = value.to_string(),
            ItemField::UnitPrice => {
                item.unit_price = value.trim().parse().unwrap_or(0.0);
                item.total_price = item.unit_price * item.unit;
            }
            ItemField::Unit => {
                item.unit = value.trim().parse().unwrap_or(0.0);
                item.total_price = item.unit_price * item.unit;
            }
        }
    }

    /// 空行を末尾に追加
    pub fn add_row(&mut self) {
        let sr_no = self.items.len() as i64 + 1;
        self.items.push(CommercialLineItem::blank(sr_no));
    }

    /// 選択行を削除し、sr_no を 1..n で振り直す。
    /// 選択が空のときは何も変更せずエラー
    pub fn delete_rows(&mut self, indices: &std::collections::BTreeSet<usize>) -> Result<(), AppError> {
        if indices.is_empty() {
            return Err(AppError::selection("Please select rows to delete"));
        }
        let mut kept: Vec<CommercialLineItem> = self
            .items
            .drain(..)
            .enumerate()
            .filter(|(idx, _)| !indices.contains(idx))
            .map(|(_, item)| item)
            .collect();
        for (idx, item) in kept.iter_mut().enumerate() {
            item.sr_no = idx as i64 + 1;
        }
        self.items = kept;
        Ok(())
    }

    /// 小計。キャッシュせず毎回合計する
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(|i| i.total_price).sum()
    }

    /// クライアントが送ってきた明細の不変条件を保存前に強制する。
    /// total_price の食い違いと sr_no の欠番をここで直す。
    pub fn recompute_totals(&mut self) {
        for (idx, item) in self.items.iter_mut().enumerate() {
            item.sr_no = idx as i64 + 1;
            item.total_price = item.unit_price * item.unit;
        }
    }
}
