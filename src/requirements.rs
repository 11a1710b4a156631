//! Requirement Editor
//! 顧客要求一覧の編集ロジック。一覧は常に 1 件以上を保つ。
//!
//! id はセッション内でのみ安定。`from_json` は配列位置から id を振り直すため、
//! リロードをまたぐ参照キーには部品タイプへのフォールバックを使うこと
//! （technical::quote_key を参照）。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AppError;

/// 顧客要求 1 件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    /// セッション内 id。旧データには無いことがある（0 = 欠落）
    #[serde(default)]
    pub id: i64,
    /// 部品タイプ。空 = 未選択
    #[serde(default, alias = "part_type", rename = "partType")]
    pub part_type: String,
    /// フィールドラベル → 入力値
    #[serde(default, rename = "fieldValues")]
    pub field_values: BTreeMap<String, String>,
}

impl Requirement {
    fn empty(id: i64) -> Self {
        Requirement { id, part_type: String::new(), field_values: BTreeMap::new() }
    }
}

/// 顧客要求の編集状態
#[derive(Debug, Clone)]
pub struct RequirementList {
    items: Vec<Requirement>,
}

impl Default for RequirementList {
    fn default() -> Self {
        Self::new()
    }
}

impl RequirementList {
    /// 空の要求 1 件から開始する
    pub fn new() -> Self {
        RequirementList { items: vec![Requirement::empty(1)] }
    }

    pub fn items(&self) -> &[Requirement] {
        &self.items
    }

    /// 新しい要求を追加。id は max + 1（削除後も再利用しない）
    pub fn add(&mut self) -> i64 {
        let id = self.items.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        self.items.push(Requirement::empty(id));
        id
    }

    /// 要求を削除。最後の 1 件は削除できない
    pub fn delete(&mut self, id: i64) -> Result<(), AppError> {
        if self.items.len() == 1 {
            return Err(AppError::selection("At least one requirement is needed"));
        }
        self.items.retain(|r| r.id != id);
        Ok(())
    }

    /// 部品タイプを変更し、入力済みの値をすべて破棄する。
    /// スキーマが替わった後に旧回答が残って見えてはならない。
    pub fn set_part_type(&mut self, id: i64, part_type: &str) {
        if let Some(req) = self.items.iter_mut().find(|r| r.id == id) {
            req.part_type = part_type.to_string();
            req.field_values.clear();
        }
    }

    /// フィールド値を upsert する。スキーマ照合はしない
    /// （旧データ由来の任意ラベルも保持する。描画側が現行スキーマ分だけ表示する）
    pub fn set_field_value(&mut self, id: i64, label: &str, value: &str) {
        if let Some(req) = self.items.iter_mut().find(|r| r.id == id) {
            req.field_values.insert(label.to_string(), value.to_string());
        }
    }

    /// 見積画面へ進む前のゲート。部品タイプ未選択の要求があれば失敗
    pub fn validate_all(&self) -> Result<(), AppError> {
        if self.items.iter().any(|r| r.part_type.is_empty()) {
            return Err(AppError::validation(
                "Please select a part type for all requirements",
            ));
        }
        Ok(())
    }

    /// 永続化形式（JSON 配列）へ
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.items)
    }

    /// 永続化形式から復元。id は配列位置（1 始まり）で振り直す
    pub fn from_json(json: &str) -> Self {
        let parsed: Vec<Requirement> = serde_json::from_str(json).unwrap_or_default();
        Self::from_items(parsed)
    }

    /// 要求列から復元。空なら初期状態に戻す
    pub fn from_items(items: Vec<Requirement>) -> Self {
        if items.is_empty() {
            return Self::new();
        }
        let items = items
            .into_iter()
            .enumerate()
            .map(|(idx, mut r)| {
                r.id = idx as i64 + 1;
                r
            })
            .collect();
        RequirementList { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_never_reused() {
        let mut list = RequirementList::new();
        list.add(); // 2
        list.add(); // 3
        list.delete(2).unwrap();
        list.add(); // 4
        let ids: Vec<i64> = list.items().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn last_requirement_cannot_be_deleted() {
        let mut list = RequirementList::new();
        let err = list.delete(1).unwrap_err();
        assert!(matches!(err, AppError::Selection(_)));
        assert_eq!(list.items().len(), 1);
    }

    #[test]
    fn changing_part_type_clears_values() {
        let mut list = RequirementList::new();
        list.set_part_type(1, "Brake Quotation");
        list.set_field_value(1, "Motor KW", "55");
        list.set_part_type(1, "Backstop Quotation");
        assert!(list.items()[0].field_values.is_empty());
        assert_eq!(list.items()[0].part_type, "Backstop Quotation");
    }

    #[test]
    fn validate_rejects_missing_part_type() {
        let mut list = RequirementList::new();
        assert!(list.validate_all().is_err());
        list.set_part_type(1, "Brake Quotation");
        assert!(list.validate_all().is_ok());
    }

    #[test]
    fn field_values_accept_labels_outside_schema() {
        let mut list = RequirementList::new();
        list.set_part_type(1, "Brake Quotation");
        list.set_field_value(1, "Legacy Field", "x");
        assert_eq!(list.items()[0].field_values["Legacy Field"], "x");
    }

    #[test]
    fn from_json_reassigns_sequential_ids() {
        let json = r#"[
            {"id": 7, "partType": "Brake Quotation", "fieldValues": {"Motor KW": "55"}},
            {"part_type": "Backstop Quotation"}
        ]"#;
        let list = RequirementList::from_json(json);
        let ids: Vec<i64> = list.items().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(list.items()[0].field_values["Motor KW"], "55");
        // 旧形式の part_type キーも受け付ける
        assert_eq!(list.items()[1].part_type, "Backstop Quotation");
    }

    #[test]
    fn from_json_on_garbage_falls_back_to_initial_state() {
        let list = RequirementList::from_json("not json");
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].id, 1);
    }

    #[test]
    fn round_trip_preserves_part_types_and_values() {
        let mut list = RequirementList::new();
        list.set_part_type(1, "Brake Quotation");
        list.set_field_value(1, "Application", "Conveyor drive");
        list.add();
        list.set_part_type(2, "Over Running Clutch Quotation");

        let json = list.to_json().unwrap();
        let restored = RequirementList::from_json(&json);
        assert_eq!(restored.items().len(), 2);
        assert_eq!(restored.items()[0].part_type, "Brake Quotation");
        assert_eq!(restored.items()[0].field_values["Application"], "Conveyor drive");
        assert_eq!(restored.items()[1].part_type, "Over Running Clutch Quotation");
    }
}
