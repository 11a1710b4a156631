//! Terms Text Codec
//! 取引条件（支払・価格ベース・税・納期など）と番号付きテキストの相互変換。
//!
//! テキスト形式は保存済みデータと PDF 入力の両方で使われているため、
//! 行レイアウトはビット単位で固定。1 行目だけ区切りが " - " である点、
//! 5) が見出し行で a)/b)/c) のサブ行を従える点に注意。

use serde::{Deserialize, Serialize};

/// 税区分（5) Taxes: のサブ行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Taxes {
    pub igst: String,
    pub cgst_sgst: String,
    pub ugst: String,
}

/// 任意追加条件（8 番以降）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTerm {
    /// セッション内で一意。表示番号は常に位置（8 + index）から決まる
    pub id: i64,
    pub title: String,
    pub description: String,
}

/// 取引条件の構造化表現
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsModel {
    pub payment: String,
    pub price_basis: String,
    pub pf_charges: String,
    pub insurance: String,
    pub taxes: Taxes,
    pub delivery_period: String,
    pub warranty: String,
    #[serde(default)]
    pub custom_terms: Vec<CustomTerm>,
}

impl Default for TermsModel {
    /// 社内標準の既定値
    fn default() -> Self {
        TermsModel {
            payment: "100% against Proforma Invoice".to_string(),
            price_basis: "Ex-Works Chakan, Pune Basis".to_string(),
            pf_charges: "2% Extra on the Basic Price".to_string(),
            insurance: "Shall be borne by you".to_string(),
            taxes: Taxes {
                igst: "I-GST is applicable for Out of Maharashtra".to_string(),
                cgst_sgst: "C-GST & S-GST is applicable within the State of Maharashtra"
                    .to_string(),
                ugst: "U-GST is applicable for Union Territory".to_string(),
            },
            delivery_period: "8 weeks from date of technically and commercially clear PO"
                .to_string(),
            warranty: "12 months from the date of commissioning or 18 months from the date of \
                       Invoice, whichever is earlier"
                .to_string(),
            custom_terms: Vec::new(),
        }
    }
}

impl TermsModel {
    /// 追加条件を末尾に足す。id は再利用しない
    pub fn add_custom_term(&mut self, title: &str, description: &str) -> i64 {
        let id = self.custom_terms.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        self.custom_terms.push(CustomTerm {
            id,
            title: title.to_string(),
            description: description.to_string(),
        });
        id
    }

    pub fn remove_custom_term(&mut self, id: i64) {
        self.custom_terms.retain(|t| t.id != id);
    }

    /// 番号付きテキストへ直列化する。
    /// title/description のどちらかが空白だけの追加条件は出力しない。
    /// 番号は位置（8 + index）のみから決まり、id とは無関係。
    pub fn encode(&self) -> String {
        let mut lines = vec![
            format!("1) Terms of Payment - {}", self.payment),
            format!("2) Price basis: {}", self.price_basis),
            format!("3) P&F Charges: {}", self.pf_charges),
            format!("4) Insurance: {}", self.insurance),
            "5) Taxes:".to_string(),
            format!("a) {}", self.taxes.igst),
            format!("b) {}", self.taxes.cgst_sgst),
            format!("c) {}", self.taxes.ugst),
            format!("6) Delivery Period: {}", self.delivery_period),
            format!("7) Warranty/Guarantee: {}", self.warranty),
        ];

        let printable = self
            .custom_terms
            .iter()
            .filter(|t| !t.title.trim().is_empty() && !t.description.trim().is_empty());
        for (idx, term) in printable.enumerate() {
            lines.push(format!("{}) {}: {}", 8 + idx, term.title, term.description));
        }

        lines.join("\n")
    }

    /// 番号付きテキストから復元する。
    /// 解釈できない行は黙って無視する（エラーにはしない）。
    /// 固定フィールドの判定順はレイアウト互換のため変更しないこと。
    pub fn decode(text: &str) -> Self {
        let mut model = TermsModel {
            payment: String::new(),
            price_basis: String::new(),
            pf_charges: String::new(),
            insurance: String::new(),
            taxes: Taxes::default(),
            delivery_period: String::new(),
            warranty: String::new(),
            custom_terms: Vec::new(),
        };
        let mut next_custom_id = 1;

        for line in text.lines() {
            // 8 番以降かつコロンを含む行は追加条件。固定フィールドの
            // キーワード（Warranty など）をタイトルに含んでいても
            // 追加条件として復元されなければならないので、先に判定する。
            if let Some((number, rest)) = split_numbered_line(line) {
                if number >= 8 {
                    if let Some((title, description)) = rest.split_once(':') {
                        model.custom_terms.push(CustomTerm {
                            id: next_custom_id,
                            title: title.trim().to_string(),
                            description: description.trim().to_string(),
                        });
                        next_custom_id += 1;
                    }
                    continue;
                }
            }

            if line.contains("Terms of Payment") {
                if let Some(v) = line.split(" - ").nth(1) {
                    model.payment = v.to_string();
                }
            } else if line.contains("Price basis:") {
                if let Some(v) = line.split(": ").nth(1) {
                    model.price_basis = v.to_string();
                }
            } else if line.contains("P&F Charges:") {
                if let Some(v) = line.split(": ").nth(1) {
                    model.pf_charges = v.to_string();
                }
            } else if line.contains("Insurance:") {
                if let Some(v) = line.split(": ").nth(1) {
                    model.insurance = v.to_string();
                }
            } else if line.starts_with("a)") {
                model.taxes.igst = line.get(3..).unwrap_or("").trim().to_string();
            } else if line.starts_with("b)") {
                model.taxes.cgst_sgst = line.get(3..).unwrap_or("").trim().to_string();
            } else if line.starts_with("c)") {
                model.taxes.ugst = line.get(3..).unwrap_or("").trim().to_string();
            } else if line.contains("Delivery Period:") {
                if let Some(v) = line.split(": ").nth(1) {
                    model.delivery_period = v.to_string();
                }
            } else if line.contains("Warranty") || line.contains("Guarantee") {
                if let Some(v) = line.split(": ").nth(1) {
                    model.warranty = v.to_string();
                }
            }
        }

        model
    }
}

/// `"12) 本文"` 形式の行を (12, " 本文") に分解する
fn split_numbered_line(line: &str) -> Option<(u32, &str)> {
    let digits_end = line.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 || !line[digits_end..].starts_with(')') {
        return None;
    }
    let number = line[..digits_end].parse().ok()?;
    Some((number, &line[digits_end + 1..]))
}
