//! General Conditions Codec
//! 一般取引条件（タイトル + 本文の節リスト）とテキストブロブの相互変換。
//!
//! テキスト形式は「Title: Content」を空行区切りで並べたもの。デコードは
//! `<番号>. <タイトル>:` で始まる行を節境界とみなし、続く行を本文へ
//! 単一スペースで折り畳む。本文内の改行はここで失われる（既知の非可逆、
//! 保存済みデータとの互換のため仕様として維持）。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 節境界: "1. Offer and Conclusion of Contract:" のような行頭パターン
static CLAUSE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.\s+.+?):").expect("clause boundary regex"));

/// 一般条件の 1 節
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub title: String,
    pub content: String,
}

impl Condition {
    fn new(title: &str, content: &str) -> Self {
        Condition { title: title.to_string(), content: content.to_string() }
    }
}

/// 既定の 12 節を新しいコピーで返す。
/// 返り値は呼び出しごとに独立しており、変更しても他へ波及しない。
pub fn default_conditions() -> Vec<Condition> {
    vec![
        Condition::new(
            "1. Offer and Conclusion of Contract",
            "Only our offers and written confirmations will be decisive with respect to the \
             scope and type of products delivered. The contract shall be deemed to have been \
             concluded when we have accepted the order in writing; up to that time our \
             quotation is without obligation. Measures, weights, illustrations and drawings \
             are without obligation for the models, unless expressly confirmed by us in \
             writing. Manufacturing and detail drawings will be supplied by us only if agreed \
             upon before conclusion of the contract and confirmed by us in writing. An \
             appropriate extra charge will be levied for the supply of such drawings. Where \
             special tools and gauges or clamping devices are necessary in order to carry out \
             a special order, these will be invoiced additionally, but shall remain our \
             property after completion of the order.",
        ),
        Condition::new(
            "2. Terms of Delivery",
            "Prices quoted in our offer are EX Works Basis. All prices are excluding freight \
             and insurance.",
        ),
        Condition::new(
            "3. Terms of Payment",
            "The Terms of Payment as applicable is mentioned in our offer. If the terms of \
             payment laid down in the contract are not complied with, interest will be \
             charged at a rate of 8% above the discount rate. In case of complaints with \
             respect to products received, the customer is requested not suspend payment or \
             make any deductions from the invoiced amount, unless liability is admitted by \
             us.",
        ),
        Condition::new(
            "4. Retention of Title/Conditional Sale",
            "The products shall remain our property until payment has been made in full.",
        ),
        Condition::new(
            "5. Delivery",
            "The Delivery time is mentioned in our offer. The delivery period shall run from \
             the date on which all technical particulars of the models in questions have \
             been clarified and agreement has been reached between the parties with respect \
             to all details of the contract. In case of unforeseeable circumstances which \
             are beyond our control, i.e., force majeure, operating trouble, delayed \
             deliveries by a subcontractor, rejects in our own plant or at a subcontractor's \
             the delivery period shall be reasonably extended. We shall use our best efforts \
             to honour confirmed delivery dates, which are only approximate. However, if in \
             case of confirmed delivery dates there occurs a delay, an appropriate extension \
             of time shall be granted. Claims for damages or penalties are, therefore, \
             excluded unless its discussed in detail during the placement of the order on \
             us.",
        ),
        Condition::new(
            "6. Packing & Forwarding Charges",
            "Packing & Forwarding charge @2% shall be applicable on the Basic price of the \
             contract. In case of NIL P & F, then we shall adopt our standard packing method \
             for the dispatch.",
        ),
        Condition::new("7. Taxes", "GST shall be applicable as per the slab of HSN Code."),
        Condition::new(
            "8. Liability for Defects",
            "Deficiency claims have to be brought forward immediately upon receipt of the \
             shipment. We warrant the quality of our products in such a manner as to replace \
             or repair all components returned to us because they do not meet the \
             specifications or cannot be used because of defects in workmanship. We accept \
             liability only for defects in design or execution which have been caused by us. \
             For defects in material supplied by us we accept liability only insofar as we \
             should have discovered the deficiency in exercising due diligence. If we are \
             responsible for the technical design, we will accept a deficiency claim only in \
             case the customer can prove that our product does not meet the state of art due \
             to our fault. We are not liable for damages due to normal wear and tear or \
             misuse of the products supplied. Any further claims, such as compensation for \
             direct or indirect damages to machinery or cost incurred in dismantling an \
             assembly work, freight charges or penalties for delay etc. are not covered. \
             Where products have been repaired, altered or overhauled without our consent \
             our liability ceases.",
        ),
        Condition::new(
            "9. Warranty",
            "Unless otherwise agreed, we warrant the quality of design and manufacture \
             utilizing good raw material for a period of 12 months from the date of \
             commissioning or 18 months from the date of shipment, whichever is earlier, in \
             such a way that we replace or repair free of charge defective components which \
             have been returned to us.",
        ),
        Condition::new(
            "10. Cancellation of Contract",
            "The customer may cancel the contract only if, upon a reasonable extension of \
             time we have failed to remedy a deficiency or if, in such case, we are, for \
             whatever reason, unable to undertake necessary corrections or to supply a \
             replacement part. In the event that the contract should be cancelled by the \
             customer without our fault, the customer shall reimburse to us, without delay, \
             the invoice value of such contract after deduction of the direct costs saved by \
             us as a result of the cancellation.",
        ),
        Condition::new(
            "11. Purchasing Conditions of Customer",
            "Purchasing conditions of the customer which are not in compliance with these \
             General Conditions of Delivery and Payment, must be accepted by us in writing \
             in order to be binding. The other provisions of these conditions remain in full \
             force and effect.",
        ),
        Condition::new(
            "12. Validity",
            "The Validity of this offer is for a period of 30 days from the date of this \
             offer and shall be extended subjected to mutual acceptance.",
        ),
    ]
}

/// 節リスト → テキストブロブ
pub fn encode(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(|c| format!("{}: {}", c.title, c.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// テキストブロブ → 節リスト。
/// 1 節も取れなかった場合（空文字列・境界行なし）は既定セットを返す。
/// 空のリストを返すことはない。
pub fn decode(text: &str) -> Vec<Condition> {
    let mut parsed: Vec<Condition> = Vec::new();
    let mut current: Option<Condition> = None;

    for line in text.lines() {
        if let Some(caps) = CLAUSE_BOUNDARY.captures(line) {
            if let Some(prev) = current.take() {
                parsed.push(prev);
            }
            let matched_len = caps.get(0).map(|m| m.end()).unwrap_or(0);
            current = Some(Condition {
                title: caps[1].to_string(),
                content: line[matched_len..].trim().to_string(),
            });
        } else if let Some(cond) = current.as_mut() {
            if !line.trim().is_empty() {
                // 継続行は単一スペースで折り畳む（改行構造は失われる）
                cond.content.push(' ');
                cond.content.push_str(line.trim());
            }
        }
    }
    if let Some(last) = current.take() {
        parsed.push(last);
    }

    if parsed.is_empty() {
        default_conditions()
    } else {
        parsed
    }
}
