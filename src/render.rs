//! Document Rendering
//! 商用/技術見積の印刷用 HTML を組み立て、データディレクトリへ書き出す。
//! ブラウザの印刷ダイアログ経由で PDF 化する前提のセルフコンテインドな
//! 1 ファイル HTML。

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::commercial::CommercialQuoteState;
use crate::conditions::Condition;
use crate::technical::{self, TechnicalQuoteData};
use crate::terms::TermsModel;

const STYLE: &str = "body{font-family:Arial,sans-serif;margin:24px;color:#222}\
h1{font-size:20px;border-bottom:2px solid #222;padding-bottom:6px}\
h2{font-size:15px;margin-top:24px}\
table{border-collapse:collapse;width:100%;margin-top:8px}\
th,td{border:1px solid #999;padding:6px 8px;font-size:12px;text-align:left}\
th{background:#f0f0f0}\
.meta{font-size:12px}\
.terms{font-size:12px;white-space:pre-wrap}\
.totals td{font-weight:bold}";

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page_head(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title>\
         <style>{}</style></head><body>",
        escape(title),
        STYLE
    )
}

/// 商用見積ドキュメント。ヘッダ、明細表、合計、取引条件、一般条件の順
pub fn commercial_document_html(
    quotation_number: &str,
    state: &CommercialQuoteState,
    terms: &TermsModel,
    conditions: &[Condition],
) -> String {
    let mut html = page_head(&format!("Commercial Quotation {}", quotation_number));
    html.push_str(&format!(
        "<h1>Commercial Quotation &mdash; {}</h1>",
        escape(quotation_number)
    ));

    html.push_str("<table class=\"meta\">");
    for (label, value) in [
        ("To", &state.to),
        ("Attn", &state.attn),
        ("Email", &state.email_to),
        ("Your Inquiry Ref", &state.your_inquiry_ref),
        ("Your Partner", &state.your_partner),
        ("Mobile No", &state.mobile_no),
        ("Fax No", &state.fax_no),
        ("Partner Email", &state.email_partner),
        ("Inquiry Date", &state.inquiry_date),
        ("Quotation Date", &state.quotation_date),
    ] {
        if !value.is_empty() {
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>",
                label,
                escape(value)
            ));
        }
    }
    html.push_str(&format!(
        "<tr><th>Pages</th><td>{}</td></tr></table>",
        state.pages
    ));

    html.push_str(
        "<h2>Items</h2><table><tr><th>Sr. No</th><th>Part Type</th><th>Description</th>\
         <th>Unit Price</th><th>Qty</th><th>Total</th></tr>",
    );
    for item in &state.items {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td><td>{:.2}</td></tr>",
            item.sr_no,
            escape(&item.part_type),
            escape(&item.description),
            item.unit_price,
            item.unit,
            item.total_price,
        ));
    }
    html.push_str(&format!(
        "<tr class=\"totals\"><td colspan=\"5\">Subtotal</td><td>{:.2}</td></tr></table>",
        state.subtotal()
    ));

    html.push_str("<h2>Terms &amp; Conditions</h2><div class=\"terms\">");
    html.push_str(&escape(&terms.encode()));
    html.push_str("</div>");

    html.push_str("<h2>General Conditions of Delivery and Payment</h2>");
    for condition in conditions {
        html.push_str(&format!(
            "<p class=\"terms\"><b>{}:</b> {}</p>",
            escape(&condition.title),
            escape(&condition.content)
        ));
    }

    html.push_str("</body></html>");
    html
}

/// 技術見積ドキュメント。要求ごとに顧客要求と技術フィールドを並べ、
/// 完了率を見出しに出す
pub fn technical_document_html(
    quotation_number: &str,
    customer_name: &str,
    sections: &[(String, TechnicalQuoteData)],
) -> String {
    let mut html = page_head(&format!("Technical Quotation {}", quotation_number));
    html.push_str(&format!(
        "<h1>Technical Quotation &mdash; {}</h1><p class=\"meta\">Customer: {}</p>",
        escape(quotation_number),
        escape(customer_name)
    ));

    for (part_type, data) in sections {
        let progress = technical::progress(part_type, &data.technical_fields);
        html.push_str(&format!(
            "<h2>{} ({}% complete)</h2>",
            escape(part_type),
            progress
        ));

        html.push_str("<table><tr><th colspan=\"2\">Customer Requirements</th></tr>");
        for (label, value) in &data.customer_requirements {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(label),
                escape(value)
            ));
        }
        html.push_str("<tr><th colspan=\"2\">Technical Data</th></tr>");
        for (label, value) in &data.technical_fields {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(label),
                escape(value)
            ));
        }
        html.push_str("</table>");
    }

    html.push_str("</body></html>");
    html
}

/// ドキュメントをデータディレクトリへ保存し、(ファイル名, フルパス) を返す
pub async fn write_document(
    data_dir: &Path,
    prefix: &str,
    html: &str,
) -> std::io::Result<(String, PathBuf)> {
    tokio::fs::create_dir_all(data_dir).await?;
    let filename = format!("{}_{}.html", prefix, Uuid::new_v4());
    let path = data_dir.join(&filename);
    tokio::fs::write(&path, html).await?;
    Ok((filename, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commercial::ItemField;
    use crate::conditions;
    use crate::requirements::Requirement;

    #[test]
    fn commercial_document_contains_items_and_terms() {
        let reqs = vec![Requirement {
            id: 1,
            part_type: "Brake Quotation".to_string(),
            field_values: Default::default(),
        }];
        let mut state = CommercialQuoteState::from_requirements(&reqs, "Acme");
        state.set_item_field(0, ItemField::UnitPrice, "100");
        state.set_item_field(0, ItemField::Unit, "2");

        let html = commercial_document_html(
            "RIPL/Q/2026/001",
            &state,
            &TermsModel::default(),
            &conditions::default_conditions(),
        );
        assert!(html.contains("RIPL/Q/2026/001"));
        assert!(html.contains("Customer: Acme - Products: Brake Quotation"));
        assert!(html.contains("200.00"));
        assert!(html.contains("1) Terms of Payment - 100% against Proforma Invoice"));
        assert!(html.contains("12. Validity"));
    }

    #[test]
    fn html_escapes_user_text() {
        let mut state = CommercialQuoteState::default();
        state.add_row();
        state.set_item_field(0, ItemField::Description, "<script>alert(1)</script>");
        let html = commercial_document_html(
            "Q-1",
            &state,
            &TermsModel::default(),
            &conditions::default_conditions(),
        );
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn technical_document_reports_progress_per_section() {
        let mut field_values = std::collections::BTreeMap::new();
        field_values.insert("Motor KW".to_string(), "55".to_string());
        let req = Requirement {
            id: 1,
            part_type: "Brake Quotation".to_string(),
            field_values,
        };
        let mut data = TechnicalQuoteData::load(&req, None);
        data.set_technical_field("Model", "DV 020");

        let html = technical_document_html(
            "Q-7",
            "Acme",
            &[("Brake Quotation".to_string(), data)],
        );
        assert!(html.contains("Brake Quotation (9% complete)"));
        assert!(html.contains("Motor KW"));
        assert!(html.contains("DV 020"));
    }

    #[tokio::test]
    async fn write_document_creates_unique_files() {
        let dir = tempfile::tempdir().unwrap();
        let (name_a, path_a) = write_document(dir.path(), "commercial", "<html>a</html>")
            .await
            .unwrap();
        let (name_b, _) = write_document(dir.path(), "commercial", "<html>b</html>")
            .await
            .unwrap();
        assert_ne!(name_a, name_b);
        assert_eq!(tokio::fs::read_to_string(path_a).await.unwrap(), "<html>a</html>");
    }
}
