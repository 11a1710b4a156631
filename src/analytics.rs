//! Analytics
//! フィルタ値オブジェクトと、見積履歴の集計ロジック。
//! 集計の入力は projects と commercial_quotations を結合した QuoteRecord 列で、
//! ハンドラが SQL で取得し、ここの純関数が KPI/チャート形状へ畳み込む。

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ========================================
// Filters
// ========================================

/// 日付プリセット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Mtd,
    Week,
    Month,
    Quarter,
    Ytd,
    Custom,
}

impl DateFilter {
    /// プリセットを今日基準の閉区間に解決する。All は None。
    /// Custom は start/end が両方あるときだけ区間になり、欠けていれば
    /// 日付フィルタなしに退化する。
    pub fn range(
        self,
        today: NaiveDate,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            DateFilter::All => None,
            DateFilter::Today => Some((today, today)),
            DateFilter::Mtd => Some((today.with_day(1).unwrap_or(today), today)),
            DateFilter::Week => Some((today - chrono::Duration::days(7), today)),
            DateFilter::Month => Some((today - chrono::Duration::days(30), today)),
            DateFilter::Quarter => Some((today - chrono::Duration::days(90), today)),
            DateFilter::Ytd => Some((
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                today,
            )),
            DateFilter::Custom => match (start, end) {
                (Some(s), Some(e)) => Some((s, e)),
                _ => None,
            },
        }
    }
}

/// 全ビュー共通のフィルタ。派生状態を持たない純粋な値
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyticsFilters {
    pub date_filter: DateFilter,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// all | Budgetary | Active | Won | Lost
    pub quote_status: String,
    /// all | 部品タイプ名
    pub product_type: String,
    /// all | 顧客名
    pub customer: String,
}

impl Default for AnalyticsFilters {
    fn default() -> Self {
        AnalyticsFilters {
            date_filter: DateFilter::All,
            start_date: None,
            end_date: None,
            quote_status: "all".to_string(),
            product_type: "all".to_string(),
            customer: "all".to_string(),
        }
    }
}

/// ドラフト編集 → 適用、のフィルタ保持。
/// apply はドラフトをアクティブに確定し、4 ビューすべての再取得を
/// 呼び出し側に要求する（true を返したときだけ再取得すればよい）。
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    active: AnalyticsFilters,
}

impl FilterState {
    pub fn active(&self) -> &AnalyticsFilters {
        &self.active
    }

    /// ドラフトを確定する。変化が無ければ false（再取得不要）
    pub fn apply(&mut self, draft: AnalyticsFilters) -> bool {
        if self.active == draft {
            return false;
        }
        self.active = draft;
        true
    }

    /// all/all/all の既定へ戻す
    pub fn reset(&mut self) {
        self.active = AnalyticsFilters::default();
    }
}

// ========================================
// Aggregation
// ========================================

/// 集計 1 件分（projects × commercial_quotations の結合結果）
#[derive(Debug, Clone)]
pub struct QuoteRecord {
    pub quotation_number: String,
    pub customer_name: String,
    /// Budgetary | Active | Won | Lost
    pub quote_status: String,
    /// プロジェクト先頭要求の部品タイプ（無ければ "Unknown"）
    pub product_type: String,
    pub total_amount: f64,
    pub created_at_ms: i64,
}

impl QuoteRecord {
    fn created_date(&self) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp_millis(self.created_at_ms).map(|dt| dt.date_naive())
    }

    fn is_won(&self) -> bool {
        self.quote_status.eq_ignore_ascii_case("won")
    }

    fn month_key(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.created_at_ms)
            .map(|dt| dt.format("%Y-%m").to_string())
            .unwrap_or_default()
    }
}

/// フィルタを全件に一様に適用する
pub fn apply_filters(
    records: &[QuoteRecord],
    filters: &AnalyticsFilters,
    today: NaiveDate,
) -> Vec<QuoteRecord> {
    let range = filters
        .date_filter
        .range(today, filters.start_date, filters.end_date);

    records
        .iter()
        .filter(|r| match range {
            Some((start, end)) => r
                .created_date()
                .map(|d| d >= start && d <= end)
                .unwrap_or(false),
            None => true,
        })
        .filter(|r| filters.quote_status == "all" || r.quote_status == filters.quote_status)
        .filter(|r| filters.customer == "all" || r.customer_name == filters.customer)
        .filter(|r| filters.product_type == "all" || r.product_type == filters.product_type)
        .cloned()
        .collect()
}

/// KPI 1 枚分
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Kpi {
    pub label: String,
    pub value: serde_json::Value,
    pub format_type: &'static str,
}

impl Kpi {
    fn number(label: &str, value: i64) -> Self {
        Kpi { label: label.to_string(), value: value.into(), format_type: "number" }
    }

    fn currency(label: &str, value: f64) -> Self {
        Kpi {
            label: label.to_string(),
            value: round2(value).into(),
            format_type: "currency",
        }
    }

    fn text(label: &str, value: &str) -> Self {
        Kpi { label: label.to_string(), value: value.into(), format_type: "text" }
    }

    fn percent(label: &str, value: f64) -> Self {
        Kpi {
            label: label.to_string(),
            value: round2(value).into(),
            format_type: "percent",
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductCount {
    pub product_type: String,
    pub quote_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevenueShare {
    pub product_type: String,
    pub revenue: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendPoint {
    pub period: String,
    pub counts: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusBreakdown {
    pub product_type: String,
    #[serde(rename = "Budgetary")]
    pub budgetary: i64,
    #[serde(rename = "Active")]
    pub active: i64,
    #[serde(rename = "Won")]
    pub won: i64,
    #[serde(rename = "Lost")]
    pub lost: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductPerformance {
    pub product_type: String,
    pub customer_count: i64,
    pub won_revenue: f64,
    pub percentage_of_total: f64,
}

/// 製品ビューの集計結果
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub kpis: BTreeMap<&'static str, Kpi>,
    pub product_quotes: Vec<ProductCount>,
    pub revenue_contribution: Vec<RevenueShare>,
    pub product_trend: Vec<TrendPoint>,
    pub status_breakdown: Vec<StatusBreakdown>,
    pub detailed_performance: Vec<ProductPerformance>,
}

/// 製品ビュー。won 売上の寄与率・月次トレンド・状態内訳を含む
pub fn product_summary(records: &[QuoteRecord]) -> ProductSummary {
    let total_quotes = records.len() as i64;
    let won: Vec<&QuoteRecord> = records.iter().filter(|r| r.is_won()).collect();
    let total_revenue: f64 = won.iter().map(|r| r.total_amount).sum();
    let total_value: f64 = records.iter().map(|r| r.total_amount).sum();
    let avg_value = if total_quotes > 0 { total_value / total_quotes as f64 } else { 0.0 };

    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
    for r in records {
        *counts.entry(r.product_type.as_str()).or_default() += 1;
    }
    let most_quoted = counts
        .iter()
        .max_by_key(|(_, &count)| count)
        .map(|(product, _)| product.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let mut product_quotes: Vec<ProductCount> = counts
        .iter()
        .map(|(product, &count)| ProductCount {
            product_type: product.to_string(),
            quote_count: count,
        })
        .collect();
    product_quotes.sort_by(|a, b| b.quote_count.cmp(&a.quote_count));

    // won 売上の製品別寄与
    let mut won_by_product: BTreeMap<&str, f64> = BTreeMap::new();
    for r in &won {
        *won_by_product.entry(r.product_type.as_str()).or_default() += r.total_amount;
    }
    let total_won: f64 = won_by_product.values().sum();
    let mut revenue_contribution: Vec<RevenueShare> = won_by_product
        .iter()
        .map(|(product, &revenue)| RevenueShare {
            product_type: product.to_string(),
            revenue: round2(revenue),
            percentage: if total_won > 0.0 { round2(revenue / total_won * 100.0) } else { 0.0 },
        })
        .collect();
    revenue_contribution.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

    // 月次トレンド
    let mut monthly: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    for r in records {
        let month = r.month_key();
        if month.is_empty() {
            continue;
        }
        *monthly
            .entry(month)
            .or_default()
            .entry(r.product_type.clone())
            .or_default() += 1;
    }
    let product_trend: Vec<TrendPoint> = monthly
        .into_iter()
        .map(|(period, counts)| TrendPoint { period, counts })
        .collect();

    // 状態内訳
    let mut breakdown: BTreeMap<&str, StatusBreakdown> = BTreeMap::new();
    for r in records {
        let entry = breakdown
            .entry(r.product_type.as_str())
            .or_insert_with(|| StatusBreakdown {
                product_type: r.product_type.clone(),
                budgetary: 0,
                active: 0,
                won: 0,
                lost: 0,
            });
        match r.quote_status.as_str() {
            "Budgetary" => entry.budgetary += 1,
            "Active" => entry.active += 1,
            "Won" => entry.won += 1,
            "Lost" => entry.lost += 1,
            _ => {}
        }
    }
    let status_breakdown: Vec<StatusBreakdown> = breakdown.into_values().collect();

    // 明細テーブル
    let mut performance: Vec<ProductPerformance> = Vec::new();
    for (product, _) in &counts {
        let of_product: Vec<&QuoteRecord> =
            records.iter().filter(|r| r.product_type == *product).collect();
        let mut customers: Vec<&str> =
            of_product.iter().map(|r| r.customer_name.as_str()).collect();
        customers.sort();
        customers.dedup();
        let won_revenue: f64 = of_product
            .iter()
            .filter(|r| r.is_won())
            .map(|r| r.total_amount)
            .sum();
        let product_value: f64 = of_product.iter().map(|r| r.total_amount).sum();
        performance.push(ProductPerformance {
            product_type: product.to_string(),
            customer_count: customers.len() as i64,
            won_revenue: round2(won_revenue),
            percentage_of_total: if total_value > 0.0 {
                round2(product_value / total_value * 100.0)
            } else {
                0.0
            },
        });
    }
    performance.sort_by(|a, b| b.won_revenue.total_cmp(&a.won_revenue));

    let mut kpis = BTreeMap::new();
    kpis.insert("total_quotes", Kpi::number("Total Quotes", total_quotes));
    kpis.insert("total_revenue", Kpi::currency("Total Revenue (Won)", total_revenue));
    kpis.insert("avg_quote_value", Kpi::currency("Average Quote Value", avg_value));
    kpis.insert("most_quoted_product", Kpi::text("Most Quoted Product", &most_quoted));
    kpis.insert("product_count", Kpi::number("Active Products", counts.len() as i64));

    ProductSummary {
        kpis,
        product_quotes,
        revenue_contribution,
        product_trend,
        status_breakdown,
        detailed_performance: performance,
    }
}

/// 財務ビューの集計結果
#[derive(Debug, Serialize)]
pub struct FinanceSummary {
    pub kpis: BTreeMap<&'static str, Kpi>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub status_values: Vec<StatusValue>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyRevenue {
    pub period: String,
    pub won_revenue: f64,
    pub quoted_value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusValue {
    pub quote_status: String,
    pub quote_count: i64,
    pub total_value: f64,
}

/// 財務ビュー。won 売上・勝率・パイプライン（Budgetary+Active）を出す
pub fn finance_summary(records: &[QuoteRecord]) -> FinanceSummary {
    let total_quotes = records.len() as i64;
    let won_revenue: f64 = records.iter().filter(|r| r.is_won()).map(|r| r.total_amount).sum();
    let won_count = records.iter().filter(|r| r.is_won()).count() as i64;
    let decided = records
        .iter()
        .filter(|r| r.is_won() || r.quote_status.eq_ignore_ascii_case("lost"))
        .count() as i64;
    let win_rate = if decided > 0 { won_count as f64 / decided as f64 * 100.0 } else { 0.0 };
    let pipeline: f64 = records
        .iter()
        .filter(|r| matches!(r.quote_status.as_str(), "Budgetary" | "Active"))
        .map(|r| r.total_amount)
        .sum();
    let quoted_value: f64 = records.iter().map(|r| r.total_amount).sum();

    let mut monthly: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for r in records {
        let month = r.month_key();
        if month.is_empty() {
            continue;
        }
        let entry = monthly.entry(month).or_default();
        entry.1 += r.total_amount;
        if r.is_won() {
            entry.0 += r.total_amount;
        }
    }
    let monthly_revenue: Vec<MonthlyRevenue> = monthly
        .into_iter()
        .map(|(period, (won, quoted))| MonthlyRevenue {
            period,
            won_revenue: round2(won),
            quoted_value: round2(quoted),
        })
        .collect();

    let mut by_status: BTreeMap<&str, (i64, f64)> = BTreeMap::new();
    for r in records {
        let entry = by_status.entry(r.quote_status.as_str()).or_default();
        entry.0 += 1;
        entry.1 += r.total_amount;
    }
    let status_values: Vec<StatusValue> = by_status
        .into_iter()
        .map(|(status, (count, value))| StatusValue {
            quote_status: status.to_string(),
            quote_count: count,
            total_value: round2(value),
        })
        .collect();

    let mut kpis = BTreeMap::new();
    kpis.insert("total_quotes", Kpi::number("Total Quotes", total_quotes));
    kpis.insert("total_quoted_value", Kpi::currency("Total Quoted Value", quoted_value));
    kpis.insert("won_revenue", Kpi::currency("Won Revenue", won_revenue));
    kpis.insert("pipeline_value", Kpi::currency("Pipeline Value", pipeline));
    kpis.insert("win_rate", Kpi::percent("Win Rate", win_rate));

    FinanceSummary { kpis, monthly_revenue, status_values }
}

/// 顧客ビューの集計結果
#[derive(Debug, Serialize)]
pub struct CustomerSummary {
    pub kpis: BTreeMap<&'static str, Kpi>,
    pub top_customers: Vec<CustomerStanding>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CustomerStanding {
    pub customer_name: String,
    pub quote_count: i64,
    pub won_revenue: f64,
    pub total_value: f64,
}

/// 顧客ビュー。顧客別の件数・won 売上の順位付け
pub fn customer_summary(records: &[QuoteRecord]) -> CustomerSummary {
    let mut by_customer: BTreeMap<&str, (i64, f64, f64)> = BTreeMap::new();
    for r in records {
        let entry = by_customer.entry(r.customer_name.as_str()).or_default();
        entry.0 += 1;
        entry.2 += r.total_amount;
        if r.is_won() {
            entry.1 += r.total_amount;
        }
    }

    let mut top_customers: Vec<CustomerStanding> = by_customer
        .iter()
        .map(|(name, &(count, won, total))| CustomerStanding {
            customer_name: name.to_string(),
            quote_count: count,
            won_revenue: round2(won),
            total_value: round2(total),
        })
        .collect();
    top_customers.sort_by(|a, b| b.won_revenue.total_cmp(&a.won_revenue));

    let top_name = top_customers
        .first()
        .map(|c| c.customer_name.clone())
        .unwrap_or_else(|| "N/A".to_string());

    let mut kpis = BTreeMap::new();
    kpis.insert("total_quotes", Kpi::number("Total Quotes", records.len() as i64));
    kpis.insert("customer_count", Kpi::number("Customers", by_customer.len() as i64));
    kpis.insert("top_customer", Kpi::text("Top Customer", &top_name));

    CustomerSummary { kpis, top_customers }
}

/// 横断ビュー。他ビューの見出し KPI をまとめる
pub fn combined_summary(records: &[QuoteRecord]) -> BTreeMap<&'static str, Kpi> {
    let product = product_summary(records);
    let finance = finance_summary(records);
    let customer = customer_summary(records);

    let mut kpis = BTreeMap::new();
    kpis.insert("total_quotes", Kpi::number("Total Quotes", records.len() as i64));
    if let Some(kpi) = finance.kpis.get("won_revenue") {
        kpis.insert("won_revenue", kpi.clone());
    }
    if let Some(kpi) = finance.kpis.get("win_rate") {
        kpis.insert("win_rate", kpi.clone());
    }
    if let Some(kpi) = product.kpis.get("most_quoted_product") {
        kpis.insert("most_quoted_product", kpi.clone());
    }
    if let Some(kpi) = customer.kpis.get("top_customer") {
        kpis.insert("top_customer", kpi.clone());
    }
    kpis
}

/// エクスポート用 CSV（ヘッダ付き）。カンマ・引用符・改行はクォートする
pub fn to_csv(records: &[QuoteRecord]) -> String {
    let mut out = String::from(
        "quotation_number,customer_name,quote_status,product_type,total_amount,created\n",
    );
    for r in records {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_field(&r.quotation_number),
            csv_field(&r.customer_name),
            csv_field(&r.quote_status),
            csv_field(&r.product_type),
            r.total_amount,
            crate::models::format_date(r.created_at_ms),
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
