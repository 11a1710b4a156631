//! API 統合テスト
//! ハンドラを直接呼び出し、インメモリ SQLite と一時ディレクトリで検証する。

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use quotation_server::analytics::AnalyticsFilters;
use quotation_server::commercial::ItemField;
use quotation_server::conditions;
use quotation_server::handlers::{analytics, auth, commercial, projects, technical};
use quotation_server::requirements::Requirement;
use quotation_server::technical::TechnicalQuoteData;
use quotation_server::terms::TermsModel;
use quotation_server::{db, AppConfig, AppState};

async fn test_state() -> (AppState, TempDir) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::create_schema(&pool).await.unwrap();

    let dir = TempDir::new().unwrap();
    let config = AppConfig {
        db_path: ":memory:".to_string(),
        data_dir: dir.path().to_path_buf(),
        bind_addr: "127.0.0.1:0".to_string(),
        email_domain: "example.com".to_string(),
    };
    (AppState::new(pool, config), dir)
}

async fn create_project(state: &AppState, number: &str, customer: &str) -> i64 {
    let Json(resp) = projects::create_project(
        State(state.clone()),
        Json(projects::CreateProjectRequest {
            quotation_number: number.to_string(),
            customer_name: customer.to_string(),
        }),
    )
    .await
    .unwrap();
    assert!(resp.success);
    resp.project.id
}

fn requirement(part_type: &str, field: (&str, &str)) -> Requirement {
    let mut field_values = std::collections::BTreeMap::new();
    field_values.insert(field.0.to_string(), field.1.to_string());
    Requirement { id: 0, part_type: part_type.to_string(), field_values }
}

async fn save_requirements(state: &AppState, project_id: i64, requirements: Vec<Requirement>) {
    projects::save_requirements(
        State(state.clone()),
        Path(project_id),
        Json(projects::RequirementsRequest { requirements }),
    )
    .await
    .unwrap();
}

// ========================================
// 認証
// ========================================

#[tokio::test]
async fn register_and_login_flow() {
    let (state, _dir) = test_state().await;

    auth::register(
        State(state.clone()),
        Json(auth::RegisterRequest {
            username: "asha".to_string(),
            email: "asha@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            full_name: Some("Asha Rao".to_string()),
            region: Some("West".to_string()),
        }),
    )
    .await
    .unwrap();

    // ユーザー名でもメールでもログインできる
    for identity in ["asha", "asha@example.com"] {
        let Json(resp) = auth::login(
            State(state.clone()),
            Json(auth::LoginRequest {
                username: identity.to_string(),
                password: "secret1".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(resp.success);
        assert_eq!(resp.user.username, "asha");
    }

    let err = auth::login(
        State(state.clone()),
        Json(auth::LoginRequest {
            username: "asha".to_string(),
            password: "wrong".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let (state, _dir) = test_state().await;

    let short = auth::register(
        State(state.clone()),
        Json(auth::RegisterRequest {
            username: "bo".to_string(),
            email: "bo@example.com".to_string(),
            password: "12345".to_string(),
            confirm_password: "12345".to_string(),
            full_name: None,
            region: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(short.0, StatusCode::BAD_REQUEST);

    let wrong_domain = auth::register(
        State(state.clone()),
        Json(auth::RegisterRequest {
            username: "bo".to_string(),
            email: "bo@gmail.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            full_name: None,
            region: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(wrong_domain.0, StatusCode::BAD_REQUEST);
    assert!(wrong_domain.1.error.contains("company email"));
}

#[tokio::test]
async fn duplicate_registration_is_blocked() {
    let (state, _dir) = test_state().await;
    let payload = || auth::RegisterRequest {
        username: "asha".to_string(),
        email: "asha@example.com".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
        full_name: None,
        region: None,
    };
    auth::register(State(state.clone()), Json(payload())).await.unwrap();
    let err = auth::register(State(state.clone()), Json(payload())).await.unwrap_err();
    assert!(err.1.error.contains("already exists"));
}

// ========================================
// プロジェクト
// ========================================

#[tokio::test]
async fn quotation_number_is_unique() {
    let (state, _dir) = test_state().await;
    create_project(&state, "RIPL/Q/2026/001", "Acme Mining").await;

    let err = projects::create_project(
        State(state.clone()),
        Json(projects::CreateProjectRequest {
            quotation_number: "RIPL/Q/2026/001".to_string(),
            customer_name: "Other Corp".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
    assert!(err.1.error.contains("already exists"));

    let Json(check) = projects::check_quotation(
        State(state.clone()),
        Path("RIPL/Q/2026/001".to_string()),
    )
    .await
    .unwrap();
    assert!(check.exists);
}

#[tokio::test]
async fn requirements_round_trip_renumbers_ids() {
    let (state, _dir) = test_state().await;
    let id = create_project(&state, "Q-1", "Acme").await;

    save_requirements(
        &state,
        id,
        vec![
            requirement("Brake Quotation", ("Motor KW", "55")),
            requirement("Backstop Quotation", ("Conveyor Capacity Mt/hr", "1200")),
        ],
    )
    .await;

    let Json(resp) = projects::get_project(State(state.clone()), Path(id)).await.unwrap();
    let stored: Vec<Requirement> = serde_json::from_str(&resp.project.requirements_data).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, 1);
    assert_eq!(stored[1].id, 2);
    assert_eq!(stored[0].field_values["Motor KW"], "55");
}

#[tokio::test]
async fn project_list_supports_search_and_paging() {
    let (state, _dir) = test_state().await;
    for i in 1..=15 {
        create_project(&state, &format!("Q-{:03}", i), "Acme Mining").await;
    }
    create_project(&state, "Z-999", "Borealis Steel").await;

    let Json(page1) = projects::list_projects(
        State(state.clone()),
        Query(projects::ProjectListQuery { page: 1, page_size: 10, search: None }),
    )
    .await
    .unwrap();
    assert_eq!(page1.total, 16);
    assert_eq!(page1.projects.len(), 10);

    let Json(page2) = projects::list_projects(
        State(state.clone()),
        Query(projects::ProjectListQuery { page: 2, page_size: 10, search: None }),
    )
    .await
    .unwrap();
    assert_eq!(page2.projects.len(), 6);

    let Json(filtered) = projects::list_projects(
        State(state.clone()),
        Query(projects::ProjectListQuery {
            page: 1,
            page_size: 10,
            search: Some("Borealis".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(filtered.total, 1);
    assert_eq!(filtered.projects[0].quotation_number, "Z-999");
}

#[tokio::test]
async fn status_update_validates_value() {
    let (state, _dir) = test_state().await;
    let id = create_project(&state, "Q-1", "Acme").await;

    projects::update_status(
        State(state.clone()),
        Path(id),
        Json(projects::StatusRequest { quote_status: "Won".to_string() }),
    )
    .await
    .unwrap();

    let err = projects::update_status(
        State(state.clone()),
        Path(id),
        Json(projects::StatusRequest { quote_status: "Maybe".to_string() }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);

    let Json(resp) = projects::get_project(State(state.clone()), Path(id)).await.unwrap();
    assert_eq!(resp.project.quote_status, "Won");
}

#[tokio::test]
async fn customer_search_suggests_created_customers() {
    let (state, _dir) = test_state().await;
    create_project(&state, "Q-1", "Acme Mining").await;
    create_project(&state, "Q-2", "Acme Mining").await;
    create_project(&state, "Q-3", "Borealis Steel").await;

    let Json(resp) = projects::search_customers(
        State(state.clone()),
        Query(projects::CustomerSearchQuery { q: "acme".to_string() }),
    )
    .await
    .unwrap();
    // 同名プロジェクトが複数でも顧客は 1 件
    assert_eq!(resp.customers.len(), 1);
    assert_eq!(resp.customers[0].name, "Acme Mining");

    let Json(empty) = projects::search_customers(
        State(state.clone()),
        Query(projects::CustomerSearchQuery { q: "  ".to_string() }),
    )
    .await
    .unwrap();
    assert!(empty.customers.is_empty());
}

// ========================================
// 商用見積
// ========================================

#[tokio::test]
async fn commercial_quote_seeds_from_requirements_then_persists() {
    let (state, _dir) = test_state().await;
    let id = create_project(&state, "Q-1", "Acme Mining").await;
    save_requirements(&state, id, vec![requirement("Brake Quotation", ("Motor KW", "55"))])
        .await;

    let Json(seeded) = commercial::get_quote(
        State(state.clone()),
        Path("Q-1".to_string()),
    )
    .await
    .unwrap();
    assert!(!seeded.is_saved);
    assert_eq!(seeded.quote.items.len(), 1);
    assert_eq!(
        seeded.quote.items[0].description,
        "Customer: Acme Mining - Products: Brake Quotation"
    );

    let mut quote = seeded.quote;
    quote.set_item_field(0, ItemField::UnitPrice, "100");
    quote.set_item_field(0, ItemField::Unit, "2");

    let Json(saved) = commercial::save_quote(
        State(state.clone()),
        Path("Q-1".to_string()),
        Json(commercial::SaveQuoteRequest { quote, tax_rate: 0.18 }),
    )
    .await
    .unwrap();
    assert_eq!(saved.subtotal, 200.0);
    assert_eq!(saved.tax_amount, 36.0);
    assert_eq!(saved.total_amount, 236.0);

    let Json(reloaded) = commercial::get_quote(
        State(state.clone()),
        Path("Q-1".to_string()),
    )
    .await
    .unwrap();
    assert!(reloaded.is_saved);
    assert_eq!(reloaded.quote.items[0].total_price, 200.0);
    assert_eq!(reloaded.total_amount, 236.0);
}

#[tokio::test]
async fn commercial_quote_for_unknown_project_is_not_found() {
    let (state, _dir) = test_state().await;
    let err = commercial::get_quote(State(state.clone()), Path("NOPE".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn terms_default_then_round_trip_exactly() {
    let (state, _dir) = test_state().await;
    create_project(&state, "Q-1", "Acme").await;

    let Json(defaults) = commercial::get_terms(State(state.clone()), Path("Q-1".to_string()))
        .await
        .unwrap();
    assert_eq!(defaults.terms, TermsModel::default().encode());

    let mut model = TermsModel::default();
    model.payment = "50% Advance, 50% against Delivery".to_string();
    model.add_custom_term("Extended Warranty", "24 months");
    let expected = model.encode();

    commercial::save_terms(State(state.clone()), Path("Q-1".to_string()), Json(model))
        .await
        .unwrap();

    let Json(stored) = commercial::get_terms(State(state.clone()), Path("Q-1".to_string()))
        .await
        .unwrap();
    // 保存したブロブがそのまま返る
    assert_eq!(stored.terms, expected);
    assert_eq!(stored.model.custom_terms.len(), 1);
    assert_eq!(stored.model.custom_terms[0].title, "Extended Warranty");
}

#[tokio::test]
async fn conditions_default_then_round_trip() {
    let (state, _dir) = test_state().await;
    create_project(&state, "Q-1", "Acme").await;

    let Json(defaults) = commercial::get_conditions(State(state.clone()), Path("Q-1".to_string()))
        .await
        .unwrap();
    assert_eq!(defaults.conditions, conditions::default_conditions());

    let mut edited = defaults.conditions;
    edited[1].content = "Prices quoted are FOR destination.".to_string();

    commercial::save_conditions(
        State(state.clone()),
        Path("Q-1".to_string()),
        Json(commercial::ConditionsRequest { conditions: edited.clone() }),
    )
    .await
    .unwrap();

    let Json(stored) = commercial::get_conditions(State(state.clone()), Path("Q-1".to_string()))
        .await
        .unwrap();
    assert_eq!(stored.conditions, edited);
}

#[tokio::test]
async fn term_options_persist_added_entries() {
    let (state, _dir) = test_state().await;

    let Json(before) = commercial::get_term_options(State(state.clone())).await.unwrap();
    let base_count = before.options["payment"].len();

    commercial::add_term_option(
        State(state.clone()),
        Json(commercial::AddTermOptionRequest {
            field: "payment".to_string(),
            option: "30% Advance, 70% against Dispatch".to_string(),
        }),
    )
    .await
    .unwrap();
    // 重複追加は無視される
    commercial::add_term_option(
        State(state.clone()),
        Json(commercial::AddTermOptionRequest {
            field: "payment".to_string(),
            option: "30% Advance, 70% against Dispatch".to_string(),
        }),
    )
    .await
    .unwrap();

    let Json(after) = commercial::get_term_options(State(state.clone())).await.unwrap();
    assert_eq!(after.options["payment"].len(), base_count + 1);
    assert!(after.options["payment"]
        .iter()
        .any(|o| o == "30% Advance, 70% against Dispatch"));
}

#[tokio::test]
async fn commercial_document_is_written_to_data_dir() {
    let (state, dir) = test_state().await;
    let id = create_project(&state, "Q-1", "Acme").await;
    save_requirements(&state, id, vec![requirement("Brake Quotation", ("Motor KW", "55"))])
        .await;

    let Json(doc) = commercial::create_document(State(state.clone()), Path("Q-1".to_string()))
        .await
        .unwrap();
    assert!(doc.filename.starts_with("commercial_"));

    let html = std::fs::read_to_string(dir.path().join(&doc.filename)).unwrap();
    assert!(html.contains("Q-1"));
    assert!(html.contains("1) Terms of Payment - 100% against Proforma Invoice"));
}

// ========================================
// 技術見積
// ========================================

#[tokio::test]
async fn technical_quotes_save_and_reload_by_requirement_key() {
    let (state, _dir) = test_state().await;
    let id = create_project(&state, "Q-1", "Acme").await;
    save_requirements(&state, id, vec![requirement("Brake Quotation", ("Motor KW", "55"))])
        .await;

    let Json(initial) = technical::get_quotes(State(state.clone()), Path("Q-1".to_string()))
        .await
        .unwrap();
    assert_eq!(initial.quotes.len(), 1);
    assert_eq!(initial.quotes[0].requirement_key, "1");
    assert_eq!(initial.quotes[0].progress, 0);

    let mut data = TechnicalQuoteData::default();
    data.set_technical_field("Model", "DV 020");
    data.set_technical_field("Brake Torque", "4500 Nm");
    data.set_customer_requirement_field("Motor KW", "55");

    let Json(saved) = technical::save_quote(
        State(state.clone()),
        Path(("Q-1".to_string(), "1".to_string())),
        Json(technical::SaveTechnicalRequest {
            part_type: "Brake Quotation".to_string(),
            data,
        }),
    )
    .await
    .unwrap();
    // Brake は 11 フィールド、2 件入力 → round(200/11) = 18
    assert_eq!(saved.progress, 18);

    let Json(reloaded) = technical::get_quotes(State(state.clone()), Path("Q-1".to_string()))
        .await
        .unwrap();
    assert_eq!(reloaded.quotes[0].data.technical_fields["Model"], "DV 020");
    assert_eq!(reloaded.quotes[0].progress, 18);
}

#[tokio::test]
async fn technical_quote_falls_back_to_part_type_key() {
    let (state, _dir) = test_state().await;
    let id = create_project(&state, "Q-1", "Acme").await;
    save_requirements(&state, id, vec![requirement("Brake Quotation", ("Motor KW", "55"))])
        .await;

    // 旧データ相当: 部品タイプ文字列で保存されている
    let mut data = TechnicalQuoteData::default();
    data.set_technical_field("Model", "DV 030");
    technical::save_quote(
        State(state.clone()),
        Path(("Q-1".to_string(), "Brake Quotation".to_string())),
        Json(technical::SaveTechnicalRequest {
            part_type: "Brake Quotation".to_string(),
            data,
        }),
    )
    .await
    .unwrap();

    let Json(resp) = technical::get_quotes(State(state.clone()), Path("Q-1".to_string()))
        .await
        .unwrap();
    // 参照キーは id だが、保存済みの部品タイプキーを拾う
    assert_eq!(resp.quotes[0].requirement_key, "1");
    assert_eq!(resp.quotes[0].data.technical_fields["Model"], "DV 030");
}

#[tokio::test]
async fn deleting_project_removes_attached_quotes() {
    let (state, _dir) = test_state().await;
    let id = create_project(&state, "Q-1", "Acme").await;
    save_requirements(&state, id, vec![requirement("Brake Quotation", ("Motor KW", "55"))])
        .await;

    let Json(seeded) = commercial::get_quote(State(state.clone()), Path("Q-1".to_string()))
        .await
        .unwrap();
    commercial::save_quote(
        State(state.clone()),
        Path("Q-1".to_string()),
        Json(commercial::SaveQuoteRequest { quote: seeded.quote, tax_rate: 0.18 }),
    )
    .await
    .unwrap();

    projects::delete_project(State(state.clone()), Path(id)).await.unwrap();

    let err = commercial::get_quote(State(state.clone()), Path("Q-1".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM commercial_quotations WHERE quotation_number = 'Q-1'")
            .fetch_one(&state.db)
            .await
            .unwrap();
    assert_eq!(count, 0);
}

// ========================================
// 分析
// ========================================

async fn seed_quote(state: &AppState, number: &str, customer: &str, part_type: &str, price: f64, status: &str) {
    let id = create_project(state, number, customer).await;
    save_requirements(state, id, vec![requirement(part_type, ("Application", "test"))]).await;

    let Json(seeded) = commercial::get_quote(State(state.clone()), Path(number.to_string()))
        .await
        .unwrap();
    let mut quote = seeded.quote;
    quote.set_item_field(0, ItemField::UnitPrice, &price.to_string());
    quote.set_item_field(0, ItemField::Unit, "1");
    commercial::save_quote(
        State(state.clone()),
        Path(number.to_string()),
        Json(commercial::SaveQuoteRequest { quote, tax_rate: 0.0 }),
    )
    .await
    .unwrap();

    projects::update_status(
        State(state.clone()),
        Path(id),
        Json(projects::StatusRequest { quote_status: status.to_string() }),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn analytics_views_aggregate_saved_quotes() {
    let (state, _dir) = test_state().await;
    seed_quote(&state, "Q-1", "Acme", "Brake Quotation", 1000.0, "Won").await;
    seed_quote(&state, "Q-2", "Acme", "Brake Quotation", 500.0, "Lost").await;
    seed_quote(&state, "Q-3", "Borealis", "Backstop Quotation", 700.0, "Active").await;

    let Json(product) = analytics::product_view(
        State(state.clone()),
        Query(AnalyticsFilters::default()),
    )
    .await
    .unwrap();
    assert_eq!(product["success"], serde_json::json!(true));
    assert_eq!(product["data"]["kpis"]["total_quotes"]["value"], serde_json::json!(3));
    assert_eq!(
        product["data"]["kpis"]["most_quoted_product"]["value"],
        serde_json::json!("Brake Quotation")
    );

    let Json(finance) = analytics::finance_view(
        State(state.clone()),
        Query(AnalyticsFilters::default()),
    )
    .await
    .unwrap();
    assert_eq!(finance["data"]["kpis"]["won_revenue"]["value"], serde_json::json!(1000.0));
    assert_eq!(finance["data"]["kpis"]["win_rate"]["value"], serde_json::json!(50.0));

    let mut won_only = AnalyticsFilters::default();
    won_only.quote_status = "Won".to_string();
    let Json(customer) = analytics::customer_view(State(state.clone()), Query(won_only))
        .await
        .unwrap();
    assert_eq!(customer["data"]["kpis"]["total_quotes"]["value"], serde_json::json!(1));
    assert_eq!(customer["data"]["kpis"]["top_customer"]["value"], serde_json::json!("Acme"));
}

#[tokio::test]
async fn analytics_export_writes_csv() {
    let (state, dir) = test_state().await;
    seed_quote(&state, "Q-1", "Acme", "Brake Quotation", 1000.0, "Won").await;

    let Json(doc) = analytics::export(
        State(state.clone()),
        Query(analytics::ExportQuery {
            format: "csv".to_string(),
            filters: AnalyticsFilters::default(),
        }),
    )
    .await
    .unwrap();
    assert!(doc.filename.ends_with(".csv"));

    let csv = std::fs::read_to_string(dir.path().join(&doc.filename)).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("quotation_number,"));
    assert!(lines.next().unwrap().starts_with("Q-1,Acme,Won,Brake Quotation,1000"));
}
