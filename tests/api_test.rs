use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};

use finance_api::{
    auth::{PublicUser, TokenResponse},
    build_app,
    transactions::TransactionResponse,
    AppState,
};

fn server() -> TestServer {
    TestServer::new(build_app(AppState::fake())).expect("Could not create test server.")
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

async fn register(server: &TestServer, email: &str, username: &str) -> TestResponse {
    server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": email, "username": username, "password": "pw12345678" }))
        .await
}

async fn login(server: &TestServer, email: &str, password: &str) -> TestResponse {
    server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .await
}

async fn signed_in(server: &TestServer, email: &str, username: &str) -> String {
    register(server, email, username).await.assert_status_ok();
    let res = login(server, email, "pw12345678").await;
    res.assert_status_ok();
    res.json::<TokenResponse>().access_token
}

async fn create_tx(server: &TestServer, token: &str, body: Value) -> TestResponse {
    server
        .post("/api/v1/transactions")
        .add_header(header::AUTHORIZATION, bearer(token))
        .json(&body)
        .await
}

fn detail(res: &TestResponse) -> String {
    res.json::<Value>()["detail"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn register_login_create_and_list() {
    let server = server();

    let res = register(&server, "a@x.com", "alice").await;
    res.assert_status_ok();
    let user = res.json::<PublicUser>();
    assert_eq!(user.email, "a@x.com");
    assert!(user.is_active);
    assert!(res.json::<Value>().get("hashed_password").is_none());

    let res = login(&server, "a@x.com", "pw12345678").await;
    res.assert_status_ok();
    let token = res.json::<TokenResponse>();
    assert_eq!(token.token_type, "bearer");

    let res = create_tx(
        &server,
        &token.access_token,
        json!({
            "amount": 42.5,
            "transaction_type": "expense",
            "expense_category": "food",
            "transaction_date": "2024-01-01"
        }),
    )
    .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    let res = server
        .get("/api/v1/transactions")
        .add_header(header::AUTHORIZATION, bearer(&token.access_token))
        .await;
    res.assert_status_ok();
    let rows = res.json::<Vec<TransactionResponse>>();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].amount, 42.5);
    assert_eq!(rows[0].expense_category.as_str(), "food");
    assert_eq!(rows[0].user_id, user.id);
}

#[tokio::test]
async fn list_returns_newest_date_first() {
    let server = server();
    let token = signed_in(&server, "a@x.com", "alice").await;
    for date in ["2024-01-01", "2024-02-01"] {
        create_tx(
            &server,
            &token,
            json!({
                "amount": 10.0,
                "transaction_type": "expense",
                "expense_category": "food",
                "transaction_date": date
            }),
        )
        .await;
    }

    let rows = server
        .get("/api/v1/transactions")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json::<Vec<Value>>();
    assert_eq!(rows[0]["transaction_date"], "2024-02-01");
    assert_eq!(rows[1]["transaction_date"], "2024-01-01");
}

#[tokio::test]
async fn duplicates_are_rejected() {
    let server = server();
    register(&server, "a@x.com", "alice").await.assert_status_ok();

    let res = register(&server, "a@x.com", "someone").await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        detail(&res),
        "The user with this email already exists in the system."
    );

    let res = register(&server, "b@x.com", "alice").await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(detail(&res), "The username is already taken.");
}

#[tokio::test]
async fn bad_login_is_opaque() {
    let server = server();
    register(&server, "a@x.com", "alice").await.assert_status_ok();

    let wrong = login(&server, "a@x.com", "not-the-password").await;
    let unknown = login(&server, "nobody@x.com", "pw12345678").await;

    wrong.assert_status(StatusCode::UNAUTHORIZED);
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(detail(&wrong), detail(&unknown));
    assert_eq!(
        wrong.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}

#[tokio::test]
async fn protected_routes_require_token() {
    let server = server();
    server
        .get("/api/v1/users/me")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/v1/transactions")
        .add_header(header::AUTHORIZATION, bearer("garbage"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_vocabulary_lists_options() {
    let server = server();
    let token = signed_in(&server, "a@x.com", "alice").await;

    let res = create_tx(
        &server,
        &token,
        json!({
            "amount": 1.0,
            "transaction_type": "bogus",
            "expense_category": "food",
            "transaction_date": "2024-01-01"
        }),
    )
    .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert!(detail(&res).starts_with("Invalid transaction type. Valid options are: income"));

    let res = server
        .get("/api/v1/transactions")
        .add_query_param("expense_category", "bogus")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert!(detail(&res).starts_with("Invalid expense category."));
}

#[tokio::test]
async fn other_users_transactions_are_not_found() {
    let server = server();
    let alice = signed_in(&server, "a@x.com", "alice").await;
    let bob = signed_in(&server, "b@x.com", "bob").await;

    let bobs = create_tx(
        &server,
        &bob,
        json!({
            "amount": 5.0,
            "transaction_type": "income",
            "expense_category": "miscellaneous",
            "transaction_date": "2024-03-01",
            "description": "gift"
        }),
    )
    .await
    .json::<TransactionResponse>();

    let res = server
        .get(&format!("/api/v1/transactions/{}", bobs.transaction_id))
        .add_header(header::AUTHORIZATION, bearer(&alice))
        .await;
    res.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(detail(&res), "Transaction not found");

    let rows = server
        .get("/api/v1/transactions")
        .add_query_param("transaction_type", "income")
        .add_header(header::AUTHORIZATION, bearer(&alice))
        .await
        .json::<Vec<Value>>();
    assert!(rows.is_empty());

    let own = server
        .get(&format!("/api/v1/transactions/{}", bobs.transaction_id))
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await;
    own.assert_status_ok();
    assert_eq!(own.json::<TransactionResponse>().description.as_deref(), Some("gift"));
}

#[tokio::test]
async fn profile_update_and_deactivation() {
    let server = server();
    let token = signed_in(&server, "a@x.com", "alice").await;
    register(&server, "b@x.com", "bob").await.assert_status_ok();

    let res = server
        .put("/api/v1/users/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "username": "bob" }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(detail(&res), "The username is already in use.");

    let res = server
        .put("/api/v1/users/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "username": "alicia" }))
        .await;
    res.assert_status_ok();
    let me = res.json::<PublicUser>();
    assert_eq!((me.username.as_str(), me.email.as_str()), ("alicia", "a@x.com"));

    server
        .put("/api/v1/users/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "is_active": false }))
        .await
        .assert_status_ok();

    // The token still verifies, but the account may no longer act.
    server
        .get("/api/v1/users/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let res = login(&server, "a@x.com", "pw12345678").await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(detail(&res), "Inactive user");
}

#[tokio::test]
async fn collection_answers_with_trailing_slash() {
    let server = server();
    let token = signed_in(&server, "a@x.com", "alice").await;

    let res = server
        .post("/api/v1/transactions/")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "amount": 12.0,
            "transaction_type": "expense",
            "expense_category": "utilities",
            "transaction_date": "2024-05-01"
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    let res = server
        .get("/api/v1/transactions/")
        .add_query_param("limit", 5)
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Vec<TransactionResponse>>().len(), 1);
}

#[tokio::test]
async fn login_accepts_oauth2_password_form() {
    let server = server();
    register(&server, "a@x.com", "alice").await.assert_status_ok();

    let res = server
        .post("/api/v1/auth/login")
        .form(&[
            ("grant_type", "password"),
            ("username", "a@x.com"),
            ("password", "pw12345678"),
        ])
        .await;
    res.assert_status_ok();
    let token = res.json::<TokenResponse>();
    assert_eq!(token.token_type, "bearer");

    server
        .get("/api/v1/users/me")
        .add_header(header::AUTHORIZATION, bearer(&token.access_token))
        .await
        .assert_status_ok();

    let res = server
        .post("/api/v1/auth/login")
        .form(&[("username", "a@x.com"), ("password", "wrong-password")])
        .await;
    res.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(detail(&res), "Incorrect email or password");
}

#[tokio::test]
async fn malformed_input_is_a_detail_bad_request() {
    let server = server();

    let res = server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "a@x.com", "username": "alice" }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert!(detail(&res).contains("password"));

    let token = signed_in(&server, "a@x.com", "alice").await;
    let res = create_tx(
        &server,
        &token,
        json!({
            "amount": 1.0,
            "transaction_type": "expense",
            "expense_category": "food",
            "transaction_date": "2024-13-45"
        }),
    )
    .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert!(detail(&res).contains("transaction_date"));

    let res = server
        .get("/api/v1/transactions")
        .add_query_param("start_date", "yesterday")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert!(!detail(&res).is_empty());

    let res = server
        .get("/api/v1/transactions/not-a-number")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert!(!detail(&res).is_empty());
}
