use std::net::SocketAddr;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

use server::routes::auth::{sign_token, Claims};

const SECRET: &str = "test-secret";

struct TestApp {
    base_url: String,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// Each test gets its own migrated in-memory database and an ephemeral port.
async fn start_server() -> anyhow::Result<TestApp> {
    let db = models::db::connect_in_memory().await?;
    let mut cfg = configs::AppConfig::default();
    cfg.auth.jwt_secret = SECRET.into();
    let app = server::startup::build_app(db, &cfg);

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });
    Ok(TestApp { base_url: format!("http://{}:{}", addr.ip(), addr.port()) })
}

fn token_for(uid: Uuid, name: &str, exp_offset_secs: i64) -> String {
    let exp = (chrono::Utc::now().timestamp() + exp_offset_secs) as usize;
    let claims = Claims { sub: format!("{name}@example.com"), uid, name: Some(name.into()), exp };
    sign_token(SECRET, &claims).expect("sign")
}

fn user(name: &str) -> (Uuid, String) {
    let uid = Uuid::new_v4();
    (uid, token_for(uid, name, 3600))
}

async fn create_contact(c: &reqwest::Client, app: &TestApp, token: &str, body: Value) -> anyhow::Result<Value> {
    let res = c.post(app.url("/contacts")).bearer_auth(token).json(&body).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    Ok(body["data"].clone())
}

#[tokio::test]
async fn health_is_public() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = reqwest::get(app.url("/health")).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_public() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = reqwest::get(app.url("/api-docs/openapi.json")).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert!(body["paths"]["/leads/{id}/convert"].is_object());
    Ok(())
}

#[tokio::test]
async fn missing_token_is_bad_request() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = reqwest::get(app.url("/contacts")).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Access token required");
    Ok(())
}

#[tokio::test]
async fn invalid_or_expired_token_is_unauthorized() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();

    let res = c.get(app.url("/contacts")).bearer_auth("not-a-jwt").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = token_for(Uuid::new_v4(), "late", -3600);
    let res = c.get(app.url("/contacts")).bearer_auth(expired).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = c.get(app.url("/contacts")).header("Authorization", "Basic abc").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn cookie_token_is_accepted_and_user_provisioned() -> anyhow::Result<()> {
    let app = start_server().await?;
    let (uid, token) = user("cookie");
    let res = reqwest::Client::new()
        .get(app.url("/users/me"))
        .header("Cookie", format!("theme=dark; auth_token={token}"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["id"], uid.to_string());
    assert_eq!(body["data"]["email"], "cookie@example.com");
    Ok(())
}

#[tokio::test]
async fn contact_lifecycle_uses_envelope() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();
    let (_, token) = user("alice");

    let created = create_contact(&c, &app, &token, json!({"firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com"})).await?;
    let id = created["id"].as_str().unwrap_or_default().to_string();

    let res = c.get(app.url(&format!("/contacts/{id}"))).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["firstName"], "Ada");
    assert_eq!(body["data"]["_count"]["deals"], 0);

    let res = c.get(app.url(&format!("/contacts/{}", Uuid::new_v4()))).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "Contact not found");

    let res = c.delete(app.url(&format!("/contacts/{id}"))).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert!(body.get("data").is_none());
    Ok(())
}

#[tokio::test]
async fn list_returns_pagination_meta() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();
    let (_, token) = user("pager");
    for i in 0..3 {
        create_contact(&c, &app, &token, json!({"firstName": format!("P{i}"), "lastName": "Page"})).await?;
    }

    let res = c.get(app.url("/contacts?page=2&limit=2")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["pagination"]["total"], 3);
    assert_eq!(body["data"]["pagination"]["page"], 2);
    assert_eq!(body["data"]["pagination"]["limit"], 2);
    assert_eq!(body["data"]["pagination"]["totalPages"], 2);
    Ok(())
}

#[tokio::test]
async fn unknown_enum_in_query_is_rejected() -> anyhow::Result<()> {
    let app = start_server().await?;
    let (_, token) = user("enum");
    let c = reqwest::Client::new();
    let res = c.get(app.url("/deals?stage=WON_ISH")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap_or_default().contains("WON_ISH"));

    let res = c.get(app.url("/deals/not-a-uuid")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn malformed_body_uses_envelope() -> anyhow::Result<()> {
    let app = start_server().await?;
    let (_, token) = user("sloppy");
    let res = reqwest::Client::new()
        .post(app.url("/contacts"))
        .bearer_auth(&token)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert!(res.status().is_client_error());
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn second_identity_with_same_email_is_rejected() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();
    let (_, first) = user("shared");
    let (_, second) = user("shared");

    let res = c.get(app.url("/users/me")).bearer_auth(&first).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = c.get(app.url("/users/me")).bearer_auth(&second).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "This email is already linked to another user");
    Ok(())
}

#[tokio::test]
async fn contact_with_activity_cannot_be_deleted() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();
    let (_, token) = user("guard");
    let contact = create_contact(&c, &app, &token, json!({"firstName": "Grace", "lastName": "Hopper"})).await?;
    let id = contact["id"].as_str().unwrap_or_default().to_string();

    let res = c
        .post(app.url(&format!("/contacts/{id}/notes")))
        .bearer_auth(&token)
        .json(&json!({"content": "met at conference"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = c.delete(app.url(&format!("/contacts/{id}"))).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn strangers_cannot_modify() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();
    let (_, owner) = user("owner");
    let (_, stranger) = user("stranger");
    let contact = create_contact(&c, &app, &owner, json!({"firstName": "Own", "lastName": "Ed"})).await?;
    let id = contact["id"].as_str().unwrap_or_default().to_string();

    let res = c
        .put(app.url(&format!("/contacts/{id}")))
        .bearer_auth(&stranger)
        .json(&json!({"firstName": "Stolen"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], "You do not have permission to modify this contact");
    Ok(())
}

#[tokio::test]
async fn bulk_deal_update_reports_each_item() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();
    let (_, token) = user("seller");

    let res = c.post(app.url("/deals")).bearer_auth(&token).json(&json!({"title": "Big one", "value": 1000.0})).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    let ghost = Uuid::new_v4().to_string();

    let res = c
        .put(app.url("/deals/bulk"))
        .bearer_auth(&token)
        .json(&json!({"ids": [id, ghost], "data": {"stage": "NEGOTIATION"}}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["succeeded"], 1);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["results"][0]["success"], true);
    assert_eq!(body["data"]["results"][1]["error"], "Deal not found");

    let res = c.get(app.url("/deals/pipeline")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["totalCount"], 1);
    Ok(())
}

#[tokio::test]
async fn lead_converts_into_contact_company_and_deal() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();
    let (_, token) = user("closer");

    let res = c
        .post(app.url("/leads"))
        .bearer_auth(&token)
        .json(&json!({"firstName": "Lin", "email": "lin@acme.io", "company": "Acme", "source": "referral"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    assert!(body["data"]["score"].as_i64().unwrap_or_default() > 0);

    let res = c
        .post(app.url(&format!("/leads/{id}/convert")))
        .bearer_auth(&token)
        .json(&json!({"conversionValue": 5000.0}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["lead"]["status"], "CONVERTED");
    assert!(body["data"]["contact"].is_object());
    assert!(body["data"]["company"].is_object());
    assert!(body["data"]["deal"].is_object());

    let res = c.post(app.url(&format!("/leads/{id}/convert"))).bearer_auth(&token).json(&json!({})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn completing_a_task_stamps_it() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();
    let (uid, token) = user("doer");

    let res = c.post(app.url("/tasks")).bearer_auth(&token).json(&json!({"title": "Call back"})).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["assignedToId"], uid.to_string());
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = c.post(app.url(&format!("/tasks/{id}/complete"))).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["status"], "COMPLETED");
    assert!(body["data"]["completedAt"].is_string());
    Ok(())
}
