//! End-to-end tests over the assembled router.
//!
//! Each test gets its own SQLite file and an in-process payment processor.

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use parking_lot::Mutex;
use roombnb_backend::{
    auth::AccountStore,
    build_router,
    payment::{PaymentIntent, PaymentProcessor},
    AppConfig, AppState, Database,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

#[derive(Default)]
struct MockProcessor {
    fail: bool,
    calls: Mutex<Vec<(i64, String, Uuid)>>,
}

#[async_trait]
impl PaymentProcessor for MockProcessor {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        account_id: Uuid,
    ) -> Result<PaymentIntent> {
        self.calls
            .lock()
            .push((amount_minor, currency.to_string(), account_id));
        if self.fail {
            anyhow::bail!("card_declined");
        }
        Ok(PaymentIntent {
            id: "pi_test".to_string(),
            client_secret: "pi_test_secret".to_string(),
        })
    }
}

struct TestApp {
    router: Router,
    accounts: AccountStore,
    _dir: TempDir,
}

impl TestApp {
    fn new(processor: Option<Arc<dyn PaymentProcessor>>) -> Self {
        Self::with_config(
            AppConfig {
                expose_reset_token: true,
                auth_rate_limit_per_min: 0,
                ..Default::default()
            },
            processor,
        )
    }

    fn with_config(config: AppConfig, processor: Option<Arc<dyn PaymentProcessor>>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("roombnb.db");
        let db = Database::open(db_path.to_str().unwrap()).unwrap();
        let accounts = AccountStore::with_hash_cost(db.clone(), 4);
        let state = AppState::with_accounts(&config, accounts.clone(), db, processor);

        Self {
            router: build_router(state),
            accounts,
            _dir: dir,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Register and return (token, account id).
    async fn register(&self, email: &str, role: &str) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": "secret123",
                    "firstName": "Test",
                    "lastName": "User",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }
}

fn listing(city: &str, price: f64, guests: u32) -> Value {
    json!({
        "title": format!("{} stay", city),
        "description": "A lovely place",
        "location": {
            "city": city,
            "country": "USA",
            "coordinates": { "lat": 25.76, "lng": -80.19 }
        },
        "price": price,
        "images": ["https://img.test/1.jpg"],
        "amenities": ["WiFi"],
        "maxGuests": guests,
        "bedrooms": 2,
        "bathrooms": 1
    })
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new(None);
    let (token, id) = app.register("guest@example.com", "guest").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "guest@example.com",
                "password": "another",
                "firstName": "Dup",
                "lastName": "User"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");

    let (status, body) = app.login("guest@example.com", "secret123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.as_str());

    let (wrong_pw_status, wrong_pw) = app.login("guest@example.com", "nope").await;
    let (unknown_status, unknown) = app.login("nobody@example.com", "secret123").await;
    assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw, unknown);

    let (status, body) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "guest@example.com");
    assert_eq!(body["role"], "guest");
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("resetToken").is_none());

    let (status, body) = app.send(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please authenticate.");

    let (status, _) = app
        .send(Method::GET, "/api/auth/verify", Some("not.a.jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_cannot_claim_admin() {
    let app = TestApp::new(None);
    let (token, _) = app.register("sneaky@example.com", "admin").await;

    let (_, body) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(body["role"], "guest");

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/auth/update-role",
            Some(&token),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_role_switch_applies_to_existing_token() {
    let app = TestApp::new(None);
    let (token, id) = app.register("switcher@example.com", "guest").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/properties",
            Some(&token),
            Some(listing("Miami", 300.0, 4)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied.");

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/auth/update-role",
            Some(&token),
            Some(json!({ "role": "host" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "host");

    let mut payload = listing("Miami", 300.0, 4);
    payload["host"] = json!(Uuid::new_v4().to_string());
    let (status, body) = app
        .send(Method::POST, "/api/properties", Some(&token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["host"]["id"], id.as_str());
    assert_eq!(body["host"]["email"], "switcher@example.com");
}

#[tokio::test]
async fn test_property_crud_and_ownership() {
    let app = TestApp::new(None);
    let (owner, _) = app.register("owner@example.com", "host").await;
    let (other, _) = app.register("other@example.com", "host").await;

    app.accounts
        .ensure_admin("admin@example.com", "adminpass")
        .await
        .unwrap();
    let (_, admin_login) = app.login("admin@example.com", "adminpass").await;
    let admin = admin_login["token"].as_str().unwrap().to_string();

    let (status, created) = app
        .send(
            Method::POST,
            "/api/properties",
            Some(&owner),
            Some(listing("Denver", 250.0, 6)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    let path = format!("/api/properties/{}", id);

    let (status, body) = app.send(Method::GET, &path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["maxGuests"], 6);
    assert_eq!(body["host"]["email"], "owner@example.com");

    let (status, _) = app
        .send(Method::PUT, &path, None, Some(json!({ "price": 1.0 })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::PUT, &path, Some(&other), Some(json!({ "price": 1.0 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::PUT, &path, Some(&owner), Some(json!({ "price": 275.0 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], 275.0);
    assert_eq!(body["title"], "Denver stay");

    let (status, body) = app
        .send(Method::PUT, &path, Some(&admin), Some(json!({ "bedrooms": 3 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bedrooms"], 3);
    assert_eq!(body["host"]["email"], "owner@example.com");

    let (status, _) = app.send(Method::DELETE, &path, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::DELETE, &path, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Property deleted");

    let (status, body) = app.send(Method::GET, &path, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Property not found");

    let (status, _) = app
        .send(Method::DELETE, &path, Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Method::GET, "/api/properties/not-an-id", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_property_search_filters() {
    let app = TestApp::new(None);
    let (host, _) = app.register("host@example.com", "host").await;

    for (city, price, guests) in [("Miami", 450.0, 8), ("Miami", 150.0, 2), ("Denver", 250.0, 6)] {
        let (status, _) = app
            .send(
                Method::POST,
                "/api/properties",
                Some(&host),
                Some(listing(city, price, guests)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.send(Method::GET, "/api/properties", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(body[0]["location"]["city"], "Denver");

    let (_, body) = app
        .send(Method::GET, "/api/properties?city=Miami&guests=4", None, None)
        .await;
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["price"], 450.0);

    let (_, body) = app
        .send(
            Method::GET,
            "/api/properties?minPrice=150&maxPrice=250",
            None,
            None,
        )
        .await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = app
        .send(Method::GET, "/api/properties?minPrice=cheap", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_property_body_is_rejected() {
    let app = TestApp::new(None);
    let (host, _) = app.register("host@example.com", "host").await;

    let mut bad = listing("Miami", 100.0, 2);
    bad["maxGuests"] = json!(-1);
    let (status, body) = app
        .send(Method::POST, "/api/properties", Some(&host), Some(bad))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let mut bad = listing("Miami", 100.0, 2);
    bad["location"]["coordinates"]["lng"] = json!(200.0);
    let (status, _) = app
        .send(Method::POST, "/api/properties", Some(&host), Some(bad))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let app = TestApp::new(None);
    let (old_token, _) = app.register("forgetful@example.com", "guest").await;

    let (status, unknown) = app
        .send(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(unknown.get("resetToken").is_none());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "forgetful@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], unknown["message"]);
    let reset_token = body["resetToken"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": reset_token, "password": "brandnew" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": reset_token, "password": "again" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Password reset token is invalid or has expired"
    );

    let (status, _) = app.login("forgetful@example.com", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("forgetful@example.com", "brandnew").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(Method::GET, "/api/auth/me", Some(&old_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_token_hidden_outside_dev_mode() {
    let app = TestApp::with_config(
        AppConfig {
            auth_rate_limit_per_min: 0,
            ..Default::default()
        },
        None,
    );
    app.register("quiet@example.com", "guest").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "quiet@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("resetToken").is_none());
}

#[tokio::test]
async fn test_change_password_rotates_sessions() {
    let app = TestApp::new(None);
    let (old_token, _) = app.register("rotate@example.com", "guest").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/change-password",
            Some(&old_token),
            Some(json!({ "currentPassword": "wrong", "newPassword": "next" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/change-password",
            Some(&old_token),
            Some(json!({ "currentPassword": "secret123", "newPassword": "next" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_token = body["token"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::GET, "/api/auth/me", Some(&old_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::GET, "/api/auth/me", Some(&new_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(Method::POST, "/api/auth/refresh-token", Some(&new_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_update_profile() {
    let app = TestApp::new(None);
    let (token, _) = app.register("profile@example.com", "guest").await;

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/auth/update-profile",
            Some(&token),
            Some(json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "phoneNumber": "+1 555 0100"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Ada");
    assert_eq!(body["phoneNumber"], "+1 555 0100");

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/auth/update-profile",
            Some(&token),
            Some(json!({ "firstName": "", "lastName": "Lovelace" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payment_intent() {
    let processor = Arc::new(MockProcessor::default());
    let app = TestApp::new(Some(processor.clone()));
    let (token, id) = app.register("payer@example.com", "guest").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/payment/create-payment-intent",
            None,
            Some(json!({ "amount": 1000 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for amount in [json!(0), json!(-5), json!("100")] {
        let (status, _) = app
            .send(
                Method::POST,
                "/api/payment/create-payment-intent",
                Some(&token),
                Some(json!({ "amount": amount })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert!(processor.calls.lock().is_empty());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/payment/create-payment-intent",
            Some(&token),
            Some(json!({ "amount": 1999.6 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientSecret"], "pi_test_secret");

    let calls = processor.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, 2000);
    assert_eq!(calls[0].1, "usd");
    assert_eq!(calls[0].2.to_string(), id);
}

#[tokio::test]
async fn test_payment_failures() {
    let failing = Arc::new(MockProcessor {
        fail: true,
        ..Default::default()
    });
    let app = TestApp::new(Some(failing));
    let (token, _) = app.register("declined@example.com", "guest").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/payment/create-payment-intent",
            Some(&token),
            Some(json!({ "amount": 500 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to create payment intent");

    let unconfigured = TestApp::new(None);
    let (token, _) = unconfigured.register("nokey@example.com", "guest").await;
    let (status, body) = unconfigured
        .send(
            Method::POST,
            "/api/payment/create-payment-intent",
            Some(&token),
            Some(json!({ "amount": 500 })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_credential_endpoints_are_rate_limited() {
    let app = TestApp::with_config(
        AppConfig {
            auth_rate_limit_per_min: 1,
            ..Default::default()
        },
        None,
    );

    let (first, _) = app.login("a@example.com", "pw").await;
    assert_eq!(first, StatusCode::UNAUTHORIZED);

    let (second, body) = app.login("a@example.com", "pw").await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_welcome_route() {
    let app = TestApp::new(None);
    let (status, body) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to RoomBnB API");
    assert_eq!(body["status"], "online");
}

#[tokio::test]
async fn test_guest_is_forbidden_before_body_is_read() {
    let app = TestApp::new(None);
    let (guest, _) = app.register("guest@example.com", "guest").await;

    for body in [json!({}), json!({ "title": 42 })] {
        let (status, response) = app
            .send(Method::POST, "/api/properties", Some(&guest), Some(body))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(response["error"], "Access denied.");
    }

    let (status, _) = app
        .send(Method::POST, "/api/properties", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (host, _) = app.register("host@example.com", "host").await;
    let (status, response) = app
        .send(Method::POST, "/api/properties", Some(&host), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Invalid request body");
}

#[tokio::test]
async fn test_passwords_beyond_bcrypt_limit() {
    let app = TestApp::new(None);
    let prefix = "a".repeat(72);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "long@example.com",
                "password": format!("{}CORRECT", prefix),
                "firstName": "Long",
                "lastName": "Password"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "edge@example.com",
                "password": prefix,
                "firstName": "Edge",
                "lastName": "Case"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.login("edge@example.com", &prefix).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .login("edge@example.com", &format!("{}WRONG", prefix))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
