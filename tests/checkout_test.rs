mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{create_customer, create_product, send, setup_state};
use ferramenta::config::Config;
use ferramenta::infrastructure::AppState;
use ferramenta::integrations::stripe::compute_signature;
use ferramenta::models::{cart_item, order, order_item, product, promotion, promotion_product};
use ferramenta::server::build_router;

const WEBHOOK_SECRET: &str = "whsec_test_secret";

async fn setup(stripe: &MockServer, email: Option<&MockServer>) -> (Router, AppState) {
    let mut config = Config::default();
    config.stripe.api_base = stripe.uri();
    config.stripe.secret_key = "sk_test_123".to_string();
    config.stripe.publishable_key = "pk_test_123".to_string();
    config.stripe.webhook_secret = WEBHOOK_SECRET.to_string();
    if let Some(email) = email {
        config.email.api_base = email.uri();
        config.email.api_key = "re_test".to_string();
    }
    let state = setup_state(config).await;
    (build_router(state.clone()), state)
}

fn succeeded_event(intent_id: &str, amount: i64, metadata: Value) -> Value {
    json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": {
            "object": {
                "id": intent_id,
                "amount": amount,
                "currency": "eur",
                "status": "succeeded",
                "metadata": metadata,
                "shipping": {
                    "name": "Mario Rossi",
                    "address": {
                        "line1": "Via Garibaldi 12",
                        "postal_code": "24100",
                        "city": "Bergamo",
                        "country": "IT"
                    }
                }
            }
        }
    })
}

async fn post_webhook(app: &Router, payload: &Value, signature: Option<String>) -> (StatusCode, Value) {
    let body = serde_json::to_vec(payload).unwrap();
    let signature = signature.unwrap_or_else(|| {
        let ts = Utc::now().timestamp();
        format!("t={},v1={}", ts, compute_signature(WEBHOOK_SECRET, ts, &body))
    });

    let request = Request::builder()
        .uri("/api/payments/webhook")
        .method("POST")
        .header("content-type", "application/json")
        .header("Stripe-Signature", signature)
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_intent_uses_database_prices_and_promotions() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("amount=2450"))
        .and(body_string_contains("currency=eur"))
        .and(body_string_contains("automatic_payment_methods%5Benabled%5D=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "amount": 2450,
            "currency": "eur",
            "client_secret": "pi_123_secret_abc",
            "status": "requires_payment_method"
        })))
        .expect(1)
        .mount(&stripe)
        .await;

    let (app, state) = setup(&stripe, None).await;
    let db = state.db();
    let hammer = create_product(db, "Martello", 1000, 10).await;
    let screws = create_product(db, "Viti", 500, 10).await;

    // 10% off the screws: 500 -> 450
    let now = Utc::now();
    let promo = promotion::ActiveModel {
        title: Set("Viteria".into()),
        description: Set(None),
        discount_percent: Set(10),
        starts_at: Set((now - Duration::hours(1)).to_rfc3339()),
        ends_at: Set((now + Duration::hours(1)).to_rfc3339()),
        active: Set(true),
        created_at: Set(now.to_rfc3339()),
        updated_at: Set(now.to_rfc3339()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    promotion_product::ActiveModel {
        promotion_id: Set(promo.id),
        product_id: Set(screws.id),
    }
    .insert(db)
    .await
    .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/payments/intent",
        None,
        Some(json!({
            "email": "ospite@example.it",
            "products": [
                { "id": hammer.id, "quantity": 2, "price_cents": 1 },
                { "id": screws.id, "quantity": 1 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["client_secret"], "pi_123_secret_abc");
    assert_eq!(body["payment_intent_id"], "pi_123");
    assert_eq!(body["amount"], 2450);
}

#[tokio::test]
async fn test_intent_rejects_bad_carts_without_calling_stripe() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&stripe)
        .await;

    let (app, state) = setup(&stripe, None).await;
    let product = create_product(state.db(), "Pinza", 800, 3).await;
    let pricey = create_product(state.db(), "Tornio", i64::MAX / 2, 3).await;

    let bad_requests = [
        json!({ "email": "a@example.it", "products": [] }),
        json!({ "email": "a@example.it", "products": [{ "id": 999, "quantity": 1 }] }),
        json!({ "email": "a@example.it", "products": [{ "id": product.id, "quantity": 0 }] }),
        json!({ "email": "not-an-email", "products": [{ "id": product.id, "quantity": 1 }] }),
        json!({
            "email": "a@example.it",
            "products": [
                { "id": product.id, "quantity": i32::MAX },
                { "id": product.id, "quantity": 1 }
            ]
        }),
        json!({ "email": "a@example.it", "products": [{ "id": pricey.id, "quantity": 3 }] }),
    ];
    for payload in bad_requests {
        let (status, _) = send(&app, "POST", "/api/payments/intent", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_stripe_error_is_bad_gateway() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(
            ResponseTemplate::new(402).set_body_json(json!({ "error": { "message": "declined" } })),
        )
        .mount(&stripe)
        .await;

    let (app, state) = setup(&stripe, None).await;
    let product = create_product(state.db(), "Pinza", 800, 3).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/payments/intent",
        None,
        Some(json!({ "email": "a@example.it", "products": [{ "id": product.id, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_webhook_creates_order_once() {
    let stripe = MockServer::start().await;
    let email = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_string_contains("cliente@example.it"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "em_1" })))
        .expect(1)
        .mount(&email)
        .await;

    let (app, state) = setup(&stripe, Some(&email)).await;
    let db = state.db();
    let (customer_id, _) = create_customer(db).await;
    let drill = create_product(db, "Trapano", 8990, 5).await;
    let bits = create_product(db, "Punte", 1200, 1).await;

    cart_item::ActiveModel {
        user_id: Set(customer_id),
        product_id: Set(drill.id),
        quantity: Set(1),
        created_at: Set(Utc::now().to_rfc3339()),
        updated_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    let items = format!(r#"[{{"id":{},"q":1}},{{"id":{},"q":2}}]"#, drill.id, bits.id);
    let event = succeeded_event(
        "pi_paid",
        11390,
        json!({
            "email": "cliente@example.it",
            "user_id": customer_id.to_string(),
            "items": items,
        }),
    );

    let (status, body) = post_webhook(&app, &event, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "order_created");
    let order_id = body["order_id"].as_i64().unwrap() as i32;

    let saved = order::Entity::find_by_id(order_id).one(db).await.unwrap().unwrap();
    assert_eq!(saved.status, "in_preparazione");
    assert_eq!(saved.total_cents, 11390);
    assert_eq!(saved.user_id, Some(customer_id));
    assert_eq!(
        saved.shipping_address.as_deref(),
        Some("Mario Rossi, Via Garibaldi 12, 24100, Bergamo, IT")
    );

    let lines = order_item::Entity::find().all(db).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().any(|l| l.product_name == "Trapano" && l.unit_price_cents == 8990));

    // Stock never drops below zero
    let drill = product::Entity::find_by_id(drill.id).one(db).await.unwrap().unwrap();
    let bits = product::Entity::find_by_id(bits.id).one(db).await.unwrap().unwrap();
    assert_eq!(drill.stock, 4);
    assert_eq!(bits.stock, 0);

    assert!(cart_item::Entity::find().all(db).await.unwrap().is_empty());

    // Stripe retries the same event
    let (status, body) = post_webhook(&app, &event, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "already_processed");
    assert_eq!(body["order_id"], order_id);
    assert_eq!(order::Entity::find().all(db).await.unwrap().len(), 1);
    assert_eq!(order_item::Entity::find().all(db).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_webhook_rejects_bad_signatures() {
    let stripe = MockServer::start().await;
    let (app, state) = setup(&stripe, None).await;
    let product = create_product(state.db(), "Trapano", 8990, 5).await;

    let event = succeeded_event(
        "pi_forged",
        8990,
        json!({ "email": "x@example.it", "items": format!(r#"[{{"id":{},"q":1}}]"#, product.id) }),
    );

    let (status, _) = post_webhook(&app, &event, Some("t=1,v1=deadbeef".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stale = Utc::now().timestamp() - 3600;
    let body = serde_json::to_vec(&event).unwrap();
    let header = format!("t={},v1={}", stale, compute_signature(WEBHOOK_SECRET, stale, &body));
    let (status, _) = post_webhook(&app, &event, Some(header)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(order::Entity::find().all(state.db()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_webhook_ignores_other_events_and_rejects_bad_metadata() {
    let stripe = MockServer::start().await;
    let (app, state) = setup(&stripe, None).await;

    let refund = json!({ "id": "evt_2", "type": "charge.refunded", "data": { "object": {} } });
    let (status, body) = post_webhook(&app, &refund, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "ignored");

    let broken = succeeded_event("pi_broken", 100, json!({ "email": "x@example.it", "items": "not json" }));
    let (status, _) = post_webhook(&app, &broken, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(order::Entity::find().all(state.db()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invoices_of_logged_in_customer() {
    let stripe = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/customers"))
        .and(query_param("email", "cliente@example.it"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": "cus_9" }] })))
        .mount(&stripe)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/invoices"))
        .and(query_param("customer", "cus_9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "in_1",
                "number": "FL-0001",
                "amount_due": 2450,
                "amount_paid": 2450,
                "currency": "eur",
                "status": "paid",
                "created": 1767225600,
                "hosted_invoice_url": "https://invoice.stripe.com/i/in_1"
            }]
        })))
        .mount(&stripe)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/customers"))
        .and(query_param("email", "nessuno@example.it"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&stripe)
        .await;

    let (app, state) = setup(&stripe, None).await;
    let (_, token) = create_customer(state.db()).await;

    let (status, invoices) = send(&app, "GET", "/api/payments/invoices", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoices[0]["number"], "FL-0001");
    assert_eq!(invoices[0]["amount_paid"], 2450);

    let (_, other) = common::create_user(state.db(), "nessuno@example.it", "customer").await;
    let (status, invoices) = send(&app, "GET", "/api/payments/invoices", Some(&other), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(invoices.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "GET", "/api/payments/invoices", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_config_exposes_publishable_key_only() {
    let stripe = MockServer::start().await;
    let (app, _) = setup(&stripe, None).await;

    let (status, body) = send(&app, "GET", "/api/payments/config", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publishable_key"], "pk_test_123");
    assert!(!body.to_string().contains("sk_test_123"));
}
