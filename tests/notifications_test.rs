mod common;

use axum::{Router, http::StatusCode};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{create_admin, create_customer, create_user, send, setup_app, setup_state};
use ferramenta::config::Config;
use ferramenta::infrastructure::AppState;
use ferramenta::models::{message, order, sms_message};
use ferramenta::server::build_router;

async fn insert_order(db: &DatabaseConnection, user_id: Option<i32>, intent: &str) -> order::Model {
    let now = chrono::Utc::now().to_rfc3339();
    order::ActiveModel {
        user_id: Set(user_id),
        email: Set("cliente@example.it".into()),
        payment_intent_id: Set(intent.into()),
        total_cents: Set(4500),
        status: Set("in_preparazione".into()),
        shipping_address: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

async fn twilio_app(twilio: &MockServer) -> (Router, AppState) {
    let mut config = Config::default();
    config.twilio.api_base = twilio.uri();
    config.twilio.account_sid = "AC123".to_string();
    config.twilio.auth_token = "twilio-token".to_string();
    config.twilio.from_number = "+390351234567".to_string();
    let state = setup_state(config).await;
    (build_router(state.clone()), state)
}

#[tokio::test]
async fn test_status_change_pushes_to_customer_devices() {
    let fcm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/projects/ferramenta-test/messages:send"))
        .and(header("authorization", "Bearer ya29.test"))
        .and(body_string_contains("fcm-device-1"))
        .and(body_string_contains("spedito"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "name": "projects/ferramenta-test/messages/1" })),
        )
        .expect(1)
        .mount(&fcm)
        .await;

    let mut config = Config::default();
    config.fcm.api_base = fcm.uri();
    config.fcm.project_id = "ferramenta-test".to_string();
    config.fcm.access_token = Some("ya29.test".to_string());
    let state = setup_state(config).await;
    let app = build_router(state.clone());

    let (_, admin) = create_admin(state.db()).await;
    let (customer_id, customer) = create_customer(state.db()).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/notifications/tokens",
        Some(&customer),
        Some(json!({ "token": "fcm-device-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let placed = insert_order(state.db(), Some(customer_id), "pi_push").await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/admin/orders/{}/status", placed.id),
        Some(&admin),
        Some(json!({ "status": "spedito" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "spedito");
}

#[tokio::test]
async fn test_status_change_survives_push_failure() {
    let fcm = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&fcm)
        .await;

    let mut config = Config::default();
    config.fcm.api_base = fcm.uri();
    config.fcm.project_id = "ferramenta-test".to_string();
    config.fcm.access_token = Some("ya29.test".to_string());
    let state = setup_state(config).await;
    let app = build_router(state.clone());

    let (_, admin) = create_admin(state.db()).await;
    let (customer_id, customer) = create_customer(state.db()).await;
    send(
        &app,
        "POST",
        "/api/notifications/tokens",
        Some(&customer),
        Some(json!({ "token": "fcm-device-1" })),
    )
    .await;
    let placed = insert_order(state.db(), Some(customer_id), "pi_push_fail").await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/admin/orders/{}/status", placed.id),
        Some(&admin),
        Some(json!({ "status": "consegnato" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "consegnato");
}

#[tokio::test]
async fn test_any_status_may_follow_any_other() {
    let (app, state) = setup_app().await;
    let (_, admin) = create_admin(state.db()).await;
    let placed = insert_order(state.db(), None, "pi_guest").await;
    let uri = format!("/api/admin/orders/{}/status", placed.id);

    for next in ["consegnato", "in_preparazione", "sconosciuto", "spedito"] {
        let (status, body) = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": next }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], next);
    }

    let (status, _) = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": "smarrito" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/admin/orders/9999/status",
        Some(&admin),
        Some(json!({ "status": "spedito" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_device_tokens_are_per_user() {
    let (app, state) = setup_app().await;
    let (_, customer) = create_customer(state.db()).await;
    let (_, other) = common::create_user(state.db(), "altro@example.it", "customer").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/notifications/tokens",
        Some(&customer),
        Some(json!({ "token": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app,
        "POST",
        "/api/notifications/tokens",
        Some(&customer),
        Some(json!({ "token": "shared-device" })),
    )
    .await;

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/notifications/tokens",
        Some(&other),
        Some(json!({ "token": "shared-device" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/notifications/tokens",
        Some(&customer),
        Some(json!({ "token": "shared-device" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_manual_push_needs_token_and_configured_fcm() {
    let (app, state) = setup_app().await;
    let (_, admin) = create_admin(state.db()).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/notifications/send",
        Some(&admin),
        Some(json!({ "token": "", "title": "Ciao", "body": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/notifications/send",
        Some(&admin),
        Some(json!({ "token": "device", "title": "Ciao", "body": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Upstream service error");
}

#[tokio::test]
async fn test_sms_enqueue_validates_number_and_text() {
    let (app, state) = setup_app().await;
    let (_, admin) = create_admin(state.db()).await;

    let (status, queued) = send(
        &app,
        "POST",
        "/api/sms",
        Some(&admin),
        Some(json!({ "numero": "+39 333 123 4567", "messaggio": " Il tuo ordine è pronto " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(queued["numero"], "+393331234567");
    assert_eq!(queued["messaggio"], "Il tuo ordine è pronto");
    assert_eq!(queued["status"], "pending");
    assert_eq!(queued["attempts"], 0);

    let too_long = "a".repeat(1601);
    let bad = [
        json!({ "numero": "3331234567", "messaggio": "ciao" }),
        json!({ "numero": "+39333", "messaggio": "ciao" }),
        json!({ "numero": "+393331234567", "messaggio": "   " }),
        json!({ "numero": "+393331234567", "messaggio": too_long }),
    ];
    for payload in bad {
        let (status, _) = send(&app, "POST", "/api/sms", Some(&admin), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, list) = send(&app, "GET", "/api/sms?status=pending", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (_, list) = send(&app, "GET", "/api/sms?status=sent", Some(&admin), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dispatch_marks_messages_sent() {
    let twilio = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(body_string_contains("To=%2B393331234567"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "sid": "SM0001", "status": "queued" })),
        )
        .expect(1)
        .mount(&twilio)
        .await;

    let (app, state) = twilio_app(&twilio).await;
    let (_, admin) = create_admin(state.db()).await;

    send(
        &app,
        "POST",
        "/api/sms",
        Some(&admin),
        Some(json!({ "numero": "+393331234567", "messaggio": "Ordine spedito" })),
    )
    .await;

    let (status, report) = send(&app, "POST", "/api/sms/dispatch", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report, json!({ "sent": 1, "retrying": 0, "failed": 0 }));

    let rows = sms_message::Entity::find().all(state.db()).await.unwrap();
    assert_eq!(rows[0].status, "sent");
    assert_eq!(rows[0].provider_sid.as_deref(), Some("SM0001"));
    assert_eq!(rows[0].attempts, 1);

    // Nothing left to send
    let (_, report) = send(&app, "POST", "/api/sms/dispatch", Some(&admin), None).await;
    assert_eq!(report["sent"], 0);
}

#[tokio::test]
async fn test_dispatch_gives_up_after_three_attempts() {
    let twilio = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "invalid number" })))
        .expect(3)
        .mount(&twilio)
        .await;

    let (app, state) = twilio_app(&twilio).await;
    let (_, admin) = create_admin(state.db()).await;
    send(
        &app,
        "POST",
        "/api/sms",
        Some(&admin),
        Some(json!({ "numero": "+393331234567", "messaggio": "Ordine spedito" })),
    )
    .await;

    for expected in [
        json!({ "sent": 0, "retrying": 1, "failed": 0 }),
        json!({ "sent": 0, "retrying": 1, "failed": 0 }),
        json!({ "sent": 0, "retrying": 0, "failed": 1 }),
        json!({ "sent": 0, "retrying": 0, "failed": 0 }),
    ] {
        let (_, report) = send(&app, "POST", "/api/sms/dispatch", Some(&admin), None).await;
        assert_eq!(report, expected);
    }

    let rows = sms_message::Entity::find().all(state.db()).await.unwrap();
    assert_eq!(rows[0].status, "failed");
    assert_eq!(rows[0].attempts, 3);
    assert!(rows[0].error.is_some());
}

#[tokio::test]
async fn test_dispatch_without_twilio_keeps_queue() {
    let (app, state) = setup_app().await;
    let (_, admin) = create_admin(state.db()).await;
    send(
        &app,
        "POST",
        "/api/sms",
        Some(&admin),
        Some(json!({ "numero": "+393331234567", "messaggio": "Ordine spedito" })),
    )
    .await;

    let (status, report) = send(&app, "POST", "/api/sms/dispatch", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["sent"], 0);

    let rows = sms_message::Entity::find().all(state.db()).await.unwrap();
    assert_eq!(rows[0].status, "pending");
    assert_eq!(rows[0].attempts, 0);
}

#[tokio::test]
async fn test_chat_between_customer_and_staff() {
    let (app, state) = setup_app().await;
    let (_, admin) = create_admin(state.db()).await;
    let (customer_id, customer) = create_customer(state.db()).await;

    for body in ["Buongiorno", "Avete tasselli da 10 mm?"] {
        let (status, _) = send(&app, "POST", "/api/chat", Some(&customer), Some(json!({ "body": body }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, inbox) = send(&app, "GET", "/api/admin/chat", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox[0]["customer_id"], customer_id);
    assert_eq!(inbox[0]["customer_email"], "cliente@example.it");
    assert_eq!(inbox[0]["unread"], 2);
    assert_eq!(inbox[0]["last_message"]["body"], "Avete tasselli da 10 mm?");

    // Opening the conversation marks customer messages read
    let uri = format!("/api/admin/chat/{}", customer_id);
    let (status, thread) = send(&app, "GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread.as_array().unwrap().len(), 2);
    let (_, inbox) = send(&app, "GET", "/api/admin/chat", Some(&admin), None).await;
    assert_eq!(inbox[0]["unread"], 0);

    let (status, reply) = send(&app, "POST", &uri, Some(&admin), Some(json!({ "body": "Sì, in negozio" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["from_staff"], true);
    assert_eq!(reply["customer_id"], customer_id);

    let (status, mine) = send(&app, "GET", "/api/chat", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 3);
    assert_eq!(mine[2]["body"], "Sì, in negozio");

    let staff_replies: Vec<message::Model> = message::Entity::find()
        .all(state.db())
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.from_staff)
        .collect();
    assert!(staff_replies.iter().all(|m| m.read));
}

#[tokio::test]
async fn test_inbox_has_one_entry_per_customer_newest_first() {
    let (app, state) = setup_app().await;
    let (_, admin) = create_admin(state.db()).await;
    let (anna_id, anna) = create_user(state.db(), "anna@example.it", "customer").await;
    let (bruno_id, bruno) = create_user(state.db(), "bruno@example.it", "customer").await;
    let (carla_id, carla) = create_user(state.db(), "carla@example.it", "customer").await;

    for (token, body) in [
        (&anna, "Ciao"),
        (&bruno, "Orari?"),
        (&anna, "Avete silicone?"),
        (&carla, "Consegnate a Lecco?"),
        (&bruno, "Grazie"),
    ] {
        let (status, _) = send(&app, "POST", "/api/chat", Some(token), Some(json!({ "body": body }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, inbox) = send(&app, "GET", "/api/admin/chat", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 3);
    let order: Vec<i64> = inbox.iter().map(|c| c["customer_id"].as_i64().unwrap()).collect();
    assert_eq!(order, vec![bruno_id as i64, carla_id as i64, anna_id as i64]);
    assert_eq!(inbox[0]["last_message"]["body"], "Grazie");
    assert_eq!(inbox[0]["unread"], 2);
    assert_eq!(inbox[2]["last_message"]["body"], "Avete silicone?");
}

#[tokio::test]
async fn test_chat_rejects_empty_or_oversized_messages() {
    let (app, state) = setup_app().await;
    let (_, admin) = create_admin(state.db()).await;
    let (_, customer) = create_customer(state.db()).await;

    for body in ["   ".to_string(), "x".repeat(2001)] {
        let (status, _) = send(&app, "POST", "/api/chat", Some(&customer), Some(json!({ "body": body }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/chat/9999",
        Some(&admin),
        Some(json!({ "body": "Ciao" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/chat", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
