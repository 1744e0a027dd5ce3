//! WebSocket integration tests
//!
//! These run against a live server with the seed users below present.
//! Run with: cargo test -- --ignored

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

const BASE_URL: &str = "http://localhost:5000/api/v1";
const WS_URL: &str = "ws://localhost:5000/ws";

const USER_EMAIL: &str = "usuario@biblioteca.test";
const AGENT_EMAIL: &str = "agente@biblioteca.test";
const PASSWORD: &str = "password123";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn get_auth_token(client: &Client, email: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to send login request");

    assert!(response.status().is_success(), "login failed for {}", email);
    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn create_ticket(client: &Client, token: &str, subject: &str) -> i64 {
    let response = client
        .post(format!("{}/support/tickets", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "asunto": subject, "mensaje": "Hola, necesito ayuda" }))
        .send()
        .await
        .expect("Failed to create ticket");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["ticket"]["id"].as_i64().expect("No ticket id")
}

async fn connect(token: &str) -> WsStream {
    let (stream, _) = connect_async(format!("{}?token={}", WS_URL, token))
        .await
        .expect("WebSocket handshake failed");
    stream
}

/// Read server events until one with the given type tag arrives, returning
/// every event seen on the way (the sentinel included, last)
async fn collect_until(stream: &mut WsStream, event_type: &str) -> Vec<Value> {
    let mut seen = Vec::new();
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {}", event_type))
            .expect("stream closed")
            .expect("stream error");

        if let Message::Text(text) = message {
            let event: Value = serde_json::from_str(&text).expect("invalid event JSON");
            let done = event["type"] == event_type;
            seen.push(event);
            if done {
                return seen;
            }
        }
    }
}

/// Read server events until one with the given type tag arrives
async fn wait_for(stream: &mut WsStream, event_type: &str) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {}", event_type))
            .expect("stream closed")
            .expect("stream error");

        if let Message::Text(text) = message {
            let event: Value = serde_json::from_str(&text).expect("invalid event JSON");
            if event["type"] == event_type {
                return event;
            }
        }
    }
}

async fn send_event(stream: &mut WsStream, event: Value) {
    stream
        .send(Message::Text(event.to_string()))
        .await
        .expect("Failed to send event");
}

fn assert_unauthorized(result: Result<(WsStream, tokio_tungstenite::tungstenite::handshake::client::Response), WsError>) {
    match result {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
        Err(other) => panic!("expected an HTTP 401 rejection, got {:?}", other),
        Ok(_) => panic!("handshake must fail"),
    }
}

#[tokio::test]
#[ignore]
async fn test_connect_without_token_rejected() {
    // Absence looks exactly like an invalid token on the wire
    assert_unauthorized(connect_async(WS_URL).await);
}

#[tokio::test]
#[ignore]
async fn test_connect_with_bad_token_rejected() {
    assert_unauthorized(connect_async(format!("{}?token=not-a-jwt", WS_URL)).await);
}

#[tokio::test]
#[ignore]
async fn test_pending_notifications_on_connect() {
    let client = Client::new();
    let token = get_auth_token(&client, USER_EMAIL).await;

    let mut stream = connect(&token).await;
    let event = wait_for(&mut stream, "notificaciones_pendientes").await;
    assert!(event["notificaciones"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_join_and_message_roundtrip() {
    let client = Client::new();
    let token = get_auth_token(&client, USER_EMAIL).await;
    let ticket_id = create_ticket(&client, &token, "Chat en tiempo real").await;

    let mut stream = connect(&token).await;
    wait_for(&mut stream, "notificaciones_pendientes").await;

    send_event(&mut stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    let joined = wait_for(&mut stream, "joined_ticket").await;
    assert_eq!(joined["ticketId"].as_i64(), Some(ticket_id));

    send_event(
        &mut stream,
        json!({ "type": "send_support_message", "ticketId": ticket_id, "contenido": "sigo aquí" }),
    )
    .await;

    // Sender receives both the echo and the durability ack.
    let echo = wait_for(&mut stream, "nuevo_mensaje_soporte").await;
    assert_eq!(echo["ticketId"].as_i64(), Some(ticket_id));
    assert_eq!(echo["mensaje"], "sigo aquí");
    assert_eq!(echo["tipo"], "usuario");

    let ack = wait_for(&mut stream, "mensaje_enviado_confirmacion").await;
    assert_eq!(ack["success"], true);
    assert!(ack["mensajeId"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_message_without_join_rejected() {
    let client = Client::new();
    let token = get_auth_token(&client, USER_EMAIL).await;
    let ticket_id = create_ticket(&client, &token, "Sin unirse a la sala").await;

    let mut stream = connect(&token).await;
    wait_for(&mut stream, "notificaciones_pendientes").await;

    // No join_ticket first: the message must be refused, not persisted.
    send_event(
        &mut stream,
        json!({ "type": "send_support_message", "ticketId": ticket_id, "contenido": "hola?" }),
    )
    .await;
    wait_for(&mut stream, "error_mensaje_soporte").await;

    let messages: Value = client
        .get(format!("{}/support/tickets/{}/messages", BASE_URL, ticket_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to fetch messages")
        .json()
        .await
        .expect("Failed to parse messages");
    assert_eq!(messages.as_array().expect("Expected array").len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_join_foreign_ticket_rejected() {
    let client = Client::new();
    let owner_token = get_auth_token(&client, USER_EMAIL).await;
    let ticket_id = create_ticket(&client, &owner_token, "Sala ajena").await;

    let other_token = get_auth_token(&client, "otro@biblioteca.test").await;
    let mut stream = connect(&other_token).await;
    wait_for(&mut stream, "notificaciones_pendientes").await;

    send_event(&mut stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    wait_for(&mut stream, "error_ticket").await;
}

#[tokio::test]
#[ignore]
async fn test_malformed_frame_reports_error() {
    let client = Client::new();
    let token = get_auth_token(&client, USER_EMAIL).await;

    let mut stream = connect(&token).await;
    wait_for(&mut stream, "notificaciones_pendientes").await;

    stream
        .send(Message::Text("this is not json".to_string()))
        .await
        .expect("Failed to send frame");
    let event = wait_for(&mut stream, "error_ticket").await;
    assert_eq!(event["message"], "Evento no válido");

    // The connection survives the bad frame.
    send_event(&mut stream, json!({ "type": "clear_all_notifications" })).await;
    wait_for(&mut stream, "notifications_cleared").await;
}

#[tokio::test]
#[ignore]
async fn test_typing_relayed_to_room_peers() {
    let client = Client::new();
    let user_token = get_auth_token(&client, USER_EMAIL).await;
    let agent_token = get_auth_token(&client, AGENT_EMAIL).await;
    let ticket_id = create_ticket(&client, &user_token, "Indicador de escritura").await;

    let mut user_stream = connect(&user_token).await;
    wait_for(&mut user_stream, "notificaciones_pendientes").await;
    send_event(&mut user_stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    wait_for(&mut user_stream, "joined_ticket").await;

    let mut agent_stream = connect(&agent_token).await;
    wait_for(&mut agent_stream, "notificaciones_pendientes").await;
    send_event(&mut agent_stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    wait_for(&mut agent_stream, "joined_ticket").await;

    send_event(&mut user_stream, json!({ "type": "typing_support", "ticketId": ticket_id })).await;

    // The peer sees it; the typist gets nothing back.
    let event = wait_for(&mut agent_stream, "user_typing_support").await;
    assert_eq!(event["ticketId"].as_i64(), Some(ticket_id));
    assert!(event["userId"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_first_agent_reply_assigns_ticket() {
    let client = Client::new();
    let user_token = get_auth_token(&client, USER_EMAIL).await;
    let agent_token = get_auth_token(&client, AGENT_EMAIL).await;
    let ticket_id = create_ticket(&client, &user_token, "Asignación automática").await;

    let mut agent_stream = connect(&agent_token).await;
    wait_for(&mut agent_stream, "notificaciones_pendientes").await;
    send_event(&mut agent_stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    wait_for(&mut agent_stream, "joined_ticket").await;

    send_event(
        &mut agent_stream,
        json!({ "type": "send_support_message", "ticketId": ticket_id, "contenido": "¿En qué puedo ayudar?" }),
    )
    .await;
    wait_for(&mut agent_stream, "mensaje_enviado_confirmacion").await;

    // The ticket left the pending state and carries an agent now.
    let tickets: Value = client
        .get(format!("{}/support/tickets", BASE_URL))
        .bearer_auth(&agent_token)
        .send()
        .await
        .expect("Failed to list queue")
        .json()
        .await
        .expect("Failed to parse queue");
    let ticket = tickets
        .as_array()
        .expect("Expected array")
        .iter()
        .find(|t| t["id"].as_i64() == Some(ticket_id))
        .expect("ticket not in queue");
    assert_eq!(ticket["status"], "en_proceso");
    assert!(ticket["agent_id"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_peer_receives_broadcast_message() {
    let client = Client::new();
    let user_token = get_auth_token(&client, USER_EMAIL).await;
    let agent_token = get_auth_token(&client, AGENT_EMAIL).await;
    let ticket_id = create_ticket(&client, &user_token, "Difusión a la sala").await;

    let mut user_stream = connect(&user_token).await;
    wait_for(&mut user_stream, "notificaciones_pendientes").await;
    send_event(&mut user_stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    wait_for(&mut user_stream, "joined_ticket").await;

    let mut agent_stream = connect(&agent_token).await;
    wait_for(&mut agent_stream, "notificaciones_pendientes").await;
    send_event(&mut agent_stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    wait_for(&mut agent_stream, "joined_ticket").await;

    send_event(
        &mut agent_stream,
        json!({ "type": "send_support_message", "ticketId": ticket_id, "contenido": "respuesta" }),
    )
    .await;

    let event = wait_for(&mut user_stream, "nuevo_mensaje_soporte").await;
    assert_eq!(event["mensaje"], "respuesta");
    assert_eq!(event["tipo"], "agente");
    assert!(event["nombreEmisor"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_agent_typing_not_relayed() {
    let client = Client::new();
    let user_token = get_auth_token(&client, USER_EMAIL).await;
    let agent_token = get_auth_token(&client, AGENT_EMAIL).await;
    let ticket_id = create_ticket(&client, &user_token, "Escritura de agente").await;

    let mut user_stream = connect(&user_token).await;
    wait_for(&mut user_stream, "notificaciones_pendientes").await;
    send_event(&mut user_stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    wait_for(&mut user_stream, "joined_ticket").await;

    let mut agent_stream = connect(&agent_token).await;
    wait_for(&mut agent_stream, "notificaciones_pendientes").await;
    send_event(&mut agent_stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    wait_for(&mut agent_stream, "joined_ticket").await;

    // A plain agent's typing indicator is dropped; only owner and admin
    // indicators relay. The follow-up message acts as an ordering fence.
    send_event(&mut agent_stream, json!({ "type": "typing_support", "ticketId": ticket_id })).await;
    send_event(
        &mut agent_stream,
        json!({ "type": "send_support_message", "ticketId": ticket_id, "contenido": "un momento" }),
    )
    .await;

    let seen = collect_until(&mut user_stream, "nuevo_mensaje_soporte").await;
    assert!(
        seen.iter().all(|e| e["type"] != "user_typing_support"),
        "agent typing indicator must not reach room peers"
    );
}

#[tokio::test]
#[ignore]
async fn test_clear_all_notifications_idempotent() {
    let client = Client::new();
    let token = get_auth_token(&client, USER_EMAIL).await;

    let mut stream = connect(&token).await;
    wait_for(&mut stream, "notificaciones_pendientes").await;

    // Both calls ack, including the second over an already-empty unread set.
    send_event(&mut stream, json!({ "type": "clear_all_notifications" })).await;
    wait_for(&mut stream, "notifications_cleared").await;

    send_event(&mut stream, json!({ "type": "clear_all_notifications" })).await;
    let seen = collect_until(&mut stream, "notifications_cleared").await;
    assert_eq!(seen.len(), 1, "second clear must ack exactly once");

    // Read-state set unchanged after the second call.
    let notifications: Value = client
        .get(format!("{}/notifications", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to list notifications")
        .json()
        .await
        .expect("Failed to parse notifications");
    for n in notifications.as_array().expect("Expected array") {
        assert_eq!(n["read"], true);
    }
}

#[tokio::test]
#[ignore]
async fn test_message_order_matches_persistence() {
    let client = Client::new();
    let user_token = get_auth_token(&client, USER_EMAIL).await;
    let agent_token = get_auth_token(&client, AGENT_EMAIL).await;
    let ticket_id = create_ticket(&client, &user_token, "Orden de mensajes").await;

    let mut user_stream = connect(&user_token).await;
    wait_for(&mut user_stream, "notificaciones_pendientes").await;
    send_event(&mut user_stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    wait_for(&mut user_stream, "joined_ticket").await;

    let mut agent_stream = connect(&agent_token).await;
    wait_for(&mut agent_stream, "notificaciones_pendientes").await;
    send_event(&mut agent_stream, json!({ "type": "join_ticket", "ticketId": ticket_id })).await;
    wait_for(&mut agent_stream, "joined_ticket").await;

    let bodies = ["uno", "dos", "tres"];
    for body in bodies {
        send_event(
            &mut user_stream,
            json!({ "type": "send_support_message", "ticketId": ticket_id, "contenido": body }),
        )
        .await;
    }

    // The peer sees the stream in persistence order.
    for body in bodies {
        let event = wait_for(&mut agent_stream, "nuevo_mensaje_soporte").await;
        assert_eq!(event["mensaje"], body);
    }

    // And the stored stream agrees (first entry is the ticket's opening message).
    let messages: Value = client
        .get(format!("{}/support/tickets/{}/messages", BASE_URL, ticket_id))
        .bearer_auth(&user_token)
        .send()
        .await
        .expect("Failed to fetch messages")
        .json()
        .await
        .expect("Failed to parse messages");
    let stored: Vec<&str> = messages
        .as_array()
        .expect("Expected array")
        .iter()
        .skip(1)
        .map(|m| m["body"].as_str().expect("body"))
        .collect();
    assert_eq!(stored, bodies);
}
