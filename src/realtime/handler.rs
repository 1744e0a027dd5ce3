//! WebSocket handler
//!
//! Upgrades and authenticates connections, then routes client events to the
//! access evaluator, ingestion pipeline, and notification service. Per
//! connection: connecting -> authenticated -> (joined rooms)* -> disconnected.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    models::{
        agent::AgentStatus,
        user::{Principal, UserClaims},
    },
    AppState,
};

use super::{
    connection::Connection,
    events::{ClientEvent, ServerEvent},
    registry::RoomId,
};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Bearer credential; the upgrade is rejected without a valid one.
    /// Optional at the extractor level so a missing token rejects as
    /// Unauthorized like an invalid one, not as a malformed query.
    token: Option<String>,
    /// Agent availability preference supplied at handshake
    estado: Option<AgentStatus>,
}

/// WebSocket endpoint: authenticates the handshake and upgrades
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
) -> Result<Response, StatusCode> {
    let token = params.token.as_deref().ok_or_else(|| {
        tracing::warn!("WebSocket auth failed: missing token");
        StatusCode::UNAUTHORIZED
    })?;
    let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
        .map_err(|e| {
            tracing::warn!(error = %e, "WebSocket auth failed: invalid token");
            StatusCode::UNAUTHORIZED
        })?;

    // Agent flag resolved from the registry, never from the client
    let principal = state
        .services
        .access
        .resolve_principal(&claims)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "WebSocket auth: failed to resolve principal");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::info!(user_id = principal.user_id, agent = principal.is_agent(), "WebSocket upgrade");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, principal, params.estado, state)))
}

/// Drive one accepted connection to disconnection
async fn handle_socket(
    socket: WebSocket,
    principal: Principal,
    estado: Option<AgentStatus>,
    state: AppState,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let conn = state
        .realtime
        .registry()
        .register(Connection::new(principal, tx))
        .await;
    let connection_id = conn.id;

    // Agents announce availability at registration
    if conn.is_agent() {
        let status = estado.unwrap_or(AgentStatus::Disponible);
        if let Err(e) = state.services.agents.set_availability(conn.user_id, status).await {
            tracing::warn!(user_id = conn.user_id, error = %e, "Failed to set agent availability");
        }
    }

    // Reconnection catch-up for queued notifications
    state.services.notifications.send_pending(conn.user_id).await;

    // Writer task: drains the connection's event channel onto the socket
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize server event");
                }
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => handle_client_event(event, &conn, &state).await,
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Malformed client event");
                    conn.send(ServerEvent::ErrorTicket {
                        message: "Evento no válido".to_string(),
                    });
                }
            },
            Message::Close(_) => break,
            // Axum answers pings itself
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Binary(_) => {
                conn.send(ServerEvent::ErrorTicket {
                    message: "Evento no válido".to_string(),
                });
            }
        }
    }

    // Disconnect: drop presence, then the best-effort agent-offline flip
    if let Some(departure) = state.realtime.registry().unregister(&connection_id).await {
        if departure.was_agent && departure.last_for_user {
            if let Err(e) = state
                .services
                .agents
                .set_availability(departure.user_id, AgentStatus::Offline)
                .await
            {
                tracing::warn!(user_id = departure.user_id, error = %e, "Failed to flip agent offline");
            }
        }
    }
    send_task.abort();
}

async fn handle_client_event(event: ClientEvent, conn: &Arc<Connection>, state: &AppState) {
    match event {
        ClientEvent::JoinTicket { ticket_id } => {
            match state
                .services
                .access
                .can_access_ticket(&conn.principal(), ticket_id)
                .await
            {
                Ok(_) => {
                    state
                        .realtime
                        .registry()
                        .join(&conn.id, RoomId::Ticket(ticket_id))
                        .await;
                    conn.send(ServerEvent::JoinedTicket { ticket_id });
                }
                // Denial is room-scoped; the connection stays usable
                Err(e) => conn.send(ServerEvent::ErrorTicket {
                    message: e.public_message(),
                }),
            }
        }

        ClientEvent::LeaveTicket { ticket_id } => {
            state
                .realtime
                .registry()
                .leave(&conn.id, RoomId::Ticket(ticket_id))
                .await;
            conn.send(ServerEvent::LeftTicket { ticket_id });
        }

        ClientEvent::TypingSupport { ticket_id } => {
            // Deliberately cheap check; disallowed indicators are dropped
            match state
                .services
                .access
                .can_signal_typing(&conn.principal(), ticket_id)
                .await
            {
                Ok(true) => {
                    state
                        .realtime
                        .registry()
                        .broadcast_except(
                            RoomId::Ticket(ticket_id),
                            &conn.id,
                            ServerEvent::UserTypingSupport {
                                ticket_id,
                                user_id: conn.user_id,
                            },
                        )
                        .await;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(ticket_id, error = %e, "Typing indicator check failed");
                }
            }
        }

        ClientEvent::SendSupportMessage { ticket_id, contenido } => {
            let joined = state
                .realtime
                .registry()
                .is_member(&conn.id, RoomId::Ticket(ticket_id))
                .await;
            if !joined {
                conn.send(ServerEvent::ErrorMensajeSoporte {
                    message: "No estás conectado a la sala del ticket".to_string(),
                });
                return;
            }

            match state
                .services
                .support
                .ingest(ticket_id, &conn.principal(), &contenido, joined)
                .await
            {
                Ok(payload) => {
                    let mensaje_id = payload.mensaje_id;
                    // Room broadcast without the sender, then a direct echo:
                    // the persisted row is the durability point the sender's
                    // UI confirms against, not its optimistic local copy
                    state
                        .realtime
                        .registry()
                        .broadcast_except(
                            RoomId::Ticket(ticket_id),
                            &conn.id,
                            ServerEvent::NuevoMensajeSoporte(payload.clone()),
                        )
                        .await;
                    conn.send(ServerEvent::NuevoMensajeSoporte(payload));
                    conn.send(ServerEvent::MensajeEnviadoConfirmacion {
                        success: true,
                        mensaje_id,
                    });
                }
                Err(e) => conn.send(ServerEvent::ErrorMensajeSoporte {
                    message: e.public_message(),
                }),
            }
        }

        ClientEvent::MarkNotificationRead { notification_id } => {
            if let Err(e) = state
                .services
                .notifications
                .mark_read(notification_id, conn.user_id)
                .await
            {
                tracing::warn!(notification_id, error = %e, "Failed to mark notification read");
                conn.send(ServerEvent::ErrorTicket {
                    message: e.public_message(),
                });
            }
        }

        ClientEvent::ClearAllNotifications => {
            if let Err(e) = state.services.notifications.mark_all_read(conn.user_id).await {
                tracing::warn!(user_id = conn.user_id, error = %e, "Failed to clear notifications");
                conn.send(ServerEvent::ErrorTicket {
                    message: e.public_message(),
                });
            }
        }
    }
}
