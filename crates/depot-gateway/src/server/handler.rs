//! WebSocket handler
//!
//! Authenticates the upgrade, registers the connection, and forwards
//! registry events to the socket until either side goes away or the peer
//! stops answering pings.

use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, stream::SplitStream, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

use crate::auth::{AuthPayload, Handshake};
use crate::connection::ConnectionId;
use crate::protocol::{CloseCode, Outbound, ServerEvent};
use crate::server::heartbeat::LastSeen;
use crate::server::GatewayState;

/// Channel buffer size for outgoing messages
const MESSAGE_BUFFER_SIZE: usize = 100;

/// How long a client without header or query credentials has to send its
/// auth payload
const AUTH_PAYLOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket realtime handler
pub async fn realtime_handler(
    State(state): State<GatewayState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let handshake = Handshake::from_request(&headers, query);
    ws.on_upgrade(move |socket| handle_socket(state, socket, handshake))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, handshake: Handshake) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    let handshake = if handshake.credential().is_none() {
        match read_auth_payload(&mut ws_stream).await {
            Some(payload) => handshake.with_auth(payload),
            None => handshake,
        }
    } else {
        handshake
    };

    let identity = match state.authenticator().authenticate(&handshake) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(error = %e, "Realtime handshake rejected");
            send_event(&mut ws_sink, &ServerEvent::unauthorized()).await;
            close(&mut ws_sink, CloseCode::AuthenticationFailed).await;
            return;
        }
    };

    let connection_id = ConnectionId::next();
    let (tx, mut rx) = mpsc::channel::<Outbound>(MESSAGE_BUFFER_SIZE);
    let admitted = state.registry().register(connection_id, identity, tx);

    if admitted {
        tracing::info!(
            connection_id = %connection_id,
            user_id = %identity.user_id,
            session_id = %identity.session_id,
            "Realtime connection established"
        );
    }

    let heartbeat = state.heartbeat();
    let last_seen = LastSeen::now();

    // Forward registry events to the socket and ping on the heartbeat interval
    let mut send_task = tokio::spawn(async move {
        let mut ping = interval_at(Instant::now() + heartbeat.interval, heartbeat.interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                outbound = rx.recv() => match outbound {
                    Some(Outbound::Event(event)) => {
                        if !send_event(&mut ws_sink, &event).await {
                            break;
                        }
                    }
                    Some(Outbound::Close(code)) => {
                        close(&mut ws_sink, code).await;
                        return;
                    }
                    None => break,
                },
                _ = ping.tick() => {
                    if ws_sink.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    // Clients only listen; any inbound frame, pongs included, marks the
    // connection as alive
    let seen = last_seen.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %connection_id, "Client closed connection");
                    break;
                }
                Ok(_) => seen.touch(),
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    let mut watchdog = tokio::spawn(async move {
        let mut check = interval(heartbeat.check_period());
        loop {
            check.tick().await;
            let silence = last_seen.elapsed();
            if silence > heartbeat.deadline() {
                tracing::warn!(
                    connection_id = %connection_id,
                    silence_ms = silence.as_millis(),
                    "Connection timed out (no pong)"
                );
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task ended");
        }
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task ended");
        }
        _ = &mut watchdog => {
            tracing::debug!(connection_id = %connection_id, "Heartbeat watchdog ended");
        }
    }

    send_task.abort();
    recv_task.abort();
    watchdog.abort();

    if state.registry().unregister(connection_id) {
        tracing::info!(connection_id = %connection_id, "Realtime connection closed");
    }
}

async fn read_auth_payload(stream: &mut SplitStream<WebSocket>) -> Option<AuthPayload> {
    let frame = tokio::time::timeout(AUTH_PAYLOAD_TIMEOUT, stream.next())
        .await
        .ok()??;
    match frame {
        Ok(Message::Text(text)) => serde_json::from_str(&text).ok(),
        _ => None,
    }
}

async fn send_event(sink: &mut SplitSink<WebSocket, Message>, event: &ServerEvent) -> bool {
    let json = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize realtime event");
            return true;
        }
    };
    if sink.send(Message::Text(json)).await.is_err() {
        tracing::debug!("Failed to send message to WebSocket");
        return false;
    }
    true
}

async fn close(sink: &mut SplitSink<WebSocket, Message>, code: CloseCode) {
    let frame = CloseFrame {
        code: code.as_u16(),
        reason: Cow::Borrowed(code.reason()),
    };
    let _ = sink.send(Message::Close(Some(frame))).await;
    let _ = sink.close().await;
}
