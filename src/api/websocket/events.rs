//! Live events WebSocket handler
//!
//! Registers each browser with the event hub, relays client-submitted log
//! lines back into it and pings on an interval to catch half-open sockets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info};

use super::{WsClientChannel, WS_BUFFER_SIZE};
use crate::api::server::{wait_for_shutdown, AppState};
use crate::hub::{ClientChannel, EventHub};
use crate::models::Inbound;

/// WebSocket handler for live gallery events
pub async fn events_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_events_ws(socket, state))
}

/// Handle one WebSocket connection for its whole lifetime
async fn handle_events_ws(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(WS_BUFFER_SIZE);

    let hub = state.hub.clone();
    if hub.is_shut_down() {
        debug!("Hub is shut down, refusing connection");
        let _ = sender.send(Message::Close(None)).await;
        return;
    }

    let channel = Arc::new(WsClientChannel::new(tx));
    channel.mark_open();

    hub.add_log(format!(
        "New client connected. Total clients: {}",
        hub.client_count() + 1
    ));
    let registration = hub.register_client(channel.clone());
    if !registration.is_active() {
        debug!(client = %channel.id(), "Client was not registered, closing");
        let _ = sender.send(Message::Close(None)).await;
        return;
    }
    info!(client = %channel.id(), "Events WebSocket connected");

    // Cleared before each ping, set again by the pong
    let alive = Arc::new(AtomicBool::new(true));

    // Spawn task to deliver queued messages and keep-alive pings
    let send_alive = alive.clone();
    let send_channel = channel.clone();
    let keepalive = state.keepalive;
    let mut send_task = tokio::spawn(async move {
        let mut ticker = interval(keepalive);
        ticker.tick().await; // Skip immediate tick

        loop {
            tokio::select! {
                queued = rx.recv() => match queued {
                    Some(text) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if !send_alive.swap(false, Ordering::SeqCst) {
                        debug!("Events WebSocket missed a pong, closing");
                        break;
                    }
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
                _ = send_channel.closed() => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    let recv_hub = hub.clone();
    let recv_alive = alive.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => relay(&recv_hub, &text),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => relay(&recv_hub, &text),
                    Err(e) => {
                        recv_hub.add_log(format!("WebSocket message error: {}", e));
                    }
                },
                Ok(Message::Pong(_)) => {
                    recv_alive.store(true, Ordering::SeqCst);
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by axum
                }
                Ok(Message::Close(_)) => {
                    debug!("Events WebSocket received close");
                    break;
                }
                Err(e) => {
                    debug!("Events WebSocket error: {}", e);
                    break;
                }
            }
        }
    });

    // Wait for any task to complete
    tokio::select! {
        _ = &mut send_task => {
            debug!("Send task ended");
        }
        _ = &mut receive_task => {
            debug!("Receive task ended");
        }
        _ = wait_for_shutdown(state.shutdown.clone()) => {
            channel.close();
            // Let the sender flush the close frame
            let _ = tokio::time::timeout(Duration::from_secs(1), &mut send_task).await;
        }
    }

    send_task.abort();
    receive_task.abort();

    channel.mark_closed();
    let id = registration.id();
    drop(registration);

    info!(client = %id, "Events WebSocket disconnected");
    if !hub.is_shut_down() {
        hub.add_log(format!(
            "Client disconnected. Total clients: {}",
            hub.client_count()
        ));
    }
}

/// Feed one inbound text frame into the hub
fn relay(hub: &EventHub, text: &str) {
    match Inbound::parse(text) {
        Inbound::Log(msg) => {
            hub.add_log(msg);
        }
        Inbound::Ignored => debug!("Ignoring unrecognized client message"),
        Inbound::Malformed(reason) => {
            hub.add_log(format!("WebSocket message error: {}", reason));
        }
    }
}
