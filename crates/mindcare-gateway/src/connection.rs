use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use mindcare_db::Database;
use mindcare_types::api::{ReplyRecord, ThreadSummary};
use mindcare_types::events::{GatewayCommand, GatewayEvent};
use mindcare_types::models::SessionUser;

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection. The session (if any) was resolved
/// from the cookie at the HTTP upgrade layer; thread and reply creation
/// require it, room membership does not.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    session: Option<SessionUser>,
) {
    let (mut sender, mut receiver) = socket.split();

    let who = session
        .as_ref()
        .map(|u| u.name.clone())
        .unwrap_or_else(|| "anonymous".into());
    info!("{} connected to gateway", who);

    // Subscribe to broadcasts and relay to this client
    let mut broadcast_rx = dispatcher.subscribe();

    // Targeted events (command rejections) flow through a per-connection channel
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<GatewayEvent>();

    // Per-connection room membership, shared between send and recv tasks.
    // Membership lives and dies with the socket, so a dropped connection
    // leaves no stale room entries behind.
    let rooms: Arc<std::sync::RwLock<HashSet<String>>> =
        Arc::new(std::sync::RwLock::new(HashSet::new()));
    let send_rooms = rooms.clone();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Spawn task to forward broadcasts + targeted events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    {
                        let subs = send_rooms.read().expect("room lock poisoned");
                        if !should_deliver(&event, &subs) {
                            continue;
                        }
                    }

                    if sender
                        .send(Message::Text(serde_json::to_string(&event).unwrap().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                result = direct_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };

                    if sender
                        .send(Message::Text(serde_json::to_string(&event).unwrap().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let recv_rooms = rooms.clone();
    let recv_session = session;
    let recv_who = who.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(
                            &dispatcher,
                            &db,
                            recv_session.as_ref(),
                            cmd,
                            &recv_rooms,
                            &direct_tx,
                        )
                        .await;
                    }
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            recv_who,
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("{} disconnected from gateway", who);
}

/// Room-scoped events go only to members of that room; global events go to all.
fn should_deliver(event: &GatewayEvent, rooms: &HashSet<String>) -> bool {
    match event.room() {
        Some(room) => rooms.contains(&room),
        None => true,
    }
}

async fn handle_command(
    dispatcher: &Dispatcher,
    db: &Arc<Database>,
    session: Option<&SessionUser>,
    cmd: GatewayCommand,
    rooms: &Arc<std::sync::RwLock<HashSet<String>>>,
    direct_tx: &mpsc::UnboundedSender<GatewayEvent>,
) {
    match cmd {
        // Room names are client-supplied and not checked against thread
        // existence; joining a room only scopes which events this
        // connection receives.
        GatewayCommand::JoinRoom { room } => {
            rooms.write().expect("room lock poisoned").insert(room);
        }

        GatewayCommand::LeaveRoom { room } => {
            rooms.write().expect("room lock poisoned").remove(&room);
        }

        GatewayCommand::NewThread {
            title,
            category,
            body,
        } => {
            let Some(user) = session else {
                reject(direct_tx, "You must be logged in to post.");
                return;
            };

            if title.trim().is_empty() || body.trim().is_empty() {
                reject(direct_tx, "Title and body are required.");
                return;
            }

            let thread_id = Uuid::new_v4();
            let author_name = display_name(user);

            // Run blocking DB insert off the async runtime
            let db = db.clone();
            let insert = {
                let (tid, title, category, author, body) = (
                    thread_id.to_string(),
                    title.clone(),
                    category.clone(),
                    author_name.clone(),
                    body.clone(),
                );
                tokio::task::spawn_blocking(move || {
                    db.insert_thread(&tid, &title, &category, &author, &body)
                })
                .await
            };

            match insert {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Thread insert failed: {}", e);
                    reject(direct_tx, "Could not save your thread.");
                    return;
                }
                Err(e) => {
                    error!("spawn_blocking join error: {}", e);
                    reject(direct_tx, "Could not save your thread.");
                    return;
                }
            }

            // New threads are announced to every connected client
            dispatcher.broadcast(GatewayEvent::ThreadCreated {
                thread: ThreadSummary {
                    id: thread_id,
                    title,
                    category,
                    author_name,
                    body,
                    created_at: chrono::Utc::now(),
                    reply_count: 0,
                },
            });
        }

        GatewayCommand::NewReply { thread_id, body } => {
            let Some(user) = session else {
                reject(direct_tx, "You must be logged in to reply.");
                return;
            };

            if body.trim().is_empty() {
                reject(direct_tx, "Reply body is required.");
                return;
            }

            let reply_id = Uuid::new_v4();
            let author_name = display_name(user);

            let db = db.clone();
            let insert = {
                let (rid, tid, author, body) = (
                    reply_id.to_string(),
                    thread_id.to_string(),
                    author_name.clone(),
                    body.clone(),
                );
                tokio::task::spawn_blocking(move || {
                    if db.get_thread(&tid)?.is_none() {
                        return Ok(false);
                    }
                    db.insert_reply(&rid, &tid, &author, &body)?;
                    Ok::<bool, anyhow::Error>(true)
                })
                .await
            };

            match insert {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => {
                    reject(direct_tx, "Thread not found.");
                    return;
                }
                Ok(Err(e)) => {
                    error!("Reply insert failed: {}", e);
                    reject(direct_tx, "Could not save your reply.");
                    return;
                }
                Err(e) => {
                    error!("spawn_blocking join error: {}", e);
                    reject(direct_tx, "Could not save your reply.");
                    return;
                }
            }

            // Delivered only to connections that joined this thread's room
            dispatcher.broadcast(GatewayEvent::ReplyCreated {
                reply: ReplyRecord {
                    id: reply_id,
                    thread_id,
                    author_name,
                    body,
                    created_at: chrono::Utc::now(),
                },
            });
        }
    }
}

fn display_name(user: &SessionUser) -> String {
    if user.name.trim().is_empty() {
        "Anonymous".into()
    } else {
        user.name.clone()
    }
}

fn reject(direct_tx: &mpsc::UnboundedSender<GatewayEvent>, message: &str) {
    let _ = direct_tx.send(GatewayEvent::Error {
        message: message.into(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindcare_types::events::thread_room;

    fn reply_event(thread_id: Uuid) -> GatewayEvent {
        GatewayEvent::ReplyCreated {
            reply: ReplyRecord {
                id: Uuid::new_v4(),
                thread_id,
                author_name: "Asha".into(),
                body: "...".into(),
                created_at: chrono::Utc::now(),
            },
        }
    }

    #[test]
    fn replies_delivered_only_to_room_members() {
        let thread_id = Uuid::new_v4();
        let other_thread = Uuid::new_v4();

        let mut rooms = HashSet::new();
        rooms.insert(thread_room(thread_id));

        assert!(should_deliver(&reply_event(thread_id), &rooms));
        assert!(!should_deliver(&reply_event(other_thread), &rooms));
        assert!(!should_deliver(&reply_event(thread_id), &HashSet::new()));
    }

    #[test]
    fn thread_created_delivered_regardless_of_rooms() {
        let event = GatewayEvent::ThreadCreated {
            thread: ThreadSummary {
                id: Uuid::new_v4(),
                title: "t".into(),
                category: "c".into(),
                author_name: "a".into(),
                body: "b".into(),
                created_at: chrono::Utc::now(),
                reply_count: 0,
            },
        };

        assert!(should_deliver(&event, &HashSet::new()));
    }

    #[test]
    fn blank_display_name_falls_back_to_anonymous() {
        let user = SessionUser {
            id: Uuid::new_v4(),
            name: "  ".into(),
            email: "x@example.com".into(),
            avatar_url: None,
        };
        assert_eq!(display_name(&user), "Anonymous");
    }
}
