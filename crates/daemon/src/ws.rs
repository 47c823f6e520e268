// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket pump for live-update subscriptions.

use axum::extract::ws::{Message, WebSocket};
use ft_engine::{EngineError, Subscription};
use ft_wire::StreamFrame;
use tracing::debug;

/// Forward a subscription's events to a WebSocket until either side ends.
///
/// Client disconnect drops the subscription, which detaches it from the
/// hub; a slow-consumer close sends one error frame before the connection
/// goes down. Either way the hub slot is freed.
pub async fn serve_observe(mut socket: WebSocket, mut subscription: Subscription) {
    loop {
        tokio::select! {
            next = subscription.next() => {
                let frame = match next {
                    Ok(Some(event)) => StreamFrame::Event((&event).into()),
                    Ok(None) => {
                        let _ = send(&mut socket, &StreamFrame::End).await;
                        break;
                    }
                    Err(EngineError::SlowConsumer) => {
                        let _ = send(
                            &mut socket,
                            &StreamFrame::Error {
                                error: ft_core::ErrorKind::SlowConsumer,
                                message: "subscription fell behind and was closed".to_string(),
                            },
                        )
                        .await;
                        break;
                    }
                    Err(e) => {
                        let _ = send(
                            &mut socket,
                            &StreamFrame::Error {
                                error: e.kind(),
                                message: e.to_string(),
                            },
                        )
                        .await;
                        break;
                    }
                };
                if send(&mut socket, &frame).await.is_err() {
                    debug!("live-update client went away mid-send");
                    break;
                }
            }

            incoming = socket.recv() => {
                match incoming {
                    // Client hung up; tear the subscription down with us.
                    None | Some(Ok(Message::Close(_))) | Some(Err(_)) => {
                        debug!("live-update client disconnected");
                        break;
                    }
                    // Pings are answered by the transport; other client
                    // chatter is ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

async fn send(socket: &mut WebSocket, frame: &StreamFrame) -> Result<(), axum::Error> {
    let body = serde_json::to_string(frame).map_err(axum::Error::new)?;
    socket.send(Message::Text(body)).await
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
