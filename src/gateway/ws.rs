//! `thread.stream` served as a WebSocket upgrade: the client sends one
//! `{threadId, message, model?}` frame, the server answers with the
//! [`UiEvent`] stream straight off [`ThreadCoordinator::stream`]. Closing
//! the socket from either side is the cancellation signal — dropping the
//! `StreamExt` consumer drops the `ReceiverStream`, which is exactly the
//! writer-close `tx.closed()` path the coordinator already watches for.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures::StreamExt;
use serde::Deserialize;

use crate::thread::ThreadStreamRequest;

use super::{rpc::user_id, state::GatewayState};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let uid = user_id(&headers);
    ws.on_upgrade(move |socket| handle_socket(socket, state, uid))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamStart {
    thread_id: String,
    message: String,
    model: Option<String>,
}

async fn handle_socket(mut socket: WebSocket, state: GatewayState, uid: String) {
    let start = match socket.recv().await {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<StreamStart>(&text) {
            Ok(s) => s,
            Err(e) => {
                let _ = send_error(&mut socket, format!("invalid thread.stream request: {e}")).await;
                return;
            }
        },
        _ => return,
    };

    let request = ThreadStreamRequest {
        thread_id: start.thread_id,
        user_id: uid,
        message: start.message,
        model: start.model,
    };

    let mut events = match state.coordinator.stream(request).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = send_error(&mut socket, e.to_string()).await;
            return;
        }
    };

    loop {
        tokio::select! {
            event = events.next() => {
                match event {
                    Some(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!(error = %e, "thread.stream: failed to serialize UiEvent");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break; // client disconnected
                        }
                    }
                    None => break, // turn finished
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {} // ignore anything else sent mid-turn
                }
            }
        }
    }
}

async fn send_error(socket: &mut WebSocket, message: String) -> Result<(), axum::Error> {
    let frame = serde_json::json!({ "type": "error", "message": message });
    socket.send(Message::Text(frame.to_string())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_start_accepts_camel_case_wire_shape() {
        let start: StreamStart = serde_json::from_str(
            r#"{"threadId": "t1", "message": "hello", "model": "gpt-4.1"}"#,
        )
        .unwrap();
        assert_eq!(start.thread_id, "t1");
        assert_eq!(start.message, "hello");
        assert_eq!(start.model.as_deref(), Some("gpt-4.1"));
    }

    #[test]
    fn stream_start_model_is_optional() {
        let start: StreamStart =
            serde_json::from_str(r#"{"threadId": "t1", "message": "hi"}"#).unwrap();
        assert_eq!(start.model, None);
    }
}
