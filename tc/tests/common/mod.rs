//! Shared test doubles for the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use taskchat::api::{ApiError, AssistReply, AssistRequest, ChatId, ChatMessage, ChatSummary, ChatTransport};
use taskchat::effects::{Notice, Notifier, Refresher};

/// Transport that answers from a script of JSON bodies
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Value, u16>>>,
    sent: Mutex<Vec<AssistRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    /// Queue a successful JSON body
    pub fn reply(self, body: Value) -> Self {
        self.replies.lock().unwrap().push_back(Ok(body));
        self
    }

    /// Queue a failure with the given HTTP status
    pub fn fail(self, status: u16) -> Self {
        self.replies.lock().unwrap().push_back(Err(status));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<AssistRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send_message(&self, request: AssistRequest) -> Result<AssistReply, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(body)) => Ok(serde_json::from_value(body)?),
            Some(Err(status)) => Err(ApiError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            None => Err(ApiError::InvalidResponse("script exhausted".to_string())),
        }
    }

    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn get_chat_messages(&self, _chat_id: ChatId) -> Result<Vec<ChatMessage>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Refresher counting each reload
#[derive(Default)]
pub struct CountingRefresher {
    pub tasks: AtomicUsize,
    pub categories: AtomicUsize,
    pub stats: AtomicUsize,
}

impl CountingRefresher {
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.tasks.load(Ordering::SeqCst),
            self.categories.load(Ordering::SeqCst),
            self.stats.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl Refresher for CountingRefresher {
    async fn load_tasks(&self) -> Result<(), ApiError> {
        self.tasks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_categories(&self) -> Result<(), ApiError> {
        self.categories.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_stats(&self) -> Result<(), ApiError> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Notifier keeping every notice
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// A request seen by the loopback stub
#[derive(Debug, Clone)]
pub struct Captured {
    pub head: String,
    pub body: String,
}

impl Captured {
    /// "METHOD /path" of the request line
    pub fn route(&self) -> String {
        self.head.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Serve `(status, body)` pairs in order on a loopback port, one connection each
///
/// Returns the base URL and the captured requests.
pub async fn serve(responses: Vec<(u16, Value)>) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));

    let sink = captured.clone();
    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };

            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let request = loop {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break Captured {
                        head: String::from_utf8_lossy(&buf).to_string(),
                        body: String::new(),
                    };
                }
                buf.extend_from_slice(&chunk[..n]);
                let Some(split) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&buf[..split]).to_string();
                let length = head
                    .lines()
                    .find_map(|l| {
                        l.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                let start = split + 4;
                if buf.len() >= start + length {
                    break Captured {
                        head,
                        body: String::from_utf8_lossy(&buf[start..start + length]).to_string(),
                    };
                }
            };
            sink.lock().unwrap().push(request);

            let body = body.to_string();
            let reply = format!(
                "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), captured)
}
