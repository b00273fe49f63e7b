//! Shared fixtures: canned HTTP server, static page renderer, recording transport

use async_trait::async_trait;
use p2p_rates::delivery::{ChatTransport, TransportError};
use p2p_rates::quote::FetchError;
use p2p_rates::source::PageRenderer;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Serve `body` as JSON to every request; returns the base URL
pub async fn serve_json(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(respond(stream, body));
        }
    });

    format!("http://{}/", addr)
}

async fn respond(mut stream: TcpStream, body: &'static str) {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];

    // Headers, then as much body as Content-Length announces
    let header_end = loop {
        let n = stream.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        request.extend_from_slice(&buf[..n]);
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < header_end + content_length {
        let n = stream.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Renderer returning a fixed page per fiat, chosen by URL suffix
pub struct StaticRenderer {
    pub pages: Vec<(&'static str, &'static str)>,
}

impl PageRenderer for StaticRenderer {
    fn render(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix))
            .map(|(_, html)| html.to_string())
            .ok_or_else(|| FetchError::SourceUnavailable(format!("no page for {}", url)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message { chat_id: i64, text: String, button: bool },
    Edit { chat_id: i64, message_id: i32, text: String },
    Answer,
}

/// Transport that records every call
#[derive(Default)]
pub struct RecordingTransport {
    pub log: Mutex<Vec<Sent>>,
    pub edit_error: Mutex<Option<TransportError>>,
    next_id: Mutex<i32>,
}

impl RecordingTransport {
    pub fn log(&self) -> Vec<Sent> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(&self, chat_id: i64, text: &str, refresh_button: bool) -> Result<i32, TransportError> {
        self.log.lock().unwrap().push(Sent::Message {
            chat_id,
            text: text.to_string(),
            button: refresh_button,
        });
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        Ok(*id)
    }

    async fn edit(&self, chat_id: i64, message_id: i32, text: &str) -> Result<(), TransportError> {
        self.log.lock().unwrap().push(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        match self.edit_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn answer_callback(&self, _callback_id: &str, _text: &str) -> Result<(), TransportError> {
        self.log.lock().unwrap().push(Sent::Answer);
        Ok(())
    }
}
