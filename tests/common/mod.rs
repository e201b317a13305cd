#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use deep_search::models::FragmentStream;
use deep_search::provider::{ChatProvider, ProviderRequest};
use deep_search::DeepSearchError;

/// What the fake provider does with a request
#[derive(Clone)]
pub enum Reply {
    Fragments(Vec<&'static str>),
    Reject(&'static str),
    FailAfter(Vec<&'static str>, &'static str),
}

/// In-process stand-in for the hosted chat API
pub struct FakeProvider {
    reply: Reply,
    pub calls: Mutex<Vec<(String, ProviderRequest)>>,
}

impl FakeProvider {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    async fn stream_chat(
        &self,
        api_key: &str,
        request: ProviderRequest,
    ) -> Result<FragmentStream, DeepSearchError> {
        self.calls.lock().push((api_key.to_string(), request));
        let items: Vec<anyhow::Result<String>> = match &self.reply {
            Reply::Fragments(fragments) => fragments.iter().map(|f| Ok(f.to_string())).collect(),
            Reply::Reject(message) => {
                return Err(DeepSearchError::ProviderError(message.to_string()))
            }
            Reply::FailAfter(fragments, message) => fragments
                .iter()
                .map(|f| Ok(f.to_string()))
                .chain(std::iter::once(Err(anyhow::anyhow!(message.to_string()))))
                .collect(),
        };
        Ok(Box::pin(stream::iter(items)))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

static KEY_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A fresh env var name, optionally set to a key
pub fn api_key_env(set: bool) -> String {
    let name = format!(
        "DEEP_SEARCH_TEST_KEY_{}_{}",
        std::process::id(),
        KEY_COUNTER.fetch_add(1, Ordering::SeqCst)
    );
    if set {
        std::env::set_var(&name, "test-key");
    }
    name
}

/// Serve `app` on an ephemeral loopback port and return its base URL
pub async fn serve_on_loopback(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A streamed body written chunk by chunk with a pause in between, so each
/// chunk reaches the client as a separate read
pub fn chunked_body(content_type: &'static str, chunks: Vec<Vec<u8>>) -> Response {
    let body = stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, std::io::Error>(Bytes::from(chunk))
    });
    ([(header::CONTENT_TYPE, content_type)], Body::from_stream(body)).into_response()
}
