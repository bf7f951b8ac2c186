//! Test helpers for integration tests
//!
//! Provides a server running the full router over in-memory stores, thin
//! request wrappers, and a WebSocket client for the realtime endpoint.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use depot_api::{create_app, create_memory_state};
use depot_common::AppConfig;
use futures_util::{SinkExt, StreamExt};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const JWT_SECRET: &str = "integration-secret";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// How long a socket read may block before the test gives up
const WS_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let state = create_memory_state(config)?;
        let app = create_app(state);

        // Bind to an ephemeral port
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        // Cookies are handled by hand so tests can replay stale ones
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    /// Make a GET request with auth token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }

    /// Make a POST request with auth token and no body
    pub async fn post_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Make a POST request carrying the refresh cookie
    pub async fn post_with_cookie(&self, path: &str, refresh_token: &str) -> Result<Response> {
        Ok(self
            .client
            .post(self.url(path))
            .header(COOKIE, format!("{REFRESH_COOKIE}={refresh_token}"))
            .send()
            .await?)
    }

    /// Make a PUT request with auth token
    pub async fn put_auth<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<Response> {
        Ok(self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    /// Make a DELETE request with auth token
    pub async fn delete_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Open a realtime socket, authenticating through the query string
    pub async fn connect_ws(&self, token: &str) -> Result<WsClient> {
        WsClient::connect(&format!("ws://{}/ws?token={token}", self.addr)).await
    }

    /// Open a realtime socket with no credential on the URL
    pub async fn connect_ws_anonymous(&self) -> Result<WsClient> {
        WsClient::connect(&format!("ws://{}/ws", self.addr)).await
    }

    /// Poll readiness until the registry holds `expected` sockets
    pub async fn wait_for_sockets(&self, expected: u64) -> Result<()> {
        for _ in 0..50 {
            let ready: Value = self.get("/health/ready").await?.json().await?;
            if ready["realtime"]["sockets"].as_u64() == Some(expected) {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!("registry never reached {expected} sockets")
    }
}

/// Configuration with in-memory friendly defaults and a generous rate limit
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::with_defaults("postgres://unused", "redis://unused", JWT_SECRET);
    config.rate_limit.requests_per_second = 1000;
    config.rate_limit.burst = 1000;
    config
}

/// Refresh token value from a response's `Set-Cookie`, if one was set
pub fn refresh_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?;
            let value = pair.strip_prefix(REFRESH_COOKIE)?.strip_prefix('=')?;
            Some(value.to_string())
        })
}

/// Whether the response tells the browser to drop the refresh cookie
pub fn clears_refresh_cookie(response: &Response) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|cookie| {
            cookie.starts_with(&format!("{REFRESH_COOKIE}=;")) && cookie.contains("Max-Age=0")
        })
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}

/// Assert an error response and return its `error.code`
pub async fn assert_error(response: Response, expected_status: StatusCode) -> Result<String> {
    let body: Value = assert_json(response, expected_status).await?;
    body["error"]["code"]
        .as_str()
        .map(str::to_string)
        .context("error body has no code")
}

// ============================================================================
// WebSocket client
// ============================================================================

/// What the client observed on the next frame
#[derive(Debug)]
pub enum WsFrame {
    Event(Value),
    Closed(Option<u16>),
}

/// Minimal client for the realtime endpoint
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url).await?;
        Ok(Self { stream })
    }

    /// Send a text frame, e.g. the deferred auth payload
    pub async fn send_json(&mut self, value: &Value) -> Result<()> {
        self.stream.send(Message::Text(value.to_string())).await?;
        Ok(())
    }

    /// Next event or close, skipping control frames
    pub async fn next_frame(&mut self) -> Result<WsFrame> {
        loop {
            let msg = tokio::time::timeout(WS_READ_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for a frame")?;
            match msg {
                Some(Ok(Message::Text(text))) => {
                    return Ok(WsFrame::Event(serde_json::from_str(&text)?));
                }
                Some(Ok(Message::Close(frame))) => {
                    return Ok(WsFrame::Closed(frame.map(|f| u16::from(f.code))));
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return Ok(WsFrame::Closed(None)),
            }
        }
    }

    /// Next frame, which must be a JSON event
    pub async fn next_event(&mut self) -> Result<Value> {
        match self.next_frame().await? {
            WsFrame::Event(event) => Ok(event),
            WsFrame::Closed(code) => {
                anyhow::bail!("socket closed ({code:?}) instead of sending an event")
            }
        }
    }

    /// Next frame, which must be a close; returns its code
    pub async fn expect_close(&mut self) -> Result<Option<u16>> {
        match self.next_frame().await? {
            WsFrame::Closed(code) => Ok(code),
            WsFrame::Event(event) => anyhow::bail!("expected close, got event {event}"),
        }
    }

    /// Close from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream
            .close(Some(tokio_tungstenite::tungstenite::protocol::CloseFrame {
                code: CloseCode::Normal,
                reason: "done".into(),
            }))
            .await?;
        Ok(())
    }
}
