//! HttpTransport - `Transport` over the arena's JSON HTTP API.
//!
//! Response contract of both endpoints:
//! - success: 2xx with `{"success": true, ...}`
//! - failure: any status with `{"success": false, "error": "..."}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use crate::config::TransportConfig;
use crate::domain::{DispatchError, OperationKind};
use crate::ports::Transport;

pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// `timeout` is applied by the client as a second line of defence; the
    /// queue enforces its own per-attempt timeout around every dispatch.
    pub fn new(config: TransportConfig, timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(config, client))
    }

    /// Use a preconfigured client (proxy, TLS roots, pooling).
    pub fn with_client(config: TransportConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(&self, kind: OperationKind, payload: &Value) -> Result<Value, DispatchError> {
        let url = self.config.endpoint(kind);
        debug!(%kind, %url, "dispatching");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        interpret_response(status, &body)
    }
}

/// Map a raw HTTP response onto the arena's success/error contract.
pub fn interpret_response(status: u16, body: &[u8]) -> Result<Value, DispatchError> {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();

    if !(200..300).contains(&status) {
        let message = parsed
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
        let message = if message.is_empty() {
            format!("HTTP {status}")
        } else {
            message
        };
        return Err(DispatchError::Status { status, message });
    }

    let Some(value) = parsed else {
        return Err(DispatchError::Decode(
            String::from_utf8_lossy(body).chars().take(200).collect(),
        ));
    };

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = error_message(&value).unwrap_or_else(|| "operation failed".to_string());
        return Err(DispatchError::Rejected(message));
    }

    Ok(value)
}

fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, answer `response_body` with 200, and return the
    /// raw request head and body.
    async fn serve_once(
        listener: TcpListener,
        response_body: &'static str,
    ) -> (String, Vec<u8>) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let head_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before request head");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length: usize = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse().ok())?
            })
            .unwrap_or(0);
        while buf.len() < head_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before request body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = buf[head_end..head_end + content_length].to_vec();

        let reply = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            response_body.len(),
            response_body
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        (head, body)
    }

    #[tokio::test]
    async fn dispatch_posts_json_to_kind_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(listener, r#"{"success":false,"error":"x"}"#));

        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let config = TransportConfig::new(format!("http://{addr}"));
        let transport = HttpTransport::with_client(config, client);
        let payload = json!({"matchId": 7, "move": {"from": "e2", "to": "e4"}});

        let err = transport
            .dispatch(OperationKind::RecordMove, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Rejected(ref m) if m == "x"));

        let (head, body) = server.await.unwrap();
        assert!(
            head.starts_with("POST /api/blockchain/record-move HTTP/1.1\r\n"),
            "unexpected request line: {head}"
        );
        assert!(head.to_ascii_lowercase().contains("content-type: application/json\r\n"));
        assert_eq!(body, serde_json::to_vec(&payload).unwrap());
    }

    #[test]
    fn success_body_is_returned() {
        let body = br#"{"success": true, "matchId": 42, "txHash": "0xabc"}"#;
        let value = interpret_response(200, body).unwrap();
        assert_eq!(value["matchId"], 42);
        assert_eq!(value["txHash"], "0xabc");
    }

    #[test]
    fn logical_failure_on_2xx_is_rejected() {
        let body = br#"{"success": false, "error": "insufficient gas"}"#;
        let err = interpret_response(200, body).unwrap_err();
        assert!(matches!(err, DispatchError::Rejected(ref m) if m == "insufficient gas"));
    }

    #[test]
    fn logical_failure_without_message() {
        let err = interpret_response(201, br#"{"success": false}"#).unwrap_err();
        assert!(matches!(err, DispatchError::Rejected(ref m) if m == "operation failed"));
    }

    #[rstest]
    #[case::structured(500, r#"{"success": false, "error": "nonce too low"}"#, "nonce too low")]
    #[case::plain_text(502, "Bad Gateway", "Bad Gateway")]
    #[case::empty(503, "", "HTTP 503")]
    #[case::structured_object(400, r#"{"error": {"code": 7}}"#, r#"{"code":7}"#)]
    fn non_2xx_carries_message(#[case] status: u16, #[case] body: &str, #[case] expected: &str) {
        let err = interpret_response(status, body.as_bytes()).unwrap_err();
        match err {
            DispatchError::Status { status: got, message } => {
                assert_eq!(got, status);
                assert_eq!(message, expected);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn non_json_2xx_is_decode_error() {
        let err = interpret_response(200, b"<html>ok</html>").unwrap_err();
        assert!(matches!(err, DispatchError::Decode(_)));
    }

    #[test]
    fn body_without_success_flag_counts_as_success() {
        let value = interpret_response(200, br#"{"ok": 1}"#).unwrap();
        assert_eq!(value["ok"], 1);
    }
}
