//! One-shot request client
//!
//! Opens a connection, sends one request frame, half-closes, and reads the
//! single response the server sends before closing.

use std::path::Path;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::config::ClientConfig;
use super::error::ClientError;
use crate::error::ProtocolError;
use crate::protocol::constants::FIELD_UUID;
use crate::protocol::{encode_frame, Framer, Request, Response};

/// What the server answered
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A well-formed `status` response
    Response(Response),
    /// Valid JSON that is not response-shaped
    Other(Value),
}

impl Reply {
    /// The reply as plain JSON, for display
    pub fn to_value(&self) -> Value {
        match self {
            Reply::Response(response) => {
                serde_json::to_value(response).unwrap_or(Value::Null)
            }
            Reply::Other(value) => value.clone(),
        }
    }
}

/// One-shot request client
///
/// # Example
/// ```no_run
/// use record_relay::client::{ClientConfig, RequestClient};
/// use record_relay::{Action, Request};
///
/// # async fn example() -> Result<(), record_relay::client::ClientError> {
/// let client = RequestClient::new(ClientConfig::new("localhost", 8080));
/// let reply = client.send(&Request::new("u1", Action::List)).await?;
/// println!("{:?}", reply);
/// # Ok(())
/// # }
/// ```
pub struct RequestClient {
    config: ClientConfig,
}

impl RequestClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a typed request
    pub async fn send(&self, request: &Request) -> Result<Reply, ClientError> {
        self.send_value(&request.to_value()).await
    }

    /// Send an arbitrary JSON request
    ///
    /// No validation happens here; the server reports missing fields.
    pub async fn send_value(&self, request: &Value) -> Result<Reply, ClientError> {
        let mut stream = connect(&self.config).await?;
        tracing::debug!(addr = %self.config.addr(), "Connected");

        let frame = encode_frame(request).map_err(|e| crate::Error::Protocol(ProtocolError::from(e)))?;
        stream.write_all(&frame).await?;
        // Nothing more to send
        stream.shutdown().await?;
        tracing::debug!("Request sent");

        let mut framer = Framer::with_max_frame_size(self.config.max_frame_size);
        let value = framer
            .read_frame(&mut stream)
            .await?
            .ok_or(ClientError::NoResponse)?;

        tracing::debug!(response = %value, "Response received");

        Ok(match serde_json::from_value::<Response>(value.clone()) {
            Ok(response) => Reply::Response(response),
            Err(_) => Reply::Other(value),
        })
    }
}

/// Open a TCP connection honoring the connect timeout
pub(super) async fn connect(config: &ClientConfig) -> Result<TcpStream, ClientError> {
    let addr = config.addr();

    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| ClientError::Connect {
            addr: addr.clone(),
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
        })?
        .map_err(|source| ClientError::Connect {
            addr: addr.clone(),
            source,
        })?;

    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Load a request from a JSON file and stamp it with `uuid`
///
/// Any `UUID` already in the file is replaced.
pub async fn load_request(path: &Path, uuid: &str) -> Result<Value, ClientError> {
    let raw = tokio::fs::read(path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ClientError::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ClientError::ReadInput {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let value: Value = serde_json::from_slice(&raw).map_err(|source| ClientError::InvalidInput {
        path: path.to_path_buf(),
        source,
    })?;

    let Value::Object(mut map) = value else {
        return Err(ClientError::NotAnObject {
            path: path.to_path_buf(),
        });
    };
    map.insert(FIELD_UUID.to_string(), Value::String(uuid.to_string()));

    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_load_request_injects_uuid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ACTION":"get","ID":"x1","UUID":"spoofed"}}"#).unwrap();

        let request = load_request(file.path(), "machine-1").await.unwrap();
        assert_eq!(
            request,
            json!({"ACTION": "get", "ID": "x1", "UUID": "machine-1"})
        );
    }

    #[tokio::test]
    async fn test_load_request_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ACTION": "get", "ID": }}"#).unwrap();

        let err = load_request(file.path(), "machine-1").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput { .. }));
        assert!(err.to_string().contains("is not valid JSON"));
    }

    #[tokio::test]
    async fn test_load_request_not_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();

        let err = load_request(file.path(), "machine-1").await.unwrap_err();
        assert!(matches!(err, ClientError::NotAnObject { .. }));
    }

    #[tokio::test]
    async fn test_load_request_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_request(&dir.path().join("nope.json"), "machine-1")
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InputNotFound { .. }));
    }

    #[test]
    fn test_reply_to_value() {
        let reply = Reply::Response(Response::error("Item not found"));
        assert_eq!(
            reply.to_value(),
            json!({"status": "Error", "message": "Item not found"})
        );

        let other = Reply::Other(json!({"id": "x1"}));
        assert_eq!(other.to_value(), json!({"id": "x1"}));
    }
}
