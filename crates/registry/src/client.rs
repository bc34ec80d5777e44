//! Caller side of the RPC substrate.

use crate::endpoint::EndpointName;
use crate::error::RemoteError;
use crate::wire::{decode_args, RpcRequest, RpcResponse};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use simlink_session::ClientSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// Client handle to one exported object
#[derive(Clone)]
pub struct RemoteHandle {
    endpoint: EndpointName,
    timeout: Duration,
    session: Arc<ClientSession>,
}

impl std::fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("endpoint", &self.endpoint.to_string())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RemoteHandle {
    /// Handle that stamps each call with the session's current id
    pub fn new(endpoint: EndpointName, timeout: Duration, session: Arc<ClientSession>) -> Self {
        Self {
            endpoint,
            timeout,
            session,
        }
    }

    /// Target endpoint
    pub fn endpoint(&self) -> &EndpointName {
        &self.endpoint
    }

    /// Handle to another object exported by the same node
    pub fn sibling(&self, name: &str) -> Result<Self, RemoteError> {
        let endpoint = self
            .endpoint
            .sibling(name)
            .map_err(|e| RemoteError::invalid_args(e.to_string()))?;
        Ok(Self {
            endpoint,
            timeout: self.timeout,
            session: Arc::clone(&self.session),
        })
    }

    /// Invoke one operation and wait for its result
    pub async fn call(&self, method: &str, args: Value) -> Result<Value, RemoteError> {
        let request = RpcRequest {
            endpoint: self.endpoint.to_string(),
            method: method.to_string(),
            session_id: self.session.session_id(),
            args,
        };

        match tokio::time::timeout(self.timeout, self.round_trip(&request)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::timeout(format!(
                "{} on {} did not answer within {:?}",
                method, self.endpoint, self.timeout
            ))),
        }
    }

    /// Invoke with typed arguments and a typed result
    pub async fn call_typed<A, R>(&self, method: &str, args: &A) -> Result<R, RemoteError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let args = serde_json::to_value(args).map_err(|e| RemoteError::invalid_args(e.to_string()))?;
        let value = self.call(method, args).await?;
        decode_args(value)
    }

    async fn round_trip(&self, request: &RpcRequest) -> Result<Value, RemoteError> {
        let addr = (self.endpoint.host(), self.endpoint.port());
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| RemoteError::transport(format!("connect {}: {}", self.endpoint, e)))?;
        let (reader, mut writer) = stream.into_split();

        let mut frame =
            serde_json::to_vec(request).map_err(|e| RemoteError::transport(e.to_string()))?;
        frame.push(b'\n');
        writer
            .write_all(&frame)
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))?;

        let mut lines = BufReader::new(reader).lines();
        let line = lines
            .next_line()
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))?
            .ok_or_else(|| RemoteError::transport("connection closed before response"))?;

        let response: RpcResponse = serde_json::from_str(&line)
            .map_err(|e| RemoteError::transport(format!("malformed response: {}", e)))?;
        debug!(endpoint = %self.endpoint, method = %request.method, "Call completed");
        response.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{bootstrap, BootstrapConfig};
    use crate::error::RemoteErrorKind;
    use crate::object::{CallContext, CoreBinding, RemoteObject};
    use async_trait::async_trait;
    use serde_json::json;
    use simlink_session::SessionMessage;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    struct Echo;

    #[async_trait]
    impl RemoteObject for Echo {
        async fn invoke(
            &self,
            ctx: &CallContext,
            method: &str,
            args: Value,
        ) -> Result<Value, RemoteError> {
            match method {
                "echo" => Ok(json!({ "session": ctx.session_id, "args": args })),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Value::Null)
                }
                other => Err(RemoteError::unknown_method(other)),
            }
        }
    }

    async fn start() -> crate::RegistryHandle {
        let config = BootstrapConfig {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            route_probe: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9),
        };
        bootstrap(&config, CoreBinding::new(Arc::new(Echo)), Vec::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn call_carries_session_and_args() {
        let handle = start().await;
        let session = Arc::new(ClientSession::new());
        session.apply(&SessionMessage::Assigned(4));

        let remote = RemoteHandle::new(
            handle.endpoint(crate::CORE_NAME).unwrap(),
            Duration::from_secs(2),
            session,
        );
        let value = remote.call("echo", json!([1, 2])).await.unwrap();
        assert_eq!(value, json!({ "session": 4, "args": [1, 2] }));

        let err = remote.call("missing", Value::Null).await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::UnknownMethod);
    }

    #[tokio::test]
    async fn unexported_sibling_is_not_found() {
        let handle = start().await;
        let remote = RemoteHandle::new(
            handle.endpoint(crate::CORE_NAME).unwrap(),
            Duration::from_secs(2),
            Arc::new(ClientSession::new()),
        );
        let err = remote
            .sibling("Weather")
            .unwrap()
            .call("echo", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::NotFound);
    }

    #[tokio::test]
    async fn call_times_out() {
        let handle = start().await;
        let remote = RemoteHandle::new(
            handle.endpoint(crate::CORE_NAME).unwrap(),
            Duration::from_millis(100),
            Arc::new(ClientSession::new()),
        );
        let err = remote.call("slow", Value::Null).await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Timeout);
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let probe = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let remote = RemoteHandle::new(
            EndpointName::core("127.0.0.1", port),
            Duration::from_secs(2),
            Arc::new(ClientSession::new()),
        );
        let err = remote.call("echo", Value::Null).await.unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Transport);
    }
}
