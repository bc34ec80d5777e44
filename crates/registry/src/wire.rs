//! JSON frames exchanged on an RPC connection.

use crate::error::RemoteError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simlink_core::{SessionId, NO_SESSION};

/// One remote call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Full endpoint name of the target object
    pub endpoint: String,
    /// Operation name
    pub method: String,
    /// Session the caller obtained from the handshake, 0 if none
    #[serde(default = "no_session")]
    pub session_id: SessionId,
    /// Operation arguments
    #[serde(default)]
    pub args: Value,
}

fn no_session() -> SessionId {
    NO_SESSION
}

/// Outcome of one remote call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RpcResponse {
    /// Operation result
    #[serde(rename = "ok")]
    Ok(Value),
    /// Operation or dispatch failure
    #[serde(rename = "err")]
    Err(RemoteError),
}

impl From<Result<Value, RemoteError>> for RpcResponse {
    fn from(result: Result<Value, RemoteError>) -> Self {
        match result {
            Ok(value) => RpcResponse::Ok(value),
            Err(err) => RpcResponse::Err(err),
        }
    }
}

impl From<RpcResponse> for Result<Value, RemoteError> {
    fn from(response: RpcResponse) -> Self {
        match response {
            RpcResponse::Ok(value) => Ok(value),
            RpcResponse::Err(err) => Err(err),
        }
    }
}

/// Decode call arguments into a typed value.
pub fn decode_args<T: DeserializeOwned>(args: Value) -> Result<T, RemoteError> {
    serde_json::from_value(args).map_err(|e| RemoteError::invalid_args(e.to_string()))
}

/// Encode an operation result.
pub fn encode_result<T: Serialize>(value: &T) -> Result<Value, RemoteError> {
    serde_json::to_value(value).map_err(|e| RemoteError::internal(e.to_string()))
}
