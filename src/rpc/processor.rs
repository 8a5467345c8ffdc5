// ABOUTME: JSON-RPC request processing: validation, method routing, and error mapping
// ABOUTME: Authorizes each call through the gateway and renders results as JSON-RPC responses

use crate::errors::AppError;
use crate::gateway::Gateway;
use crate::jsonrpc::{error_codes, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use crate::middleware::auth::{Operation, Transport};
use crate::services::accounts::{LoginRequest, RefreshRequest, RegisterRequest};
use crate::services::notifications::{
    BroadcastRequest, FilterRequest, MarkReadRequest, PublishRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Methods served over JSON-RPC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    /// Create an account
    Register,
    /// Exchange credentials for tokens
    Login,
    /// Exchange a refresh token for tokens
    TokenRefresh,
    /// Publish to one user's channel
    Publish,
    /// Publish to every regular user
    Broadcast,
    /// Mark one of the caller's notifications read
    MarkAsRead,
    /// The caller's notifications matching a filter
    GetNotificationsByFilter,
    /// The caller's account
    GetProfile,
    /// Every account
    GetUsers,
}

impl RpcMethod {
    /// Every method, in dispatch order
    pub const ALL: [Self; 9] = [
        Self::Register,
        Self::Login,
        Self::TokenRefresh,
        Self::Publish,
        Self::Broadcast,
        Self::MarkAsRead,
        Self::GetNotificationsByFilter,
        Self::GetProfile,
        Self::GetUsers,
    ];

    /// Look up a method by its wire name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == name)
    }

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "Register",
            Self::Login => "Login",
            Self::TokenRefresh => "TokenRefresh",
            Self::Publish => "Publish",
            Self::Broadcast => "Broadcast",
            Self::MarkAsRead => "MarkAsRead",
            Self::GetNotificationsByFilter => "GetNotificationsByFilter",
            Self::GetProfile => "GetProfile",
            Self::GetUsers => "GetUsers",
        }
    }

    /// Gateway operation this method invokes
    #[must_use]
    pub const fn operation(self) -> Operation {
        match self {
            Self::Register => Operation::Register,
            Self::Login => Operation::Login,
            Self::TokenRefresh => Operation::TokenRefresh,
            Self::Publish => Operation::Publish,
            Self::Broadcast => Operation::Broadcast,
            Self::MarkAsRead => Operation::MarkAsRead,
            Self::GetNotificationsByFilter => Operation::ListNotifications,
            Self::GetProfile => Operation::Profile,
            Self::GetUsers => Operation::ListUsers,
        }
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a call produced no result
enum RpcFailure {
    InvalidRequest(String),
    MethodNotFound(String),
    InvalidParams(String),
    Application(AppError),
}

impl From<AppError> for RpcFailure {
    fn from(error: AppError) -> Self {
        Self::Application(error)
    }
}

type RpcResult = Result<Value, RpcFailure>;

/// Routes JSON-RPC requests to gateway operations
#[derive(Clone)]
pub struct RpcRequestProcessor {
    gateway: Arc<Gateway>,
}

impl RpcRequestProcessor {
    /// Create a processor over `gateway`
    #[must_use]
    pub const fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Handle one request; every outcome is a response
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let start_time = Instant::now();
        Self::log_request(&request);

        let id = request.id.clone();
        let response = match self.process_request(&request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(RpcFailure::InvalidRequest(message)) => {
                JsonRpcResponse::error(id, error_codes::INVALID_REQUEST, message)
            }
            Err(RpcFailure::MethodNotFound(method)) => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            ),
            Err(RpcFailure::InvalidParams(message)) => JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Invalid params: {message}"),
            ),
            Err(RpcFailure::Application(error)) => {
                error.log_at_boundary();
                JsonRpcResponse::from_app_error(id, &error)
            }
        };

        debug!(
            rpc_method = %request.method,
            success = response.is_success(),
            duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(0),
            "Completed RPC request"
        );
        response
    }

    async fn process_request(&self, request: &JsonRpcRequest) -> RpcResult {
        Self::validate_request(request)?;

        let method = RpcMethod::from_name(&request.method)
            .ok_or_else(|| RpcFailure::MethodNotFound(request.method.clone()))?;
        let operation = method.operation();
        let gateway = &self.gateway;

        match method {
            RpcMethod::Register => {
                gateway.authorize(Transport::Rpc, operation, request)?;
                let params: RegisterRequest = Self::params(request)?;
                to_result(gateway.register(params).await?)
            }
            RpcMethod::Login => {
                gateway.authorize(Transport::Rpc, operation, request)?;
                let params: LoginRequest = Self::params(request)?;
                to_result(gateway.login(params).await?)
            }
            RpcMethod::TokenRefresh => {
                gateway.authorize(Transport::Rpc, operation, request)?;
                let params: RefreshRequest = Self::params(request)?;
                to_result(gateway.refresh(&params.refresh_token).await?)
            }
            RpcMethod::Publish => {
                let principal = gateway.principal(Transport::Rpc, operation, request)?;
                let params: PublishRequest = Self::params(request)?;
                to_result(
                    gateway
                        .publish(&principal, &params.channel, params.data)
                        .await?,
                )
            }
            RpcMethod::Broadcast => {
                let principal = gateway.principal(Transport::Rpc, operation, request)?;
                let params: BroadcastRequest = Self::params(request)?;
                to_result(gateway.broadcast(&principal, params.data).await?)
            }
            RpcMethod::MarkAsRead => {
                let principal = gateway.principal(Transport::Rpc, operation, request)?;
                let params: MarkReadRequest = Self::params(request)?;
                gateway
                    .mark_as_read(&principal, params.notification_id)
                    .await?;
                Ok(json!({"status": "ok"}))
            }
            RpcMethod::GetNotificationsByFilter => {
                let principal = gateway.principal(Transport::Rpc, operation, request)?;
                let params: FilterRequest = Self::params(request)?;
                to_result(
                    gateway
                        .list_filtered(&principal, params.filter_or_all())
                        .await?,
                )
            }
            RpcMethod::GetProfile => {
                let principal = gateway.principal(Transport::Rpc, operation, request)?;
                to_result(gateway.profile(&principal).await?)
            }
            RpcMethod::GetUsers => {
                let principal = gateway.principal(Transport::Rpc, operation, request)?;
                to_result(gateway.list_users(&principal).await?)
            }
        }
    }

    fn validate_request(request: &JsonRpcRequest) -> Result<(), RpcFailure> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(RpcFailure::InvalidRequest(format!(
                "Invalid JSON-RPC version: got '{}', expected '{JSONRPC_VERSION}'",
                request.jsonrpc
            )));
        }
        if request.method.is_empty() {
            return Err(RpcFailure::InvalidRequest("Missing method".to_owned()));
        }
        Ok(())
    }

    /// Decode params; absent params decode as an empty object
    fn params<T: DeserializeOwned>(request: &JsonRpcRequest) -> Result<T, RpcFailure> {
        let params = request
            .params
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        serde_json::from_value(params).map_err(|e| RpcFailure::InvalidParams(e.to_string()))
    }

    fn log_request(request: &JsonRpcRequest) {
        debug!(
            rpc_method = %request.method,
            rpc_id = ?request.id,
            auth_present = request.auth_token.is_some() || request.header("authorization").is_some(),
            "Received RPC request"
        );
    }
}

fn to_result<T: Serialize>(value: T) -> RpcResult {
    serde_json::to_value(value).map_err(|e| {
        RpcFailure::Application(
            AppError::internal(format!("Failed to serialize RPC result: {e}")).with_source(e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_round_trip() {
        for method in RpcMethod::ALL {
            assert_eq!(RpcMethod::from_name(method.as_str()), Some(method));
        }
        assert_eq!(RpcMethod::from_name("register"), None);
        assert_eq!(RpcMethod::from_name("Presence"), None);
    }

    #[test]
    fn test_filter_listing_maps_to_list_operation() {
        assert_eq!(
            RpcMethod::GetNotificationsByFilter.operation(),
            Operation::ListNotifications
        );
        assert_eq!(RpcMethod::GetUsers.operation(), Operation::ListUsers);
    }
}
