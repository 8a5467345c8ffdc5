// ABOUTME: Request gating shared by the REST and RPC transports
// ABOUTME: Provides the authorization chain, admin guard, redaction, CORS, and request tracing

pub mod admin_guard;
pub mod auth;
pub mod cors;
pub mod redaction;
pub mod tracing;

// Authorization chain
pub use auth::{AuthorizationChain, CredentialSource, Operation, OperationPolicy, Transport};

// Role gate
pub use admin_guard::require_admin;

// Credential-safe logging
pub use redaction::describe_authorization;

// REST plumbing
pub use cors::setup_cors;
pub use self::tracing::{create_request_span, MakeRequestIdPrefixed, REQUEST_ID_HEADER};
