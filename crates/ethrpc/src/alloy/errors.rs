use alloy::{primitives::Bytes, transports::TransportError};

pub trait RpcErrorExt {
    /// Returns whether the node received the request and answered with an
    /// error object, e.g. because the call reverted. Everything else (timeouts,
    /// refused connections, malformed responses) counts as the node being
    /// unreachable.
    fn is_node_rejection(&self) -> bool;

    /// Revert data attached to the error response, if any.
    fn revert_data(&self) -> Option<Bytes>;
}

impl RpcErrorExt for TransportError {
    fn is_node_rejection(&self) -> bool {
        self.as_error_resp().is_some()
    }

    fn revert_data(&self) -> Option<Bytes> {
        self.as_error_resp()
            .and_then(|payload| payload.as_revert_data())
    }
}

/// Create an error as if the node rejected the request.
/// Useful for testing.
#[cfg(any(test, feature = "test-util"))]
pub fn testing_node_rejection() -> TransportError {
    TransportError::ErrorResp(alloy::rpc::json_rpc::ErrorPayload::internal_error())
}

/// Create an error as if the node could not be reached.
/// Useful for testing.
#[cfg(any(test, feature = "test-util"))]
pub fn testing_unreachable_node() -> TransportError {
    alloy::transports::TransportErrorKind::custom_str("connection refused")
}
