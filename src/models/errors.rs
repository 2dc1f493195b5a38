use thiserror::Error;

/// Service-level errors surfaced at the cart and catalog boundary
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Stored cart is corrupt for session {session_key}: {source}")]
    CorruptCart {
        session_key: String,
        #[source]
        source: CodecError,
    },

    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: i32 },

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },

    #[error("Invalid session key: {reason}")]
    InvalidSessionKey { reason: String },

    #[error("Session store error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },
}

/// Errors raised by session store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session store backend failed: {message}")]
    Backend { message: String },

    #[error("DynamoDB table not found: {table_name}. Ensure the table exists and IAM permissions are correct.")]
    TableNotFound { table_name: String },

    #[error("Timeout occurred during session store operation")]
    Timeout,
}

/// Errors decoding a persisted cart blob
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed cart payload: {source}")]
    Malformed {
        #[from]
        source: serde_json::Error,
    },

    #[error("Unsupported cart schema version: {found}")]
    UnsupportedVersion { found: u32 },
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for session store operations
pub type StoreResult<T> = Result<T, StoreError>;
