//! Portal model and replication error types.

/// Errors raised when mutating a portal entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortalError {
    /// Scale factors must be finite and strictly positive.
    #[error("invalid portal scale {0}")]
    InvalidScale(f32),
}

/// Errors raised while encoding or decoding a portal group snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    /// The snapshot could not be serialized.
    #[error("failed to encode portal snapshot: {0}")]
    Encode(#[source] postcard::Error),

    /// The payload is not a valid snapshot.
    #[error("failed to decode portal snapshot: {0}")]
    Decode(#[source] postcard::Error),
}
