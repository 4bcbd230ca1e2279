//! Capture device error types.

/// Errors raised while building the device's button map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The configured action name is not a capture action.
    #[error("unknown capture action '{0}'")]
    UnknownAction(String),

    /// The configured channel does not exist on the device.
    #[error("channel {channel} for '{action}' is out of range (device has 16 channels)")]
    ChannelOutOfRange {
        /// Action name as configured.
        action: String,
        /// Requested channel.
        channel: u8,
    },
}
