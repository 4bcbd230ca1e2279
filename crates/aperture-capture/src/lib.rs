//! The portal capture device: a tracked, button-driven handheld that
//! captures, drags, scales, browses, and deletes portals on the server.
//!
//! [`PortalCaptureDevice::update`] runs once per tick with the latest
//! [`InputFrame`]. Button edges are handled first, then the continuous
//! effects (scaling, dragging, gallery layout, device-anchored entry poses).

mod device;
pub mod drag;
mod error;
pub mod gallery;
mod input;

pub use device::{CaptureSettings, CaptureState, PortalCaptureDevice};
pub use error::CaptureError;
pub use input::{ButtonEdges, ButtonMap, CHANNEL_COUNT, CaptureAction, InputFrame};
