//! Client side of the portal pipeline.
//!
//! Each tick the [`PortalClient`] reconciles the replicated portal group
//! into [`PortalMirror`]s, propagates the one-way bindings, and evaluates a
//! [`PortalView`] per (mirror, observation slot) pair. The renderer consumes
//! the enabled [`PortalPipeline`]s and their output textures.

mod client;
mod client_view;
mod mirror;
mod pipeline;
mod reconciler;
mod render_mask;
mod slot;
mod upstream;
pub mod view;

pub use client::{ClientTick, PortalClient};
pub use client_view::ClientView;
pub use mirror::PortalMirror;
pub use pipeline::{PortalCamera, PortalPipeline};
pub use reconciler::{LOCAL_PORTAL_GROUP, MirrorObserver, PortalReconciler, ReconcileReport};
pub use render_mask::RenderMask;
pub use slot::{ObservationSlot, SlotPose, SlotRegistry};
pub use upstream::{ClientBindings, ClientUpstream};
pub use view::PortalView;
