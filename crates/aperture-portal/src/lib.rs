//! Portal Entity data model, server-side portal registry, and the
//! replication snapshot carried from the server to rendering clients.
//!
//! A [`PortalEntity`] is owned by the server. Its identity is a
//! [`PortalId`] allocated from a monotonically increasing counter, so clients
//! match replicated portals by id rather than by transient reference.

mod entity;
mod error;
mod modes;
mod registry;
pub mod replication;

pub use entity::{PortalEntity, PortalId, PortalSpec};
pub use error::{PortalError, ReplicationError};
pub use modes::{BorderMaterial, NegativeParallax, PortalModes, ProjectionMode, ViewingMode, Visibility};
pub use registry::{PortalEvent, PortalManager, PortalRegistry};
pub use replication::PortalGroupSnapshot;
