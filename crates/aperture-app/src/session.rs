//! One process hosting both sides of the replication boundary: the server
//! portal group driven by the capture device, and a rendering client fed
//! with encoded snapshots.

use glam::Vec3;
use tracing::{debug, info};

use aperture_capture::{CaptureError, CaptureSettings, CaptureState, PortalCaptureDevice};
use aperture_client::{ClientTick, ObservationSlot, PortalClient, SlotPose, SlotRegistry};
use aperture_config::Config;
use aperture_portal::{PortalEvent, PortalRegistry, ReplicationError, replication};
use aperture_scene::SceneError;

use crate::script::{InputScript, ScriptError};

/// Errors raised while building or stepping a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("capture device: {0}")]
    Capture(#[from] CaptureError),

    #[error("client scene: {0}")]
    Scene(#[from] SceneError),

    #[error("replication: {0}")]
    Replication(#[from] ReplicationError),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Outcome of one [`Session::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTick {
    pub tick: u64,
    /// Device state after the input frame.
    pub state: CaptureState,
    /// Portal lifecycle events raised on the server this tick.
    pub events: Vec<PortalEvent>,
    /// Encoded snapshot size.
    pub snapshot_bytes: usize,
    pub client: ClientTick,
}

#[derive(Debug, Clone, Copy)]
struct Seat {
    slot: ObservationSlot,
    head: Vec3,
    eye_distance: f32,
}

/// Capture device, portal group, and one client, stepped in lockstep.
#[derive(Debug)]
pub struct Session {
    registry: PortalRegistry,
    device: PortalCaptureDevice,
    client: PortalClient,
    script: InputScript,
    seats: Vec<Seat>,
    tick: u64,
}

impl Session {
    pub fn new(config: &Config, script: InputScript) -> Result<Self, SessionError> {
        let device = PortalCaptureDevice::new(CaptureSettings::from_config(config)?);
        let client = PortalClient::new(
            &config.render,
            SlotRegistry::from_config(&config.session.slots),
        )?;
        let seats = config
            .session
            .slots
            .iter()
            .map(|slot| Seat {
                slot: slot.into(),
                head: Vec3::from_array(slot.head_position),
                eye_distance: slot.eye_distance,
            })
            .collect();
        info!(
            slots = config.session.slots.len(),
            frames = script.len(),
            "session created"
        );
        Ok(Self {
            registry: PortalRegistry::new(),
            device,
            client,
            script,
            seats,
            tick: 0,
        })
    }

    /// Ticks completed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn registry(&self) -> &PortalRegistry {
        &self.registry
    }

    pub fn device(&self) -> &PortalCaptureDevice {
        &self.device
    }

    pub fn client(&self) -> &PortalClient {
        &self.client
    }

    /// Plays the next input frame, replicates the portal group, and runs
    /// the client tick.
    pub fn step(&mut self) -> Result<SessionTick, SessionError> {
        let frame = self.script.frame(self.tick);
        let state = self.device.update(&frame, &mut self.registry);

        let events = self.registry.drain_events();
        for event in &events {
            debug!(?event, "replicating portal event");
        }

        self.tick += 1;
        let bytes = replication::encode(&self.registry.snapshot(self.tick))?;
        let snapshot = replication::decode(&bytes)?;

        for seat in &self.seats {
            let pose = SlotPose::seated(frame.platform, seat.head, seat.eye_distance);
            self.client.set_slot_pose(&seat.slot, pose);
        }
        let client = self.client.tick(Some(snapshot));
        debug!(
            tick = self.tick,
            ?state,
            portals = self.registry.len(),
            enabled = client.enabled_views,
            "session tick"
        );

        Ok(SessionTick {
            tick: self.tick,
            state,
            events,
            snapshot_bytes: bytes.len(),
            client,
        })
    }
}
