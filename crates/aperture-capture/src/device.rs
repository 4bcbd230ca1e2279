//! The capture device state machine.

use glam::{Mat4, Vec3};
use tracing::{debug, info, warn};

use aperture_config::Config;
use aperture_portal::{
    BorderMaterial, NegativeParallax, PortalEntity, PortalId, PortalManager, PortalModes,
    PortalSpec, ProjectionMode, ViewingMode, Visibility,
};

use crate::drag::{DragAnchor, device_frame, drag_exit_pose};
use crate::gallery::{GalleryLayout, GrabBox, wrap_index};
use crate::{ButtonEdges, ButtonMap, CaptureAction, CaptureError, InputFrame};

/// Tunables of the capture device.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Width of captured portals.
    pub width: f32,
    /// Height of captured portals.
    pub height: f32,
    /// Per-tick scale factor while shrink is held.
    pub shrink_factor: f32,
    /// Per-tick scale factor while grow is held.
    pub grow_factor: f32,
    /// Carousel geometry.
    pub gallery: GalleryLayout,
    /// Box around carousel portals that grabs them back.
    pub grab: GrabBox,
    /// Border material of captured portals.
    pub border_material: String,
    /// Channel-to-action table.
    pub buttons: ButtonMap,
    /// Viewing mode of the first capture.
    pub default_viewing: ViewingMode,
    /// Parallax mode of the first capture.
    pub default_parallax: NegativeParallax,
}

impl CaptureSettings {
    /// Reads the `portal` and `capture` sections of the configuration.
    pub fn from_config(config: &Config) -> Result<Self, CaptureError> {
        let buttons = ButtonMap::with_overrides(&config.capture.buttons)?;
        Ok(Self::with_buttons(config, buttons))
    }

    fn with_buttons(config: &Config, buttons: ButtonMap) -> Self {
        let portal = &config.portal;
        Self {
            width: portal.width,
            height: portal.height,
            shrink_factor: portal.shrink_factor,
            grow_factor: portal.grow_factor,
            gallery: GalleryLayout {
                width: portal.width,
                height: portal.height,
                magnification: portal.gallery_magnification,
                spacing: portal.gallery_spacing,
            },
            grab: GrabBox {
                half_extents: Vec3::new(
                    portal.width * 0.5,
                    portal.grab_half_height,
                    portal.grab_half_depth,
                ),
            },
            border_material: portal.default_border_material.clone(),
            buttons,
            default_viewing: if config.capture.capture_in_3d {
                ViewingMode::ThreeD
            } else {
                ViewingMode::TwoD
            },
            default_parallax: if config.capture.capture_negative_parallax {
                NegativeParallax::Enabled
            } else {
                NegativeParallax::Disabled
            },
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::with_buttons(&Config::default(), ButtonMap::default())
    }
}

/// Observable state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No current portal.
    Idle,
    /// A current portal is displayed on the device.
    Holding,
    /// The current portal's exit pose follows the device.
    Dragging,
    /// Captured portals are laid out in the carousel.
    Gallery,
}

/// One captured portal. While `anchored`, its entry pose follows the
/// device frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CaptureSession {
    id: PortalId,
    anchored: bool,
}

/// Server-side handheld that creates, edits, browses, and deletes portals.
#[derive(Debug, Clone)]
pub struct PortalCaptureDevice {
    settings: CaptureSettings,
    sessions: Vec<CaptureSession>,
    current: Option<PortalId>,
    last_open: usize,
    focus: usize,
    /// Carousel anchor, latched when the gallery opens.
    gallery_station: Option<Mat4>,
    /// Set once the device has been outside every grab box since the gallery opened.
    grab_armed: bool,
    drag: Option<DragAnchor>,
    previous_buttons: u16,
    frame_visible: bool,
    default_viewing: ViewingMode,
    default_parallax: NegativeParallax,
    pose: Mat4,
    platform: Mat4,
}

impl PortalCaptureDevice {
    /// Creates an idle device.
    pub fn new(settings: CaptureSettings) -> Self {
        let default_viewing = settings.default_viewing;
        let default_parallax = settings.default_parallax;
        Self {
            settings,
            sessions: Vec::new(),
            current: None,
            last_open: 0,
            focus: 0,
            gallery_station: None,
            grab_armed: false,
            drag: None,
            previous_buttons: 0,
            frame_visible: false,
            default_viewing,
            default_parallax,
            pose: Mat4::IDENTITY,
            platform: Mat4::IDENTITY,
        }
    }

    /// Current state.
    pub fn state(&self) -> CaptureState {
        if self.gallery_station.is_some() {
            CaptureState::Gallery
        } else if self.drag.is_some() {
            CaptureState::Dragging
        } else if self.current.is_some() {
            CaptureState::Holding
        } else {
            CaptureState::Idle
        }
    }

    /// The portal displayed on the device.
    pub fn current(&self) -> Option<PortalId> {
        self.current
    }

    /// Position of the current portal in the captured collection.
    pub fn current_index(&self) -> Option<usize> {
        let id = self.current?;
        self.sessions.iter().position(|s| s.id == id)
    }

    /// Captured portals in capture order.
    pub fn captured(&self) -> impl Iterator<Item = PortalId> + '_ {
        self.sessions.iter().map(|s| s.id)
    }

    /// Index restored by the open action.
    pub fn last_open(&self) -> usize {
        self.last_open
    }

    /// Focused carousel index while the gallery is open.
    pub fn gallery_focus(&self) -> Option<usize> {
        self.gallery_station.map(|_| self.focus)
    }

    /// Whether the device's own frame outline is shown.
    pub fn frame_visible(&self) -> bool {
        self.frame_visible
    }

    /// Viewing and parallax modes the next capture will use.
    pub fn capture_defaults(&self) -> (ViewingMode, NegativeParallax) {
        (self.default_viewing, self.default_parallax)
    }

    /// World pose of the device frame.
    pub fn device_frame(&self) -> Mat4 {
        device_frame(self.platform, self.pose, self.settings.height)
    }

    /// Advances the device by one tick.
    pub fn update<M: PortalManager + ?Sized>(
        &mut self,
        frame: &InputFrame,
        manager: &mut M,
    ) -> CaptureState {
        self.pose = frame.pose;
        self.platform = frame.platform;
        self.prune(manager);

        let edges = self
            .settings
            .buttons
            .edges(self.previous_buttons, frame.buttons);
        self.previous_buttons = frame.buttons;

        for &action in &edges.released {
            self.on_release(action);
        }
        for &action in &edges.pressed {
            self.on_press(action, manager);
        }

        self.apply_scale(&edges, manager);
        self.apply_drag(manager);
        self.apply_gallery(manager);
        self.follow_device(manager);

        if self.current.is_some() {
            self.frame_visible = false;
        }
        self.state()
    }

    fn on_release(&mut self, action: CaptureAction) {
        match action {
            CaptureAction::Focus => self.frame_visible = false,
            CaptureAction::Capture => {
                if self.drag.take().is_some() {
                    debug!(portal = ?self.current, "drag released");
                }
            }
            _ => {}
        }
    }

    fn on_press<M: PortalManager + ?Sized>(&mut self, action: CaptureAction, manager: &mut M) {
        let in_gallery = self.gallery_station.is_some();
        match action {
            CaptureAction::Focus => {
                if self.current.is_none() {
                    self.frame_visible = true;
                }
            }
            CaptureAction::Capture if in_gallery => debug!("capture ignored in gallery"),
            CaptureAction::Capture => match self.current {
                None => self.capture(manager),
                Some(id) => {
                    if let Some(portal) = manager.portal(id) {
                        self.drag = Some(DragAnchor {
                            device: self.pose,
                            exit: portal.exit,
                        });
                        debug!(portal = %id, "drag started");
                    }
                }
            },
            CaptureAction::Close if !in_gallery => self.close(manager),
            CaptureAction::Open if !in_gallery => self.open(manager),
            CaptureAction::Delete if !in_gallery => self.delete(manager),
            CaptureAction::Prior => self.cycle(-1, manager),
            CaptureAction::Next => self.cycle(1, manager),
            CaptureAction::Gallery => {
                if in_gallery {
                    self.leave_gallery(manager);
                } else {
                    self.enter_gallery();
                }
            }
            CaptureAction::Mode2D => self.set_viewing(ViewingMode::TwoD, manager),
            CaptureAction::Mode3D => self.set_viewing(ViewingMode::ThreeD, manager),
            CaptureAction::ParallaxOn => self.set_parallax(NegativeParallax::Enabled, manager),
            CaptureAction::ParallaxOff => self.set_parallax(NegativeParallax::Disabled, manager),
            CaptureAction::Shrink | CaptureAction::Grow => {}
            CaptureAction::Close | CaptureAction::Open | CaptureAction::Delete => {
                debug!(?action, "ignored in gallery");
            }
        }
    }

    fn capture<M: PortalManager + ?Sized>(&mut self, manager: &mut M) {
        let frame = self.device_frame();
        let id = manager.add_portal(PortalSpec {
            entry: frame,
            exit: frame,
            scale: 1.0,
            width: self.settings.width,
            height: self.settings.height,
            modes: PortalModes {
                viewing: self.default_viewing,
                projection: ProjectionMode::Perspective,
                parallax: self.default_parallax,
                border: BorderMaterial::Material(self.settings.border_material.clone()),
                visibility: Visibility::Shown,
            },
        });
        self.sessions.push(CaptureSession { id, anchored: true });
        self.current = Some(id);
        self.last_open = self.sessions.len() - 1;
        info!(portal = %id, captured = self.sessions.len(), "portal captured");
    }

    fn close<M: PortalManager + ?Sized>(&mut self, manager: &mut M) {
        let Some(index) = self.current_index() else {
            return;
        };
        set_shown(manager, self.sessions[index].id, false);
        self.last_open = index;
        self.current = None;
        self.drag = None;
        debug!(index, "portal closed");
    }

    fn open<M: PortalManager + ?Sized>(&mut self, manager: &mut M) {
        if self.current.is_some() || self.sessions.is_empty() {
            return;
        }
        let index = self.last_open.min(self.sessions.len() - 1);
        let session = &mut self.sessions[index];
        session.anchored = true;
        set_shown(manager, session.id, true);
        self.current = Some(session.id);
        self.last_open = index;
        debug!(index, "portal opened");
    }

    fn delete<M: PortalManager + ?Sized>(&mut self, manager: &mut M) {
        let Some(index) = self.current_index() else {
            return;
        };
        let session = self.sessions.remove(index);
        self.current = None;
        self.drag = None;
        self.last_open = index.saturating_sub(1);
        self.focus = self.last_open;
        if !manager.remove_portal(session.id) {
            warn!(portal = %session.id, "manager did not know the deleted portal");
        }
        info!(portal = %session.id, captured = self.sessions.len(), "portal deleted");
    }

    fn cycle<M: PortalManager + ?Sized>(&mut self, step: isize, manager: &mut M) {
        if self.sessions.is_empty() {
            return;
        }
        if self.gallery_station.is_some() {
            self.focus = wrap_index(self.focus, step, self.sessions.len());
            return;
        }
        let Some(index) = self.current_index() else {
            return;
        };
        let next = wrap_index(index, step, self.sessions.len());
        if next == index {
            return;
        }
        set_shown(manager, self.sessions[index].id, false);
        let session = &mut self.sessions[next];
        session.anchored = true;
        set_shown(manager, session.id, true);
        self.current = Some(session.id);
        self.last_open = next;
        self.drag = None;
        debug!(from = index, to = next, "current portal cycled");
    }

    fn enter_gallery(&mut self) {
        if self.sessions.is_empty() {
            debug!("gallery ignored: no captured portals");
            return;
        }
        self.focus = self
            .current_index()
            .unwrap_or(self.last_open)
            .min(self.sessions.len() - 1);
        self.drag = None;
        for session in &mut self.sessions {
            session.anchored = false;
        }
        self.gallery_station = Some(self.pose);
        self.grab_armed = false;
        info!(portals = self.sessions.len(), focus = self.focus, "gallery opened");
    }

    fn leave_gallery<M: PortalManager + ?Sized>(&mut self, manager: &mut M) {
        self.gallery_station = None;
        self.last_open = self.focus;
        self.current = None;
        for session in &mut self.sessions {
            session.anchored = true;
            set_shown(manager, session.id, false);
        }
        info!(last_open = self.last_open, "gallery closed");
    }

    fn set_viewing<M: PortalManager + ?Sized>(&mut self, mode: ViewingMode, manager: &mut M) {
        match current_portal(self.current, manager) {
            Some(portal) => {
                if portal.modes.viewing != mode {
                    portal.modes.switch_viewing_mode();
                }
            }
            None => self.default_viewing = mode,
        }
    }

    fn set_parallax<M: PortalManager + ?Sized>(
        &mut self,
        mode: NegativeParallax,
        manager: &mut M,
    ) {
        match current_portal(self.current, manager) {
            Some(portal) => {
                if portal.modes.parallax != mode {
                    portal.modes.switch_negative_parallax();
                }
            }
            None => self.default_parallax = mode,
        }
    }

    fn apply_scale<M: PortalManager + ?Sized>(&mut self, edges: &ButtonEdges, manager: &mut M) {
        let mut factor = 1.0;
        if edges.is_held(CaptureAction::Shrink) {
            factor *= self.settings.shrink_factor;
        }
        if edges.is_held(CaptureAction::Grow) {
            factor *= self.settings.grow_factor;
        }
        if factor == 1.0 {
            return;
        }
        let Some(portal) = current_portal(self.current, manager) else {
            return;
        };
        if let Err(error) = portal.set_scale(portal.scale() * factor) {
            warn!(portal = %portal.id(), %error, "scale left unchanged");
        }
    }

    fn apply_drag<M: PortalManager + ?Sized>(&mut self, manager: &mut M) {
        let Some(anchor) = self.drag else {
            return;
        };
        let Some(portal) = current_portal(self.current, manager) else {
            self.drag = None;
            return;
        };
        portal.exit = drag_exit_pose(&anchor, self.pose, portal.scale());
    }

    fn apply_gallery<M: PortalManager + ?Sized>(&mut self, manager: &mut M) {
        let Some(station) = self.gallery_station else {
            return;
        };
        if self.sessions.is_empty() {
            self.gallery_station = None;
            self.current = None;
            info!("gallery closed: collection is empty");
            return;
        }
        self.focus = self.focus.min(self.sessions.len() - 1);
        self.current = Some(self.sessions[self.focus].id);

        let entries: Vec<Mat4> = (0..self.sessions.len())
            .map(|i| {
                self.settings
                    .gallery
                    .entry_pose(self.platform, station, i as isize - self.focus as isize)
            })
            .collect();
        for (session, entry) in self.sessions.iter().zip(&entries) {
            if let Some(portal) = manager.portal_mut(session.id) {
                portal.entry = *entry;
                portal.set_visible(true);
            }
        }

        let point = self.device_frame().transform_point3(Vec3::ZERO);
        match self.settings.grab.first_hit(&entries, point) {
            Some(hit) if self.grab_armed => self.grab(hit, manager),
            Some(_) => {}
            None => self.grab_armed = true,
        }
    }

    fn grab<M: PortalManager + ?Sized>(&mut self, hit: usize, manager: &mut M) {
        self.gallery_station = None;
        self.last_open = hit;
        self.focus = hit;
        self.current = Some(self.sessions[hit].id);
        for (index, session) in self.sessions.iter_mut().enumerate() {
            session.anchored = true;
            if index != hit {
                set_shown(manager, session.id, false);
            }
        }
        info!(portal = %self.sessions[hit].id, index = hit, "portal grabbed from gallery");
    }

    fn follow_device<M: PortalManager + ?Sized>(&self, manager: &mut M) {
        let frame = self.device_frame();
        for session in self.sessions.iter().filter(|s| s.anchored) {
            if let Some(portal) = manager.portal_mut(session.id) {
                portal.entry = frame;
            }
        }
    }

    /// Drops sessions whose portal was destroyed behind the device's back.
    fn prune<M: PortalManager + ?Sized>(&mut self, manager: &M) {
        let before = self.sessions.len();
        self.sessions.retain(|s| manager.portal(s.id).is_some());
        if self.sessions.len() == before {
            return;
        }
        warn!(
            dropped = before - self.sessions.len(),
            "captured portals vanished from the manager"
        );
        if self.current_index().is_none() {
            self.current = None;
            self.drag = None;
        }
        let last = self.sessions.len().saturating_sub(1);
        self.last_open = self.last_open.min(last);
        self.focus = self.focus.min(last);
    }
}

fn current_portal<M: PortalManager + ?Sized>(
    current: Option<PortalId>,
    manager: &mut M,
) -> Option<&mut PortalEntity> {
    manager.portal_mut(current?)
}

fn set_shown<M: PortalManager + ?Sized>(manager: &mut M, id: PortalId, shown: bool) {
    if let Some(portal) = manager.portal_mut(id) {
        portal.set_visible(shown);
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
