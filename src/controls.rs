//! Orbit camera controls.
//!
//! Translates mouse, touch, and keyboard input into orbit (rotate), dolly
//! (zoom), and pan motion around a target point, expressed in spherical
//! coordinates. Input handlers only accumulate pending deltas; `update`,
//! called once per rendered frame by the host loop, applies them to the
//! camera pose, clamps against the configured limits, and reorients the
//! camera toward the target. Optional exponential damping lets motion coast
//! after input stops.

use glam::{Quat, Vec2, Vec3};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::camera::{Camera, Projection, ProjectionKind};

const EPS: f32 = 1e-6;
const TAU: f32 = std::f32::consts::TAU;
const PI: f32 = std::f32::consts::PI;

/// Spherical coordinates around the target: `radius` is the distance,
/// `phi` the polar angle from the up axis (0 = above, pi = below), and
/// `theta` the azimuth around the up axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub const ZERO: Self = Self {
        radius: 0.0,
        phi: 0.0,
        theta: 0.0,
    };

    /// Convert a y-up offset vector to spherical coordinates.
    pub fn from_vec3(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            Self::ZERO
        } else {
            Self {
                radius,
                phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
                theta: v.x.atan2(v.z),
            }
        }
    }

    /// Convert back to a y-up offset vector.
    pub fn to_vec3(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.radius * self.phi.cos(),
            sin_phi_radius * self.theta.cos(),
        )
    }

    /// Keep phi off the poles so the look-at up vector stays well defined.
    pub fn make_safe(&mut self) {
        self.phi = self.phi.clamp(EPS, PI - EPS);
    }
}

/// Which gesture a mouse button triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Rotate,
    Dolly,
    Pan,
}

/// Mouse-button-to-gesture mapping.
#[derive(Debug, Clone, Copy)]
pub struct MouseBindings {
    pub left: GestureKind,
    pub middle: GestureKind,
    pub right: GestureKind,
}

impl Default for MouseBindings {
    fn default() -> Self {
        Self {
            left: GestureKind::Rotate,
            middle: GestureKind::Dolly,
            right: GestureKind::Pan,
        }
    }
}

/// Arrow-key pan bindings.
#[derive(Debug, Clone, Copy)]
pub struct KeyBindings {
    pub left: KeyCode,
    pub up: KeyCode,
    pub right: KeyCode,
    pub down: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            left: KeyCode::ArrowLeft,
            up: KeyCode::ArrowUp,
            right: KeyCode::ArrowRight,
            down: KeyCode::ArrowDown,
        }
    }
}

/// Exclusive tag for the gesture currently in progress. One input session
/// (button-down to button-up, or touch-start to touch-end) owns the mode at
/// a time; a new session overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    None,
    Rotate,
    Dolly,
    Pan,
    TouchRotate,
    TouchDolly,
    TouchPan,
}

/// Notifications emitted by the controls, drained by the host each frame.
/// `Start`/`End` bracket a session (a wheel tick is its own session);
/// `Change` fires whenever `update` detects a visible pose delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlsEvent {
    Start,
    Change,
    End,
}

pub struct OrbitControls {
    /// Master switch; when false all input is ignored.
    pub enabled: bool,
    /// The point the camera orbits around. Mutated by panning.
    pub target: Vec3,

    /// Dolly distance limits (perspective cameras only).
    pub min_distance: f32,
    pub max_distance: f32,
    /// Zoom limits (orthographic cameras only).
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Polar angle limits, within [0, pi].
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    /// Azimuth limits; finite values must describe a sub-interval of
    /// [-pi, pi] (possibly wrapped across the seam).
    pub min_azimuth_angle: f32,
    pub max_azimuth_angle: f32,

    /// Inertial damping. When enabled, `update` must run every frame.
    pub enable_damping: bool,
    pub damping_factor: f32,

    pub enable_zoom: bool,
    pub zoom_speed: f32,
    pub enable_rotate: bool,
    pub rotate_speed: f32,
    pub enable_pan: bool,
    pub pan_speed: f32,
    /// true: pan along the camera's local up axis; false: pan on the plane
    /// orthogonal to world up.
    pub screen_space_panning: bool,
    /// Pixels moved per arrow key press.
    pub key_pan_speed: f32,

    /// Constant rotation around the target while no gesture is active.
    /// When enabled, `update` must run every frame.
    pub auto_rotate: bool,
    /// Revolutions scale: 2.0 means one orbit in 30 seconds at 60 fps.
    pub auto_rotate_speed: f32,

    pub enable_keys: bool,
    pub keys: KeyBindings,
    pub mouse_buttons: MouseBindings,

    // Reset baseline captured at construction.
    target0: Vec3,
    position0: Vec3,
    zoom0: f32,

    // Input surface size in pixels; rotate and pan deltas are normalized
    // against it (height for rotation, so speed is isotropic relative to
    // the vertical field of view).
    viewport: Vec2,

    state: InteractionMode,
    spherical: Spherical,
    spherical_delta: Spherical,
    scale: f32,
    pan_offset: Vec3,
    zoom_changed: bool,

    rotate_start: Vec2,
    pan_start: Vec2,
    dolly_start: Vec2,

    last_position: Vec3,
    last_quaternion: Quat,

    events: Vec<ControlsEvent>,
    disposed: bool,
}

impl OrbitControls {
    /// Bind controls to `camera` with the given input-surface size in
    /// pixels. Snapshots the current target/position/zoom as the reset
    /// baseline and runs one synchronous `update` so the camera is posed
    /// before the first render.
    pub fn new(camera: &mut Camera, viewport: Vec2) -> Self {
        let mut controls = Self {
            enabled: true,
            target: Vec3::ZERO,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_zoom: 0.0,
            max_zoom: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            min_azimuth_angle: f32::NEG_INFINITY,
            max_azimuth_angle: f32::INFINITY,
            enable_damping: false,
            damping_factor: 0.05,
            enable_zoom: true,
            zoom_speed: 1.0,
            enable_rotate: true,
            rotate_speed: 1.0,
            enable_pan: true,
            pan_speed: 1.0,
            screen_space_panning: true,
            key_pan_speed: 7.0,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            enable_keys: true,
            keys: KeyBindings::default(),
            mouse_buttons: MouseBindings::default(),
            target0: Vec3::ZERO,
            position0: camera.position,
            zoom0: camera.zoom(),
            viewport,
            state: InteractionMode::None,
            spherical: Spherical::ZERO,
            spherical_delta: Spherical::ZERO,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            zoom_changed: false,
            rotate_start: Vec2::ZERO,
            pan_start: Vec2::ZERO,
            dolly_start: Vec2::ZERO,
            last_position: Vec3::ZERO,
            last_quaternion: Quat::IDENTITY,
            events: Vec::new(),
            disposed: false,
        };
        controls.update(camera);
        controls
    }

    /// Polar angle of the last `update`, radians from the up axis.
    pub fn get_polar_angle(&self) -> f32 {
        self.spherical.phi
    }

    /// Azimuth angle of the last `update`, radians around the up axis.
    pub fn get_azimuthal_angle(&self) -> f32 {
        self.spherical.theta
    }

    /// Gesture currently in progress.
    pub fn interaction_mode(&self) -> InteractionMode {
        self.state
    }

    /// Notify the controls of an input-surface resize.
    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport;
    }

    /// Drain the notifications emitted since the last call.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, ControlsEvent> {
        self.events.drain(..)
    }

    /// Apply pending rotation/pan/dolly to the camera pose. Must be called
    /// once per rendered frame. Returns true when the pose visibly changed
    /// (a `Change` notification is queued as well).
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        if self.disposed {
            return false;
        }

        // Rotate the offset into a y-up frame so an arbitrary world up
        // behaves like +Y internally, and back out at the end.
        let quat = Quat::from_rotation_arc(camera.up.normalize(), Vec3::Y);
        let quat_inverse = quat.inverse();

        let mut offset = quat * (camera.position - self.target);
        self.spherical = Spherical::from_vec3(offset);

        if self.auto_rotate && self.state == InteractionMode::None {
            self.rotate_left(self.auto_rotation_angle());
        }

        self.spherical.theta += self.spherical_delta.theta;
        self.spherical.phi += self.spherical_delta.phi;

        self.spherical.theta = self.clamp_azimuth(self.spherical.theta);
        self.spherical.phi = self
            .spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle);
        self.spherical.make_safe();

        self.spherical.radius *= self.scale;
        self.spherical.radius = self
            .spherical
            .radius
            .clamp(self.min_distance, self.max_distance);

        self.target += self.pan_offset;

        offset = quat_inverse * self.spherical.to_vec3();
        camera.position = self.target + offset;
        camera.look_at(self.target);

        if self.enable_damping {
            self.spherical_delta.theta *= 1.0 - self.damping_factor;
            self.spherical_delta.phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.spherical_delta = Spherical::ZERO;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        // Change condition: camera displacement, rotation displacement, or
        // an orthographic zoom step since the last emitted change.
        if self.zoom_changed
            || self.last_position.distance_squared(camera.position) > EPS
            || 8.0 * (1.0 - self.last_quaternion.dot(camera.orientation())) > EPS
        {
            self.events.push(ControlsEvent::Change);
            self.last_position = camera.position;
            self.last_quaternion = camera.orientation();
            self.zoom_changed = false;
            return true;
        }
        false
    }

    /// Restore the target, camera position, and zoom captured at
    /// construction, cancelling any gesture in progress.
    pub fn reset(&mut self, camera: &mut Camera) {
        if self.disposed {
            return;
        }
        self.target = self.target0;
        camera.position = self.position0;
        camera.set_zoom(self.zoom0);

        self.events.push(ControlsEvent::Change);
        self.update(camera);
        self.state = InteractionMode::None;
    }

    /// Detach the controls from input. No further gesture processing
    /// happens after this; the controls must not be used again.
    pub fn dispose(&mut self) {
        self.state = InteractionMode::None;
        self.events.clear();
        self.disposed = true;
    }

    //
    // Input surface
    //

    /// Button press at `position` (pixels). Starts a session according to
    /// the button mapping, overwriting any gesture already in progress.
    pub fn on_mouse_down(&mut self, button: MouseButton, position: Vec2) {
        if !self.enabled || self.disposed {
            return;
        }
        let gesture = match button {
            MouseButton::Left => self.mouse_buttons.left,
            MouseButton::Middle => self.mouse_buttons.middle,
            MouseButton::Right => self.mouse_buttons.right,
            _ => return,
        };
        match gesture {
            GestureKind::Rotate => {
                if !self.enable_rotate {
                    return;
                }
                self.rotate_start = position;
                self.state = InteractionMode::Rotate;
            }
            GestureKind::Dolly => {
                if !self.enable_zoom {
                    return;
                }
                self.dolly_start = position;
                self.state = InteractionMode::Dolly;
            }
            GestureKind::Pan => {
                if !self.enable_pan {
                    return;
                }
                self.pan_start = position;
                self.state = InteractionMode::Pan;
            }
        }
        self.events.push(ControlsEvent::Start);
    }

    /// Cursor motion. Only accumulates deltas while a mouse session is
    /// active; the camera moves on the next `update`.
    pub fn on_mouse_move(&mut self, camera: &mut Camera, position: Vec2) {
        if !self.enabled || self.disposed {
            return;
        }
        match self.state {
            InteractionMode::Rotate => {
                let delta = (position - self.rotate_start) * self.rotate_speed;
                // Normalized by viewport height for both axes, so rotation
                // speed is isotropic relative to the vertical field of view.
                self.rotate_left(TAU * delta.x / self.viewport.y);
                self.rotate_up(TAU * delta.y / self.viewport.y);
                self.rotate_start = position;
            }
            InteractionMode::Dolly => {
                // Drag down backs the camera away, drag up brings it closer.
                let dy = position.y - self.dolly_start.y;
                if dy > 0.0 {
                    let s = self.zoom_scale();
                    self.dolly_out(camera, s);
                } else if dy < 0.0 {
                    let s = self.zoom_scale();
                    self.dolly_in(camera, s);
                }
                self.dolly_start = position;
            }
            InteractionMode::Pan => {
                let delta = (position - self.pan_start) * self.pan_speed;
                self.pan(camera, delta);
                self.pan_start = position;
            }
            _ => {}
        }
    }

    /// Button release; ends the mouse session.
    pub fn on_mouse_up(&mut self, _button: MouseButton) {
        if self.disposed {
            return;
        }
        if matches!(
            self.state,
            InteractionMode::Rotate | InteractionMode::Dolly | InteractionMode::Pan
        ) {
            self.events.push(ControlsEvent::End);
            self.state = InteractionMode::None;
        }
    }

    /// Wheel tick. A self-contained session: ignored while a drag is in
    /// progress, bracketed by `Start`/`End` otherwise. Positive `delta_y`
    /// dollies away from the target.
    pub fn on_mouse_wheel(&mut self, camera: &mut Camera, delta_y: f32) {
        if !self.enabled
            || !self.enable_zoom
            || self.disposed
            || self.state != InteractionMode::None
        {
            return;
        }
        self.events.push(ControlsEvent::Start);
        if delta_y < 0.0 {
            let s = self.zoom_scale();
            self.dolly_in(camera, s);
        } else if delta_y > 0.0 {
            let s = self.zoom_scale();
            self.dolly_out(camera, s);
        }
        self.events.push(ControlsEvent::End);
    }

    /// Touch session start. One finger rotates, two dolly (pinch), three
    /// pan; any other count cancels the session.
    pub fn on_touch_start(&mut self, touches: &[Vec2]) {
        if !self.enabled || self.disposed {
            return;
        }
        match touches {
            [touch] => {
                if !self.enable_rotate {
                    return;
                }
                self.rotate_start = *touch;
                self.state = InteractionMode::TouchRotate;
            }
            [a, b] => {
                if !self.enable_zoom {
                    return;
                }
                self.dolly_start = Vec2::new(0.0, a.distance(*b));
                self.state = InteractionMode::TouchDolly;
            }
            [touch, _, _] => {
                if !self.enable_pan {
                    return;
                }
                self.pan_start = *touch;
                self.state = InteractionMode::TouchPan;
            }
            _ => {
                self.state = InteractionMode::None;
                return;
            }
        }
        self.events.push(ControlsEvent::Start);
    }

    /// Touch motion for the active touch session.
    pub fn on_touch_move(&mut self, camera: &mut Camera, touches: &[Vec2]) {
        if !self.enabled || self.disposed {
            return;
        }
        match (self.state, touches) {
            (InteractionMode::TouchRotate, [touch, ..]) => {
                let delta = (*touch - self.rotate_start) * self.rotate_speed;
                self.rotate_left(TAU * delta.x / self.viewport.y);
                self.rotate_up(TAU * delta.y / self.viewport.y);
                self.rotate_start = *touch;
            }
            (InteractionMode::TouchDolly, [a, b, ..]) => {
                // Spreading the fingers gives a ratio below 1, which dollies
                // the camera in by that amount.
                let distance = a.distance(*b);
                if distance > 0.0 && self.dolly_start.y > 0.0 {
                    let ratio = (self.dolly_start.y / distance).powf(self.zoom_speed);
                    self.dolly_in(camera, ratio);
                }
                self.dolly_start = Vec2::new(0.0, distance);
            }
            (InteractionMode::TouchPan, [touch, ..]) => {
                let delta = (*touch - self.pan_start) * self.pan_speed;
                self.pan(camera, delta);
                self.pan_start = *touch;
            }
            _ => {}
        }
    }

    /// Touch session end.
    pub fn on_touch_end(&mut self) {
        if !self.enabled || self.disposed {
            return;
        }
        if matches!(
            self.state,
            InteractionMode::TouchRotate | InteractionMode::TouchDolly | InteractionMode::TouchPan
        ) {
            self.events.push(ControlsEvent::End);
            self.state = InteractionMode::None;
        }
    }

    /// Arrow-key pan: one discrete step of `key_pan_speed` pixels, applied
    /// immediately with a synchronous `update`. Keys bypass the session
    /// mechanism entirely.
    pub fn on_key_down(&mut self, camera: &mut Camera, code: KeyCode) {
        if !self.enabled || !self.enable_keys || !self.enable_pan || self.disposed {
            return;
        }
        let step = if code == self.keys.up {
            Vec2::new(0.0, self.key_pan_speed)
        } else if code == self.keys.down {
            Vec2::new(0.0, -self.key_pan_speed)
        } else if code == self.keys.left {
            Vec2::new(self.key_pan_speed, 0.0)
        } else if code == self.keys.right {
            Vec2::new(-self.key_pan_speed, 0.0)
        } else {
            return;
        };
        self.pan(camera, step);
        self.update(camera);
    }

    //
    // Gesture primitives
    //

    fn auto_rotation_angle(&self) -> f32 {
        // One revolution in 3600 frames at speed 1. Frame-locked: assumes
        // a 60 fps host loop, so wall-clock speed tracks the frame rate.
        TAU / 60.0 / 60.0 * self.auto_rotate_speed
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    fn pan_left(&mut self, distance: f32, camera: &Camera) {
        self.pan_offset += camera.right_axis() * -distance;
    }

    fn pan_up(&mut self, distance: f32, camera: &Camera) {
        let dir = if self.screen_space_panning {
            camera.up_axis()
        } else {
            // Stay on the plane orthogonal to world up.
            camera.up.cross(camera.right_axis())
        };
        self.pan_offset += dir * distance;
    }

    /// Pan by a pixel-space delta, scaled so motion is proportional to the
    /// visible frustum extent at the target's depth.
    fn pan(&mut self, camera: &Camera, delta: Vec2) {
        match *camera.projection() {
            Projection::Perspective { fov_y, .. } => {
                let offset = camera.position - self.target;
                let target_distance = offset.length() * (fov_y / 2.0).tan();
                self.pan_left(2.0 * delta.x * target_distance / self.viewport.y, camera);
                self.pan_up(2.0 * delta.y * target_distance / self.viewport.y, camera);
            }
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                zoom,
                ..
            } => {
                self.pan_left(delta.x * (right - left) / zoom / self.viewport.x, camera);
                self.pan_up(delta.y * (top - bottom) / zoom / self.viewport.y, camera);
            }
            Projection::Custom(_) => {
                log::warn!("orbit controls: unknown camera kind, pan disabled");
                self.enable_pan = false;
            }
        }
    }

    /// Move toward the target: shrinks the orbit radius of a perspective
    /// camera, grows the zoom of an orthographic one. `dolly_scale` < 1
    /// dollies by one notch.
    fn dolly_in(&mut self, camera: &mut Camera, dolly_scale: f32) {
        match camera.projection_kind() {
            ProjectionKind::Perspective => {
                self.scale *= dolly_scale;
            }
            ProjectionKind::Orthographic => {
                let zoom = (camera.zoom() / dolly_scale).clamp(self.min_zoom, self.max_zoom);
                camera.set_zoom(zoom);
                self.zoom_changed = true;
            }
            ProjectionKind::Custom => {
                log::warn!("orbit controls: unknown camera kind, dolly/zoom disabled");
                self.enable_zoom = false;
            }
        }
    }

    /// Move away from the target; the inverse of [`Self::dolly_in`].
    fn dolly_out(&mut self, camera: &mut Camera, dolly_scale: f32) {
        match camera.projection_kind() {
            ProjectionKind::Perspective => {
                self.scale /= dolly_scale;
            }
            ProjectionKind::Orthographic => {
                let zoom = (camera.zoom() * dolly_scale).clamp(self.min_zoom, self.max_zoom);
                camera.set_zoom(zoom);
                self.zoom_changed = true;
            }
            ProjectionKind::Custom => {
                log::warn!("orbit controls: unknown camera kind, dolly/zoom disabled");
                self.enable_zoom = false;
            }
        }
    }

    /// Clamp theta against the azimuth limits. Finite limits are wrapped
    /// into [-pi, pi] first; an interval that crosses the seam (min > max
    /// after wrapping) clamps toward the nearer bound so the behavior is
    /// stable across the wraparound.
    fn clamp_azimuth(&self, theta: f32) -> f32 {
        let (min, max) = (self.min_azimuth_angle, self.max_azimuth_angle);
        if min.is_infinite() || max.is_infinite() {
            return theta.min(max).max(min);
        }
        let min = wrap_angle(min);
        let max = wrap_angle(max);
        if min <= max {
            theta.clamp(min, max)
        } else if theta > (min + max) / 2.0 {
            theta.max(min)
        } else {
            theta.min(max)
        }
    }
}

fn wrap_angle(angle: f32) -> f32 {
    if angle < -PI {
        angle + TAU
    } else if angle > PI {
        angle - TAU
    } else {
        angle
    }
}
