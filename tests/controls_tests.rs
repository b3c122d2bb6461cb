use approx::assert_relative_eq;
use glam::{Vec2, Vec3};
use starfield_renderer::camera::{Camera, Projection};
use starfield_renderer::controls::{ControlsEvent, InteractionMode, OrbitControls};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);
const TAU: f32 = std::f32::consts::TAU;
const PI: f32 = std::f32::consts::PI;

fn perspective_rig() -> (Camera, OrbitControls) {
    let mut camera = Camera::perspective(70.0, VIEWPORT.x / VIEWPORT.y, 0.1, 10000.0);
    camera.position = Vec3::new(0.0, 0.0, 1000.0);
    camera.look_at(Vec3::ZERO);
    let mut controls = OrbitControls::new(&mut camera, VIEWPORT);
    controls.drain_events().for_each(drop);
    (camera, controls)
}

fn orthographic_rig() -> (Camera, OrbitControls) {
    let mut camera = Camera::orthographic(-400.0, 400.0, 300.0, -300.0, 0.1, 10000.0);
    camera.position = Vec3::new(0.0, 0.0, 1000.0);
    camera.look_at(Vec3::ZERO);
    let mut controls = OrbitControls::new(&mut camera, VIEWPORT);
    controls.drain_events().for_each(drop);
    (camera, controls)
}

fn drag_rotate(controls: &mut OrbitControls, camera: &mut Camera, from: Vec2, to: Vec2) {
    controls.on_mouse_down(MouseButton::Left, from);
    controls.on_mouse_move(camera, to);
    controls.on_mouse_up(MouseButton::Left);
}

#[test]
fn test_rotate_gesture_decreases_azimuth_by_screen_fraction() {
    let (mut camera, mut controls) = perspective_rig();
    let phi_before = controls.get_polar_angle();

    drag_rotate(
        &mut controls,
        &mut camera,
        Vec2::new(400.0, 300.0),
        Vec2::new(500.0, 300.0),
    );
    controls.update(&mut camera);

    // 100 px over a 600 px tall surface at rotate_speed 1.
    let expected = -TAU * 100.0 / 600.0;
    assert_relative_eq!(controls.get_azimuthal_angle(), expected, epsilon = 1e-4);

    // Still on the radius-1000 sphere, at the same polar angle.
    assert_relative_eq!(camera.position.distance(controls.target), 1000.0, epsilon = 1e-2);
    assert_relative_eq!(controls.get_polar_angle(), phi_before, epsilon = 1e-4);
}

#[test]
fn test_limits_hold_for_arbitrary_gesture_sequences() {
    let (mut camera, mut controls) = perspective_rig();
    controls.min_distance = 500.0;
    controls.max_distance = 1500.0;
    controls.min_polar_angle = 0.5;
    controls.max_polar_angle = 2.0;
    controls.min_azimuth_angle = -0.5;
    controls.max_azimuth_angle = 0.5;

    // Violent rotate far past the angular limits.
    drag_rotate(
        &mut controls,
        &mut camera,
        Vec2::new(0.0, 0.0),
        Vec2::new(3000.0, -3000.0),
    );
    controls.update(&mut camera);

    // Dolly way out, then way in.
    for _ in 0..200 {
        controls.on_mouse_wheel(&mut camera, 1.0);
        controls.update(&mut camera);
    }
    for _ in 0..400 {
        controls.on_mouse_wheel(&mut camera, -1.0);
        controls.update(&mut camera);
    }

    // Pan hard as well.
    controls.on_mouse_down(MouseButton::Right, Vec2::new(0.0, 0.0));
    controls.on_mouse_move(&mut camera, Vec2::new(2000.0, 2000.0));
    controls.on_mouse_up(MouseButton::Right);
    controls.update(&mut camera);

    let radius = camera.position.distance(controls.target);
    assert!(radius >= 500.0 - 1e-2 && radius <= 1500.0 + 1e-2);
    let phi = controls.get_polar_angle();
    assert!(phi >= 0.5 - 1e-4 && phi <= 2.0 + 1e-4);
    let theta = controls.get_azimuthal_angle();
    assert!(theta >= -0.5 - 1e-4 && theta <= 0.5 + 1e-4);
}

#[test]
fn test_damping_decays_pending_rotation_geometrically() {
    let (mut camera, mut controls) = perspective_rig();
    controls.enable_damping = true;
    controls.damping_factor = 0.05;

    // A 6 px drag coasts 2pi*6/600/0.05 ~ 1.26 rad in total, so the azimuth
    // readback never wraps across the +/-pi seam and the per-frame
    // differences below measure the decay directly.
    drag_rotate(
        &mut controls,
        &mut camera,
        Vec2::new(400.0, 300.0),
        Vec2::new(406.0, 300.0),
    );

    let mut theta = controls.get_azimuthal_angle();
    let mut steps = Vec::new();
    for _ in 0..8 {
        controls.update(&mut camera);
        let next = controls.get_azimuthal_angle();
        steps.push((next - theta).abs());
        theta = next;
    }

    for pair in steps.windows(2) {
        assert!(pair[1] < pair[0], "coasting must strictly decay");
        assert_relative_eq!(pair[1] / pair[0], 0.95, epsilon = 1e-3);
    }
}

#[test]
fn test_without_damping_one_update_consumes_the_delta() {
    let (mut camera, mut controls) = perspective_rig();

    drag_rotate(
        &mut controls,
        &mut camera,
        Vec2::new(400.0, 300.0),
        Vec2::new(460.0, 300.0),
    );
    let changed = controls.update(&mut camera);
    assert!(changed);
    let theta = controls.get_azimuthal_angle();
    let position = camera.position;

    // No residual motion on the next frame.
    let changed_again = controls.update(&mut camera);
    assert!(!changed_again);
    assert_relative_eq!(controls.get_azimuthal_angle(), theta, epsilon = 1e-5);
    assert!(camera.position.distance(position) < 1e-2);
}

#[test]
fn test_quiescent_update_is_a_pose_noop() {
    let (mut camera, mut controls) = perspective_rig();

    controls.update(&mut camera);
    let position = camera.position;
    let orientation = camera.orientation();

    let changed = controls.update(&mut camera);
    assert!(!changed);
    assert!(camera.position.distance(position) < 1e-3);
    assert!(camera.orientation().dot(orientation) > 1.0 - 1e-6);
}

#[test]
fn test_reset_restores_construction_baseline() {
    let (mut camera, mut controls) = perspective_rig();
    let target0 = controls.target;
    let zoom0 = camera.zoom();

    // Wander: rotate, pan, dolly.
    drag_rotate(
        &mut controls,
        &mut camera,
        Vec2::new(100.0, 100.0),
        Vec2::new(300.0, 250.0),
    );
    controls.update(&mut camera);
    controls.on_mouse_down(MouseButton::Right, Vec2::new(0.0, 0.0));
    controls.on_mouse_move(&mut camera, Vec2::new(120.0, 90.0));
    controls.on_mouse_up(MouseButton::Right);
    controls.update(&mut camera);
    controls.on_mouse_wheel(&mut camera, 1.0);
    controls.update(&mut camera);
    assert!(camera.position.distance(Vec3::new(0.0, 0.0, 1000.0)) > 1.0);

    controls.reset(&mut camera);
    assert_eq!(controls.target, target0);
    assert_eq!(camera.zoom(), zoom0);
    assert!(camera.position.distance(Vec3::new(0.0, 0.0, 1000.0)) < 1e-2);
    assert_eq!(controls.interaction_mode(), InteractionMode::None);
}

#[test]
fn test_reset_cancels_in_progress_gesture() {
    let (mut camera, mut controls) = perspective_rig();
    controls.on_mouse_down(MouseButton::Left, Vec2::new(10.0, 10.0));
    assert_eq!(controls.interaction_mode(), InteractionMode::Rotate);
    controls.reset(&mut camera);
    assert_eq!(controls.interaction_mode(), InteractionMode::None);
}

#[test]
fn test_perspective_dolly_changes_radius_not_zoom() {
    let (mut camera, mut controls) = perspective_rig();

    controls.on_mouse_wheel(&mut camera, 1.0);
    controls.update(&mut camera);

    let radius = camera.position.distance(controls.target);
    assert_relative_eq!(radius, 1000.0 / 0.95, epsilon = 1e-1);
    assert_eq!(camera.zoom(), 1.0);
}

#[test]
fn test_orthographic_dolly_changes_zoom_not_radius() {
    let (mut camera, mut controls) = orthographic_rig();

    controls.on_mouse_wheel(&mut camera, 1.0);
    controls.update(&mut camera);

    assert_relative_eq!(camera.zoom(), 0.95, epsilon = 1e-5);
    let radius = camera.position.distance(controls.target);
    assert_relative_eq!(radius, 1000.0, epsilon = 1e-2);
}

#[test]
fn test_middle_drag_direction_matches_the_wheel() {
    let (mut camera, mut controls) = perspective_rig();

    // Drag up brings the camera closer.
    controls.on_mouse_down(MouseButton::Middle, Vec2::new(400.0, 300.0));
    controls.on_mouse_move(&mut camera, Vec2::new(400.0, 250.0));
    controls.on_mouse_up(MouseButton::Middle);
    controls.update(&mut camera);
    let radius = camera.position.distance(controls.target);
    assert_relative_eq!(radius, 950.0, epsilon = 1e-1);

    // Drag down backs it away again.
    controls.on_mouse_down(MouseButton::Middle, Vec2::new(400.0, 300.0));
    controls.on_mouse_move(&mut camera, Vec2::new(400.0, 350.0));
    controls.on_mouse_up(MouseButton::Middle);
    controls.update(&mut camera);
    let radius_after = camera.position.distance(controls.target);
    assert_relative_eq!(radius_after, radius / 0.95, epsilon = 1e-1);
}

#[test]
fn test_orthographic_zoom_floors_exactly_at_min_zoom() {
    let (mut camera, mut controls) = orthographic_rig();
    controls.min_zoom = 0.5;
    controls.max_zoom = 2.0;

    // Dolly out until the clamp engages, then keep going.
    for _ in 0..20 {
        controls.on_mouse_wheel(&mut camera, 1.0);
        controls.update(&mut camera);
    }
    assert_eq!(camera.zoom(), 0.5);

    controls.on_mouse_wheel(&mut camera, 1.0);
    controls.update(&mut camera);
    assert_eq!(camera.zoom(), 0.5);
}

#[test]
fn test_polar_angle_never_reaches_the_poles() {
    let (mut camera, mut controls) = perspective_rig();
    controls.min_polar_angle = 0.0;
    controls.max_polar_angle = PI;

    // Push straight up far past the pole.
    drag_rotate(
        &mut controls,
        &mut camera,
        Vec2::new(400.0, 300.0),
        Vec2::new(400.0, 5000.0),
    );
    controls.update(&mut camera);
    let phi_top = controls.get_polar_angle();
    assert!(phi_top > 0.0 && phi_top < PI);
    assert!(camera.position.distance(controls.target) > 1.0);

    // And straight down.
    drag_rotate(
        &mut controls,
        &mut camera,
        Vec2::new(400.0, 300.0),
        Vec2::new(400.0, -5000.0),
    );
    controls.update(&mut camera);
    let phi_bottom = controls.get_polar_angle();
    assert!(phi_bottom > 0.0 && phi_bottom < PI);
    assert!(camera.position.distance(controls.target) > 1.0);
}

#[test]
fn test_sessions_are_bracketed_by_start_and_end() {
    let (mut camera, mut controls) = perspective_rig();

    controls.on_mouse_down(MouseButton::Left, Vec2::new(0.0, 0.0));
    controls.on_mouse_move(&mut camera, Vec2::new(10.0, 0.0));
    controls.on_mouse_up(MouseButton::Left);
    let events: Vec<_> = controls.drain_events().collect();
    assert_eq!(events, vec![ControlsEvent::Start, ControlsEvent::End]);

    // A wheel tick is its own bracketed session.
    controls.on_mouse_wheel(&mut camera, 1.0);
    let events: Vec<_> = controls.drain_events().collect();
    assert_eq!(events, vec![ControlsEvent::Start, ControlsEvent::End]);
}

#[test]
fn test_update_emits_change_only_when_pose_moves() {
    let (mut camera, mut controls) = perspective_rig();
    controls.update(&mut camera);
    controls.drain_events().for_each(drop);

    drag_rotate(
        &mut controls,
        &mut camera,
        Vec2::new(0.0, 0.0),
        Vec2::new(50.0, 0.0),
    );
    controls.drain_events().for_each(drop);

    assert!(controls.update(&mut camera));
    assert!(controls
        .drain_events()
        .any(|e| e == ControlsEvent::Change));

    assert!(!controls.update(&mut camera));
    assert!(controls.drain_events().next().is_none());
}

#[test]
fn test_new_mouse_down_overwrites_the_active_gesture() {
    let (mut camera, mut controls) = perspective_rig();

    controls.on_mouse_down(MouseButton::Left, Vec2::new(0.0, 0.0));
    assert_eq!(controls.interaction_mode(), InteractionMode::Rotate);

    controls.on_mouse_down(MouseButton::Right, Vec2::new(0.0, 0.0));
    assert_eq!(controls.interaction_mode(), InteractionMode::Pan);

    // Rotate deltas no longer accumulate for the dropped gesture.
    let theta = controls.get_azimuthal_angle();
    controls.on_mouse_move(&mut camera, Vec2::new(100.0, 0.0));
    controls.on_mouse_up(MouseButton::Right);
    controls.update(&mut camera);
    assert_relative_eq!(controls.get_azimuthal_angle(), theta, epsilon = 1e-5);
}

#[test]
fn test_wheel_is_ignored_while_a_drag_is_active() {
    let (mut camera, mut controls) = perspective_rig();

    controls.on_mouse_down(MouseButton::Left, Vec2::new(0.0, 0.0));
    controls.drain_events().for_each(drop);
    controls.on_mouse_wheel(&mut camera, 1.0);
    controls.update(&mut camera);

    assert!(controls.drain_events().all(|e| e != ControlsEvent::Start));
    let radius = camera.position.distance(controls.target);
    assert_relative_eq!(radius, 1000.0, epsilon = 1e-2);
}

#[test]
fn test_touch_count_selects_the_gesture() {
    let (_camera, mut controls) = perspective_rig();

    controls.on_touch_start(&[Vec2::new(10.0, 10.0)]);
    assert_eq!(controls.interaction_mode(), InteractionMode::TouchRotate);
    controls.on_touch_end();

    controls.on_touch_start(&[Vec2::new(10.0, 10.0), Vec2::new(50.0, 10.0)]);
    assert_eq!(controls.interaction_mode(), InteractionMode::TouchDolly);
    controls.on_touch_end();

    controls.on_touch_start(&[
        Vec2::new(10.0, 10.0),
        Vec2::new(50.0, 10.0),
        Vec2::new(30.0, 40.0),
    ]);
    assert_eq!(controls.interaction_mode(), InteractionMode::TouchPan);
    controls.on_touch_end();

    // Unsupported touch counts cancel the session.
    controls.on_touch_start(&[Vec2::ZERO, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO]);
    assert_eq!(controls.interaction_mode(), InteractionMode::None);
}

#[test]
fn test_pinch_apart_moves_the_camera_closer() {
    let (mut camera, mut controls) = perspective_rig();

    controls.on_touch_start(&[Vec2::new(300.0, 300.0), Vec2::new(500.0, 300.0)]);
    controls.on_touch_move(
        &mut camera,
        &[Vec2::new(200.0, 300.0), Vec2::new(600.0, 300.0)],
    );
    controls.on_touch_end();
    controls.update(&mut camera);

    let radius = camera.position.distance(controls.target);
    assert!(radius < 1000.0, "pinch apart should dolly in, got {radius}");
}

#[test]
fn test_arrow_keys_pan_immediately_without_a_session() {
    let (mut camera, mut controls) = perspective_rig();
    let target_before = controls.target;

    controls.on_key_down(&mut camera, KeyCode::ArrowUp);

    assert_eq!(controls.interaction_mode(), InteractionMode::None);
    assert!(controls.target.distance(target_before) > 0.0);
    // The pan step was already applied; nothing pending for the next frame.
    let target_after = controls.target;
    controls.update(&mut camera);
    assert_eq!(controls.target, target_after);
}

#[test]
fn test_auto_rotate_advances_azimuth_when_idle() {
    let (mut camera, mut controls) = perspective_rig();
    controls.auto_rotate = true;
    controls.auto_rotate_speed = 2.0;

    controls.update(&mut camera);
    let theta1 = controls.get_azimuthal_angle();
    controls.update(&mut camera);
    let theta2 = controls.get_azimuthal_angle();

    let per_frame = TAU / 3600.0 * 2.0;
    assert_relative_eq!(theta2 - theta1, -per_frame, epsilon = 1e-5);

    // Suppressed while a gesture is in progress.
    controls.on_mouse_down(MouseButton::Left, Vec2::ZERO);
    controls.update(&mut camera);
    let theta3 = controls.get_azimuthal_angle();
    assert_relative_eq!(theta3, theta2, epsilon = 1e-5);
}

#[test]
fn test_custom_projection_disables_pan_and_dolly_but_not_rotate() {
    let mut camera = Camera::new(Projection::Custom(glam::Mat4::IDENTITY), 1.0);
    camera.position = Vec3::new(0.0, 0.0, 1000.0);
    camera.look_at(Vec3::ZERO);
    let mut controls = OrbitControls::new(&mut camera, VIEWPORT);

    // A dolly drag against the unknown kind turns zooming off for good.
    controls.on_mouse_down(MouseButton::Middle, Vec2::new(0.0, 0.0));
    controls.on_mouse_move(&mut camera, Vec2::new(0.0, 50.0));
    controls.on_mouse_up(MouseButton::Middle);
    assert!(!controls.enable_zoom);

    controls.on_mouse_down(MouseButton::Right, Vec2::new(0.0, 0.0));
    controls.on_mouse_move(&mut camera, Vec2::new(50.0, 0.0));
    controls.on_mouse_up(MouseButton::Right);
    assert!(!controls.enable_pan);

    // Rotation still works.
    drag_rotate(
        &mut controls,
        &mut camera,
        Vec2::new(400.0, 300.0),
        Vec2::new(500.0, 300.0),
    );
    controls.update(&mut camera);
    assert!(controls.get_azimuthal_angle() < -0.5);
}

#[test]
fn test_disposed_controls_ignore_all_input() {
    let (mut camera, mut controls) = perspective_rig();
    controls.update(&mut camera);
    let position = camera.position;

    controls.dispose();
    controls.on_mouse_down(MouseButton::Left, Vec2::ZERO);
    controls.on_mouse_move(&mut camera, Vec2::new(500.0, 500.0));
    controls.on_mouse_wheel(&mut camera, 1.0);
    assert!(!controls.update(&mut camera));
    assert_eq!(camera.position, position);
    assert!(controls.drain_events().next().is_none());
}

#[test]
fn test_disabled_gestures_never_start_a_session() {
    let (mut camera, mut controls) = perspective_rig();
    controls.enable_rotate = false;
    controls.on_mouse_down(MouseButton::Left, Vec2::ZERO);
    assert_eq!(controls.interaction_mode(), InteractionMode::None);

    controls.enable_pan = false;
    controls.on_mouse_down(MouseButton::Right, Vec2::ZERO);
    assert_eq!(controls.interaction_mode(), InteractionMode::None);

    controls.enable_zoom = false;
    controls.on_mouse_wheel(&mut camera, 1.0);
    controls.update(&mut camera);
    let radius = camera.position.distance(controls.target);
    assert_relative_eq!(radius, 1000.0, epsilon = 1e-2);
}
