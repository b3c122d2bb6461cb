//! Ray picking of stars from screen coordinates.
//!
//! Builds a world-space ray by unprojecting the cursor through the inverse
//! view-projection matrix, so the same path serves perspective and
//! orthographic cameras, then intersects star bounding spheres.

use crate::camera::Camera;
use crate::star::StarInstance;
use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// A picked star: index into the instance list and distance along the ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub index: usize,
    pub distance: f32,
}

/// Ray through a screen position (pixels, origin top-left) for the given
/// viewport size.
pub fn ray_from_screen(camera: &Camera, screen: Vec2, viewport: Vec2) -> Ray {
    let ndc = Vec2::new(
        (screen.x / viewport.x) * 2.0 - 1.0,
        1.0 - (screen.y / viewport.y) * 2.0,
    );
    let inverse = camera.view_projection().inverse();

    // Unproject a point on the near plane and one on the far plane
    // (wgpu depth range [0, 1]).
    let near = unproject(inverse, ndc, 0.0);
    let far = unproject(inverse, ndc, 1.0);

    Ray {
        origin: near,
        direction: (far - near).normalize(),
    }
}

fn unproject(inverse_view_proj: glam::Mat4, ndc: Vec2, depth: f32) -> Vec3 {
    let p = inverse_view_proj * Vec4::new(ndc.x, ndc.y, depth, 1.0);
    p.xyz() / p.w
}

/// Nearest positive intersection distance of `ray` with a sphere, if any.
pub fn intersect_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.direction);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t0 = -b - sqrt_disc;
    let t1 = -b + sqrt_disc;
    if t0 > 0.0 {
        Some(t0)
    } else if t1 > 0.0 {
        // Origin inside the sphere.
        Some(t1)
    } else {
        None
    }
}

/// Closest star hit by the ray through `screen`, if any.
pub fn pick_star(
    camera: &Camera,
    screen: Vec2,
    viewport: Vec2,
    stars: &[StarInstance],
) -> Option<Hit> {
    let ray = ray_from_screen(camera, screen, viewport);
    let mut best: Option<Hit> = None;
    for (index, star) in stars.iter().enumerate() {
        if let Some(distance) = intersect_sphere(&ray, star.center(), star.radius) {
            if best.map_or(true, |hit| distance < hit.distance) {
                best = Some(Hit { index, distance });
            }
        }
    }
    best
}
