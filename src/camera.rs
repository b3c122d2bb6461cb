//! Camera with a polymorphic projection.
//!
//! The pose is a position plus an orientation quaternion that is only ever
//! derived by `look_at`; input handling never writes the orientation
//! directly. Projection is perspective, orthographic (with a zoom scalar),
//! or a custom matrix supplied by the host.

use glam::{Mat3, Mat4, Quat, Vec3};

/// Projection parameters. Perspective and orthographic cameras use mutually
/// exclusive scaling mechanisms: dollying changes the orbit radius of a
/// perspective camera and the zoom scalar of an orthographic one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        znear: f32,
        zfar: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        znear: f32,
        zfar: f32,
        /// Magnification factor applied to the frustum extents.
        zoom: f32,
    },
    /// Host-supplied projection matrix. Orbit controls cannot pan or dolly
    /// this kind and will disable those capabilities.
    Custom(Mat4),
}

/// Discriminant of [`Projection`], used for gesture dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    Perspective,
    Orthographic,
    Custom,
}

pub struct Camera {
    /// World-space eye position.
    pub position: Vec3,
    /// Configured world up vector. The orbit axis.
    pub up: Vec3,
    orientation: Quat,
    projection: Projection,
    aspect: f32,
    projection_dirty: bool,
}

impl Camera {
    pub fn new(projection: Projection, aspect: f32) -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 0.0, 1.0),
            up: Vec3::Y,
            orientation: Quat::IDENTITY,
            projection,
            aspect,
            projection_dirty: false,
        };
        camera.look_at(Vec3::ZERO);
        camera
    }

    /// Perspective camera. `fov_y_degrees` is the vertical field of view.
    pub fn perspective(fov_y_degrees: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        Self::new(
            Projection::Perspective {
                fov_y: fov_y_degrees.to_radians(),
                znear,
                zfar,
            },
            aspect,
        )
    }

    /// Orthographic camera with zoom 1.
    pub fn orthographic(
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        znear: f32,
        zfar: f32,
    ) -> Self {
        Self::new(
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                znear,
                zfar,
                zoom: 1.0,
            },
            (right - left).abs() / (top - bottom).abs().max(f32::EPSILON),
        )
    }

    /// Derive the orientation so the camera looks from `position` toward
    /// `target` with the configured up vector.
    pub fn look_at(&mut self, target: Vec3) {
        // Camera-space basis: z points from target to eye (looking down -z).
        let mut z = self.position - target;
        if z.length_squared() == 0.0 {
            z.z = 1.0;
        }
        z = z.normalize();

        let mut x = self.up.cross(z);
        if x.length_squared() < 1e-12 {
            // Up is parallel to the view direction; nudge z off the axis.
            if self.up.z.abs() >= 1.0 - f32::EPSILON {
                z.x += 1e-4;
            } else {
                z.z += 1e-4;
            }
            z = z.normalize();
            x = self.up.cross(z);
        }
        x = x.normalize();
        let y = z.cross(x);

        self.orientation = Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize();
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Camera-local +X in world space (first column of the pose matrix).
    pub fn right_axis(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    /// Camera-local +Y in world space (second column of the pose matrix).
    pub fn up_axis(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn projection_kind(&self) -> ProjectionKind {
        match self.projection {
            Projection::Perspective { .. } => ProjectionKind::Perspective,
            Projection::Orthographic { .. } => ProjectionKind::Orthographic,
            Projection::Custom(_) => ProjectionKind::Custom,
        }
    }

    /// Orthographic zoom scalar; 1.0 for other projection kinds.
    pub fn zoom(&self) -> f32 {
        match self.projection {
            Projection::Orthographic { zoom, .. } => zoom,
            _ => 1.0,
        }
    }

    /// Set the orthographic zoom and flag the projection matrix as stale.
    /// No-op for other projection kinds.
    pub fn set_zoom(&mut self, value: f32) {
        if let Projection::Orthographic { ref mut zoom, .. } = self.projection {
            *zoom = value;
            self.projection_dirty = true;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.projection_dirty = true;
    }

    /// Read and clear the projection-dirty flag.
    pub fn take_projection_dirty(&mut self) -> bool {
        std::mem::take(&mut self.projection_dirty)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y, znear, zfar } => {
                // perspective_rh uses the [0,1] depth range wgpu expects
                Mat4::perspective_rh(fov_y, self.aspect, znear, zfar)
            }
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                znear,
                zfar,
                zoom,
            } => {
                let dx = (right - left) / (2.0 * zoom);
                let dy = (top - bottom) / (2.0 * zoom);
                let cx = (right + left) / 2.0;
                let cy = (top + bottom) / 2.0;
                Mat4::orthographic_rh(cx - dx, cx + dx, cy - dy, cy + dy, znear, zfar)
            }
            Projection::Custom(matrix) => matrix,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}
