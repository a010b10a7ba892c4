/// Camera system with keyboard fly controls
/// Position + look direction, rebuilt into a view-projection every frame
use glam::{Mat4, Quat, Vec3, Vec4};

use crate::config::CullerConfig;

pub struct Camera {
    pub position: Vec3,
    /// Unit look direction
    pub direction: Vec3,
    /// Unit up vector, never parallel to `direction`
    pub up: Vec3,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect_ratio: f32,
}

impl Camera {
    pub fn new(position: Vec3, direction: Vec3, up: Vec3, config: &CullerConfig) -> Self {
        Self {
            position,
            direction: direction.normalize(),
            up: up.normalize(),
            fov: config.fov,
            near: config.near,
            far: config.far,
            aspect_ratio: config.aspect_ratio(),
        }
    }

    /// Start position used by the demo binary for the castle scene.
    pub fn castle_preset(config: &CullerConfig) -> Self {
        Self::new(
            Vec3::new(27.0, 2.0, 47.0),
            Vec3::new(0.142_582_76, 0.061_106_894, -0.987_894_8),
            Vec3::Y,
            config,
        )
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }

    /// Get projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Get right direction vector
    pub fn right(&self) -> Vec3 {
        self.direction.cross(self.up).normalize()
    }

    /// Rotate the look direction around `axis`, keeping it unit length.
    pub fn rotate(&mut self, axis: Vec3, angle: f32) {
        let rotated = (Quat::from_axis_angle(axis.normalize(), angle) * self.direction).normalize();

        // Refuse rotations that would make direction and up parallel.
        if rotated.cross(self.up).length_squared() > 1e-6 {
            self.direction = rotated;
        }
    }

    /// Move along the look direction and the right vector.
    pub fn translate(&mut self, forward: f32, right: f32) {
        self.position += self.direction * forward + self.right() * right;
    }

    /// Extract frustum planes from the view-projection matrix
    pub fn extract_frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection_matrix())
    }
}

/// View frustum represented as 6 planes for AABB culling
/// Planes are stored in Hessian normal form: ax + by + cz + d = 0
/// where (a,b,c) points into the frustum
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// 6 planes: left, right, bottom, top, near, far
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix
    /// (Gribb-Hartmann, clip-space depth in [0, w])
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let row0 = vp.row(0);
        let row1 = vp.row(1);
        let row2 = vp.row(2);
        let row3 = vp.row(3);

        let mut planes = [Vec4::ZERO; 6];

        // Left plane: row3 + row0
        planes[0] = Self::normalize_plane(row3 + row0);
        // Right plane: row3 - row0
        planes[1] = Self::normalize_plane(row3 - row0);
        // Bottom plane: row3 + row1
        planes[2] = Self::normalize_plane(row3 + row1);
        // Top plane: row3 - row1
        planes[3] = Self::normalize_plane(row3 - row1);
        // Near plane: z >= 0
        planes[4] = Self::normalize_plane(row2);
        // Far plane: row3 - row2
        planes[5] = Self::normalize_plane(row3 - row2);

        Self { planes }
    }

    #[inline]
    fn normalize_plane(plane: Vec4) -> Vec4 {
        let normal_length = plane.truncate().length();
        if normal_length > 0.0001 {
            plane / normal_length
        } else {
            plane
        }
    }

    /// Test if an AABB intersects the frustum
    /// Returns true if the box is at least partially inside (conservative)
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        for plane in &self.planes {
            // Corner furthest along the plane normal
            let p_vertex = Vec3::new(
                if plane.x > 0.0 { max.x } else { min.x },
                if plane.y > 0.0 { max.y } else { min.y },
                if plane.z > 0.0 { max.z } else { min.z },
            );

            if plane.truncate().dot(p_vertex) + plane.w < 0.0 {
                return false;
            }
        }

        true
    }
}

/// Camera controller - keyboard state integrated once per frame
#[derive(Debug, Default, Clone)]
pub struct CameraController {
    pub forward_pressed: bool,
    pub backward_pressed: bool,
    pub left_pressed: bool,
    pub right_pressed: bool,
    pub pitch_up_pressed: bool,
    pub pitch_down_pressed: bool,
    pub yaw_left_pressed: bool,
    pub yaw_right_pressed: bool,
    /// Shift: move three times faster
    pub fast: bool,
    /// Ctrl: move at a tenth of the speed
    pub slow: bool,
}

impl CameraController {
    /// World units per millisecond
    pub const TRANSLATE_SPEED: f32 = 0.01;
    /// Radians per millisecond
    pub const ROTATE_SPEED: f32 = 0.002;

    pub fn new() -> Self {
        Self::default()
    }

    /// Update camera based on controller state
    pub fn update_camera(&self, camera: &mut Camera, dt_ms: f32) {
        let mut translate = Self::TRANSLATE_SPEED * dt_ms;
        let rotate = Self::ROTATE_SPEED * dt_ms;

        if self.fast {
            translate *= 3.0;
        }
        if self.slow {
            translate *= 0.1;
        }

        let mut forward = 0.0;
        let mut right = 0.0;
        if self.forward_pressed {
            forward += translate;
        }
        if self.backward_pressed {
            forward -= translate;
        }
        if self.left_pressed {
            right -= translate;
        }
        if self.right_pressed {
            right += translate;
        }
        camera.translate(forward, right);

        let right_axis = camera.right();
        if self.pitch_up_pressed {
            camera.rotate(right_axis, rotate);
        }
        if self.pitch_down_pressed {
            camera.rotate(right_axis, -rotate);
        }

        let up_axis = camera.up;
        if self.yaw_left_pressed {
            camera.rotate(up_axis, rotate);
        }
        if self.yaw_right_pressed {
            camera.rotate(up_axis, -rotate);
        }
    }
}
