//! Camera for viewing the simulation cube

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Eye offset that centres the unit cube in front of the camera
pub const DEFAULT_EYE: Vec3 = Vec3::new(-0.5, -0.5, -1.5);

/// Eye z change per frame while a dolly key is held
pub const DOLLY_STEP: f32 = 0.025;

/// Camera uniform for GPU
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub particle_size: f32,
    pub aspect: f32,
    pub type_count: u32,
    pub _padding: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMove {
    Forward,
    Backward,
}

/// Fixed-orientation camera; only the eye translation changes.
pub struct Camera {
    pub eye: Vec3,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: DEFAULT_EYE,
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: 1.0,
            znear: 0.1,
            zfar: 50.0,
        }
    }

    pub fn reset_eye(&mut self) {
        self.eye = DEFAULT_EYE;
    }

    pub fn dolly(&mut self, direction: CameraMove) {
        match direction {
            CameraMove::Forward => self.eye.z += DOLLY_STEP,
            CameraMove::Backward => self.eye.z -= DOLLY_STEP,
        }
    }

    /// Projection (depth in [0, 1]) times the eye translation
    pub fn build_view_projection_matrix(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar);
        proj * Mat4::from_translation(self.eye)
    }

    pub fn to_uniform(&self, particle_size: f32, type_count: u32) -> CameraUniform {
        CameraUniform {
            view_proj: self.build_view_projection_matrix().to_cols_array_2d(),
            particle_size,
            aspect: self.aspect,
            type_count,
            _padding: 0.0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_cube_centre_projects_to_screen_centre() {
        let camera = Camera::new(1920, 1080);
        let clip = camera.build_view_projection_matrix() * Vec4::new(0.5, 0.5, 0.5, 1.0);
        let ndc = clip / clip.w;

        assert!(approx(ndc.x, 0.0));
        assert!(approx(ndc.y, 0.0));
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_whole_cube_is_in_front_of_camera() {
        let camera = Camera::new(800, 800);
        let vp = camera.build_view_projection_matrix();
        for corner in 0..8 {
            let p = Vec4::new(
                (corner & 1) as f32,
                ((corner >> 1) & 1) as f32,
                ((corner >> 2) & 1) as f32,
                1.0,
            );
            let clip = vp * p;
            assert!(clip.w > 0.0);
            let depth = clip.z / clip.w;
            assert!((0.0..=1.0).contains(&depth));
        }
    }

    #[test]
    fn test_dolly_moves_eye_z() {
        let mut camera = Camera::new(640, 480);
        camera.dolly(CameraMove::Forward);
        assert!(approx(camera.eye.z, DEFAULT_EYE.z + DOLLY_STEP));
        assert_eq!(camera.eye.x, DEFAULT_EYE.x);
        assert_eq!(camera.eye.y, DEFAULT_EYE.y);

        camera.dolly(CameraMove::Backward);
        camera.dolly(CameraMove::Backward);
        assert!(approx(camera.eye.z, DEFAULT_EYE.z - DOLLY_STEP));

        camera.reset_eye();
        assert_eq!(camera.eye, DEFAULT_EYE);
    }

    #[test]
    fn test_resize_ignores_minimised_window() {
        let mut camera = Camera::new(1000, 500);
        assert!(approx(camera.aspect, 2.0));

        camera.resize(0, 0);
        assert!(approx(camera.aspect, 2.0));

        camera.resize(500, 1000);
        assert!(approx(camera.aspect, 0.5));
    }

    #[test]
    fn test_uniform_layout() {
        // mat4x4 + four scalars, 16-byte aligned for WGSL
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);

        let camera = Camera::new(100, 100);
        let uniform = camera.to_uniform(0.01, 8);
        assert_eq!(uniform.type_count, 8);
        assert_eq!(uniform.view_proj, camera.build_view_projection_matrix().to_cols_array_2d());
    }
}
