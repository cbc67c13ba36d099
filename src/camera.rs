use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3};

/// Highest device pixel ratio the renderer will honor.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

const POLAR_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
            position: Vec3::new(3.0, 3.0, 3.0),
        }
    }
}

impl PerspectiveCamera {
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view(&self, target: Vec3) -> Mat4 {
        Mat4::look_at_rh(self.position, target, Vec3::Y)
    }

    pub fn set_aspect(&mut self, viewport: &Viewport) {
        if let Some(aspect) = viewport.aspect() {
            self.aspect = aspect;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            pixel_ratio: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32, native_pixel_ratio: f32, max_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: native_pixel_ratio.min(max_pixel_ratio).max(f32::MIN_POSITIVE),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width >= 1.0 && self.height >= 1.0)
    }

    pub fn aspect(&self) -> Option<f32> {
        if self.is_degenerate() {
            None
        } else {
            Some(self.width / self.height)
        }
    }

    pub fn physical_size(&self) -> [f32; 2] {
        [self.width * self.pixel_ratio, self.height * self.pixel_ratio]
    }
}

/// Camera offset from the orbit target in spherical form; `theta` is measured
/// around +Y starting at +Z, `phi` down from +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self {
                radius,
                theta: 0.0,
                phi: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vec3::new(
            self.radius * sin_phi * sin_theta,
            self.radius * cos_phi,
            self.radius * sin_phi * cos_theta,
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitSettings {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.01,
            max_distance: f32::INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitInput {
    Rotate { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
    /// Positive values zoom in, one unit per wheel notch.
    Dolly { notches: f32 },
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub settings: OrbitSettings,
    target: Vec3,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(OrbitSettings::default())
    }
}

impl OrbitControls {
    pub fn new(settings: OrbitSettings) -> Self {
        Self {
            settings,
            target: Vec3::ZERO,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn apply(&mut self, input: OrbitInput, camera: &PerspectiveCamera, viewport: &Viewport) {
        let height = viewport.height.max(1.0);
        match input {
            OrbitInput::Rotate { dx, dy } => {
                // A drag across the full viewport height is one full turn.
                self.delta_theta -= TAU * dx / height * self.settings.rotate_speed;
                self.delta_phi -= TAU * dy / height * self.settings.rotate_speed;
            }
            OrbitInput::Pan { dx, dy } => self.pan(dx, dy, height, camera),
            OrbitInput::Dolly { notches } => {
                self.scale *= 0.95f32.powf(self.settings.zoom_speed * notches);
            }
        }
    }

    fn pan(&mut self, dx: f32, dy: f32, height: f32, camera: &PerspectiveCamera) {
        let offset = camera.position - self.target;
        let half_extent = offset.length() * (camera.fov_y_degrees.to_radians() * 0.5).tan();
        let forward = (-offset).try_normalize().unwrap_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);

        let left_distance = 2.0 * dx * half_extent / height * self.settings.pan_speed;
        let up_distance = 2.0 * dy * half_extent / height * self.settings.pan_speed;
        self.pan_offset += -right * left_distance + up * up_distance;
    }

    /// Moves `camera` by the pending input. Returns whether it moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let before = camera.position;
        let factor = if self.settings.enable_damping {
            self.settings.damping_factor
        } else {
            1.0
        };

        let mut spherical = Spherical::from_offset(camera.position - self.target);
        spherical.theta += self.delta_theta * factor;
        spherical.phi =
            (spherical.phi + self.delta_phi * factor).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        spherical.radius = (spherical.radius * self.scale)
            .clamp(self.settings.min_distance, self.settings.max_distance);

        self.target += self.pan_offset * factor;
        camera.position = self.target + spherical.to_offset();

        if self.settings.enable_damping {
            self.delta_theta *= 1.0 - factor;
            self.delta_phi *= 1.0 - factor;
            self.pan_offset *= 1.0 - factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        camera.position.distance_squared(before) > 1e-8
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{OrbitControls, OrbitInput, OrbitSettings, PerspectiveCamera, Spherical, Viewport};

    fn setup() -> (OrbitControls, PerspectiveCamera, Viewport) {
        (
            OrbitControls::default(),
            PerspectiveCamera::default(),
            Viewport::new(800.0, 600.0, 1.0, 2.0),
        )
    }

    #[test]
    fn spherical_matches_offset() {
        let offset = Vec3::new(3.0, 3.0, 3.0);
        let back = Spherical::from_offset(offset).to_offset();
        assert!(back.distance(offset) < 1e-5);
    }

    #[test]
    fn idle_update_keeps_camera_still() {
        let (mut controls, mut camera, _) = setup();
        assert!(!controls.update(&mut camera));
        assert!(camera.position.distance(Vec3::new(3.0, 3.0, 3.0)) < 1e-5);
    }

    #[test]
    fn damped_rotation_converges_to_undamped() {
        let (mut damped, mut camera_a, viewport) = setup();
        let mut undamped = OrbitControls::new(OrbitSettings {
            enable_damping: false,
            ..OrbitSettings::default()
        });
        let mut camera_b = camera_a;

        let drag = OrbitInput::Rotate { dx: 120.0, dy: 0.0 };
        damped.apply(drag, &camera_a, &viewport);
        undamped.apply(drag, &camera_b, &viewport);

        assert!(damped.update(&mut camera_a));
        let first_step = camera_a;
        undamped.update(&mut camera_b);
        assert!(first_step.position.distance(camera_b.position) > 0.1);

        for _ in 0..400 {
            damped.update(&mut camera_a);
        }
        assert!(camera_a.position.distance(camera_b.position) < 1e-3);
    }

    #[test]
    fn dolly_in_shortens_distance() {
        let (mut controls, mut camera, viewport) = setup();
        let start = camera.position.length();
        controls.settings.enable_damping = false;
        controls.apply(OrbitInput::Dolly { notches: 2.0 }, &camera, &viewport);
        controls.update(&mut camera);
        assert!((camera.position.length() - start * 0.95 * 0.95).abs() < 1e-4);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let (mut controls, mut camera, viewport) = setup();
        controls.settings.enable_damping = false;
        controls.apply(OrbitInput::Rotate { dx: 0.0, dy: 5_000.0 }, &camera, &viewport);
        controls.update(&mut camera);
        assert!(camera.position.y > 0.0);
        assert!(camera.position.x.hypot(camera.position.z) < 1e-3);
    }

    #[test]
    fn pan_moves_target_and_camera_together() {
        let (mut controls, mut camera, viewport) = setup();
        controls.settings.enable_damping = false;
        let offset_before = camera.position - controls.target();
        controls.apply(OrbitInput::Pan { dx: 40.0, dy: 0.0 }, &camera, &viewport);
        controls.update(&mut camera);
        assert!(controls.target().length() > 0.0);
        assert!((camera.position - controls.target()).distance(offset_before) < 1e-4);
    }

    #[test]
    fn viewport_caps_pixel_ratio() {
        let viewport = Viewport::new(100.0, 50.0, 3.0, 2.0);
        assert_eq!(viewport.physical_size(), [200.0, 100.0]);
        assert_eq!(viewport.aspect(), Some(2.0));
        assert_eq!(Viewport::new(0.0, 50.0, 1.0, 2.0).aspect(), None);
    }

    #[test]
    fn degenerate_viewport_keeps_aspect() {
        let mut camera = PerspectiveCamera::default();
        camera.set_aspect(&Viewport::new(1600.0, 900.0, 1.0, 2.0));
        camera.set_aspect(&Viewport::new(1600.0, 0.0, 1.0, 2.0));
        assert!((camera.aspect - 16.0 / 9.0).abs() < 1e-6);
    }
}
