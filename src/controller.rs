use std::collections::VecDeque;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::animation::GalaxySpin;
use crate::camera::{
    OrbitControls, OrbitInput, OrbitSettings, PerspectiveCamera, Viewport, MAX_PIXEL_RATIO,
};
use crate::error::{GalaxyError, GalaxyResult, PointUploadError};
use crate::galaxy::generator::{generate_with_rng, ParticleBuffer};
use crate::galaxy::layout::GpuViewUniform;
use crate::galaxy::GalaxyParams;

pub trait PointSetBackend {
    type Points;

    fn upload(&mut self, buffer: &ParticleBuffer) -> Result<Self::Points, PointUploadError>;

    fn release(&mut self, points: Self::Points);
}

#[derive(Debug)]
pub struct RenderablePointSet<P> {
    pub points: P,
    pub particle_count: u32,
    pub point_size: f32,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GalaxyEvent {
    ParameterCommitted(GalaxyParams),
    ViewportResized {
        width: f32,
        height: f32,
        pixel_ratio: f32,
    },
    OrbitInput(OrbitInput),
    FrameTick {
        elapsed_seconds: f32,
    },
}

#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<GalaxyEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GalaxyEvent) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<GalaxyEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub seed: Option<u64>,
    pub max_pixel_ratio: f32,
    pub spin: GalaxySpin,
    pub orbit: OrbitSettings,
    pub camera: PerspectiveCamera,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            seed: None,
            max_pixel_ratio: MAX_PIXEL_RATIO,
            spin: GalaxySpin::default(),
            orbit: OrbitSettings::default(),
            camera: PerspectiveCamera::default(),
        }
    }
}

pub struct GalaxyController<B: PointSetBackend> {
    params: GalaxyParams,
    backend: B,
    point_set: Option<RenderablePointSet<B::Points>>,
    rng: StdRng,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    spin: GalaxySpin,
    viewport: Viewport,
    max_pixel_ratio: f32,
    elapsed_seconds: f32,
    generation: u64,
    last_error: Option<String>,
}

impl<B: PointSetBackend> GalaxyController<B> {
    pub fn new(
        params: GalaxyParams,
        backend: B,
        settings: ControllerSettings,
    ) -> GalaxyResult<Self> {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut controller = Self {
            params,
            backend,
            point_set: None,
            rng,
            camera: settings.camera,
            controls: OrbitControls::new(settings.orbit),
            spin: settings.spin,
            viewport: Viewport::default(),
            max_pixel_ratio: settings.max_pixel_ratio.min(MAX_PIXEL_RATIO),
            elapsed_seconds: 0.0,
            generation: 0,
            last_error: None,
        };
        controller.camera.set_aspect(&controller.viewport);
        controller.regenerate(params)?;
        Ok(controller)
    }

    pub fn dispatch(&mut self, event: GalaxyEvent) -> GalaxyResult<()> {
        match event {
            GalaxyEvent::ParameterCommitted(params) => {
                let result = self.regenerate(params);
                match &result {
                    Ok(()) => self.last_error = None,
                    Err(err) => {
                        warn!(error = %err, "galaxy update rejected; keeping previous galaxy");
                        self.last_error = Some(err.to_string());
                    }
                }
                result
            }
            GalaxyEvent::ViewportResized {
                width,
                height,
                pixel_ratio,
            } => {
                self.resize(Viewport::new(width, height, pixel_ratio, self.max_pixel_ratio));
                Ok(())
            }
            GalaxyEvent::OrbitInput(input) => {
                self.controls.apply(input, &self.camera, &self.viewport);
                Ok(())
            }
            GalaxyEvent::FrameTick { elapsed_seconds } => {
                self.elapsed_seconds = elapsed_seconds;
                self.controls.update(&mut self.camera);
                Ok(())
            }
        }
    }

    /// A failing handler does not stop the ones behind it.
    pub fn drain(&mut self, queue: &mut EventQueue) -> Vec<GalaxyError> {
        let mut errors = Vec::new();
        while let Some(event) = queue.pop() {
            if let Err(err) = self.dispatch(event) {
                errors.push(err);
            }
        }
        errors
    }

    fn regenerate(&mut self, params: GalaxyParams) -> GalaxyResult<()> {
        let started = Instant::now();
        let buffer = generate_with_rng(&params, &mut self.rng)?;
        let points = self.backend.upload(&buffer)?;

        let generation = self.generation + 1;
        let next = RenderablePointSet {
            points,
            particle_count: buffer.len() as u32,
            point_size: params.size,
            generation,
        };
        if let Some(previous) = self.point_set.replace(next) {
            self.backend.release(previous.points);
        }
        self.params = params;
        self.generation = generation;

        info!(
            count = params.count,
            branches = params.branches,
            generation,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "galaxy generated"
        );
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) {
        if viewport.is_degenerate() {
            debug!(width = viewport.width, height = viewport.height, "ignoring empty viewport");
            return;
        }
        self.viewport = viewport;
        self.camera.set_aspect(&viewport);
    }

    pub fn view_uniform(&self) -> GpuViewUniform {
        let point_size = self
            .point_set
            .as_ref()
            .map_or(self.params.size, |set| set.point_size);
        GpuViewUniform::new(
            self.spin.model_matrix(self.elapsed_seconds),
            self.camera.view(self.controls.target()),
            self.camera.projection(),
            point_size,
            self.viewport.physical_size(),
        )
    }

    pub fn params(&self) -> &GalaxyParams {
        &self.params
    }

    pub fn point_set(&self) -> Option<&RenderablePointSet<B::Points>> {
        self.point_set.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn rotation_y(&self) -> f32 {
        self.spin.angle_at(self.elapsed_seconds)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl<B: PointSetBackend> Drop for GalaxyController<B> {
    fn drop(&mut self) {
        if let Some(previous) = self.point_set.take() {
            self.backend.release(previous.points);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::{
        ControllerSettings, EventQueue, GalaxyController, GalaxyEvent, PointSetBackend,
    };
    use crate::camera::OrbitInput;
    use crate::error::{GalaxyError, PointUploadError};
    use crate::galaxy::generator::ParticleBuffer;
    use crate::galaxy::GalaxyParams;

    #[derive(Debug, PartialEq)]
    struct MockPoints {
        id: usize,
        first: Option<[f32; 3]>,
    }

    #[derive(Default)]
    struct MockBackend {
        live: Rc<Cell<usize>>,
        uploads: usize,
        fail_uploads: bool,
    }

    impl PointSetBackend for MockBackend {
        type Points = MockPoints;

        fn upload(&mut self, buffer: &ParticleBuffer) -> Result<MockPoints, PointUploadError> {
            if self.fail_uploads {
                return Err(PointUploadError::Allocation("out of memory".into()));
            }
            self.uploads += 1;
            self.live.set(self.live.get() + 1);
            Ok(MockPoints {
                id: self.uploads,
                first: buffer.positions.first().copied(),
            })
        }

        fn release(&mut self, _points: MockPoints) {
            self.live.set(self.live.get() - 1);
        }
    }

    fn small() -> GalaxyParams {
        GalaxyParams {
            count: 500,
            ..GalaxyParams::default()
        }
    }

    fn seeded() -> ControllerSettings {
        ControllerSettings {
            seed: Some(17),
            ..ControllerSettings::default()
        }
    }

    fn controller() -> (GalaxyController<MockBackend>, Rc<Cell<usize>>) {
        let backend = MockBackend::default();
        let live = Rc::clone(&backend.live);
        let controller = GalaxyController::new(small(), backend, seeded()).unwrap();
        (controller, live)
    }

    #[test]
    fn first_generation_happens_on_construction() {
        let (controller, live) = controller();
        let set = controller.point_set().unwrap();
        assert_eq!(set.particle_count, 500);
        assert_eq!(set.generation, 1);
        assert_eq!(live.get(), 1);
    }

    #[test]
    fn repeated_regeneration_keeps_one_live_point_set() {
        let (mut controller, live) = controller();
        for count in (100..=2_500).step_by(100) {
            let params = GalaxyParams { count, ..small() };
            controller
                .dispatch(GalaxyEvent::ParameterCommitted(params))
                .unwrap();
            assert_eq!(live.get(), 1);
        }
        assert_eq!(controller.backend().uploads, 26);
        assert_eq!(controller.generation(), 26);
        assert_eq!(controller.point_set().unwrap().particle_count, 2_500);
    }

    #[test]
    fn zero_branches_keeps_previous_state() {
        let (mut controller, live) = controller();
        let bad = GalaxyParams {
            branches: 0,
            ..small()
        };
        let err = controller
            .dispatch(GalaxyEvent::ParameterCommitted(bad))
            .unwrap_err();
        assert!(err.is_config());
        assert_eq!(controller.params(), &small());
        assert_eq!(controller.point_set().unwrap().points.id, 1);
        assert_eq!(controller.generation(), 1);
        assert!(controller.last_error().is_some());
        assert_eq!(live.get(), 1);
    }

    #[test]
    fn failed_upload_never_installs_a_partial_set() {
        let (mut controller, live) = controller();
        controller.backend.fail_uploads = true;
        let err = controller
            .dispatch(GalaxyEvent::ParameterCommitted(GalaxyParams {
                count: 900,
                ..small()
            }))
            .unwrap_err();
        assert!(matches!(err, GalaxyError::Upload(PointUploadError::Allocation(_))));
        assert_eq!(controller.point_set().unwrap().particle_count, 500);
        assert_eq!(controller.params().count, 500);
        assert_eq!(live.get(), 1);
    }

    #[test]
    fn drop_releases_the_live_point_set() {
        let (controller, live) = controller();
        drop(controller);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn queue_runs_events_in_order_past_failures() {
        let (mut controller, _) = controller();
        let mut queue = EventQueue::new();
        queue.push(GalaxyEvent::ParameterCommitted(GalaxyParams {
            count: 700,
            ..small()
        }));
        queue.push(GalaxyEvent::ParameterCommitted(GalaxyParams {
            branches: 0,
            ..small()
        }));
        queue.push(GalaxyEvent::ParameterCommitted(GalaxyParams {
            count: 800,
            ..small()
        }));
        assert_eq!(queue.len(), 3);

        let errors = controller.drain(&mut queue);
        assert!(queue.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(controller.params().count, 800);
        assert_eq!(controller.generation(), 3);
        assert!(controller.last_error().is_none());
    }

    #[test]
    fn frame_tick_spins_the_galaxy() {
        let (mut controller, _) = controller();
        controller
            .dispatch(GalaxyEvent::FrameTick {
                elapsed_seconds: 7.0,
            })
            .unwrap();
        assert!((controller.rotation_y() + 0.1).abs() < 1e-6);

        let uniform = controller.view_uniform();
        let expected = glam::Mat4::from_rotation_y(controller.rotation_y()).to_cols_array_2d();
        assert_eq!(uniform.model, expected);
        assert_eq!(uniform.point_size, small().size);
    }

    #[test]
    fn resize_updates_aspect_and_caps_pixel_ratio() {
        let (mut controller, _) = controller();
        controller
            .dispatch(GalaxyEvent::ViewportResized {
                width: 1000.0,
                height: 500.0,
                pixel_ratio: 3.0,
            })
            .unwrap();
        assert_eq!(controller.camera().aspect, 2.0);
        assert_eq!(controller.viewport().physical_size(), [2000.0, 1000.0]);

        controller
            .dispatch(GalaxyEvent::ViewportResized {
                width: 0.0,
                height: 0.0,
                pixel_ratio: 1.0,
            })
            .unwrap();
        assert_eq!(controller.camera().aspect, 2.0);
    }

    #[test]
    fn orbit_input_moves_camera_on_next_tick() {
        let (mut controller, _) = controller();
        let before = controller.camera().position;
        controller
            .dispatch(GalaxyEvent::OrbitInput(OrbitInput::Rotate { dx: 50.0, dy: 0.0 }))
            .unwrap();
        assert_eq!(controller.camera().position, before);
        controller
            .dispatch(GalaxyEvent::FrameTick {
                elapsed_seconds: 0.0,
            })
            .unwrap();
        assert_ne!(controller.camera().position, before);
    }

    #[test]
    fn same_seed_same_galaxy() {
        let (a, _) = controller();
        let (b, _) = controller();
        assert_eq!(
            a.point_set().unwrap().points.first,
            b.point_set().unwrap().points.first
        );
    }
}
