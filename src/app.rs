use std::sync::Arc;

use eframe::egui_wgpu;
use egui::{Color32, PointerButton, Sense};
use tracing::error;

use crate::animation::FrameClock;
use crate::camera::{OrbitInput, Viewport};
use crate::controller::{ControllerSettings, EventQueue, GalaxyController, GalaxyEvent};
use crate::error::{GalaxyError, GalaxyResult};
use crate::galaxy::{
    GalaxyGpuPoints, GalaxyParams, GalaxyPointPipeline, GpuViewUniform, WgpuPointBackend,
};
use crate::panel::{PanelAction, PanelStatus, ParamPanel};

/// Scroll distance in points egui reports for one mouse-wheel notch.
const POINTS_PER_WHEEL_NOTCH: f32 = 50.0;

pub struct GalaxyApp {
    controller: GalaxyController<WgpuPointBackend>,
    panel: ParamPanel,
    events: EventQueue,
    clock: FrameClock,
    last_viewport: Option<Viewport>,
}

impl GalaxyApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        params: GalaxyParams,
        settings: ControllerSettings,
    ) -> GalaxyResult<Self> {
        let render_state = cc
            .wgpu_render_state
            .as_ref()
            .ok_or(GalaxyError::NoRenderState)?;

        let pipeline = GalaxyPointPipeline::new(&render_state.device, render_state.target_format);
        render_state
            .renderer
            .write()
            .callback_resources
            .insert(pipeline);

        let backend = WgpuPointBackend::new(Arc::clone(&render_state.device));
        let controller = GalaxyController::new(params, backend, settings)?;
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        Ok(Self {
            panel: ParamPanel::new(*controller.params()),
            controller,
            events: EventQueue::new(),
            clock: FrameClock::new(),
            last_viewport: None,
        })
    }

    fn status(&self) -> PanelStatus {
        PanelStatus {
            generation: self.controller.generation(),
            particle_count: self
                .controller
                .point_set()
                .map_or(0, |set| set.particle_count),
            frames_per_second: self.clock.frames_per_second(),
            last_error: self.controller.last_error().map(str::to_owned),
        }
    }

    fn viewport_ui(&mut self, ui: &mut egui::Ui) {
        // Not focusable, so tabbing never parks keyboard focus on the viewport.
        let sense = Sense {
            focusable: false,
            ..Sense::click_and_drag()
        };
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), sense);

        let viewport = Viewport {
            width: rect.width(),
            height: rect.height(),
            pixel_ratio: ui.ctx().pixels_per_point(),
        };
        if self.last_viewport != Some(viewport) {
            self.last_viewport = Some(viewport);
            self.events.push(GalaxyEvent::ViewportResized {
                width: viewport.width,
                height: viewport.height,
                pixel_ratio: viewport.pixel_ratio,
            });
        }

        let delta = response.drag_delta();
        if response.dragged_by(PointerButton::Primary) {
            self.events.push(GalaxyEvent::OrbitInput(OrbitInput::Rotate {
                dx: delta.x,
                dy: delta.y,
            }));
        } else if response.dragged_by(PointerButton::Secondary) {
            self.events.push(GalaxyEvent::OrbitInput(OrbitInput::Pan {
                dx: delta.x,
                dy: delta.y,
            }));
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                self.events.push(GalaxyEvent::OrbitInput(OrbitInput::Dolly {
                    notches: scroll / POINTS_PER_WHEEL_NOTCH,
                }));
            }
        }

        self.events.push(GalaxyEvent::FrameTick {
            elapsed_seconds: self.clock.elapsed_seconds(),
        });
        for err in self.controller.drain(&mut self.events) {
            if !err.is_config() {
                error!(error = %err, "galaxy regeneration failed");
            }
        }
        self.panel.sync(self.controller.params());

        let callback = GalaxyPaintCallback {
            points: self
                .controller
                .point_set()
                .map(|set| Arc::clone(&set.points)),
            view: self.controller.view_uniform(),
        };
        ui.painter()
            .add(egui_wgpu::Callback::new_paint_callback(rect, callback));
    }
}

impl eframe::App for GalaxyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.clock.mark_frame();

        let status = self.status();
        egui::SidePanel::right("galaxy.params")
            .resizable(false)
            .show(ctx, |ui| self.panel.ui(ui, &status));

        match self.panel.finish_frame(ctx) {
            Some(PanelAction::Commit(params)) => {
                self.events.push(GalaxyEvent::ParameterCommitted(params));
            }
            Some(PanelAction::Reroll) => {
                self.events
                    .push(GalaxyEvent::ParameterCommitted(*self.controller.params()));
            }
            None => {}
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| self.viewport_ui(ui));

        ctx.request_repaint();
    }
}

struct GalaxyPaintCallback {
    points: Option<Arc<GalaxyGpuPoints>>,
    view: GpuViewUniform,
}

impl egui_wgpu::CallbackTrait for GalaxyPaintCallback {
    fn prepare(
        &self,
        _device: &wgpu::Device,
        queue: &wgpu::Queue,
        _screen_descriptor: &egui_wgpu::ScreenDescriptor,
        _egui_encoder: &mut wgpu::CommandEncoder,
        resources: &mut egui_wgpu::CallbackResources,
    ) -> Vec<wgpu::CommandBuffer> {
        if let Some(pipeline) = resources.get::<GalaxyPointPipeline>() {
            pipeline.write_view(queue, &self.view);
        }
        Vec::new()
    }

    fn paint(
        &self,
        _info: egui::PaintCallbackInfo,
        render_pass: &mut wgpu::RenderPass<'static>,
        resources: &egui_wgpu::CallbackResources,
    ) {
        let pipeline = resources.get::<GalaxyPointPipeline>();
        if let (Some(pipeline), Some(points)) = (pipeline, &self.points) {
            pipeline.draw(render_pass, points);
        }
    }
}
