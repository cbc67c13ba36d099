use egui::{Color32, RichText, Slider, Ui};

use crate::galaxy::config::{
    BRANCHES_RANGE, COUNT_RANGE, COUNT_STEP, RADIUS_RANGE, RANDOMNESS_POWER_RANGE,
    RANDOMNESS_RANGE, SIZE_RANGE, SPIN_RANGE,
};
use crate::galaxy::{GalaxyParams, Rgb};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelAction {
    Commit(GalaxyParams),
    Reroll,
}

#[derive(Debug, Clone, Default)]
pub struct PanelStatus {
    pub generation: u64,
    pub particle_count: u32,
    pub frames_per_second: f32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParamPanel {
    draft: GalaxyParams,
    dirty: bool,
    reroll_requested: bool,
}

impl ParamPanel {
    pub fn new(params: GalaxyParams) -> Self {
        Self {
            draft: params,
            dirty: false,
            reroll_requested: false,
        }
    }

    pub fn draft(&self) -> &GalaxyParams {
        &self.draft
    }

    /// A rejected commit snaps the widgets back.
    pub fn sync(&mut self, committed: &GalaxyParams) {
        if !self.dirty {
            self.draft = *committed;
        }
    }

    pub fn edit(&mut self, f: impl FnOnce(&mut GalaxyParams)) {
        f(&mut self.draft);
        self.dirty = true;
    }

    pub fn ui(&mut self, ui: &mut Ui, status: &PanelStatus) {
        ui.heading("Galaxy");
        ui.separator();

        let d = &mut self.draft;
        let mut changed = false;
        changed |= ui
            .add(
                Slider::new(&mut d.count, COUNT_RANGE)
                    .step_by(COUNT_STEP as f64)
                    .logarithmic(true)
                    .text("count"),
            )
            .changed();
        changed |= ui
            .add(Slider::new(&mut d.size, SIZE_RANGE).step_by(0.001).text("size"))
            .changed();
        changed |= ui
            .add(Slider::new(&mut d.radius, RADIUS_RANGE).step_by(0.01).text("radius"))
            .changed();
        changed |= ui
            .add(Slider::new(&mut d.branches, BRANCHES_RANGE).step_by(1.0).text("branches"))
            .changed();
        changed |= ui
            .add(Slider::new(&mut d.spin, SPIN_RANGE).step_by(0.001).text("spin"))
            .changed();
        changed |= ui
            .add(
                Slider::new(&mut d.randomness, RANDOMNESS_RANGE)
                    .step_by(0.001)
                    .text("randomness"),
            )
            .changed();
        changed |= ui
            .add(
                Slider::new(&mut d.randomness_power, RANDOMNESS_POWER_RANGE)
                    .step_by(0.001)
                    .text("randomness power"),
            )
            .changed();
        changed |= color_row(ui, "inside color", &mut d.inside_color);
        changed |= color_row(ui, "outside color", &mut d.outside_color);
        self.dirty |= changed;

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Regenerate").clicked() {
                self.reroll_requested = true;
            }
            if ui.button("Reset").clicked() {
                self.draft = GalaxyParams::default();
                self.dirty = true;
            }
        });

        ui.separator();
        ui.label(format!(
            "{} particles · generation {} · {:.0} fps",
            status.particle_count, status.generation, status.frames_per_second
        ));
        if let Some(err) = &status.last_error {
            ui.label(RichText::new(err).color(Color32::LIGHT_RED));
        }
    }

    /// Call once per frame after `ui`. Edits are held while a pointer button
    /// is down or a widget has keyboard focus.
    pub fn finish_frame(&mut self, ctx: &egui::Context) -> Option<PanelAction> {
        let held = ctx.input(|i| i.pointer.any_down()) || ctx.wants_keyboard_input();
        self.finish(held)
    }

    pub fn finish(&mut self, held: bool) -> Option<PanelAction> {
        if self.dirty && !held {
            self.dirty = false;
            self.reroll_requested = false;
            return Some(PanelAction::Commit(self.draft));
        }
        if self.reroll_requested {
            self.reroll_requested = false;
            return Some(PanelAction::Reroll);
        }
        None
    }
}

fn color_row(ui: &mut Ui, label: &str, color: &mut Rgb) -> bool {
    ui.horizontal(|ui| {
        let mut srgb = color.to_srgb8();
        let changed = egui::color_picker::color_edit_button_srgb(ui, &mut srgb).changed();
        ui.label(label);
        if changed {
            *color = Rgb::from_srgb8(srgb);
        }
        changed
    })
    .inner
}

#[cfg(test)]
mod tests {
    use egui::{Event, Key, Modifiers, RawInput};

    use super::{PanelAction, PanelStatus, ParamPanel};
    use crate::galaxy::GalaxyParams;

    fn key(key: Key) -> Event {
        Event::Key {
            key,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: Modifiers::NONE,
        }
    }

    fn run_frame(
        ctx: &egui::Context,
        panel: &mut ParamPanel,
        events: Vec<Event>,
    ) -> Option<PanelAction> {
        let input = RawInput {
            events,
            ..RawInput::default()
        };
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                panel.ui(ui, &PanelStatus::default());
            });
        });
        panel.finish_frame(ctx)
    }

    #[test]
    fn commit_waits_for_pointer_release() {
        let mut panel = ParamPanel::new(GalaxyParams::default());
        panel.edit(|p| p.spin = 2.0);
        assert_eq!(panel.finish(true), None);
        panel.edit(|p| p.spin = 2.5);
        assert_eq!(panel.finish(true), None);

        match panel.finish(false) {
            Some(PanelAction::Commit(params)) => assert_eq!(params.spin, 2.5),
            other => panic!("expected commit, got {other:?}"),
        }
        assert_eq!(panel.finish(false), None);
    }

    #[test]
    fn sync_only_overrides_clean_drafts() {
        let mut panel = ParamPanel::new(GalaxyParams::default());
        let committed = GalaxyParams {
            count: 500,
            ..GalaxyParams::default()
        };
        panel.sync(&committed);
        assert_eq!(panel.draft().count, 500);

        panel.edit(|p| p.count = 900);
        panel.sync(&committed);
        assert_eq!(panel.draft().count, 900);
    }

    #[test]
    fn idle_frame_produces_no_action() {
        let mut panel = ParamPanel::new(GalaxyParams::default());
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                panel.ui(ui, &PanelStatus::default());
            });
        });
        assert_eq!(panel.finish(false), None);
        assert_eq!(panel.draft(), &GalaxyParams::default());
    }

    #[test]
    fn typed_value_commits_once_on_enter() {
        let mut panel = ParamPanel::new(GalaxyParams::default());
        let ctx = egui::Context::default();

        assert_eq!(run_frame(&ctx, &mut panel, Vec::new()), None);
        // Slider body first, then its value box.
        assert_eq!(run_frame(&ctx, &mut panel, vec![key(Key::Tab)]), None);
        assert_eq!(run_frame(&ctx, &mut panel, vec![key(Key::Tab)]), None);
        assert!(ctx.wants_keyboard_input());

        for digit in ["2", "5", "0", "0"] {
            let action = run_frame(&ctx, &mut panel, vec![Event::Text(digit.to_owned())]);
            assert_eq!(action, None, "committed while typing {digit}");
        }

        let mut commits = Vec::new();
        commits.extend(run_frame(&ctx, &mut panel, vec![key(Key::Enter)]));
        commits.extend(run_frame(&ctx, &mut panel, Vec::new()));
        commits.extend(run_frame(&ctx, &mut panel, Vec::new()));

        assert_eq!(commits.len(), 1, "{commits:?}");
        match commits[0] {
            PanelAction::Commit(params) => assert_eq!(params.count, 2500),
            other => panic!("expected commit, got {other:?}"),
        }
    }
}
