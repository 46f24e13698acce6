use std::f32::consts::PI;
use std::path::PathBuf;

use egui::{Context, RichText, ScrollArea, Ui};

use crate::ui::state::{ShapeChoice, UiState};
use crate::ui::theme::*;

pub const QUICK_ROTATE_STEP: f32 = PI / 8.0;
pub const QUICK_TILT_STEP: f32 = PI / 12.0;

/// One frame's worth of requests from the panel; the app applies them after
/// the egui pass so UI code never touches the engine directly.
#[derive(Default)]
pub struct UiActions {
    pub load_image: Option<PathBuf>,
    pub clear_image: bool,
    pub rebuild: bool,
    pub depth_changed: Option<f32>,
    pub export_frame: bool,
    pub reset_view: bool,
    pub rotate_step: Option<f32>,
    pub tilt_step: Option<f32>,
}

fn section_header(ui: &mut Ui, title: &str) {
    ui.label(RichText::new(title).color(TEXT_MUTED).size(11.0).strong());
    ui.add_space(4.0);
}

pub fn draw_side_panel(
    ctx: &Context,
    state: &mut UiState,
    image_loaded: bool,
    surface_summary: Option<&str>,
) -> UiActions {
    let mut actions = UiActions::default();

    egui::SidePanel::right("control_panel")
        .min_width(300.0)
        .max_width(380.0)
        .default_width(320.0)
        .frame(egui::Frame::default().fill(BG_PANEL).inner_margin(16.0))
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading(RichText::new("Relief 3D").strong());
                ui.add_space(4.0);
                ui.label(
                    RichText::new("Image to surface viewer")
                        .color(TEXT_MUTED)
                        .size(11.0),
                );
                ui.add_space(16.0);

                section_header(ui, "IMAGE");
                ui.add(
                    egui::TextEdit::singleline(&mut state.image_path)
                        .hint_text("path/to/image.png")
                        .desired_width(ui.available_width()),
                );
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    let load_label = if state.image_loading {
                        "Loading..."
                    } else {
                        "Load"
                    };
                    if ui
                        .add_enabled(!state.image_loading, egui::Button::new(load_label))
                        .clicked()
                        && !state.image_path.trim().is_empty()
                    {
                        actions.load_image = Some(PathBuf::from(state.image_path.trim()));
                    }
                    if ui.add_enabled(image_loaded, egui::Button::new("Clear")).clicked() {
                        actions.clear_image = true;
                    }
                });
                ui.add_space(16.0);
                ui.separator();
                ui.add_space(12.0);

                section_header(ui, "SHAPE");
                for choice in ShapeChoice::ALL {
                    if ui
                        .selectable_label(state.shape == choice, choice.label())
                        .clicked()
                        && state.shape != choice
                    {
                        state.shape = choice;
                        actions.rebuild = true;
                    }
                }
                if state.shape == ShapeChoice::Curved {
                    ui.add_space(4.0);
                    ui.horizontal(|ui| {
                        ui.label("Curve:");
                        if ui
                            .add(egui::Slider::new(&mut state.curve_factor, 0.0..=1.0))
                            .changed()
                        {
                            actions.rebuild = true;
                        }
                    });
                }
                ui.add_space(16.0);

                section_header(ui, "DEPTH");
                ui.horizontal(|ui| {
                    ui.label("Intensity:");
                    if ui
                        .add(egui::Slider::new(&mut state.depth_intensity, 0.0..=1.5))
                        .changed()
                    {
                        actions.depth_changed = Some(state.depth_intensity);
                    }
                });
                if state.shape != ShapeChoice::Panel {
                    ui.label(
                        RichText::new("Depth applies to the flat panel only")
                            .color(TEXT_MUTED)
                            .size(11.0)
                            .italics(),
                    );
                }
                ui.add_space(16.0);
                ui.separator();
                ui.add_space(12.0);

                section_header(ui, "VIEW");
                ui.checkbox(&mut state.auto_rotate, "Auto rotate");
                ui.horizontal(|ui| {
                    ui.label("Speed:");
                    ui.add(egui::Slider::new(&mut state.rotation_speed, 0.0..=0.02));
                });
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    if ui.button("\u{25c0}").clicked() {
                        actions.rotate_step = Some(-QUICK_ROTATE_STEP);
                    }
                    if ui.button("\u{25b6}").clicked() {
                        actions.rotate_step = Some(QUICK_ROTATE_STEP);
                    }
                    if ui.button("\u{25b2}").clicked() {
                        actions.tilt_step = Some(-QUICK_TILT_STEP);
                    }
                    if ui.button("\u{25bc}").clicked() {
                        actions.tilt_step = Some(QUICK_TILT_STEP);
                    }
                    if ui.button("Reset view").clicked() {
                        actions.reset_view = true;
                    }
                });
                ui.add_space(16.0);

                section_header(ui, "EXPORT");
                if ui
                    .add_enabled(
                        image_loaded,
                        egui::Button::new("Save PNG")
                            .fill(ACCENT)
                            .min_size(egui::vec2(ui.available_width(), 30.0)),
                    )
                    .clicked()
                {
                    actions.export_frame = true;
                }
                ui.add_space(16.0);
                ui.separator();
                ui.add_space(8.0);

                if let Some(summary) = surface_summary {
                    ui.label(RichText::new(summary).color(TEXT_MUTED).size(11.0));
                } else {
                    ui.label(
                        RichText::new("No surface. Load an image to begin.")
                            .color(TEXT_MUTED)
                            .size(11.0),
                    );
                }
            });
        });

    actions
}

/// Bottom-center error notice. Fades on its own after a few seconds; a click
/// dismisses it early.
pub fn draw_error_overlay(ctx: &Context, state: &mut UiState) {
    state.tick_error();

    let Some((message, _)) = state.error.clone() else {
        return;
    };

    egui::Area::new(egui::Id::new("error_overlay"))
        .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(BG_WIDGET)
                .stroke(egui::Stroke::new(1.0, ACCENT_ERROR))
                .rounding(4.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(&message).color(ACCENT_ERROR));
                        if ui.button("\u{2715}").clicked() {
                            state.error = None;
                        }
                    });
                });
        });
}
