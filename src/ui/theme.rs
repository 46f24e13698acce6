use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};

pub const BG_PANEL: Color32 = Color32::from_rgb(16, 18, 24);
pub const BG_WIDGET: Color32 = Color32::from_rgb(28, 31, 40);
pub const BG_WIDGET_HOVER: Color32 = Color32::from_rgb(40, 44, 56);
pub const BG_WIDGET_ACTIVE: Color32 = Color32::from_rgb(52, 57, 72);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(190, 193, 200);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(120, 124, 134);
pub const TEXT_BRIGHT: Color32 = Color32::from_rgb(232, 234, 238);

pub const ACCENT: Color32 = Color32::from_rgb(94, 176, 180);
pub const ACCENT_WARM: Color32 = Color32::from_rgb(206, 154, 62);
pub const ACCENT_ERROR: Color32 = Color32::from_rgb(198, 70, 70);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(46, 50, 64);

pub fn apply_theme(ctx: &egui::Context) {
    let mut style = Style::default();

    let mut visuals = Visuals::dark();
    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_PANEL;
    visuals.window_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.window_rounding = Rounding::same(5.0);
    visuals.faint_bg_color = BG_WIDGET;
    visuals.extreme_bg_color = Color32::from_rgb(10, 11, 15);
    visuals.warn_fg_color = ACCENT_WARM;
    visuals.error_fg_color = ACCENT_ERROR;
    visuals.hyperlink_color = ACCENT;
    visuals.slider_trailing_fill = true;
    visuals.selection = egui::style::Selection {
        bg_fill: ACCENT.gamma_multiply(0.35),
        stroke: Stroke::new(1.0, ACCENT),
    };

    visuals.widgets.noninteractive.bg_fill = BG_WIDGET;
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, TEXT_MUTED);
    visuals.widgets.inactive.bg_fill = BG_WIDGET;
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);
    visuals.widgets.hovered.bg_fill = BG_WIDGET_HOVER;
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT);
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, TEXT_BRIGHT);
    visuals.widgets.active.bg_fill = BG_WIDGET_ACTIVE;
    visuals.widgets.active.bg_stroke = Stroke::new(2.0, ACCENT);
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, TEXT_BRIGHT);
    for widget in [
        &mut visuals.widgets.noninteractive,
        &mut visuals.widgets.inactive,
        &mut visuals.widgets.hovered,
        &mut visuals.widgets.active,
        &mut visuals.widgets.open,
    ] {
        widget.rounding = Rounding::same(3.0);
    }

    style.visuals = visuals;

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 5.0);
    style.spacing.slider_width = 180.0;

    style.text_styles = [
        (TextStyle::Small, FontId::new(11.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Button, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Heading, FontId::new(18.0, FontFamily::Proportional)),
        (
            TextStyle::Monospace,
            FontId::new(13.0, FontFamily::Monospace),
        ),
    ]
    .into();

    ctx.set_style(style);
}
