use std::time::{Duration, Instant};

use crate::surface::Shape;

/// How long an error notice stays on screen before it fades on its own.
pub const ERROR_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ShapeChoice {
    Panel,
    Curved,
    Cube,
    Sphere,
    Torus,
}

impl ShapeChoice {
    pub const ALL: [ShapeChoice; 5] = [
        ShapeChoice::Panel,
        ShapeChoice::Curved,
        ShapeChoice::Cube,
        ShapeChoice::Sphere,
        ShapeChoice::Torus,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ShapeChoice::Panel => "Panel",
            ShapeChoice::Curved => "Curved wall",
            ShapeChoice::Cube => "Cube",
            ShapeChoice::Sphere => "Sphere",
            ShapeChoice::Torus => "Torus",
        }
    }
}

pub struct UiState {
    pub shape: ShapeChoice,
    pub curve_factor: f32,
    pub depth_intensity: f32,

    pub auto_rotate: bool,
    pub rotation_speed: f32,

    pub image_path: String,
    pub image_loading: bool,

    pub error: Option<(String, Instant)>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            shape: ShapeChoice::Panel,
            curve_factor: 0.5,
            depth_intensity: 0.6,

            auto_rotate: true,
            rotation_speed: 0.0038,

            image_path: String::new(),
            image_loading: false,

            error: None,
        }
    }
}

impl UiState {
    /// Maps the picker selection to the geometry shape, folding in the curve
    /// slider for the curved wall.
    pub fn selected_shape(&self) -> Shape {
        match self.shape {
            ShapeChoice::Panel => Shape::Panel,
            ShapeChoice::Curved => Shape::Curved {
                curve_factor: self.curve_factor,
            },
            ShapeChoice::Cube => Shape::Cube,
            ShapeChoice::Sphere => Shape::Sphere,
            ShapeChoice::Torus => Shape::Torus,
        }
    }

    pub fn report_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.error = Some((message, Instant::now()));
    }

    /// Drops the error notice once it has been on screen long enough.
    pub fn tick_error(&mut self) {
        if let Some((_, since)) = &self.error {
            if since.elapsed() >= ERROR_DISMISS_AFTER {
                self.error = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curved_selection_carries_the_slider_value() {
        let mut state = UiState::default();
        state.shape = ShapeChoice::Curved;
        state.curve_factor = 0.75;

        assert_eq!(
            state.selected_shape(),
            Shape::Curved { curve_factor: 0.75 }
        );
    }

    #[test]
    fn stale_errors_are_dismissed() {
        let mut state = UiState::default();
        state.error = Some((
            "boom".to_string(),
            Instant::now() - ERROR_DISMISS_AFTER * 2,
        ));

        state.tick_error();
        assert!(state.error.is_none());

        state.report_error("fresh");
        state.tick_error();
        assert!(state.error.is_some());
    }
}
