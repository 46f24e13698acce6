pub mod panels;
pub mod state;
pub mod theme;

pub use panels::{QUICK_ROTATE_STEP, QUICK_TILT_STEP, UiActions, draw_error_overlay, draw_side_panel};
pub use state::UiState;
pub use theme::apply_theme;
