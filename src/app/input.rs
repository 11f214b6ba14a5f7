use crate::render::OrbitControls;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// Pointer state for orbiting the camera with the left button.
#[derive(Default, Debug, Clone, Copy)]
pub struct InputState {
    cursor: Option<(f32, f32)>,
    dragging: bool,
}

impl InputState {
    /// `ui_captured` is true when the press lands on the control panel.
    pub fn handle_button(&mut self, button: MouseButton, state: ElementState, ui_captured: bool) {
        if button != MouseButton::Left {
            return;
        }
        self.dragging = state == ElementState::Pressed && !ui_captured;
    }

    pub fn handle_cursor(
        &mut self,
        x: f32,
        y: f32,
        viewport_height: f32,
        controls: &mut OrbitControls,
    ) {
        if let (true, Some((last_x, last_y))) = (self.dragging, self.cursor) {
            controls.drag(x - last_x, y - last_y, viewport_height);
        }
        self.cursor = Some((x, y));
    }

    pub fn handle_cursor_left(&mut self) {
        self.cursor = None;
        self.dragging = false;
    }

    pub fn handle_wheel(&mut self, delta: MouseScrollDelta, controls: &mut OrbitControls) {
        let amount = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
        };
        // Scrolling up moves toward the target.
        controls.wheel(-amount);
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}
