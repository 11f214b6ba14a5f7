use crate::render::UiFrame;
use egui_winit::winit::event::WindowEvent;
use winit::window::Window;

/// Panel pass result: the tessellated frame plus whether egui wants the
/// pointer, which gates orbit dragging and wheel zoom.
pub struct UiPass {
    pub frame: UiFrame,
    pub wants_pointer: bool,
}

/// Owns the egui context and its winit input translation.
pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Self {
            context,
            winit_state,
        }
    }

    /// Returns true when egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    pub fn run<F>(&mut self, window: &Window, build: F) -> UiPass
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let output = self.context.run(raw_input, build);
        self.winit_state
            .handle_platform_output(window, output.platform_output);
        UiPass {
            frame: UiFrame::tessellate(
                &self.context,
                output.shapes,
                output.textures_delta,
                output.pixels_per_point,
            ),
            wants_pointer: self.context.wants_pointer_input(),
        }
    }
}
