mod egui_host;
mod input;
mod loader;
mod timing;

use crate::assets::FsAssetProvider;
use crate::config::ViewerConfig;
use crate::render::{HeadlessRenderer, RenderBackend, RenderError, RendererSettings};
use crate::ui::{ControlPanel, PanelResponse};
use crate::viewer::Viewer;
use egui_host::EguiHost;
use input::InputState;
use loader::{LoadRequest, PendingLoad};
use timing::FrameTiming;

use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorIcon, Window, WindowAttributes, WindowId};

pub struct App {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    egui: Option<EguiHost>,
    renderer: HeadlessRenderer,
    viewer: Viewer,
    panel: ControlPanel,
    input: InputState,
    ui_wants_pointer: bool,
    timing: FrameTiming,
    loader: Option<PendingLoad>,
    error: Option<RenderError>,
}

/// Renderer output settings taken from the config; the rest keep their
/// defaults.
fn renderer_settings(config: &ViewerConfig) -> RendererSettings {
    RendererSettings {
        tone_mapping: config.tone_mapping,
        exposure: config.tone_mapping_exposure,
        shadow_map_enabled: config.shadow.enabled,
        shadow_filter: config.shadow_filter,
        ..RendererSettings::default()
    }
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            window: None,
            egui: None,
            renderer: HeadlessRenderer::new(renderer_settings(&config)),
            viewer: Viewer::new(&config),
            panel: ControlPanel::new("Controls"),
            input: InputState::default(),
            ui_wants_pointer: false,
            timing: FrameTiming::new(config.window_title.clone()),
            loader: None,
            error: None,
            config,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: RenderError) {
        log::error!("{}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        self.viewer
            .resize(&mut self.renderer, size.width, size.height, scale_factor);
    }

    fn poll_loader(&mut self) {
        let Some(loader) = &mut self.loader else {
            return;
        };
        for event in loader.poll() {
            self.viewer.handle_load_event(event);
        }
        if loader.is_finished() {
            if self.viewer.is_model_loaded() {
                log::info!("Asset loading finished");
            } else {
                log::warn!("Asset loading finished without a model; showing an empty scene");
            }
            self.loader = None;
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.clone() else {
            return;
        };
        self.poll_loader();

        let Some(egui) = self.egui.as_mut() else {
            return;
        };
        let mut settings = *self.renderer.settings();
        let mut response = PanelResponse::default();
        let viewer = &mut self.viewer;
        let panel = &mut self.panel;
        let pass = egui.run(&window, |ctx| {
            response.merge(panel.show(ctx, viewer.panel_bindings(&mut settings)));
        });
        self.ui_wants_pointer = pass.wants_pointer;
        *self.renderer.settings_mut() = settings;
        if response.any_changed() {
            self.viewer.apply_panel(response);
        }

        let now = Instant::now();
        self.timing.update(Some(&window), now);
        let elapsed = self.timing.elapsed(now);
        if let Err(err) = self.viewer.tick(elapsed, &mut self.renderer, Some(&pass.frame)) {
            self.fail(event_loop, err);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let [width, height] = self.config.window_size;
        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window_title.clone())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.fail(event_loop, err.into());
                return;
            }
        };

        self.egui = Some(EguiHost::new(&window));
        self.handle_resize(window.inner_size(), window.scale_factor());
        log::info!(
            "Loading assets from {}",
            self.config.asset_root.display()
        );
        self.loader = Some(PendingLoad::spawn(
            Box::new(FsAssetProvider::new(self.config.asset_root.clone())),
            LoadRequest::from_config(&self.config),
        ));
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed = match (&self.window, &mut self.egui) {
            (Some(window), Some(egui)) => egui.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
                    PhysicalKey::Code(KeyCode::KeyH) if !consumed => {
                        self.panel.set_open(!self.panel.is_open());
                    }
                    _ => {}
                }
            }
            WindowEvent::Resized(new_size) => {
                let scale_factor = self
                    .window
                    .as_ref()
                    .map(|window| window.scale_factor())
                    .unwrap_or(1.0);
                self.handle_resize(new_size, scale_factor);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(size) = self.window.as_ref().map(|window| window.inner_size()) {
                    self.handle_resize(size, scale_factor);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let height = self
                    .window
                    .as_ref()
                    .map(|window| window.inner_size().height as f32)
                    .unwrap_or(0.0);
                self.input.handle_cursor(
                    position.x as f32,
                    position.y as f32,
                    height,
                    self.viewer.controls_mut(),
                );
            }
            WindowEvent::CursorLeft { .. } => self.input.handle_cursor_left(),
            WindowEvent::MouseInput { state, button, .. } => {
                self.input
                    .handle_button(button, state, consumed || self.ui_wants_pointer);
                if let Some(window) = &self.window {
                    window.set_cursor(if self.input.is_dragging() {
                        CursorIcon::Grabbing
                    } else {
                        CursorIcon::Default
                    });
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !consumed && !self.ui_wants_pointer {
                    self.input.handle_wheel(delta, self.viewer.controls_mut());
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

pub fn run(config: ViewerConfig) -> Result<(), RenderError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
