use crate::config::{WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH};
use crate::core::audio::{AudioOutput, DeviceAudio, NullAudio};
use crate::core::input::{self, InputEdge, KeyInput};
use crate::game::profile;
use crate::game::session::{Command, Session};
use crate::game::song::{self, SongCatalog};
use crate::game::ui::UiState;
use rand::SeedableRng;
use rand::rngs::StdRng;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use log::{error, info, warn};
use std::{error::Error, sync::Arc, time::Instant};

pub struct App {
    window: Option<Arc<Window>>,
    session: Session<Box<dyn AudioOutput>>,
    ui: UiState,
    frame_count: u32,
    last_title_update: Instant,
    last_fps: f32,
}

impl App {
    fn new(session: Session<Box<dyn AudioOutput>>) -> Self {
        Self {
            window: None,
            session,
            ui: UiState::default(),
            frame_count: 0,
            last_title_update: Instant::now(),
            last_fps: 0.0,
        }
    }

    fn handle_edge(&mut self, edge: InputEdge) {
        let command = match (edge.input, edge.pressed) {
            (KeyInput::Lane(lane), true) => Some(Command::KeyDown(lane)),
            (KeyInput::Lane(lane), false) => Some(Command::KeyUp(lane)),
            (KeyInput::Menu(key), true) => self.session.menu_command(key),
            (KeyInput::Menu(_), false) => None,
        };
        if let Some(command) = command {
            self.session.dispatch(command, edge.timestamp);
            persist_option(command, &self.session);
        }
    }

    fn sync_ui(&mut self, now: Instant) {
        let events = self.session.drain_events();
        self.ui.apply_all(&events, now);
        if let Some(alert) = self.ui.clear_alert() {
            warn!("{}", alert);
        }
    }

    fn update_title(&mut self, window: &Window, now: Instant) {
        self.frame_count += 1;
        let elapsed = now.duration_since(self.last_title_update);
        if elapsed.as_secs_f32() >= 0.1 {
            self.last_fps = self.frame_count as f32 / elapsed.as_secs_f32();
            let mut title = format!("{} - {}", WINDOW_TITLE, self.ui.hud_line(now));
            if self.ui.debug {
                title.push_str(&format!(
                    " | {} notes | {} bursts | {:.0} FPS",
                    self.session.field().len(),
                    self.session.effects().bursts().len(),
                    self.last_fps
                ));
            }
            window.set_title(&title);
            self.frame_count = 0;
            self.last_title_update = now;
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn Error>> {
        let window_attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_resizable(true)
            .with_inner_size(PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        let window = Arc::new(event_loop.create_window(window_attributes)?);
        self.window = Some(window);
        info!("Starting event loop...");
        Ok(())
    }
}

/// Writes option changes back to the profile file.
fn persist_option<A: AudioOutput>(command: Command, session: &Session<A>) {
    match command {
        Command::ChangeDifficulty(difficulty) => profile::update(|p| p.difficulty = difficulty),
        Command::ChangeVolume(_) => {
            let volume = session.music().volume();
            profile::update(|p| p.music_volume = volume);
        }
        Command::ToggleDebug => {
            let debug = session.state().debug_mode;
            profile::update(|p| p.debug = debug);
        }
        _ => {}
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init_window(event_loop) {
                error!("Failed to create window: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref().cloned() else { return; };
        if window_id != window.id() { return; }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested. Shutting down.");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                if let Some(edge) = input::edge_from_key_event(&key_event, Instant::now()) {
                    self.handle_edge(edge);
                }
            }
            WindowEvent::Focused(false) => {
                // Keys released while unfocused never arrive; let go of every lane.
                let now = Instant::now();
                for lane in crate::game::note::Lane::ALL {
                    if self.session.state().is_key_active(lane) {
                        self.session.dispatch(Command::KeyUp(lane), now);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                self.session.update(now);
                self.sync_ui(now);
                self.update_title(&window, now);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        let stats = self.session.stats();
        info!(
            "Exiting. Last score {}, max combo {}, perfect {}, misses {}.",
            self.session.state().score,
            stats.max_combo,
            stats.perfect_hits,
            stats.misses
        );
    }
}

fn open_audio() -> Box<dyn AudioOutput> {
    match DeviceAudio::new() {
        Ok(device) => Box::new(device),
        Err(e) => {
            warn!("No audio device ({}); continuing without sound.", e);
            Box::new(NullAudio)
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    profile::load();
    let options = profile::get();

    let catalog = SongCatalog::new(song::builtin_songs(), song::load_catalog(&options.music_xml));
    let mut session = Session::new(open_audio(), &options, catalog, StdRng::from_os_rng());
    session.init();

    let event_loop = EventLoop::new()?;
    let mut app = App::new(session);
    app.sync_ui(Instant::now());
    event_loop.run_app(&mut app)?;
    Ok(())
}
