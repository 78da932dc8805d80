use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::Settings;
use crate::coords::Vec2;
use crate::core::{Game, GameInit};
use crate::device::{Gpu, GpuInit};
use crate::diagnostics::{FrameTelemetry, TelemetryPublisher};
use crate::frame::{Collaborators, LoopConfig, LoopController, LoopState};
use crate::input::{key_text, translate_window_event, InputDispatcher};
use crate::physics::PhysicsWorld;
use crate::render::WgpuBackend;
use crate::scene::EntityTree;
use crate::startup::{StartupSequencer, TeardownStack};
use crate::store::AppStore;
use crate::time::FrameClock;

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window and drives frames until the loop terminates.
    ///
    /// A critical startup failure exits the process with status 1 from inside
    /// the event loop. `telemetry`, when present, receives a snapshot after
    /// every frame.
    pub fn run<G>(
        settings: Settings,
        store: Arc<AppStore>,
        telemetry: Option<TelemetryPublisher>,
        game: G,
    ) -> Result<()>
    where
        G: Game + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut app = RuntimeApp::new(settings, store, telemetry, game);

        event_loop
            .run_app(&mut app)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Option<Gpu<'this>>,
}

/// Subsystems owned between startup and teardown.
///
/// Each optional field is filled by one startup stage and emptied by its
/// teardown.
struct Session<G> {
    entry: Option<WindowEntry>,
    backend: Option<WgpuBackend>,
    physics: Option<PhysicsWorld>,
    tree: Option<EntityTree>,
    game: Option<G>,
    store: Arc<AppStore>,

    input: InputDispatcher,
    controller: LoopController,
    clock: FrameClock,
    close_requested: bool,
}

impl<G> Session<G> {
    fn update_pointer_scale(&mut self, render: Vec2) {
        let Some(entry) = self.entry.as_ref() else {
            return;
        };
        let logical: LogicalSize<f32> =
            entry.with_window(|w| w.inner_size().to_logical(w.scale_factor()));
        self.input
            .set_pointer_scale(Vec2::new(logical.width, logical.height), render);
    }

    fn request_redraw(&self) {
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }
}

struct RuntimeApp<G: Game + 'static> {
    settings: Settings,
    telemetry: Option<TelemetryPublisher>,
    pending_game: Option<G>,
    session: Session<G>,
    teardown: Option<TeardownStack<Session<G>>>,

    started: Instant,
    frame_interval: Option<Duration>,
    next_frame: Instant,
}

impl<G: Game + 'static> RuntimeApp<G> {
    fn new(
        settings: Settings,
        store: Arc<AppStore>,
        telemetry: Option<TelemetryPublisher>,
        game: G,
    ) -> Self {
        let clock = FrameClock::with_clamps(
            Duration::from_micros(100),
            Duration::from_secs_f32(settings.max_frame_secs.max(0.001)),
        );
        let frame_interval = match settings.target_fps {
            0 => None,
            fps => Some(Duration::from_secs_f64(1.0 / f64::from(fps))),
        };

        let session = Session {
            entry: None,
            backend: None,
            physics: None,
            tree: None,
            game: None,
            store,
            input: InputDispatcher::new(),
            controller: LoopController::new(LoopConfig::from_settings(&settings)),
            clock,
            close_requested: false,
        };

        let now = Instant::now();
        Self {
            settings,
            telemetry,
            pending_game: Some(game),
            session,
            teardown: None,
            started: now,
            frame_interval,
            next_frame: now,
        }
    }

    fn render_size(&self) -> Vec2 {
        Vec2::new(
            self.settings.render_width as f32,
            self.settings.render_height as f32,
        )
    }

    /// Brings subsystems up in dependency order.
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<TeardownStack<Session<G>>> {
        let settings = &self.settings;
        let session = &mut self.session;
        let mut seq = StartupSequencer::<Session<G>>::new();

        let window = seq.critical("window", || {
            let attrs = Window::default_attributes()
                .with_title(settings.title.clone())
                .with_inner_size(LogicalSize::new(
                    f64::from(settings.screen_width),
                    f64::from(settings.screen_height),
                ));
            event_loop.create_window(attrs).context("failed to create window")
        })?;
        session.entry = Some(WindowEntry::new(window, |_| None));
        seq.register_teardown("window", |s: &mut Session<G>| s.entry = None);

        seq.critical("graphics api", || {
            let entry = session.entry.as_mut().context("window missing")?;
            let init = GpuInit::for_target_fps(settings.target_fps);
            entry.with_mut(|fields| -> Result<()> {
                let gpu = pollster::block_on(Gpu::new(fields.window, init))?;
                *fields.gpu = Some(gpu);
                Ok(())
            })
        })?;
        seq.register_teardown("graphics api", |s: &mut Session<G>| {
            if let Some(entry) = s.entry.as_mut() {
                entry.with_gpu_mut(|gpu| *gpu = None);
            }
        });

        let viewport = (settings.render_width, settings.render_height);
        let backend = seq.critical("render backend", || {
            let entry = session.entry.as_ref().context("window missing")?;
            entry.with_gpu(|gpu| match gpu {
                Some(gpu) => WgpuBackend::init(gpu, viewport),
                None => anyhow::bail!("graphics api missing"),
            })
        })?;
        session.backend = Some(backend);
        seq.register_teardown("render backend", |s: &mut Session<G>| {
            if let Some(backend) = s.backend.as_mut() {
                backend.deinit();
            }
            s.backend = None;
        });

        let physics = seq.critical("physics", || {
            PhysicsWorld::init(settings.fixed_dt, settings.gravity, settings.pixels_per_unit)
        })?;
        session.physics = Some(physics);
        seq.register_teardown("physics", |s: &mut Session<G>| {
            if let Some(physics) = s.physics.as_mut() {
                physics.deinit();
            }
            s.physics = None;
        });

        let tree = seq.critical("hierarchy", || Ok(EntityTree::new()))?;
        session.tree = Some(tree);
        seq.register_teardown("hierarchy", |s: &mut Session<G>| {
            if let Some(tree) = s.tree.as_mut() {
                log::debug!("releasing {} entities", tree.len());
                tree.clear();
            }
            s.tree = None;
        });

        let mut game = self.pending_game.take().context("game already started")?;
        seq.critical("game", || {
            let (Some(tree), Some(physics)) = (session.tree.as_mut(), session.physics.as_mut()) else {
                anyhow::bail!("hierarchy or physics missing");
            };
            let mut ctx = GameInit {
                tree,
                physics,
                store: &session.store,
                settings,
            };
            game.init(&mut ctx)
        })?;
        session.game = Some(game);
        seq.register_teardown("game", |s: &mut Session<G>| {
            if let Some(mut game) = s.game.take() {
                game.deinit(&s.store);
            }
        });

        Ok(seq.finish())
    }

    fn run_frame(&mut self, event_loop: &ActiveEventLoop) {
        let dt = self.session.clock.tick().dt;

        let Session {
            entry,
            backend,
            physics,
            tree,
            store,
            input,
            controller,
            close_requested,
            ..
        } = &mut self.session;

        let (Some(entry), Some(backend), Some(physics), Some(tree)) =
            (entry.as_mut(), backend.as_mut(), physics.as_mut(), tree.as_mut())
        else {
            return;
        };
        let close = *close_requested;

        let state = entry.with_gpu_mut(|gpu| {
            let Some(gpu) = gpu.as_mut() else {
                return controller.state();
            };
            let mut target = crate::render::WgpuTarget::new(gpu, backend);
            controller.frame(
                Collaborators {
                    hierarchy: &mut *tree,
                    physics: &mut *physics,
                    renderer: &mut target,
                    input: &mut *input,
                    state: &**store,
                },
                dt,
                close,
            )
        });

        if let Some(telemetry) = self.telemetry.as_ref() {
            telemetry.publish(FrameTelemetry::capture(
                state,
                controller.stats(),
                self.started.elapsed(),
            ));
        }

        if state == LoopState::Terminated {
            event_loop.exit();
        }
    }
}

impl<G: Game + 'static> ApplicationHandler for RuntimeApp<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.teardown.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(stack) => self.teardown = Some(stack),
            Err(e) => {
                log::error!("startup aborted: {e:#}");
                eprintln!("fatal: {e:#}");
                std::process::exit(1);
            }
        }

        let render = self.render_size();
        self.session.update_pointer_scale(render);
        self.session.clock.reset();
        self.next_frame = Instant::now();
        self.session.request_redraw();
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.controller.state() == LoopState::Terminated {
            event_loop.exit();
            return;
        }

        let Some(interval) = self.frame_interval else {
            event_loop.set_control_flow(ControlFlow::Poll);
            self.session.request_redraw();
            return;
        };

        let now = Instant::now();
        if now >= self.next_frame {
            self.session.request_redraw();
            self.next_frame += interval;
            if self.next_frame < now {
                self.next_frame = now + interval;
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.session.entry.is_none() {
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.session.close_requested = true;
                self.session.request_redraw();
                return;
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.session.entry.as_mut() {
                    entry.with_gpu_mut(|gpu| {
                        if let Some(gpu) = gpu.as_mut() {
                            gpu.resize(*new_size);
                        }
                    });
                }
                let render = self.render_size();
                self.session.update_pointer_scale(render);
                return;
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.session.entry.as_mut() {
                    let size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| {
                        if let Some(gpu) = gpu.as_mut() {
                            gpu.resize(size);
                        }
                    });
                }
                let render = self.render_size();
                self.session.update_pointer_scale(render);
                return;
            }

            WindowEvent::RedrawRequested => {
                self.run_frame(event_loop);
                return;
            }

            _ => {}
        }

        let Session { entry, input, .. } = &mut self.session;
        let Some(entry) = entry.as_ref() else {
            return;
        };
        let translated = entry.with_window(|w| translate_window_event(w, input.state(), &event));
        if let Some(ev) = translated {
            input.queue(ev);
        }
        if let Some(text) = key_text(&event) {
            input.queue(text);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        let stats = self.session.controller.stats();
        log::info!(
            "loop exited after {} frames ({:.1}s, {} dropped)",
            stats.frames,
            stats.elapsed,
            stats.dropped_frames
        );

        if let Some(stack) = self.teardown.take() {
            stack.shutdown(&mut self.session);
        }
    }
}
