//! Headless driver for the rein2d demo scene.
//!
//! A player box is tied to a smaller box by a rod and dropped onto a static
//! wall. The arrow-key input of an interactive build is replaced by a fixed
//! script so runs are repeatable.
//!
//! Usage: `rein2d-app [seconds]` (default 5). Set `RUST_LOG=debug` for
//! per-frame body positions.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use glam::{Vec2, Vec3};
use rein2d::{BodyHandle, PhysicsConfig, PhysicsWorld, RigidBody, Shape};

/// Magnitude of the force the "arrow keys" push the player with.
const PLAYER_FORCE: f32 = 10_000.0;

/// Frame pacing for the outer (render-rate) loop.
struct LoopConfig {
    /// Target frames per second. Default: 60.
    target_fps: f64,
    /// Seconds to run before exiting. Default: 5.
    run_time: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            run_time: 5.0,
        }
    }
}

struct DemoApp {
    physics: PhysicsWorld,
    player: BodyHandle,
    cargo: BodyHandle,
    frames: u64,
    steps: u64,
}

impl DemoApp {
    fn new() -> anyhow::Result<Self> {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default().damping(0.95))?;

        let player = physics.add_body(RigidBody::new_dynamic(
            Shape::rectangle(Vec2::new(100.0, 100.0)),
            Vec3::new(100.0, 300.0, 0.0),
            5.0,
        ));
        let cargo = physics.add_body(RigidBody::new_dynamic(
            Shape::rectangle(Vec2::new(50.0, 50.0)),
            Vec3::new(200.0, 400.0, 0.0),
            3.0,
        ));
        physics.add_body(RigidBody::new_static(
            Shape::rectangle(Vec2::new(1000.0, 100.0)),
            Vec3::new(640.0, 200.0, 0.0),
        ));

        // Right edge of the player to the left edge of the cargo box.
        physics.add_rod(
            player,
            cargo,
            Vec3::new(150.0, 300.0, 0.0),
            Vec3::new(175.0, 400.0, 0.0),
        )?;

        Ok(Self {
            physics,
            player,
            cargo,
            frames: 0,
            steps: 0,
        })
    }

    /// Direction the scripted arrow keys point at `elapsed` seconds.
    fn scripted_input(elapsed: f64) -> Vec3 {
        match elapsed {
            t if t < 1.0 => Vec3::ZERO,
            t if t < 2.0 => Vec3::X,
            t if t < 2.5 => Vec3::new(1.0, 1.0, 0.0),
            t if t < 3.5 => Vec3::NEG_X,
            _ => Vec3::ZERO,
        }
    }

    /// One render frame at `elapsed` seconds since startup.
    fn update(&mut self, elapsed: f64) -> anyhow::Result<()> {
        self.steps += u64::from(self.physics.advance_to(elapsed));
        self.frames += 1;

        let force = Self::scripted_input(elapsed).normalize_or_zero() * PLAYER_FORCE;
        let player = self
            .physics
            .body_mut(self.player)
            .context("player body was removed")?;
        player.force = force;

        self.report()
    }

    fn report(&self) -> anyhow::Result<()> {
        let player = self.physics.body(self.player).context("player body was removed")?;
        let cargo = self.physics.body(self.cargo).context("cargo body was removed")?;
        log::debug!(
            "frame {}: player {:?} cargo {:?}",
            self.frames,
            player.position.truncate(),
            cargo.position.truncate()
        );

        for manifold in self.physics.manifolds() {
            log::info!(
                "collided! contacts: {}, normal: {:?}, depth: {:.3}",
                manifold.points.len(),
                manifold.normal.truncate(),
                manifold.depth
            );
            for point in &manifold.points {
                log::info!("  contact point {:?}", point.truncate());
            }
        }

        // A windowed build would upload these as instance buffers.
        let instances = self.physics.draw_instances();
        let markers = self.physics.contact_markers();
        log::trace!(
            "draw: {} bodies, {} contact markers",
            instances.len(),
            markers.len()
        );
        Ok(())
    }
}

fn run(config: LoopConfig, mut app: DemoApp) -> anyhow::Result<()> {
    let frame_budget = Duration::from_secs_f64(1.0 / config.target_fps);
    let start = Instant::now();

    loop {
        let frame_start = Instant::now();
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed >= config.run_time {
            break;
        }

        app.update(elapsed)?;

        if let Some(remaining) = frame_budget.checked_sub(frame_start.elapsed()) {
            thread::sleep(remaining);
        }
    }

    log::info!(
        "ran {} frames and {} physics steps in {:.2}s",
        app.frames,
        app.steps,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut config = LoopConfig::default();
    if let Some(arg) = std::env::args().nth(1) {
        config.run_time = arg
            .parse()
            .with_context(|| format!("invalid run time {arg:?}, expected seconds"))?;
    }

    let app = DemoApp::new()?;
    log::info!("rein2d demo: {} bodies", app.physics.body_count());
    run(config, app)
}
