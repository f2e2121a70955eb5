//! Headless frame-loop driver for the scene subsystem.
//!
//! Runs a sample solar system against a tallying backend for a fixed number
//! of frames and logs what the scene asked the device to do. Useful for
//! profiling the orchestration layer without a GPU.

mod backend;
mod host;

use std::f64::consts::TAU;

use anyhow::Result;
use celestial::{CelestialSphere, ConstLabelRec, LineDataRec, StarDataRec};
use gfx::Device;
use glam::{DMat3, DVec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene::{CustomCamera, ParticleStream, Scene, SecondaryPass};
use scene_core::{ClientConfig, PlanetariumFlags, PostProcessMode};
use serde::{Deserialize, Serialize};

use backend::HeadlessDevice;
use host::SampleHost;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct DriverConfig {
    frames: u64,
    /// Fixed simulation step per frame [s].
    dt: f64,
    width: u32,
    height: u32,
    seed: u64,
    star_count: usize,
    client: ClientConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        let mut client = ClientConfig::default();
        client.planetarium = PlanetariumFlags::ENABLE
            | PlanetariumFlags::CONST_LINES
            | PlanetariumFlags::CONST_LABELS
            | PlanetariumFlags::CELESTIAL_MARKERS
            | PlanetariumFlags::OBJECT_MARKERS
            | PlanetariumFlags::SURFACE_MARKERS
            | PlanetariumFlags::BASE_MARKERS;
        client.post_process = PostProcessMode::LensFlare;
        Self {
            frames: 600,
            dt: 1.0 / 60.0,
            width: 1280,
            height: 720,
            seed: 7,
            star_count: 4000,
            client,
        }
    }
}

impl DriverConfig {
    fn load() -> Self {
        match std::fs::read_to_string("config.ron") {
            Ok(text) => match ron::from_str(&text) {
                Ok(cfg) => {
                    log::info!("loaded config.ron");
                    cfg
                }
                Err(e) => {
                    log::warn!("config.ron is invalid ({e}); using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("no config.ron found; using defaults");
                Self::default()
            }
        }
    }
}

/// Random star catalogue, mag-sorted so the brightest records come first.
fn random_star_catalog(rng: &mut impl Rng, count: usize) -> Vec<StarDataRec> {
    let mut recs: Vec<StarDataRec> = (0..count)
        .map(|_| StarDataRec {
            lng: rng.gen_range(0.0..TAU),
            lat: rng.gen_range(-1.0f64..1.0).asin(),
            mag: rng.gen_range(-1.5..6.5),
            spec_idx: rng.gen_range(0..70),
        })
        .collect();
    recs.sort_by(|a, b| a.mag.total_cmp(&b.mag));
    recs
}

/// A handful of random line figures standing in for constellation data.
fn random_constellations(rng: &mut impl Rng) -> (Vec<LineDataRec>, Vec<ConstLabelRec>) {
    let mut lines = Vec::new();
    let mut labels = Vec::new();
    for i in 0..12 {
        let lng0 = rng.gen_range(0.0..TAU);
        let lat0 = rng.gen_range(-1.2..1.2);
        let mut lng1 = lng0;
        let mut lat1 = lat0;
        for _ in 0..rng.gen_range(3..7) {
            let lng2 = lng1 + rng.gen_range(-0.12..0.12);
            let lat2 = (lat1 + rng.gen_range(-0.08f64..0.08)).clamp(-1.4, 1.4);
            lines.push(LineDataRec { lng1, lat1, lng2, lat2 });
            lng1 = lng2;
            lat1 = lat2;
        }
        labels.push(ConstLabelRec {
            lng: lng0,
            lat: lat0,
            abbr: format!("C{i:02}"),
            full: format!("Constellation {i:02}"),
        });
    }
    (lines, labels)
}

struct ExhaustPlume {
    life: f64,
}

impl ParticleStream for ExhaustPlume {
    fn is_active(&self) -> bool {
        self.life > 0.0
    }

    fn is_expired(&self) -> bool {
        self.life < -5.0
    }

    fn update(&mut self, dt: f64) {
        self.life -= dt;
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = DriverConfig::load();
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    let stars = random_star_catalog(&mut rng, cfg.star_count);
    let (lines, labels) = random_constellations(&mut rng);
    let sphere = CelestialSphere::from_records(&stars, &lines, &[], &labels, &cfg.client.stars);

    let mut device = HeadlessDevice::new(cfg.width, cfg.height);
    let mut host = SampleHost::new(&mut rng);
    let mut scene = Scene::new(&mut device, cfg.client.clone(), sphere);

    // Rear-view camera on the focus vessel, regenerated round-robin.
    let rear_view = device.create_offscreen_target(256, 256)?;
    scene.setup_custom_camera(
        &device,
        None,
        CustomCamera {
            vessel: host.focus_vessel(),
            position: DVec3::new(0.0, 3.0, -12.0),
            rotation: DMat3::from_rotation_y(std::f64::consts::PI),
            aperture: 30f64.to_radians() / 2.0,
            target: rear_view,
            pass_flags: SecondaryPass::all(),
            active: true,
            error: 0,
        },
    )?;

    scene.add_particle_stream(Box::new(ExhaustPlume { life: 8.0 }));

    log::info!("rendering {} frames at dt = {:.4} s", cfg.frames, cfg.dt);
    for frame in 0..cfg.frames {
        host.step(cfg.dt);
        if frame % 120 == 0 {
            let sky = scene.sky_color();
            scene.push_debug_line(format!("sky {sky:?}"));
        }
        scene.update(&mut device, &host, cfg.dt)?;
        scene.render_main_frame(&mut device, &host)?;
    }

    device.log_summary();
    log::info!("done: {} frames rendered", cfg.frames);
    Ok(())
}
