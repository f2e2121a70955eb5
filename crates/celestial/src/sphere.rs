//! Celestial sphere render data: star brightness/colour mapping, line sets,
//! constellation labels and sky-brightness colour adjustment.

use std::path::Path;

use glam::{DMat3, DVec3, Vec3, Vec4};
use gfx::StarVertex;
use scene_core::{MarkerSpec, StarRenderParams};

use crate::catalog::{
    load_constellation_boundaries, load_constellation_labels, load_constellation_lines,
    load_star_data, ConstLabelRec, LineDataRec, StarDataRec,
};

/// Obliquity of the J2000 ecliptic, used when the host cannot provide a
/// precession state.
pub const J2000_OBLIQUITY: f64 = 0.4092797095927;

/// One renderable background star.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarRenderRec {
    /// Unit direction on the celestial sphere.
    pub pos: DVec3,
    /// Mapped brightness, 0..1. Records are ordered brightest-first.
    pub brightness: f64,
    /// Display colour from the spectral class.
    pub col: DVec3,
}

fn sphere_point(lng: f64, lat: f64) -> DVec3 {
    let xz = lat.cos();
    DVec3::new(xz * lng.cos(), lat.sin(), xz * lng.sin())
}

/// Convert star catalog records to render records.
///
/// Returns an empty list (stars disabled) when the magnitude limits are
/// inconsistent.
pub fn star_render_data(records: &[StarDataRec], prm: &StarRenderParams) -> Vec<StarRenderRec> {
    if prm.mag_lo <= prm.mag_hi {
        log::warn!(
            "inconsistent magnitude limits for background stars ({} <= {}); stars disabled",
            prm.mag_lo,
            prm.mag_hi
        );
        return Vec::new();
    }

    // scaling factors for the magnitude-to-brightness mapping
    let (a, b) = if prm.map_log {
        (-prm.brt_min.ln() / (prm.mag_lo - prm.mag_hi), 0.0)
    } else {
        let a = (1.0 - prm.brt_min) / (prm.mag_hi - prm.mag_lo);
        (a, prm.brt_min - prm.mag_lo * a)
    };

    records
        .iter()
        .map(|rec| {
            let c = if prm.map_log {
                (-(rec.mag - prm.mag_hi) * a).exp().max(prm.brt_min).min(1.0)
            } else {
                (a * rec.mag + b).max(prm.brt_min).min(1.0)
            };

            // colour scales from the spectral class index
            let s = f64::from(rec.spec_idx);
            let r_scale = if s < 25.0 { s / 25.0 * 0.25 + 0.75 } else { 1.0 };
            let g_scale = if s < 20.0 {
                s / 20.0 * 0.15 + 0.85
            } else if s < 50.0 {
                1.0
            } else {
                (70.0 - s) / 20.0 * 0.25 + 0.75
            };
            let b_scale = if s < 30.0 { 1.0 } else { (70.0 - s) / 40.0 * 0.4 + 0.6 };

            let scale_max = r_scale.max(g_scale).max(b_scale);
            // rescale to maintain overall brightness, capped to preserve hue
            let rescale = (3.0 / (r_scale + g_scale + b_scale)).min(1.0 / (c * scale_max));

            StarRenderRec {
                pos: sphere_point(rec.lng, rec.lat),
                brightness: c,
                col: DVec3::new(
                    (c * rescale * r_scale).min(1.0),
                    (c * rescale * g_scale).min(1.0),
                    (c * rescale * b_scale).min(1.0),
                ),
            }
        })
        .collect()
}

/// Per-sky-brightness star count table: entry `i` is the number of leading
/// (brightest) records still rendered against background level `i` (0..=255).
pub fn star_brightness_cutoff(stars: &[StarRenderRec]) -> Vec<usize> {
    let mut cutoff = vec![0usize; 256];
    let mut j = stars.len();
    for (i, slot) in cutoff.iter_mut().enumerate() {
        let brt = (i as f64 / 256.0 * 1.4).powf(0.75) * 2.0;
        while j > 0 && stars[j - 1].brightness <= brt {
            j -= 1;
        }
        *slot = j;
    }
    cutoff
}

/// Expand lng/lat segment records to unit-sphere endpoint pairs.
pub fn line_render_data(records: &[LineDataRec]) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(records.len() * 2);
    for rec in records {
        out.push(sphere_point(rec.lng1, rec.lat1).as_vec3());
        out.push(sphere_point(rec.lng2, rec.lat2).as_vec3());
    }
    out
}

fn label_render_data(records: &[ConstLabelRec]) -> Vec<MarkerSpec> {
    records
        .iter()
        .map(|rec| MarkerSpec {
            pos: sphere_point(rec.lng, rec.lat),
            label: [rec.full.clone(), rec.abbr.clone()],
        })
        .collect()
}

/// Rotation from celestial (equatorial) to ecliptic frame.
///
/// `precession` is the host's (obliquity, longitude-of-ascending-node) pair;
/// `None` falls back to the J2000 ecliptic.
pub fn celestial_to_ecliptic(precession: Option<(f64, f64)>) -> DMat3 {
    let (eps, lan) = precession.unwrap_or((J2000_OBLIQUITY, 0.0));
    let (coso, sino) = (eps.cos(), eps.sin());
    let (cosl, sinl) = (lan.cos(), lan.sin());
    DMat3::from_cols(
        DVec3::new(cosl, -sino * sinl, -coso * sinl),
        DVec3::new(0.0, coso, -sino),
        DVec3::new(sinl, sino * cosl, coso * cosl),
    )
}

/// Loaded and precomputed celestial-sphere render data.
pub struct CelestialSphere {
    stars: Vec<StarRenderRec>,
    star_cutoff: Vec<usize>,
    constellation_lines: Vec<Vec3>,
    constellation_boundaries: Vec<Vec3>,
    labels: Vec<MarkerSpec>,
    sky_col: DVec3,
    sky_brt: f64,
}

impl CelestialSphere {
    /// Load catalogs from a data directory. Missing files disable the
    /// corresponding feature.
    pub fn load(dir: &Path, prm: &StarRenderParams) -> Self {
        Self::from_records(
            &load_star_data(dir, prm.mag_lo),
            &load_constellation_lines(dir),
            &load_constellation_boundaries(dir),
            &load_constellation_labels(dir),
            prm,
        )
    }

    pub fn from_records(
        stars: &[StarDataRec],
        lines: &[LineDataRec],
        boundaries: &[LineDataRec],
        labels: &[ConstLabelRec],
        prm: &StarRenderParams,
    ) -> Self {
        let stars = star_render_data(stars, prm);
        let star_cutoff = star_brightness_cutoff(&stars);
        Self {
            star_cutoff,
            stars,
            constellation_lines: line_render_data(lines),
            constellation_boundaries: line_render_data(boundaries),
            labels: label_render_data(labels),
            sky_col: DVec3::ZERO,
            sky_brt: 0.0,
        }
    }

    pub fn stars(&self) -> &[StarRenderRec] {
        &self.stars
    }

    /// Star vertices for upload to the backend.
    pub fn star_vertices(&self) -> Vec<StarVertex> {
        self.stars
            .iter()
            .map(|s| StarVertex {
                pos: s.pos.as_vec3().to_array(),
                color: s.col.as_vec3().to_array(),
            })
            .collect()
    }

    /// Number of stars still visible against a background of `dim_level`
    /// (0 = black sky, all stars; 255 = full daylight).
    pub fn visible_star_count(&self, dim_level: u32) -> usize {
        let idx = (dim_level as usize).min(255);
        self.star_cutoff[idx]
    }

    pub fn constellation_lines(&self) -> &[Vec3] {
        &self.constellation_lines
    }

    pub fn constellation_boundaries(&self) -> &[Vec3] {
        &self.constellation_boundaries
    }

    pub fn labels(&self) -> &[MarkerSpec] {
        &self.labels
    }

    /// Record the current sky colour; drives label/marker fading.
    pub fn set_sky_color(&mut self, col: DVec3) {
        self.sky_col = col;
        self.sky_brt = (col.x + col.y + col.z) / 3.0;
    }

    pub fn sky_brightness(&self) -> f64 {
        self.sky_brt
    }

    /// Fade a base colour against a bright sky.
    pub fn color_adjusted(&self, base: Vec4) -> Vec4 {
        base * (1.0 - self.sky_brt as f32 * 0.9)
    }

    /// Text colour faded against the sky and blended over it, as 0xRRGGBB.
    pub fn text_color_adjusted(&self, base: Vec4) -> u32 {
        let c = self.color_adjusted(base);
        let r = ((c.x + self.sky_col.x as f32).clamp(0.0, 1.0) * 255.0) as u32;
        let g = ((c.y + self.sky_col.y as f32).clamp(0.0, 1.0) * 255.0) as u32;
        let b = ((c.z + self.sky_col.z as f32).clamp(0.0, 1.0) * 255.0) as u32;
        (r << 16) | (g << 8) | b
    }
}
