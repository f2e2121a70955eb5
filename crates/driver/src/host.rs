//! Sample simulation: a star, a planet with an atmosphere and a moon, one
//! surface base and two vessels on circular orbits. The camera chases the
//! focus vessel from outside.

use std::collections::HashMap;
use std::f64::consts::TAU;

use glam::{DMat3, DVec3};
use rand::Rng;
use scene_core::{
    AtmConstants, AtmParams, LightEmitter, LightKind, LightVisibility, MarkerList, MarkerShape,
    MarkerSpec, ObjectId, ObjectKind, SimHost, VesselApi,
};

/// Scale height of the sample atmosphere [m].
const SCALE_HEIGHT: f64 = 8500.0;

struct Body {
    id: ObjectId,
    kind: ObjectKind,
    name: &'static str,
    size: f64,
    /// Index of the body this one orbits; `None` pins it at `pos`.
    center: Option<usize>,
    radius: f64,
    rate: f64,
    phase: f64,
    pos: DVec3,
}

struct SimVessel {
    gpos: DVec3,
    altitude: f64,
    rot: DMat3,
    emitters: Vec<LightEmitter>,
}

impl VesselApi for SimVessel {
    fn altitude(&self) -> f64 {
        self.altitude
    }

    fn surface_elevation(&self) -> f64 {
        0.0
    }

    fn rotation_matrix(&self) -> DMat3 {
        self.rot
    }

    fn local_to_global(&self, local: DVec3) -> DVec3 {
        self.gpos + self.rot * local
    }

    fn has_external_pass(&self) -> bool {
        true
    }

    fn light_emitters(&self) -> &[LightEmitter] {
        &self.emitters
    }
}

pub struct SampleHost {
    t: f64,
    bodies: Vec<Body>,
    vessels: HashMap<ObjectId, SimVessel>,
    surface_lists: Vec<MarkerList>,
    celestial_lists: Vec<MarkerList>,
    planet: ObjectId,
    base: ObjectId,
    focus: ObjectId,
    cam_pos: DVec3,
    cam_dir: DVec3,
    cam_rot: DMat3,
}

impl SampleHost {
    pub fn new(rng: &mut impl Rng) -> Self {
        let planet_size = 6.371e6;
        let bodies = vec![
            Body {
                id: ObjectId(1),
                kind: ObjectKind::Star,
                name: "Sol",
                size: 6.96e8,
                center: None,
                radius: 0.0,
                rate: 0.0,
                phase: 0.0,
                pos: DVec3::ZERO,
            },
            Body {
                id: ObjectId(2),
                kind: ObjectKind::Planet,
                name: "Terra",
                size: planet_size,
                center: Some(0),
                radius: 1.496e11,
                rate: TAU / (365.25 * 86400.0),
                phase: rng.gen_range(0.0..TAU),
                pos: DVec3::ZERO,
            },
            Body {
                id: ObjectId(3),
                kind: ObjectKind::Planet,
                name: "Luna",
                size: 1.7374e6,
                center: Some(1),
                radius: 3.844e8,
                rate: TAU / (27.3 * 86400.0),
                phase: rng.gen_range(0.0..TAU),
                pos: DVec3::ZERO,
            },
            Body {
                id: ObjectId(4),
                kind: ObjectKind::Base,
                name: "Canaveral",
                size: 3000.0,
                center: Some(1),
                radius: planet_size,
                rate: 0.0,
                phase: 0.3,
                pos: DVec3::ZERO,
            },
            Body {
                id: ObjectId(5),
                kind: ObjectKind::Vessel,
                name: "Endeavour",
                size: 18.0,
                center: Some(1),
                radius: planet_size + 400e3,
                rate: TAU / 5560.0,
                phase: rng.gen_range(0.0..TAU),
                pos: DVec3::ZERO,
            },
            Body {
                id: ObjectId(6),
                kind: ObjectKind::Vessel,
                name: "Outpost",
                size: 55.0,
                center: Some(1),
                radius: planet_size + 35.786e6,
                rate: TAU / 86164.0,
                phase: rng.gen_range(0.0..TAU),
                pos: DVec3::ZERO,
            },
        ];

        let mut vessels = HashMap::new();
        vessels.insert(
            ObjectId(5),
            SimVessel {
                gpos: DVec3::ZERO,
                altitude: 400e3,
                rot: DMat3::IDENTITY,
                emitters: vec![
                    nav_light(DVec3::new(-9.0, 0.0, 0.0), DVec3::new(1.0, 0.2, 0.2)),
                    nav_light(DVec3::new(9.0, 0.0, 0.0), DVec3::new(0.2, 1.0, 0.2)),
                    cockpit_light(),
                ],
            },
        );
        vessels.insert(
            ObjectId(6),
            SimVessel {
                gpos: DVec3::ZERO,
                altitude: 35.786e6,
                rot: DMat3::IDENTITY,
                emitters: vec![nav_light(DVec3::new(0.0, 28.0, 0.0), DVec3::new(1.0, 1.0, 0.8))],
            },
        );

        let surface_lists = vec![MarkerList {
            active: true,
            colour: 3,
            shape: MarkerShape::Delta,
            size: 1.0,
            dist_factor: 1.0,
            markers: vec![
                MarkerSpec {
                    pos: DVec3::new(0.0, planet_size, 0.0),
                    label: ["North Polar Cap".into(), "NPC".into()],
                },
                MarkerSpec {
                    pos: DVec3::new(planet_size, 0.0, 0.0),
                    label: ["Meridian Bay".into(), "MB".into()],
                },
            ],
        }];

        let celestial_lists = vec![MarkerList {
            active: true,
            colour: 5,
            shape: MarkerShape::Crosshair,
            size: 1.0,
            dist_factor: 1.0,
            markers: vec![
                MarkerSpec {
                    pos: DVec3::new(0.0, 1.0, 0.0),
                    label: ["North Celestial Pole".into(), "NCP".into()],
                },
                MarkerSpec {
                    pos: DVec3::new(1.0, 0.0, 0.0),
                    label: ["Vernal Equinox".into(), "VE".into()],
                },
            ],
        }];

        let mut host = Self {
            t: 0.0,
            bodies,
            vessels,
            surface_lists,
            celestial_lists,
            planet: ObjectId(2),
            base: ObjectId(4),
            focus: ObjectId(5),
            cam_pos: DVec3::ZERO,
            cam_dir: DVec3::Z,
            cam_rot: DMat3::IDENTITY,
        };
        host.step(0.0);
        host
    }

    pub fn focus_vessel(&self) -> ObjectId {
        self.focus
    }

    /// Advance the simulation by `dt` seconds and refresh derived state.
    pub fn step(&mut self, dt: f64) {
        self.t += dt;

        // Orbit centres precede their satellites in the body list.
        for i in 0..self.bodies.len() {
            let pos = match self.bodies[i].center {
                Some(c) => {
                    let ang = self.bodies[i].phase + self.t * self.bodies[i].rate;
                    self.bodies[c].pos + DVec3::new(ang.cos(), 0.0, ang.sin()) * self.bodies[i].radius
                }
                None => self.bodies[i].pos,
            };
            self.bodies[i].pos = pos;
        }

        for body in &self.bodies {
            if body.kind != ObjectKind::Vessel {
                continue;
            }
            let Some(vessel) = self.vessels.get_mut(&body.id) else {
                continue;
            };
            let center = body.center.unwrap_or(0);
            vessel.gpos = body.pos;
            vessel.altitude =
                (body.pos - self.bodies[center].pos).length() - self.bodies[center].size;
            vessel.rot = DMat3::from_rotation_y(self.t * 0.03);
        }

        self.update_chase_camera();
    }

    /// Place the camera behind the focus vessel, looking along the orbit.
    fn update_chase_camera(&mut self) {
        let Some(vessel) = self.vessels.get(&self.focus) else {
            return;
        };
        let planet_pos = self.body(self.planet).map(|b| b.pos).unwrap_or_default();
        let radial = (vessel.gpos - planet_pos).normalize_or_zero();
        let tangent = radial.cross(DVec3::Y).normalize_or_zero();

        self.cam_pos = vessel.gpos - tangent * 60.0 + radial * 20.0;
        self.cam_dir = (vessel.gpos - self.cam_pos).normalize_or_zero();

        let z = self.cam_dir;
        let x = radial.cross(z).normalize_or_zero();
        let y = z.cross(x);
        self.cam_rot = DMat3::from_cols(x, y, z).transpose();
    }

    fn body(&self, id: ObjectId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }
}

fn nav_light(position: DVec3, color: DVec3) -> LightEmitter {
    LightEmitter {
        kind: LightKind::Point,
        active: true,
        intensity: 1.0,
        visibility: LightVisibility::EXTERNAL,
        position,
        direction: DVec3::Z,
        color,
        attenuation: [0.0, 0.0, 0.002],
        range: 200.0,
        cone: (0.0, 0.0),
    }
}

fn cockpit_light() -> LightEmitter {
    LightEmitter {
        kind: LightKind::Spot,
        active: true,
        intensity: 0.6,
        visibility: LightVisibility::COCKPIT,
        position: DVec3::new(0.0, 1.4, 4.0),
        direction: DVec3::new(0.0, -0.4, 0.9).normalize(),
        color: DVec3::new(1.0, 0.95, 0.85),
        attenuation: [1.0, 0.0, 0.0],
        range: 5.0,
        cone: (0.5, 0.9),
    }
}

impl SimHost for SampleHost {
    fn object_count(&self) -> usize {
        self.bodies.len()
    }

    fn object_by_index(&self, index: usize) -> Option<ObjectId> {
        self.bodies.get(index).map(|b| b.id)
    }

    fn object_kind(&self, id: ObjectId) -> Option<ObjectKind> {
        self.body(id).map(|b| b.kind)
    }

    fn object_name(&self, id: ObjectId) -> String {
        self.body(id).map(|b| b.name.to_owned()).unwrap_or_default()
    }

    fn global_pos(&self, id: ObjectId) -> DVec3 {
        self.body(id).map(|b| b.pos).unwrap_or_default()
    }

    fn size(&self, id: ObjectId) -> f64 {
        self.body(id).map(|b| b.size).unwrap_or_default()
    }

    fn rotation_matrix(&self, id: ObjectId) -> DMat3 {
        self.vessels
            .get(&id)
            .map(|v| v.rot)
            .unwrap_or(DMat3::IDENTITY)
    }

    fn camera_target(&self) -> Option<ObjectId> {
        Some(self.focus)
    }

    fn camera_proxy_body(&self) -> Option<ObjectId> {
        Some(self.planet)
    }

    fn camera_global_pos(&self) -> DVec3 {
        self.cam_pos
    }

    fn camera_global_dir(&self) -> DVec3 {
        self.cam_dir
    }

    fn camera_rotation(&self) -> DMat3 {
        self.cam_rot
    }

    fn camera_aperture(&self) -> f64 {
        25f64.to_radians() / 2.0
    }

    fn camera_internal(&self) -> bool {
        false
    }

    fn focus_object(&self) -> Option<ObjectId> {
        Some(self.focus)
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn vessel(&self, id: ObjectId) -> Option<&dyn VesselApi> {
        self.vessels.get(&id).map(|v| v as &dyn VesselApi)
    }

    fn atm_constants(&self, id: ObjectId) -> Option<AtmConstants> {
        if id != self.planet {
            return None;
        }
        let size = self.size(id);
        Some(AtmConstants {
            rad_limit: size + 200e3,
            rho0: 1.225,
            p0: 101_325.0,
            color0: DVec3::new(0.45, 0.65, 1.0),
        })
    }

    fn atm_params(&self, id: ObjectId, dist: f64) -> Option<AtmParams> {
        let c = self.atm_constants(id)?;
        let alt = (dist - self.size(id)).max(0.0);
        Some(AtmParams { rho: c.rho0 * (-alt / SCALE_HEIGHT).exp() })
    }

    fn base_count(&self, planet: ObjectId) -> usize {
        usize::from(planet == self.planet)
    }

    fn base_by_index(&self, planet: ObjectId, index: usize) -> Option<ObjectId> {
        (planet == self.planet && index == 0).then_some(self.base)
    }

    fn ecliptic_obliquity(&self) -> Option<(f64, f64)> {
        Some((0.4092797095927, 0.0))
    }

    fn surface_markers(&self, planet: ObjectId) -> &[MarkerList] {
        if planet == self.planet {
            &self.surface_lists
        } else {
            &[]
        }
    }

    fn celestial_markers(&self) -> &[MarkerList] {
        &self.celestial_lists
    }

    fn debug_string(&self) -> String {
        format!("t = {:.1} s, focus {}", self.t, self.object_name(self.focus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn vessel_stays_on_its_orbit() {
        let mut host = SampleHost::new(&mut StdRng::seed_from_u64(1));
        for _ in 0..100 {
            host.step(10.0);
        }
        let vessel = host.vessel(ObjectId(5)).unwrap();
        assert!((vessel.altitude() - 400e3).abs() < 1.0);
    }

    #[test]
    fn chase_camera_looks_at_the_focus_vessel() {
        let mut host = SampleHost::new(&mut StdRng::seed_from_u64(1));
        host.step(1.0);
        let to_vessel = (host.global_pos(ObjectId(5)) - host.camera_global_pos()).normalize();
        assert!(host.camera_global_dir().dot(to_vessel) > 0.999);
    }

    #[test]
    fn atmosphere_thins_with_altitude() {
        let host = SampleHost::new(&mut StdRng::seed_from_u64(1));
        let size = host.size(ObjectId(2));
        let sea = host.atm_params(ObjectId(2), size).unwrap().rho;
        let high = host.atm_params(ObjectId(2), size + 50e3).unwrap().rho;
        assert!(sea > high * 100.0);
        assert!(host.atm_params(ObjectId(3), 2e6).is_none());
    }
}
