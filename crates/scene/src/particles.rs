//! Particle stream bookkeeping.
//!
//! The scene owns the stream list; the streams themselves (exhaust trails,
//! reentry plumes) are backend objects behind a trait. Active streams are
//! rendered after the vessel pass and pull the near clip plane in.

pub trait ParticleStream {
    /// Whether the stream currently has live particles.
    fn is_active(&self) -> bool;
    /// Whether the stream has finished and can be dropped.
    fn is_expired(&self) -> bool;
    /// Advance the stream's simulation by `dt` seconds.
    fn update(&mut self, dt: f64);
}

#[derive(Default)]
pub struct ParticleStreamSet {
    streams: Vec<Box<dyn ParticleStream>>,
}

impl ParticleStreamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stream: Box<dyn ParticleStream>) {
        self.streams.push(stream);
    }

    /// Advance all streams and drop expired ones.
    pub fn update(&mut self, dt: f64) {
        for s in &mut self.streams {
            s.update(dt);
        }
        self.streams.retain(|s| !s.is_expired());
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.streams.iter().filter(|s| s.is_active()).count()
    }

    /// Indices of the streams to submit this frame.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.streams
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_active())
            .map(|(i, _)| i)
    }
}
