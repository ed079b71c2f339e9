//! Terrain brushes for [`Editor::edit`](crate::editor::Editor::edit).

use glam::Vec2;
use noise::{NoiseFn, Perlin};

/// Maps an existing distance sample to its edited value.
///
/// `value` is the current signed distance (`>= 0` solid), `dist` the
/// distance from the sample to the brush centre, `radius` the brush radius
/// and `pos` the world position of the sample.
pub trait Brush {
    fn apply(&self, value: f32, dist: f32, radius: f32, pos: Vec2) -> f32;
}

impl<F> Brush for F
where
    F: Fn(f32, f32, f32, Vec2) -> f32,
{
    #[inline]
    fn apply(&self, value: f32, dist: f32, radius: f32, pos: Vec2) -> f32 {
        self(value, dist, radius, pos)
    }
}

/// Adds a disc of material.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddBrush;

impl Brush for AddBrush {
    #[inline]
    fn apply(&self, value: f32, dist: f32, radius: f32, _pos: Vec2) -> f32 {
        value.max(radius - dist)
    }
}

/// Removes a disc of material.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubtractBrush;

impl Brush for SubtractBrush {
    #[inline]
    fn apply(&self, value: f32, dist: f32, radius: f32, _pos: Vec2) -> f32 {
        value.min(dist - radius)
    }
}

/// Whether a noise brush builds or carves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrushMode {
    Add,
    Subtract,
}

/// Disc brush whose edge is roughened by Perlin noise.
///
/// The effective radius at a sample shrinks by up to `amplitude * radius`, so
/// the brush never reaches beyond its nominal radius.
#[derive(Clone, Debug)]
pub struct NoiseBrush {
    noise: Perlin,
    mode: BrushMode,
    frequency: f64,
    amplitude: f32,
}

impl NoiseBrush {
    pub fn new(seed: u32, mode: BrushMode) -> Self {
        Self {
            noise: Perlin::new(seed),
            mode,
            frequency: 0.08,
            amplitude: 0.35,
        }
    }

    /// Spatial frequency of the edge noise, per world unit.
    #[must_use]
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Fraction of the radius the noise may remove, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Radius after noise modulation at `pos`.
    pub fn radius_at(&self, radius: f32, pos: Vec2) -> f32 {
        let n = self.noise.get([
            f64::from(pos.x) * self.frequency,
            f64::from(pos.y) * self.frequency,
        ]) as f32;
        // Perlin output is roughly [-1, 1]; map to [0, 1].
        let t = (n * 0.5 + 0.5).clamp(0.0, 1.0);
        radius * (1.0 - self.amplitude * t)
    }
}

impl Brush for NoiseBrush {
    fn apply(&self, value: f32, dist: f32, radius: f32, pos: Vec2) -> f32 {
        let radius = self.radius_at(radius, pos);
        match self.mode {
            BrushMode::Add => AddBrush.apply(value, dist, radius, pos),
            BrushMode::Subtract => SubtractBrush.apply(value, dist, radius, pos),
        }
    }
}
