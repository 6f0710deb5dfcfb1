use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Enums that travel as plain strings in timeline JSON.
///
/// Parsing goes through `FromStr` so an unknown mode surfaces as the matching
/// [`ConfigError`] instead of a generic serde message.
macro_rules! string_enum {
    ($ty:ident, $err:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &[$ty] = &[$($ty::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(ConfigError::$err(other.to_string())),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ConfigError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$ty> for String {
            fn from(v: $ty) -> String {
                v.as_str().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Sprite shape drawn for every particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParticleShape {
    #[default]
    Circle,
    Square,
    Triangle,
}

string_enum!(ParticleShape, UnknownShape, {
    Circle => "circle",
    Square => "square",
    Triangle => "triangle",
});

/// How overlapping particles combine; selects the draw call's blend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParticleOverlap {
    #[default]
    Add,
    Alpha,
    Overwrite,
}

string_enum!(ParticleOverlap, UnknownOverlapMode, {
    Add => "add",
    Alpha => "alpha",
    Overwrite => "overwrite",
});

/// Feedback mode of the accumulation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AccumulationMode {
    #[default]
    None,
    Trails,
    SmoothTrails,
    Smear,
}

string_enum!(AccumulationMode, UnknownAccumulationMode, {
    None => "none",
    Trails => "trails",
    SmoothTrails => "smooth-trails",
    Smear => "smear",
});

/// How the source image is mapped onto the particle grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageScaling {
    /// Whole image visible, letterboxed.
    #[default]
    Fit,
    /// Grid fully covered, image cropped.
    Fill,
    Stretch,
}

string_enum!(ImageScaling, UnknownScalingMode, {
    Fit => "fit",
    Fill => "fill",
    Stretch => "stretch",
});

fn default_repetitions() -> u32 {
    1
}

/// One timed application of an effect.
///
/// Never mutated while a build reads it: editing produces a new instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectInstance {
    pub effect_id: String,
    /// Milliseconds.
    pub time_begin: f64,
    /// Milliseconds, inclusive.
    pub time_end: f64,
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// Opaque per-effect parameters, interpreted by the effect.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl EffectInstance {
    pub fn new(effect_id: impl Into<String>, time_begin: f64, time_end: f64) -> Self {
        Self {
            effect_id: effect_id.into(),
            time_begin,
            time_end,
            repetitions: 1,
            config: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    pub fn duration(&self) -> f64 {
        self.time_end - self.time_begin
    }

    /// Length of one repetition cycle.
    pub fn period(&self) -> f64 {
        self.duration() / f64::from(self.repetitions.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_begin > self.time_end {
            return Err(ConfigError::InvertedWindow {
                effect_id: self.effect_id.clone(),
                time_begin: self.time_begin.to_string(),
                time_end: self.time_end.to_string(),
            });
        }
        if self.repetitions == 0 {
            return Err(ConfigError::ZeroRepetitions(self.effect_id.clone()));
        }
        Ok(())
    }
}

/// Instances evaluated left to right. Tracks run concurrently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Track {
    pub instances: Vec<EffectInstance>,
}

impl Track {
    pub fn new(instances: Vec<EffectInstance>) -> Self {
        Self { instances }
    }
}

fn default_grid_dim() -> u32 {
    160
}

fn default_particle_size() -> f32 {
    8.0
}

/// Tracks plus the global particle parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineConfig {
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default = "default_grid_dim")]
    pub particle_grid_width: u32,
    #[serde(default = "default_grid_dim")]
    pub particle_grid_height: u32,
    #[serde(default = "default_particle_size")]
    pub particle_size: f32,
    #[serde(default)]
    pub particle_shape: ParticleShape,
    #[serde(default)]
    pub particle_fading: bool,
    #[serde(default)]
    pub particle_overlap: ParticleOverlap,
    #[serde(default)]
    pub background_color: [f32; 3],
    #[serde(default)]
    pub accumulation: AccumulationMode,
    #[serde(default)]
    pub image_scaling: ImageScaling,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            particle_grid_width: default_grid_dim(),
            particle_grid_height: default_grid_dim(),
            particle_size: default_particle_size(),
            particle_shape: ParticleShape::default(),
            particle_fading: false,
            particle_overlap: ParticleOverlap::default(),
            background_color: [0.0; 3],
            accumulation: AccumulationMode::default(),
            image_scaling: ImageScaling::default(),
        }
    }
}

/// Upper bound on `width * height` for a particle grid.
pub const MAX_PARTICLES: u32 = 1 << 24;

/// Particle count of a `width`x`height` grid, rejecting empty and oversized grids.
pub fn grid_particle_count(width: u32, height: u32) -> Result<u32, ConfigError> {
    if width == 0 || height == 0 {
        return Err(ConfigError::EmptyGrid(width, height));
    }
    width
        .checked_mul(height)
        .filter(|&count| count <= MAX_PARTICLES)
        .ok_or(ConfigError::GridTooLarge(width, height))
}

impl TimelineConfig {
    /// Saturates for grids `validate` rejects.
    pub fn particle_count(&self) -> u32 {
        self.particle_grid_width
            .saturating_mul(self.particle_grid_height)
    }

    /// Every instance in build order: track 0 front to back, then track 1, ...
    pub fn instances(&self) -> impl Iterator<Item = &EffectInstance> {
        self.tracks.iter().flat_map(|t| t.instances.iter())
    }

    pub fn instance_count(&self) -> usize {
        self.tracks.iter().map(|t| t.instances.len()).sum()
    }

    /// Loop length of the whole timeline: the latest `timeEnd`, or 0 when empty.
    pub fn duration(&self) -> f64 {
        self.instances().map(|i| i.time_end).fold(0.0, f64::max)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        grid_particle_count(self.particle_grid_width, self.particle_grid_height)?;
        self.instances().try_for_each(EffectInstance::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn period_divides_window_by_repetitions() {
        let inst = EffectInstance::new("Wave", 1000.0, 4000.0).with_repetitions(3);
        assert!(approx_eq(inst.period(), 1000.0, 1e-9));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let inst = EffectInstance::new("Wave", 500.0, 100.0);
        assert!(matches!(inst.validate(), Err(ConfigError::InvertedWindow { .. })));
    }

    #[test]
    fn zero_repetitions_is_rejected() {
        let inst = EffectInstance::new("Wave", 0.0, 100.0).with_repetitions(0);
        assert_eq!(inst.validate(), Err(ConfigError::ZeroRepetitions("Wave".into())));
    }

    #[test]
    fn instance_serde_uses_camel_case_and_defaults() {
        let json = r#"{"effectId":"Wave","timeBegin":0,"timeEnd":10000}"#;
        let inst: EffectInstance = serde_json::from_str(json).unwrap();
        assert_eq!(inst.effect_id, "Wave");
        assert_eq!(inst.repetitions, 1);
        assert!(inst.config.is_null());

        let back = serde_json::to_value(&inst).unwrap();
        assert_eq!(back["timeEnd"], 10000.0);
    }

    #[test]
    fn instances_iterate_track_major() {
        let config = TimelineConfig {
            tracks: vec![
                Track::new(vec![
                    EffectInstance::new("A", 0.0, 1.0),
                    EffectInstance::new("B", 1.0, 2.0),
                ]),
                Track::new(vec![EffectInstance::new("C", 0.0, 5.0)]),
            ],
            ..TimelineConfig::default()
        };
        let ids: Vec<_> = config.instances().map(|i| i.effect_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(config.instance_count(), 3);
        assert!(approx_eq(config.duration(), 5.0, 1e-9));
    }

    #[test]
    fn empty_timeline_has_zero_duration() {
        assert_eq!(TimelineConfig::default().duration(), 0.0);
    }

    #[test]
    fn unknown_overlap_mode_surfaces_config_error() {
        assert_eq!(
            "xor".parse::<ParticleOverlap>(),
            Err(ConfigError::UnknownOverlapMode("xor".into()))
        );
        let json = r#"{"particleOverlap":"xor"}"#;
        let err = serde_json::from_str::<TimelineConfig>(json).unwrap_err();
        assert!(err.to_string().contains("Unknown particle overlap mode: xor"));
    }

    #[test]
    fn string_enums_round_trip() {
        for mode in AccumulationMode::ALL {
            assert_eq!(mode.as_str().parse::<AccumulationMode>().unwrap(), *mode);
        }
        for shape in ParticleShape::ALL {
            assert_eq!(shape.to_string().parse::<ParticleShape>().unwrap(), *shape);
        }
        assert_eq!(
            "cover".parse::<ImageScaling>(),
            Err(ConfigError::UnknownScalingMode("cover".into()))
        );
    }

    #[test]
    fn empty_grid_is_rejected() {
        let config = TimelineConfig {
            particle_grid_width: 0,
            ..TimelineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyGrid(0, 160)));
    }

    #[test]
    fn oversized_grid_is_rejected_without_overflow() {
        let config: TimelineConfig = serde_json::from_str(
            r#"{"particleGridWidth": 65536, "particleGridHeight": 65536}"#,
        )
        .unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigError::GridTooLarge(65536, 65536))
        );
        assert_eq!(config.particle_count(), u32::MAX);
        assert_eq!(
            grid_particle_count(MAX_PARTICLES, 2),
            Err(ConfigError::GridTooLarge(MAX_PARTICLES, 2))
        );
        assert_eq!(grid_particle_count(4096, 4096), Ok(MAX_PARTICLES));
    }
}
