use std::path::PathBuf;

use serde_json::Value;

use crate::error::ParamError;
use crate::task::Params;

/// Reads step params against a fixed set of accepted keys.
/// Absent keys and explicit nulls fall back to defaults; anything else
/// provided must have the right type.
struct ParamReader<'a> {
    params: &'a Params,
}

impl<'a> ParamReader<'a> {
    fn new(params: &'a Params, accepted: &[&str]) -> Result<Self, ParamError> {
        if let Some(key) = params.keys().find(|k| !accepted.contains(&k.as_str())) {
            return Err(ParamError::Unexpected(key.clone()));
        }
        Ok(Self { params })
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.params.get(key).filter(|v| !v.is_null())
    }

    fn f64_or(&self, key: &str, default: f64) -> Result<f64, ParamError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| ParamError::InvalidType {
                key: key.to_string(),
                expected: "a number",
            }),
        }
    }

    fn u32_or(&self, key: &str, default: u32) -> Result<u32, ParamError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| ParamError::InvalidType {
                    key: key.to_string(),
                    expected: "a non-negative integer",
                }),
        }
    }

    fn str(&self, key: &str) -> Result<Option<&'a str>, ParamError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.as_str().map(Some).ok_or_else(|| ParamError::InvalidType {
                key: key.to_string(),
                expected: "a string",
            }),
        }
    }

    fn required_path(&self, key: &'static str) -> Result<PathBuf, ParamError> {
        match self.str(key)? {
            Some(s) if !s.trim().is_empty() => Ok(PathBuf::from(s)),
            _ => Err(ParamError::Missing(key)),
        }
    }
}

fn positive(key: &str, value: f64) -> Result<f64, ParamError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ParamError::OutOfRange {
            key: key.to_string(),
            reason: format!("{} must be greater than zero", value),
        })
    }
}

/// Color balance direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Temperature {
    #[default]
    Cool,
    Warm,
}

impl Temperature {
    fn parse(value: &str) -> Result<Self, ParamError> {
        match value {
            "cool" => Ok(Self::Cool),
            "warm" => Ok(Self::Warm),
            _ => Err(ParamError::InvalidType {
                key: "temperature".into(),
                expected: "\"cool\" or \"warm\"",
            }),
        }
    }
}

/// Preview render quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    fn parse(value: &str) -> Result<Self, ParamError> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParamError::InvalidType {
                key: "quality".into(),
                expected: "\"low\", \"medium\" or \"high\"",
            }),
        }
    }

    /// Target video bitrate
    pub fn video_bitrate(&self) -> &'static str {
        match self {
            Self::Low => "1500k",
            Self::Medium => "4000k",
            Self::High => "8000k",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorParams {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub temperature: Temperature,
}

impl ColorParams {
    pub fn decode(params: &Params) -> Result<Self, ParamError> {
        let r = ParamReader::new(
            params,
            &["brightness", "contrast", "saturation", "temperature"],
        )?;
        Ok(Self {
            brightness: r.f64_or("brightness", 0.0)?,
            contrast: r.f64_or("contrast", 1.0)?,
            saturation: r.f64_or("saturation", 1.0)?,
            temperature: match r.str("temperature")? {
                Some(t) => Temperature::parse(t)?,
                None => Temperature::default(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoomParams {
    pub from_scale: f64,
    pub to_scale: f64,
    pub duration_s: f64,
    pub fps: u32,
}

impl ZoomParams {
    pub fn decode(params: &Params) -> Result<Self, ParamError> {
        let r = ParamReader::new(params, &["from_scale", "to_scale", "duration_s", "fps"])?;
        Ok(Self {
            from_scale: positive("from_scale", r.f64_or("from_scale", 1.0)?)?,
            to_scale: positive("to_scale", r.f64_or("to_scale", 1.05)?)?,
            duration_s: positive("duration_s", r.f64_or("duration_s", 5.0)?)?,
            fps: match r.u32_or("fps", 30)? {
                0 => {
                    return Err(ParamError::OutOfRange {
                        key: "fps".into(),
                        reason: "0 must be greater than zero".into(),
                    })
                }
                fps => fps,
            },
        })
    }

    /// Frames over which the zoom ramps, at least one
    pub fn frames(&self) -> u32 {
        ((self.duration_s * self.fps as f64) as u32).max(1)
    }
}

/// Deepest duck; the sidechain threshold is twice this below full scale
pub const MAX_DUCK_DB: u32 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct DuckParams {
    pub music_file: PathBuf,
    pub duck_db: u32,
    pub attack_ms: u32,
    pub release_ms: u32,
}

impl DuckParams {
    pub fn decode(params: &Params) -> Result<Self, ParamError> {
        let r = ParamReader::new(
            params,
            &["music_file", "duck_db", "attack_ms", "release_ms"],
        )?;
        let duck_db = r.u32_or("duck_db", 10)?;
        if duck_db > MAX_DUCK_DB {
            return Err(ParamError::OutOfRange {
                key: "duck_db".into(),
                reason: format!("{} is outside 0..={}", duck_db, MAX_DUCK_DB),
            });
        }
        Ok(Self {
            music_file: r.required_path("music_file")?,
            duck_db,
            attack_ms: r.u32_or("attack_ms", 200)?,
            release_ms: r.u32_or("release_ms", 800)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewParams {
    pub quality: Quality,
}

impl PreviewParams {
    pub fn decode(params: &Params) -> Result<Self, ParamError> {
        let r = ParamReader::new(params, &["quality"])?;
        Ok(Self {
            quality: match r.str("quality")? {
                Some(q) => Quality::parse(q)?,
                None => Quality::default(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rec709Params {
    pub contrast: f64,
    pub saturation: f64,
    pub brightness: f64,
}

impl Rec709Params {
    pub fn decode(params: &Params) -> Result<Self, ParamError> {
        let r = ParamReader::new(params, &["contrast", "saturation", "brightness"])?;
        Ok(Self {
            contrast: r.f64_or("contrast", 1.1)?,
            saturation: r.f64_or("saturation", 1.05)?,
            brightness: r.f64_or("brightness", 0.02)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LutParams {
    pub lut_file: PathBuf,
    /// Mix between source (0.0) and full LUT (1.0)
    pub intensity: f64,
}

impl LutParams {
    pub fn decode(params: &Params) -> Result<Self, ParamError> {
        let r = ParamReader::new(params, &["lut_file", "intensity"])?;
        let intensity = r.f64_or("intensity", 1.0)?;
        if !(0.0..=1.0).contains(&intensity) {
            return Err(ParamError::OutOfRange {
                key: "intensity".into(),
                reason: format!("{} is outside 0.0..=1.0", intensity),
            });
        }
        Ok(Self {
            lut_file: r.required_path("lut_file")?,
            intensity,
        })
    }
}
