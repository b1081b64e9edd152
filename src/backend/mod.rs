//! Capability contract between the executor and media backends.
//!
//! A backend advertises a fixed set of [`Action`]s and runs one typed
//! [`Invocation`] at a time against an input artifact. The executor only
//! ever holds `&dyn Backend`, so the ffmpeg-driven and Resolve-driven
//! implementations are interchangeable.

mod ffmpeg;
mod params;
mod process;
mod resolve;
mod segment;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ParamError};
use crate::task::Params;

pub use ffmpeg::FfmpegBackend;
pub use params::{
    ColorParams, DuckParams, LutParams, PreviewParams, Quality, Rec709Params, Temperature,
    ZoomParams,
};
pub use process::{ToolCommand, SPAWN_FAILED_CODE, TIMEOUT_EXIT_CODE};
pub use resolve::ResolveBackend;
pub use segment::Segment;

/// Editing operations known to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    AdjustColorEq,
    AddKeyframeZoom,
    DuckMusic,
    ExportPreview,
    Slog3ToRec709,
    Slog3WithLut,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::AdjustColorEq,
        Action::AddKeyframeZoom,
        Action::DuckMusic,
        Action::ExportPreview,
        Action::Slog3ToRec709,
        Action::Slog3WithLut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdjustColorEq => "adjust_color_eq",
            Self::AddKeyframeZoom => "add_keyframe_zoom",
            Self::DuckMusic => "duck_music",
            Self::ExportPreview => "export_preview",
            Self::Slog3ToRec709 => "slog3_to_rec709",
            Self::Slog3WithLut => "slog3_with_lut",
        }
    }

    /// Short label used in output file names
    pub fn label(&self) -> &'static str {
        match self {
            Self::AdjustColorEq => "color",
            Self::AddKeyframeZoom => "zoom",
            Self::DuckMusic => "duck",
            Self::ExportPreview => "preview",
            Self::Slog3ToRec709 => "rec709",
            Self::Slog3WithLut => "lut",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ActionError::Unknown(s.to_string()))
    }
}

/// A capability call with every default already applied
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    AdjustColor(ColorParams),
    KeyframeZoom(ZoomParams),
    DuckMusic(DuckParams),
    ExportPreview(PreviewParams),
    Slog3ToRec709(Rec709Params),
    Slog3WithLut(LutParams),
}

impl Invocation {
    /// Decode step params for `action`
    pub fn decode(action: Action, params: &Params) -> Result<Self, ParamError> {
        Ok(match action {
            Action::AdjustColorEq => Self::AdjustColor(ColorParams::decode(params)?),
            Action::AddKeyframeZoom => Self::KeyframeZoom(ZoomParams::decode(params)?),
            Action::DuckMusic => Self::DuckMusic(DuckParams::decode(params)?),
            Action::ExportPreview => Self::ExportPreview(PreviewParams::decode(params)?),
            Action::Slog3ToRec709 => Self::Slog3ToRec709(Rec709Params::decode(params)?),
            Action::Slog3WithLut => Self::Slog3WithLut(LutParams::decode(params)?),
        })
    }

    pub fn action(&self) -> Action {
        match self {
            Self::AdjustColor(_) => Action::AdjustColorEq,
            Self::KeyframeZoom(_) => Action::AddKeyframeZoom,
            Self::DuckMusic(_) => Action::DuckMusic,
            Self::ExportPreview(_) => Action::ExportPreview,
            Self::Slog3ToRec709(_) => Action::Slog3ToRec709,
            Self::Slog3WithLut(_) => Action::Slog3WithLut,
        }
    }
}

/// Where a capability reads from and writes to
#[derive(Debug, Clone, Copy)]
pub struct CapabilityIo<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub segment: Option<&'a Segment>,
}

/// Structured result of one capability call
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityOutcome {
    /// Zero on success
    pub code: i32,
    pub log: String,
    /// Produced artifact; only set when `code == 0`
    pub file: Option<PathBuf>,
    /// Set when the call was killed for exceeding its time limit
    pub timed_out: Option<Duration>,
}

impl CapabilityOutcome {
    pub fn success(file: impl Into<PathBuf>, log: impl Into<String>) -> Self {
        Self {
            code: 0,
            log: log.into(),
            file: Some(file.into()),
            timed_out: None,
        }
    }

    pub fn failure(code: i32, log: impl Into<String>) -> Self {
        debug_assert!(code != 0, "failure outcome needs a non-zero code");
        Self {
            code,
            log: log.into(),
            file: None,
            timed_out: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// A media execution target
pub trait Backend {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Actions this backend can run
    fn capabilities(&self) -> &[Action];

    fn supports(&self, action: Action) -> bool {
        self.capabilities().contains(&action)
    }

    /// Map an action key to a capability of this backend
    fn resolve(&self, key: &str) -> Result<Action, ActionError> {
        let action = key.parse::<Action>()?;
        if self.supports(action) {
            Ok(action)
        } else {
            Err(ActionError::Unsupported {
                action: key.to_string(),
                backend: self.name().to_string(),
            })
        }
    }

    /// Run one capability. Must leave `io.input` untouched and return a
    /// non-zero code whenever no usable artifact was written.
    fn invoke(&self, call: &Invocation, io: &CapabilityIo<'_>) -> CapabilityOutcome;
}
