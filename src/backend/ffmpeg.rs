use std::time::Duration;

use tracing::info;

use super::params::Temperature;
use super::process::{run_with_timeout, ToolCommand};
use super::{Action, Backend, CapabilityIo, CapabilityOutcome, Invocation};

/// Runs each capability as one blocking ffmpeg process
pub struct FfmpegBackend {
    tool: ToolCommand,
    timeout: Duration,
}

impl FfmpegBackend {
    pub fn new(tool: ToolCommand, timeout: Duration) -> Self {
        Self { tool, timeout }
    }

    /// Per-call arguments, appended after the tool's own leading args
    pub fn build_args(call: &Invocation, io: &CapabilityIo<'_>) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into()];
        if let Some(segment) = io.segment {
            args.extend(segment.seek_args());
        }
        args.push("-i".into());
        args.push(io.input.to_string_lossy().into_owned());

        match call {
            Invocation::AdjustColor(p) => {
                let balance = match p.temperature {
                    Temperature::Cool => "colorbalance=bs=0.05:bh=0.03",
                    Temperature::Warm => "colorbalance=rs=0.05:rh=0.03",
                };
                let vf = format!(
                    "eq=brightness={}:contrast={}:saturation={},{}",
                    p.brightness, p.contrast, p.saturation, balance
                );
                args.extend(["-vf".into(), vf, "-c:a".into(), "copy".into()]);
            }
            Invocation::KeyframeZoom(p) => {
                let (s1, s2, frames) = (p.from_scale, p.to_scale, p.frames());
                let vf = format!(
                    "zoompan=z='if(eq(on,1),{s1},{s1}+({s2}-{s1})*(on-1)/{frames})':d=1:fps={},scale=iw:ih",
                    p.fps
                );
                args.extend(["-vf".into(), vf, "-c:a".into(), "copy".into()]);
            }
            Invocation::DuckMusic(p) => {
                // duck_db sets how far below full scale the dialogue key starts compressing
                let filter = format!(
                    "[1:a][0:a]sidechaincompress=threshold=-{}dB:ratio=6:attack={}:release={}:makeup=0:mix=1:sclevel=peak:wet=1[outa]",
                    u64::from(p.duck_db) * 2,
                    p.attack_ms,
                    p.release_ms
                );
                args.extend([
                    "-i".into(),
                    p.music_file.to_string_lossy().into_owned(),
                    "-filter_complex".into(),
                    filter,
                    "-map".into(),
                    "0:v".into(),
                    "-map".into(),
                    "[outa]".into(),
                    "-c:v".into(),
                    "copy".into(),
                    "-c:a".into(),
                    "aac".into(),
                ]);
            }
            Invocation::ExportPreview(p) => {
                args.extend([
                    "-c:v".into(),
                    "libx264".into(),
                    "-b:v".into(),
                    p.quality.video_bitrate().into(),
                    "-preset".into(),
                    "veryfast".into(),
                    "-c:a".into(),
                    "aac".into(),
                ]);
            }
            Invocation::Slog3ToRec709(p) => {
                let vf = format!(
                    "colorspace=all=bt709:iall=bt709,eq=contrast={}:saturation={}:brightness={},curves=vintage",
                    p.contrast, p.saturation, p.brightness
                );
                args.extend(["-vf".into(), vf]);
                args.extend(high_quality_h264());
            }
            Invocation::Slog3WithLut(p) => {
                let lut = format!(
                    "lut3d=file='{}':interp=trilinear",
                    p.lut_file.to_string_lossy()
                );
                let vf = if p.intensity < 1.0 {
                    // A is the untouched branch, B the graded one
                    format!(
                        "split[a][b];[b]{lut}[lut];[a][lut]blend=all_expr='A*{}+B*{}'",
                        1.0 - p.intensity,
                        p.intensity
                    )
                } else {
                    lut
                };
                args.extend(["-vf".into(), vf]);
                args.extend(high_quality_h264());
            }
        }

        args.push(io.output.to_string_lossy().into_owned());
        args
    }
}

fn high_quality_h264() -> [String; 8] {
    ["-c:v", "libx264", "-preset", "slow", "-crf", "18", "-c:a", "copy"].map(String::from)
}

impl Backend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn capabilities(&self) -> &[Action] {
        &Action::ALL
    }

    fn invoke(&self, call: &Invocation, io: &CapabilityIo<'_>) -> CapabilityOutcome {
        match call {
            Invocation::DuckMusic(p) if !p.music_file.exists() => {
                return CapabilityOutcome::failure(
                    1,
                    format!("music file not found: {}", p.music_file.display()),
                );
            }
            Invocation::Slog3WithLut(p) if !p.lut_file.exists() => {
                return CapabilityOutcome::failure(
                    1,
                    format!("LUT file not found: {}", p.lut_file.display()),
                );
            }
            _ => {}
        }

        let args = Self::build_args(call, io);
        info!(action = %call.action(), output = %io.output.display(), "running ffmpeg");
        let output = run_with_timeout(&self.tool, &args, self.timeout);

        if output.timed_out {
            return CapabilityOutcome {
                code: output.code,
                log: output.log,
                file: None,
                timed_out: Some(self.timeout),
            };
        }
        if output.code != 0 {
            return CapabilityOutcome::failure(output.code, output.log);
        }
        if !io.output.is_file() {
            return CapabilityOutcome::failure(
                1,
                format!(
                    "{}\nexited 0 but wrote no file at {}",
                    output.log,
                    io.output.display()
                ),
            );
        }
        CapabilityOutcome::success(io.output, output.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        ColorParams, DuckParams, LutParams, PreviewParams, Quality, Segment, ZoomParams,
    };
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn io<'a>(input: &'a Path, output: &'a Path, segment: Option<&'a Segment>) -> CapabilityIo<'a> {
        CapabilityIo {
            input,
            output,
            segment,
        }
    }

    fn joined(args: &[String]) -> String {
        args.join(" ")
    }

    // ========================================
    // Argument construction
    // ========================================

    #[test]
    fn test_color_args() {
        let call = Invocation::AdjustColor(ColorParams {
            brightness: 0.0,
            contrast: 1.15,
            saturation: 0.85,
            temperature: Temperature::Cool,
        });
        let args = FfmpegBackend::build_args(&call, &io(Path::new("in.mp4"), Path::new("out.mp4"), None));

        assert_eq!(&args[..3], &["-y", "-i", "in.mp4"]);
        assert!(joined(&args).contains("eq=brightness=0:contrast=1.15:saturation=0.85,colorbalance=bs=0.05:bh=0.03"));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_segment_precedes_input() {
        let segment: Segment = "00:00:03-00:00:07".parse().unwrap();
        let call = Invocation::ExportPreview(PreviewParams {
            quality: Quality::High,
        });
        let args = FfmpegBackend::build_args(
            &call,
            &io(Path::new("in.mp4"), Path::new("out.mp4"), Some(&segment)),
        );

        assert_eq!(
            &args[..7],
            &["-y", "-ss", "00:00:03", "-to", "00:00:07", "-i", "in.mp4"]
        );
        assert!(joined(&args).contains("-b:v 8000k"));
    }

    #[test]
    fn test_zoom_args() {
        let call = Invocation::KeyframeZoom(ZoomParams {
            from_scale: 1.0,
            to_scale: 1.08,
            duration_s: 5.0,
            fps: 30,
        });
        let args = FfmpegBackend::build_args(&call, &io(Path::new("a"), Path::new("b"), None));
        assert!(joined(&args).contains("zoompan=z='if(eq(on,1),1,1+(1.08-1)*(on-1)/150)':d=1:fps=30"));
    }

    #[test]
    fn test_duck_args_use_music_as_second_input() {
        let call = Invocation::DuckMusic(DuckParams {
            music_file: PathBuf::from("bed.wav"),
            duck_db: 10,
            attack_ms: 200,
            release_ms: 800,
        });
        let args = FfmpegBackend::build_args(&call, &io(Path::new("a"), Path::new("b"), None));
        let line = joined(&args);

        assert!(line.contains("-i a -i bed.wav"));
        assert!(line.contains("threshold=-20dB"));
        assert!(line.contains("attack=200:release=800"));
    }

    #[test]
    fn test_duck_threshold_at_limit() {
        let call = Invocation::DuckMusic(DuckParams {
            music_file: PathBuf::from("bed.wav"),
            duck_db: u32::MAX,
            attack_ms: 200,
            release_ms: 800,
        });
        let args = FfmpegBackend::build_args(&call, &io(Path::new("a"), Path::new("b"), None));
        assert!(joined(&args).contains("threshold=-8589934590dB"));
    }

    #[test]
    fn test_lut_blend_when_partial() {
        let call = Invocation::Slog3WithLut(LutParams {
            lut_file: PathBuf::from("look.cube"),
            intensity: 0.25,
        });
        let args = FfmpegBackend::build_args(&call, &io(Path::new("a"), Path::new("b"), None));
        let line = joined(&args);

        assert!(line.contains("lut3d=file='look.cube'"));
        assert!(line.contains("blend=all_expr='A*0.75+B*0.25'"));
    }

    // ========================================
    // Invocation against a stand-in tool
    // ========================================

    #[cfg(unix)]
    fn fake_tool(dir: &TempDir, body: &str) -> ToolCommand {
        let script = dir.path().join("fake-ffmpeg.sh");
        std::fs::write(&script, format!("for a; do last=$a; done\n{}\n", body)).unwrap();
        ToolCommand {
            command: "sh".into(),
            args: vec![script.to_string_lossy().into_owned()],
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_success_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let backend = FfmpegBackend::new(
            fake_tool(&dir, "echo rendered > \"$last\""),
            Duration::from_secs(10),
        );
        let output = dir.path().join("out.mp4");
        let call = Invocation::ExportPreview(PreviewParams {
            quality: Quality::Medium,
        });

        let outcome = backend.invoke(&call, &io(Path::new("in.mp4"), &output, None));
        assert!(outcome.is_success());
        assert_eq!(outcome.file.as_deref(), Some(output.as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_exit_zero_without_file_is_failure() {
        let dir = TempDir::new().unwrap();
        let backend = FfmpegBackend::new(fake_tool(&dir, "exit 0"), Duration::from_secs(10));
        let output = dir.path().join("out.mp4");
        let call = Invocation::ExportPreview(PreviewParams {
            quality: Quality::Low,
        });

        let outcome = backend.invoke(&call, &io(Path::new("in.mp4"), &output, None));
        assert_ne!(outcome.code, 0);
        assert!(outcome.file.is_none());
        assert!(outcome.log.contains("wrote no file"));
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_timeout() {
        let dir = TempDir::new().unwrap();
        let backend = FfmpegBackend::new(fake_tool(&dir, "exec sleep 5"), Duration::from_millis(200));
        let output = dir.path().join("out.mp4");
        let call = Invocation::ExportPreview(PreviewParams {
            quality: Quality::Low,
        });

        let outcome = backend.invoke(&call, &io(Path::new("in.mp4"), &output, None));
        assert_eq!(outcome.timed_out, Some(Duration::from_millis(200)));
        assert!(!outcome.is_success());
    }

    #[cfg(unix)]
    #[test]
    fn test_invoke_timeout_with_lingering_child() {
        let dir = TempDir::new().unwrap();
        let backend = FfmpegBackend::new(fake_tool(&dir, "sleep 3; true"), Duration::from_millis(200));
        let output = dir.path().join("out.mp4");
        let call = Invocation::ExportPreview(PreviewParams {
            quality: Quality::Low,
        });

        let started = std::time::Instant::now();
        let outcome = backend.invoke(&call, &io(Path::new("in.mp4"), &output, None));
        assert_eq!(outcome.timed_out, Some(Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_missing_lut_fails_before_running() {
        let backend = FfmpegBackend::new(ToolCommand::new("cutflow-never-run"), Duration::from_secs(1));
        let call = Invocation::Slog3WithLut(LutParams {
            lut_file: PathBuf::from("/nonexistent/look.cube"),
            intensity: 1.0,
        });

        let outcome = backend.invoke(&call, &io(Path::new("a"), Path::new("b"), None));
        assert_eq!(outcome.code, 1);
        assert!(outcome.log.contains("LUT file not found"));
    }
}
