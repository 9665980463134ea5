//! Building argument vectors for the external renderer process.
//!
//! The renderer is invoked as `ffmpeg -v error -hide_banner -nostats
//! <source args> <encoder args>`, writing MPEG-TS bytes to stdout. This
//! module builds the source argument vectors and the encoder settings.

use crate::config::Config;

/// What a [`RenderCommand`] renders.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SourceKind {
    /// Real media from the playlist, possibly seeked into or truncated.
    Clip,

    /// Synthetic filler covering a scheduling gap.
    Dummy,
}

/// Opaque argument vector for one invocation of the external renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderCommand {
    /// Source arguments, placed between the renderer's global options and
    /// the encoder settings.
    pub args: Vec<String>,

    /// Kind of source these arguments render.
    pub kind: SourceKind,

    /// Playable span (seconds) this command covers.
    pub span: f64,
}

impl RenderCommand {
    /// Indicates whether this command renders synthetic filler.
    #[inline]
    #[must_use]
    pub fn is_dummy(&self) -> bool {
        self.kind == SourceKind::Dummy
    }
}

/// Generates a dummy clip: solid color video with an empty audio track of
/// the given `duration`, or the configured black clip in copy mode.
#[must_use]
pub fn gen_dummy(cfg: &Config, duration: f64) -> RenderCommand {
    let args = if cfg.processing.copy_mode {
        vec!["-i".to_string(), cfg.playlist.blackclip.clone()]
    } else {
        vec![
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!(
                "color=s={}x{}:d={}",
                cfg.processing.width, cfg.processing.height, duration,
            ),
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            "anullsrc=r=48000".to_string(),
            "-shortest".to_string(),
        ]
    };
    RenderCommand {
        args,
        kind: SourceKind::Dummy,
        span: duration,
    }
}

/// Seeks into a clip and cuts its end.
///
/// In compress mode a 1 second video and audio fade-out is anchored right
/// before the out point; copy mode emits the seek and the cut only.
#[must_use]
pub fn seek_in_cut_end(
    cfg: &Config,
    src: &str,
    duration: f64,
    seek: f64,
    out: f64,
) -> RenderCommand {
    let mut args = Vec::new();
    if seek > 0.0 {
        args.push("-ss".to_string());
        args.push(format!("{}", seek));
    }
    args.push("-i".to_string());
    args.push(src.to_string());

    let (fade_out_vid, fade_out_aud, end) = if out < duration {
        let length = out - seek - 1.0;
        args.push("-t".to_string());
        args.push(format!("{}", out - seek));
        (
            format!("[0:v]fade=out:st={}:d=1.0[v];", length),
            format!("[0:a]afade=out:st={}:d=1.0[a]", length),
            vec!["-map", "[v]", "-map", "[a]"],
        )
    } else {
        (
            String::new(),
            "[0:a]apad[a]".to_string(),
            vec!["-shortest", "-map", "0:v", "-map", "[a]"],
        )
    };

    if !cfg.processing.copy_mode {
        args.push("-filter_complex".to_string());
        args.push(format!("{}{}", fade_out_vid, fade_out_aud));
        args.extend(end.into_iter().map(String::from));
    }

    RenderCommand {
        args,
        kind: SourceKind::Clip,
        span: out.min(duration) - seek,
    }
}

/// Full pass-through of a source, with the audio padded so its length
/// matches the video and the shorter of both picked on output. Copy mode
/// emits only the input.
#[must_use]
pub fn pass_through(cfg: &Config, src: &str, span: f64) -> RenderCommand {
    let mut args = vec!["-i".to_string(), src.to_string()];
    if !cfg.processing.copy_mode {
        args.extend(
            ["-filter_complex", "[0:a]apad[a]", "-shortest", "-map", "0:v",
             "-map", "[a]"]
                .iter()
                .map(|s| s.to_string()),
        );
    }
    RenderCommand {
        args,
        kind: SourceKind::Clip,
        span,
    }
}

/// Encoder settings appended after the source arguments.
///
/// Compress mode targets MPEG-2 intra video at a pinned bitrate with
/// s302m PCM audio in an MPEG-TS container on stdout; copy mode uses the
/// configured pass-through vector instead.
#[must_use]
pub fn pre_settings(cfg: &Config) -> Vec<String> {
    if cfg.processing.copy_mode {
        return cfg.processing.ffmpeg_copy_settings.clone();
    }
    let p = &cfg.processing;
    vec![
        "-s".to_string(),
        format!("{}x{}", p.width, p.height),
        "-aspect".to_string(),
        format!("{}", p.aspect()),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-r".to_string(),
        format!("{}", p.fps),
        "-c:v".to_string(),
        "mpeg2video".to_string(),
        "-intra".to_string(),
        "-b:v".to_string(),
        format!("{}k", p.v_bitrate),
        "-minrate".to_string(),
        format!("{}k", p.v_bitrate),
        "-maxrate".to_string(),
        format!("{}k", p.v_bitrate),
        "-bufsize".to_string(),
        format!("{}k", p.v_bitrate / 2),
        "-c:a".to_string(),
        "s302m".to_string(),
        "-strict".to_string(),
        "-2".to_string(),
        "-ar".to_string(),
        "48000".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "-threads".to_string(),
        "2".to_string(),
        "-f".to_string(),
        "mpegts".to_string(),
        "-".to_string(),
    ]
}
