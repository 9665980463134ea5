//! Typed application configuration and its strict loader.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr as _,
};

use anyhow::{anyhow, Context as _};
use serde::Deserialize;
use smart_default::SmartDefault;
use telecast_log::Level;

/// Locations probed for the configuration file, in order.
pub const CONFIG_PATHS: &[&str] =
    &["/etc/telecast/telecast.yml", "telecast.yml"];

/// Whole configuration of the playout engine.
///
/// Loaded from a YAML file; unknown keys are rejected, so a typo cannot
/// silently fall back to a default.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Playlist lookup and broadcast-day framing.
    pub playlist: PlaylistConfig,

    /// Rendering parameters of the per-clip renderer processes.
    pub processing: ProcessingConfig,

    /// Ring buffer between the renderers and the output encoder.
    pub buffer: BufferConfig,

    /// Output encoder/streamer parameters.
    pub out: OutConfig,

    /// SMTP notification delivery.
    pub mail: MailConfig,

    /// Log sink routing.
    pub logging: LogConfig,
}

impl Config {
    /// Loads the configuration from the first existing location of
    /// [`CONFIG_PATHS`].
    ///
    /// # Errors
    ///
    /// If no configuration file exists, or the found one fails to parse.
    pub fn load() -> anyhow::Result<Self> {
        for path in CONFIG_PATHS {
            let path = Path::new(path);
            if path.is_file() {
                return Self::from_file(path);
            }
        }
        Err(anyhow!(
            "no configuration file found in any of {:?}",
            CONFIG_PATHS,
        ))
    }

    /// Loads the configuration from the given `path`.
    ///
    /// # Errors
    ///
    /// If the file cannot be read, or contains invalid or unknown keys.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read configuration file {}", path.display())
        })?;
        serde_yaml::from_str(&contents).with_context(|| {
            format!("invalid configuration in {}", path.display())
        })
    }
}

/// Playlist lookup and broadcast-day framing.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default, deny_unknown_fields)]
pub struct PlaylistConfig {
    /// Root of the `<root>/<YYYY>/<MM>/<YYYY-MM-DD>.json` playlist layout.
    #[default(PathBuf::from("/var/lib/telecast/playlists"))]
    pub path: PathBuf,

    /// Hour of day at which the broadcast day starts.
    #[default = 6]
    pub day_start: u8,

    /// Fixed shift (seconds) applied to the wall clock.
    pub time_shift: f64,

    /// On-air filler clip. When it substitutes for missing time its tail
    /// is preferred over its head, so it reaches a natural close.
    pub filler: String,

    /// Pre-rendered black clip used as filler in copy mode.
    pub blackclip: String,

    /// Optional `(from, to)` pair replaced literally in every clip source,
    /// so one playlist can be served by sources with differing extensions
    /// in different environments.
    pub map_ext: Option<(String, String)>,
}

/// Rendering parameters of the per-clip renderer processes.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Target video width.
    #[default = 1024]
    pub width: u32,

    /// Target video height.
    #[default = 576]
    pub height: u32,

    /// Target frame rate.
    #[default = 25]
    pub fps: u32,

    /// Video bitrate (kbit/s) of the intermediate MPEG-2 intra stream.
    #[default = 50000]
    pub v_bitrate: u32,

    /// Pass sources through without re-encoding. Filters and fades are
    /// disabled in this mode.
    pub copy_mode: bool,

    /// URI schemes treated as live sources and probed remotely instead of
    /// checked on the filesystem.
    #[default(vec![
        "http".into(),
        "https".into(),
        "rtmp".into(),
        "rtp".into(),
        "udp".into(),
    ])]
    pub live_protocols: Vec<String>,

    /// Renderer argument vector used in copy mode instead of the encoder
    /// settings.
    #[default(vec![
        "-c".into(),
        "copy".into(),
        "-bsf:v".into(),
        "h264_mp4toannexb".into(),
        "-f".into(),
        "mpegts".into(),
        "-".into(),
    ])]
    pub ffmpeg_copy_settings: Vec<String>,
}

impl ProcessingConfig {
    /// Display aspect ratio of the target frame.
    #[inline]
    #[must_use]
    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Ring buffer between the renderers and the output encoder.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default, deny_unknown_fields)]
pub struct BufferConfig {
    /// Playout lead (seconds) the pipeline keeps ahead of real time.
    #[default = 10.0]
    pub length: f64,

    /// Permitted drift (seconds) before a sync alert is raised.
    #[default = 2.0]
    pub tolerance: f64,

    /// Ring buffer executable.
    #[default(String::from("mbuffer"))]
    pub cli: String,

    /// Arguments passed to the ring buffer executable, before the size.
    #[default(vec!["-q".into(), "-Q".into(), "-m".into()])]
    pub cmd: Vec<String>,
}

/// Output encoder/streamer parameters.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default, deny_unknown_fields)]
pub struct OutConfig {
    /// Play the buffered stream on a local preview player instead of
    /// streaming it to [`OutConfig::out_addr`].
    pub preview: bool,

    /// `service_name` stream metadata.
    #[default(String::from("Telecast TV"))]
    pub service_name: String,

    /// `service_provider` stream metadata.
    #[default(String::from("Telecast"))]
    pub service_provider: String,

    /// Address the output encoder streams to.
    #[default(String::from("rtmp://127.0.0.1/live/stream"))]
    pub out_addr: String,

    /// Video encoding options of the output encoder.
    #[default(vec![
        "-c:v".into(),
        "libx264".into(),
        "-crf".into(),
        "23".into(),
        "-x264-params".into(),
        "keyint=50:min-keyint=25:scenecut=-1".into(),
        "-maxrate".into(),
        "1300k".into(),
        "-bufsize".into(),
        "2600k".into(),
        "-preset".into(),
        "medium".into(),
        "-profile:v".into(),
        "Main".into(),
        "-level".into(),
        "3.1".into(),
    ])]
    pub post_video: Vec<String>,

    /// Audio encoding options of the output encoder.
    #[default(vec![
        "-c:a".into(),
        "aac".into(),
        "-ar".into(),
        "44100".into(),
        "-b:a".into(),
        "128k".into(),
    ])]
    pub post_audio: Vec<String>,

    /// Trailing options of the output encoder, after the metadata.
    #[default(vec!["-flags".into(), "+global_header".into(), "-f".into(), "flv".into()])]
    pub post_extra: Vec<String>,

    /// Output options used in copy mode instead of the encoding ones.
    #[default(vec!["-f".into(), "flv".into()])]
    pub post_copy: Vec<String>,

    /// Optional logo image overlaid onto the output.
    pub logo: String,

    /// Filter expression positioning the logo overlay.
    #[default(String::from("overlay=W-w-12:12"))]
    pub logo_filter: String,
}

/// SMTP notification delivery.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default, deny_unknown_fields)]
pub struct MailConfig {
    /// SMTP server to deliver notifications through.
    pub smtp_server: String,

    /// SMTP server port.
    #[default = 587]
    pub port: u16,

    /// Sender address, also used as the login name.
    pub sender_addr: String,

    /// Sender password.
    pub sender_pass: String,

    /// Recipient address. Leaving it empty routes notifications to the
    /// log sink instead.
    pub recipient: String,

    /// Subject line of every notification mail.
    #[default(String::from("Playout Error"))]
    pub subject: String,
}

/// Log sink routing.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// File to write the log to. Without one the log goes to stdout.
    pub path: Option<PathBuf>,

    /// Verbosity level of the log sink.
    #[default(String::from("info"))]
    pub level: String,
}

impl LogConfig {
    /// Parses the configured verbosity [`Level`], if it names one.
    #[must_use]
    pub fn level(&self) -> Option<Level> {
        Level::from_str(&self.level).ok()
    }
}
