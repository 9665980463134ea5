//! Extracting info about media sources with [FFprobe].
//!
//! [FFprobe]: https://ffmpeg.org/ffprobe.html

use std::process::Command;

use telecast_log::log;

/// Result of probing a source's reported duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProbedDuration {
    /// The probe reported a parseable duration, in seconds.
    Known(f64),

    /// The probe reached the source but reported no parseable duration.
    Unknown,

    /// The probe output signalled a missing source.
    Missing,
}

/// Probes the reported duration of the given source.
///
/// The probe is deemed failed when its output contains `404`.
#[must_use]
pub fn duration(src: &str) -> ProbedDuration {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            src,
        ])
        .output();

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            log::error!("Failed to run ffprobe on {}: {}", src, e);
            return ProbedDuration::Unknown;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stdout.contains("404") || stderr.contains("404") {
        return ProbedDuration::Missing;
    }
    match stdout.trim().parse::<f64>() {
        Ok(duration) => ProbedDuration::Known(duration),
        Err(_) => ProbedDuration::Unknown,
    }
}

/// Probes the total bit rate of the given source, in bits per second.
#[must_use]
pub fn bit_rate(src: &str) -> Option<i64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=bit_rate",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            src,
        ])
        .output()
        .map_err(|e| {
            log::error!("Failed to run ffprobe on {}: {}", src, e);
        })
        .ok()?;

    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}
