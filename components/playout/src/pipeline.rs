//! The three-stage streaming pipeline and its supervision.
//!
//! Spawns the ring buffer and the output encoder, drives the
//! [`Scheduler`] on a blocking worker that renders one clip at a time
//! into the buffer, and watches the liveness of all stages. Any dead
//! stage tears the whole group down; a clean end of the scheduled
//! sequence drains and stops it gracefully.

use std::{
    fs::File,
    io::{self, BufRead as _, BufReader},
    path::Path,
    process::{ChildStderr, Command, Stdio},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context as _};
use chrono::Datelike as _;
use telecast_log::log;
use tokio::{task, time};

use crate::{
    clock::BroadcastClock,
    config::Config,
    display_panic,
    ffmpeg::{self, probe},
    notify::Notifier,
    playlist::{day_path, Playlist},
    scheduler::Scheduler,
};

/// Cadence of the liveness watchdog.
const WATCHDOG_INTERVAL: Duration = Duration::from_secs(4);

/// Runs the full pipeline until the scheduler ends or a stage dies.
///
/// # Errors
///
/// If a stage fails to spawn, the output process dies, or the render
/// worker fails.
#[tokio::main]
pub async fn run(cfg: Config) -> anyhow::Result<()> {
    let notifier = Arc::new(Notifier::new(cfg.mail.clone()));

    let size = calc_buffer_size(&cfg);
    log::info!("Ring buffer size: {}k", size);

    let mut buffer = tokio::process::Command::new(&cfg.buffer.cli)
        .args(&cfg.buffer.cmd)
        .arg(format!("{}k", size))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| {
            format!("failed to spawn buffer process {}", cfg.buffer.cli)
        })?;

    let buffer_in = buffer
        .stdin
        .take()
        .ok_or_else(|| anyhow!("buffer process has no stdin"))?;
    let buffer_in = File::from(
        buffer_in
            .into_owned_fd()
            .context("failed to detach buffer stdin")?,
    );
    let buffer_out = buffer
        .stdout
        .take()
        .ok_or_else(|| anyhow!("buffer process has no stdout"))?;
    let buffer_out = Stdio::from(
        buffer_out
            .into_owned_fd()
            .context("failed to detach buffer stdout")?,
    );

    let mut output = spawn_output(&cfg, buffer_out)?;

    let scheduler = Scheduler::new(cfg.clone(), notifier);
    let worker_cfg = cfg.clone();
    let mut worker = task::spawn_blocking(move || {
        play_clips(&worker_cfg, scheduler, buffer_in)
    });

    let result = loop {
        time::sleep(WATCHDOG_INTERVAL).await;

        if let Some(status) =
            output.try_wait().context("failed to poll output process")?
        {
            log::error!(
                "Output process is not alive anymore, terminating playout",
            );
            break Err(anyhow!("output process exited with {}", status));
        }

        if worker.is_finished() {
            break match (&mut worker).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    log::error!(
                        "Render worker is not alive anymore, \
                         terminating playout",
                    );
                    Err(e)
                }
                Err(e) if e.is_panic() => Err(anyhow!(
                    "render worker panicked: {}",
                    display_panic(&e.into_panic()),
                )),
                Err(e) => Err(anyhow::Error::new(e)),
            };
        }
    };

    if result.is_err() {
        // Terminating the buffer cascades: the render worker's writes
        // fail and the output's stdin reaches EOF.
        let _ = buffer.start_kill();
    }
    let _ = buffer.wait().await;
    let _ = output.wait().await;

    if result.is_ok() {
        log::info!("Playout done...");
    }
    result
}

/// Drives the [`Scheduler`], spawning one renderer process per command
/// and copying its rendered bytes into the buffer process.
///
/// The renderer's stderr is pumped into the log sink at error level.
fn play_clips(
    cfg: &Config,
    scheduler: Scheduler,
    mut buffer_in: File,
) -> anyhow::Result<()> {
    let pre_settings = ffmpeg::pre_settings(cfg);

    for cmd in scheduler {
        log::info!("Play: {:?}", cmd.args);

        let mut renderer = Command::new("ffmpeg")
            .args(["-v", "error", "-hide_banner", "-nostats"])
            .args(&cmd.args)
            .args(&pre_settings)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to spawn renderer process")?;

        let stderr = renderer
            .stderr
            .take()
            .ok_or_else(|| anyhow!("renderer process has no stderr"))?;
        let stderr_pump =
            std::thread::spawn(move || forward_renderer_log(stderr));

        let mut rendered = renderer
            .stdout
            .take()
            .ok_or_else(|| anyhow!("renderer process has no stdout"))?;
        let copied = io::copy(&mut rendered, &mut buffer_in);

        let status = renderer
            .wait()
            .context("failed to wait on renderer process")?;
        let _ = stderr_pump.join();

        drop(
            copied
                .context("failed to pipe rendered bytes into the buffer")?,
        );

        if !status.success() {
            log::error!("Renderer exited with {}", status);
        }
    }
    Ok(())
}

/// Forwards a renderer's stderr lines into the log sink.
fn forward_renderer_log(stderr: ChildStderr) {
    for line in BufReader::new(stderr).lines().flatten() {
        if !line.trim().is_empty() {
            log::error!("Renderer: {}", line);
        }
    }
}

/// Spawns the output stage consuming the buffer's stdout.
fn spawn_output(
    cfg: &Config,
    buffer_out: Stdio,
) -> anyhow::Result<tokio::process::Child> {
    let (program, args) = output_command(cfg);
    log::info!("Start output: {} {}", program, args.join(" "));

    tokio::process::Command::new(&program)
        .args(&args)
        .stdin(buffer_out)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| {
            format!("failed to spawn output process {}", program)
        })
}

/// Builds the output stage's program and argument vector: a preview
/// player, or the encoder/streamer with the configured pre/post options
/// and stream metadata.
fn output_command(cfg: &Config) -> (String, Vec<String>) {
    if cfg.out.preview {
        return (
            "ffplay".to_string(),
            ["-v", "error", "-hide_banner", "-nostats", "-i", "pipe:0"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
    }

    let mut args: Vec<String> =
        ["-v", "info", "-hide_banner", "-nostats", "-re"]
            .iter()
            .map(|s| s.to_string())
            .collect();

    if cfg.processing.copy_mode {
        args.extend(
            ["-i", "pipe:0", "-c", "copy"].iter().map(|s| s.to_string()),
        );
        args.extend(cfg.out.post_copy.iter().cloned());
    } else {
        args.extend(
            [
                "-thread_queue_size",
                "256",
                "-fflags",
                "+igndts",
                "-i",
                "pipe:0",
                "-fflags",
                "+genpts",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.extend(logo_overlay(cfg));
        args.extend(cfg.out.post_video.iter().cloned());
        args.extend(cfg.out.post_audio.iter().cloned());
    }

    let year =
        BroadcastClock::new(cfg.playlist.day_start, cfg.playlist.time_shift)
            .date_for(false)
            .year();
    args.push("-metadata".to_string());
    args.push(format!("service_name={}", cfg.out.service_name));
    args.push("-metadata".to_string());
    args.push(format!("service_provider={}", cfg.out.service_provider));
    args.push("-metadata".to_string());
    args.push(format!("year={}", year));
    args.extend(cfg.out.post_extra.iter().cloned());
    args.push(cfg.out.out_addr.clone());

    ("ffmpeg".to_string(), args)
}

/// Logo overlay inputs and filter, applied only when the configured logo
/// file exists.
fn logo_overlay(cfg: &Config) -> Vec<String> {
    if cfg.out.logo.is_empty() || !Path::new(&cfg.out.logo).is_file() {
        return Vec::new();
    }
    vec![
        "-thread_queue_size".to_string(),
        "16".to_string(),
        "-i".to_string(),
        cfg.out.logo.clone(),
        "-filter_complex".to_string(),
        format!("[0:v][1:v]{}[o]", cfg.out.logo_filter),
        "-map".to_string(),
        "[o]".to_string(),
        "-map".to_string(),
        "0:a".to_string(),
    ]
}

/// Computes the ring buffer size in KB.
///
/// In copy mode files normally carry a smaller bit rate, so the size is
/// derived from probing the first clip of today's playlist instead of
/// the configured video bitrate.
fn calc_buffer_size(cfg: &Config) -> u64 {
    if !cfg.processing.copy_mode {
        return ((f64::from(cfg.processing.v_bitrate) * 0.125 + 281.25)
            * cfg.buffer.length) as u64;
    }

    let clock =
        BroadcastClock::new(cfg.playlist.day_start, cfg.playlist.time_shift);
    let path = day_path(&cfg.playlist.path, clock.date_for(true));
    let first_source = std::fs::read_to_string(path)
        .ok()
        .and_then(|contents| {
            serde_json::from_str::<Playlist>(&contents).ok()
        })
        .and_then(|list| list.program.into_iter().next())
        .map(|node| match &cfg.playlist.map_ext {
            Some((from, to)) => node.source.replace(from, to),
            None => node.source,
        });

    match first_source {
        Some(source) => {
            let kbit =
                probe::bit_rate(&source).map_or(4000.0, |b| b as f64 / 1024.0);
            (kbit * 0.125 * cfg.buffer.length) as u64
        }
        None => 5000,
    }
}

#[cfg(test)]
mod pipeline_spec {
    use super::{calc_buffer_size, logo_overlay, output_command};
    use crate::config::Config;

    #[test]
    fn sizes_the_buffer_from_the_video_bitrate() {
        let cfg = Config::default();

        assert_eq!(
            calc_buffer_size(&cfg),
            ((50000.0 * 0.125 + 281.25) * 10.0) as u64,
        );
    }

    #[test]
    fn falls_back_to_a_fixed_size_without_a_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.processing.copy_mode = true;
        cfg.playlist.path = dir.path().to_path_buf();

        assert_eq!(calc_buffer_size(&cfg), 5000);
    }

    #[test]
    fn previews_on_a_local_player() {
        let mut cfg = Config::default();
        cfg.out.preview = true;

        let (program, args) = output_command(&cfg);

        assert_eq!(program, "ffplay");
        assert_eq!(args.last().map(String::as_str), Some("pipe:0"));
    }

    #[test]
    fn streams_with_service_metadata() {
        let cfg = Config::default();

        let (program, args) = output_command(&cfg);

        assert_eq!(program, "ffmpeg");
        assert_eq!(args.last(), Some(&cfg.out.out_addr));
        assert!(args.contains(&"service_name=Telecast TV".to_string()));
        assert!(args.contains(&"-re".to_string()));
        assert!(args.contains(&"libx264".to_string()));
    }

    #[test]
    fn copies_the_stream_in_copy_mode() {
        let mut cfg = Config::default();
        cfg.processing.copy_mode = true;

        let (_, args) = output_command(&cfg);

        assert!(args.windows(2).any(|w| w == ["-c", "copy"]));
        assert!(!args.contains(&"libx264".to_string()));
    }

    #[test]
    fn skips_the_logo_overlay_without_a_logo_file() {
        let mut cfg = Config::default();
        cfg.out.logo = "/nowhere/logo.png".to_string();

        assert!(logo_overlay(&cfg).is_empty());
        let (_, args) = output_command(&cfg);
        assert!(!args.contains(&"-filter_complex".to_string()));
    }
}
