//! Best-effort validation of freshly loaded playlists.
//!
//! Validation runs concurrently with playout and is advisory: errors are
//! reported through the notifier, never enforced.

use std::{path::Path, sync::Arc, thread};

use url::Url;

use crate::{
    ffmpeg::probe::{self, ProbedDuration},
    notify::Notifier,
    playlist::Playlist,
};

/// Slack (seconds) granted before a playlist counts as shorter than its
/// declared length.
const LENGTH_SLACK: f64 = 5.0;

/// Indicates whether the given source must be probed as a live stream
/// rather than checked on the filesystem.
#[must_use]
pub(crate) fn is_live_source(src: &str, live_protocols: &[String]) -> bool {
    Url::parse(src)
        .ok()
        .map_or(false, |url| {
            live_protocols.iter().any(|p| p == url.scheme())
        })
}

/// Spawns the detached validation thread for the given playlist.
///
/// The thread may outlive the load that triggered it; its only effect is
/// a notification describing everything found wrong.
pub(crate) fn spawn(
    list: Playlist,
    live_protocols: Vec<String>,
    day_start_sec: f64,
    notifier: Arc<Notifier>,
) {
    drop(thread::spawn(move || {
        check(&list, &live_protocols, day_start_sec, &notifier);
    }));
}

/// Checks every node of the playlist and its declared total length.
pub(crate) fn check(
    list: &Playlist,
    live_protocols: &[String],
    day_start_sec: f64,
    notifier: &Notifier,
) {
    let mut error = String::new();
    let mut counter = 0.0;

    for node in &list.program {
        let source_issue = if is_live_source(&node.source, live_protocols) {
            match probe::duration(&node.source) {
                ProbedDuration::Missing => "Stream not exist! ",
                ProbedDuration::Known(_) | ProbedDuration::Unknown => "",
            }
        } else if Path::new(&node.source).is_file() {
            ""
        } else {
            "File not exist! "
        };

        let range_issue = if node.seek < 0.0 || node.out <= node.seek {
            "Missing Value! "
        } else {
            counter += node.out - node.seek;
            ""
        };

        let duration_issue = if node.duration > 0.0 {
            ""
        } else {
            "No DURATION Value! "
        };

        let line =
            format!("{}{}{}", source_issue, range_issue, duration_issue);
        if !line.is_empty() {
            error.push_str(&format!("{}In line: {:?}\n", line, node));
        }
    }

    if !error.is_empty() {
        notifier.send(
            "Validation error, check JSON playlist, values are missing:",
            &error,
        );
    }

    check_start_and_length(list, counter, day_start_sec, notifier);
}

/// Verifies that the playlist covers its declared length from its
/// declared begin.
fn check_start_and_length(
    list: &Playlist,
    counter: f64,
    day_start_sec: f64,
    notifier: &Notifier,
) {
    let (begin, length) = match (list.begin_sec(), list.length_sec()) {
        (Some(begin), Some(length)) => (begin, length),
        _ => return,
    };

    let total_play_time = begin + counter - day_start_sec;
    if total_play_time < length - LENGTH_SLACK {
        notifier.send(
            "JSON playlist is not long enough!",
            &format!("total play time is: {:.2} seconds", total_play_time),
        );
    }
}
