//! Day playlists and their on-disk store.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::UNIX_EPOCH,
};

use chrono::{Datelike as _, NaiveDate};
use derive_more::{Display, Error};
use serde::Deserialize;
use telecast_log::log;

use crate::{config::Config, notify::Notifier, validate};

/// Single clip entry of a [`Playlist`].
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ClipNode {
    /// URI of the media source: a file path, or a live-protocol URI.
    pub source: String,

    /// In-point (seconds) the source starts playing from.
    #[serde(rename = "in")]
    pub seek: f64,

    /// Out-point (seconds) the source plays until. `out - in` is the
    /// playable span.
    pub out: f64,

    /// Full length (seconds) of the source media.
    pub duration: f64,
}

/// Ordered program of one broadcast day.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Playlist {
    /// Absolute time-of-day anchor (`HH:MM:SS`) of the first clip.
    #[serde(default)]
    pub begin: Option<String>,

    /// Expected total duration (`HH:MM:SS`), used for sanity checks only.
    #[serde(default)]
    pub length: Option<String>,

    /// Clips in their authoritative playout order.
    pub program: Vec<ClipNode>,
}

impl Playlist {
    /// Declared anchor of the first clip, in seconds of day.
    #[must_use]
    pub fn begin_sec(&self) -> Option<f64> {
        self.begin.as_deref().and_then(parse_time_of_day)
    }

    /// Declared total duration, in seconds.
    #[must_use]
    pub fn length_sec(&self) -> Option<f64> {
        self.length.as_deref().and_then(parse_time_of_day)
    }
}

/// Parses a `HH:MM:SS` time of day into seconds.
pub(crate) fn parse_time_of_day(s: &str) -> Option<f64> {
    let mut parts = s.split(':');
    let (h, m, sec) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let h = h.parse::<f64>().ok()?;
    let m = m.parse::<f64>().ok()?;
    let sec = sec.parse::<f64>().ok()?;
    Some(h * 3600.0 + m * 60.0 + sec)
}

/// Location of the given day's playlist inside the
/// `<root>/<YYYY>/<MM>/<YYYY-MM-DD>.json` layout.
#[must_use]
pub fn day_path(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
        .join(format!("{}.json", date))
}

/// Possible failures of loading a day's playlist.
#[derive(Debug, Display, Error)]
pub enum LoadError {
    /// No playlist file exists for the requested date.
    #[display(fmt = "{}", "_0.display()")]
    NotFound(#[error(not(source))] PathBuf),

    /// The playlist file exists but cannot be read or parsed.
    #[display(fmt = "{}: {}", "path.display()", "error")]
    Broken {
        /// Path of the broken playlist file.
        path: PathBuf,

        /// Description of what went wrong with it.
        #[error(not(source))]
        error: String,
    },
}

/// Locates, loads and caches day playlists.
///
/// Each [`PlaylistStore::load`] checks the file's mtime: unchanged files
/// are served from the cache without reparsing. Every actual (re)parse
/// spawns the advisory validator in the background.
#[derive(Debug)]
pub struct PlaylistStore {
    /// Root of the on-disk playlist layout.
    root: PathBuf,

    /// Optional `(from, to)` source extension remap.
    map_ext: Option<(String, String)>,

    /// URI schemes the validator probes remotely.
    live_protocols: Vec<String>,

    /// Start of the broadcast day, for the validator's length check.
    day_start_sec: f64,

    notifier: Arc<Notifier>,

    /// Last parsed playlist, keyed by the file it came from.
    cached: Option<(PathBuf, Playlist)>,

    /// mtime (Unix seconds) observed at the last parse.
    last_mod_time: f64,
}

impl PlaylistStore {
    /// Creates a new [`PlaylistStore`] for the configured layout.
    #[must_use]
    pub fn new(cfg: &Config, notifier: Arc<Notifier>) -> Self {
        Self {
            root: cfg.playlist.path.clone(),
            map_ext: cfg.playlist.map_ext.clone(),
            live_protocols: cfg.processing.live_protocols.clone(),
            day_start_sec: f64::from(cfg.playlist.day_start) * 3600.0,
            notifier,
            cached: None,
            last_mod_time: 0.0,
        }
    }

    /// Location of the given day's playlist file.
    #[must_use]
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        day_path(&self.root, date)
    }

    /// Loads the given day's playlist, reparsing only when the file's
    /// mtime advanced past the last observed one.
    ///
    /// # Errors
    ///
    /// If the playlist file is absent, unreadable, or not a valid
    /// playlist.
    pub fn load(&mut self, date: NaiveDate) -> Result<Playlist, LoadError> {
        let path = self.path_for(date);
        if !path.is_file() {
            return Err(LoadError::NotFound(path));
        }

        let mod_time = modified_secs(&path);
        let fresh = self
            .cached
            .as_ref()
            .map_or(false, |(cached_path, _)| *cached_path == path)
            && mod_time <= self.last_mod_time;

        if !fresh {
            let file = fs::File::open(&path).map_err(|e| {
                LoadError::Broken {
                    path: path.clone(),
                    error: e.to_string(),
                }
            })?;
            let mut list: Playlist =
                serde_json::from_reader(io::BufReader::new(file)).map_err(
                    |e| LoadError::Broken {
                        path: path.clone(),
                        error: e.to_string(),
                    },
                )?;

            if let Some((from, to)) = &self.map_ext {
                for node in &mut list.program {
                    node.source = node.source.replace(from, to);
                }
            }

            log::info!("Open playlist {}", path.display());
            validate::spawn(
                list.clone(),
                self.live_protocols.clone(),
                self.day_start_sec,
                Arc::clone(&self.notifier),
            );

            self.cached = Some((path, list));
        }
        self.last_mod_time = mod_time;

        match &self.cached {
            Some((_, list)) => Ok(list.clone()),
            None => unreachable!("playlist cache is filled right above"),
        }
    }

    /// Forces the next [`PlaylistStore::load`] to reread from disk.
    pub fn invalidate(&mut self) {
        self.last_mod_time = 0.0;
    }
}

/// mtime of the given file as Unix seconds, `0.0` when unavailable.
fn modified_secs(path: &Path) -> f64 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0.0, |d| d.as_secs_f64())
}

#[cfg(test)]
mod playlist_spec {
    use std::{fs, path::Path, time::Duration};

    use chrono::NaiveDate;

    use super::{day_path, parse_time_of_day, Playlist, PlaylistStore};
    use crate::{config::Config, notify::Notifier};

    const LIST: &str = r#"{
        "begin": "06:00:00",
        "length": "24:00:00",
        "program": [
            {"source": "a.mp4", "in": 0, "out": 3600, "duration": 3600}
        ]
    }"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn store_in(root: &Path) -> PlaylistStore {
        let mut cfg = Config::default();
        cfg.playlist.path = root.to_path_buf();
        let (notifier, _) = Notifier::capturing();
        PlaylistStore::new(&cfg, std::sync::Arc::new(notifier))
    }

    fn write_list(root: &Path, contents: &str) -> std::path::PathBuf {
        let path = day_path(root, date());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_time_of_day() {
        assert_eq!(parse_time_of_day("06:00:00"), Some(21600.0));
        assert_eq!(parse_time_of_day("23:59:30"), Some(86370.0));
        assert_eq!(parse_time_of_day("6:0:0"), Some(21600.0));
        assert_eq!(parse_time_of_day("06:00"), None);
        assert_eq!(parse_time_of_day("ab:cd:ef"), None);
    }

    #[test]
    fn lays_out_paths_by_year_and_month() {
        assert_eq!(
            day_path(Path::new("/srv/lists"), date()),
            Path::new("/srv/lists/2024/01/2024-01-15.json"),
        );
    }

    #[test]
    fn deserializes_program_nodes() {
        let list: Playlist = serde_json::from_str(LIST).unwrap();

        assert_eq!(list.begin_sec(), Some(21600.0));
        assert_eq!(list.length_sec(), Some(86400.0));
        assert_eq!(list.program.len(), 1);
        assert_eq!(list.program[0].seek, 0.0);
        assert_eq!(list.program[0].out, 3600.0);
    }

    #[test]
    fn reports_missing_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path());

        assert!(store.load(date()).is_err());
    }

    #[test]
    fn remaps_source_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let _ = write_list(dir.path(), LIST);
        let mut store = store_in(dir.path());
        store.map_ext = Some((".mp4".to_string(), ".mkv".to_string()));

        let list = store.load(date()).unwrap();

        assert_eq!(list.program[0].source, "a.mkv");
    }

    #[test]
    fn serves_unchanged_files_from_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_list(dir.path(), LIST);
        let mut store = store_in(dir.path());

        let first = store.load(date()).unwrap();
        assert_eq!(first.begin_sec(), Some(21600.0));

        // Rewrite the file but roll its mtime back: the store must keep
        // serving the cached parse.
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();
        fs::write(&path, LIST.replace("06:00:00", "07:00:00")).unwrap();
        let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_times(fs::FileTimes::new().set_modified(mtime)).unwrap();

        let second = store.load(date()).unwrap();
        assert_eq!(second.begin_sec(), Some(21600.0));
    }

    #[test]
    fn reloads_when_the_mtime_advances() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_list(dir.path(), LIST);
        let mut store = store_in(dir.path());

        let _ = store.load(date()).unwrap();

        let mtime = fs::metadata(&path).unwrap().modified().unwrap();
        fs::write(&path, LIST.replace("06:00:00", "07:00:00")).unwrap();
        let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_times(
            fs::FileTimes::new().set_modified(mtime + Duration::from_secs(10)),
        )
        .unwrap();

        let reloaded = store.load(date()).unwrap();
        assert_eq!(reloaded.begin_sec(), Some(25200.0));
    }

    #[test]
    fn rereads_after_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_list(dir.path(), LIST);
        let mut store = store_in(dir.path());

        let _ = store.load(date()).unwrap();

        let mtime = fs::metadata(&path).unwrap().modified().unwrap();
        fs::write(&path, LIST.replace("06:00:00", "07:00:00")).unwrap();
        let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_times(fs::FileTimes::new().set_modified(mtime)).unwrap();

        store.invalidate();

        let reloaded = store.load(date()).unwrap();
        assert_eq!(reloaded.begin_sec(), Some(25200.0));
    }
}
