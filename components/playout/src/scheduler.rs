//! The scheduling core: a lazy producer of render commands synchronized
//! against wall-clock time.
//!
//! The [`Scheduler`] walks the active day's playlist once per pulled
//! command and decides for each entry whether to play it fully, seek into
//! it, truncate it at the day boundary, skip it, or substitute synthetic
//! filler, so the downstream pipeline never starves.

use std::{path::Path, sync::Arc};

use chrono::NaiveDate;
use telecast_log::log;

use crate::{
    clock::{BroadcastClock, DAY_IN_SEC},
    config::Config,
    ffmpeg::{
        self,
        probe::{self, ProbedDuration},
        RenderCommand,
    },
    notify::Notifier,
    playlist::{LoadError, PlaylistStore},
    validate::is_live_source,
};

/// Default filler length (seconds) for covering scheduling gaps.
pub const DEFAULT_DUMMY_LEN: f64 = 60.0;

/// Shortest remainder (seconds) still rendered from the source when a
/// clip is truncated at the day boundary. Remainders between 1 second and
/// this become a dummy; anything below 1 second is suppressed.
pub const MIN_TRUNCATE_RENDER: f64 = 5.0;

/// Seconds before the day start the recovery timestamp is parked at when
/// rolling over to the next day's playlist.
const ROLLOVER_HEADROOM: f64 = 5.0;

/// What the previous pass emitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LastEmission {
    /// Nothing yet: cold start, or a suppressed sub-second remainder.
    Nothing,

    /// Synthetic filler.
    Dummy,

    /// A real clip.
    Clip,
}

/// Lazy, infinite producer of [`RenderCommand`]s.
///
/// Pulled one command per step; emission order is the authoritative
/// playout order. The sequence only ends when the playlist genuinely
/// runs out (see the end condition in [`Iterator::next`]); every soft
/// failure is covered by filler instead.
#[derive(Debug)]
pub struct Scheduler {
    cfg: Config,
    clock: BroadcastClock,
    store: PlaylistStore,
    notifier: Arc<Notifier>,

    /// Virtual playhead: seconds-of-broadcast-day at which the next clip
    /// is scheduled to start.
    begin: f64,

    /// Broadcast-day time at which recovery from a gap resumes.
    last_time: Option<f64>,

    /// Whether the next emission must resynchronize by seeking into the
    /// clip containing [`Scheduler::last_time`].
    first: bool,

    /// Whether the current clip is the playlist's final entry.
    last: bool,

    /// Date of the active playlist.
    list_date: NaiveDate,

    /// Filler length for the next fallback emission.
    dummy_len: f64,

    emitted: LastEmission,

    /// Set once the playlist genuinely ran out; ends the sequence.
    finished: bool,
}

impl Scheduler {
    /// Creates a new [`Scheduler`] ticking with the system clock.
    #[must_use]
    pub fn new(cfg: Config, notifier: Arc<Notifier>) -> Self {
        let clock = BroadcastClock::new(
            cfg.playlist.day_start,
            cfg.playlist.time_shift,
        );
        Self::new_with(cfg, notifier, clock)
    }

    fn new_with(
        cfg: Config,
        notifier: Arc<Notifier>,
        clock: BroadcastClock,
    ) -> Self {
        let store = PlaylistStore::new(&cfg, Arc::clone(&notifier));
        let list_date = clock.date_for(true);
        Self {
            cfg,
            clock,
            store,
            notifier,
            begin: 0.0,
            last_time: None,
            first: false,
            last: false,
            list_date,
            dummy_len: DEFAULT_DUMMY_LEN,
            emitted: LastEmission::Nothing,
            finished: false,
        }
    }

    /// Scheduling lead of the pipeline: the buffer plus its tolerance.
    fn lead(&self) -> f64 {
        self.cfg.buffer.length + self.cfg.buffer.tolerance
    }

    fn is_filler(&self, src: &str) -> bool {
        !self.cfg.playlist.filler.is_empty()
            && src == self.cfg.playlist.filler
    }

    /// Covers a scheduling gap with filler and arms the resync state, so
    /// the output keeps running while the cause is reported.
    fn fallback(&mut self, message: &str, detail: &str) -> RenderCommand {
        let cmd = ffmpeg::gen_dummy(&self.cfg, self.dummy_len);
        let now = self.clock.seconds_of_day();

        if self.last {
            self.last_time =
                Some(self.clock.day_start_sec() - ROLLOVER_HEADROOM);
            self.first = false;
        } else {
            self.last_time =
                Some(self.clock.wrap(now + self.dummy_len + self.lead()));
            self.first = true;
        }

        self.notifier.send(message, detail);

        self.begin = now + self.lead();
        self.last = false;
        self.dummy_len = DEFAULT_DUMMY_LEN;
        self.store.invalidate();
        self.emitted = LastEmission::Dummy;
        cmd
    }

    /// Emits the priming filler covering the realignment window after a
    /// cold start or a suppressed remainder.
    fn prime(&mut self) -> RenderCommand {
        let cmd = ffmpeg::gen_dummy(&self.cfg, self.dummy_len);
        let now = self.clock.seconds_of_day();
        self.first = true;
        self.last_time =
            Some(self.clock.wrap(now + self.dummy_len + self.lead()));
        self.emitted = LastEmission::Dummy;
        cmd
    }

    /// Advisory drift check between the playhead and the wall clock.
    ///
    /// The playhead is expected to run `buffer_length` ahead of real
    /// time; exceeding the tolerance only raises a report, no state is
    /// altered.
    fn check_sync(&self) {
        let time_now = self.clock.seconds_of_day();
        let start = self.clock.day_start_sec();

        // The buffer length cannot be estimated reliably in copy mode.
        let tolerance = if self.cfg.processing.copy_mode {
            60.0
        } else {
            self.cfg.buffer.tolerance * 4.0
        };

        let mut t_dist = self.begin - time_now;
        if (0.0..start).contains(&time_now) && self.begin != start {
            t_dist -= DAY_IN_SEC;
        }

        if (t_dist - self.cfg.buffer.length).abs() >= tolerance {
            self.notifier.send(
                "Playlist is not sync!",
                &format!("{:.2} seconds async", t_dist),
            );
        }
    }

    /// Decides how much of a clip still fits into the broadcast day.
    ///
    /// Returns the command to render (if any), and the day-boundary
    /// verdict: [`None`] for a nominal mid-day emission, `Some(left)`
    /// with positive `left` when the day's final clip leaves that much
    /// uncovered time, or `Some(0.0)` once the day boundary is reached.
    fn gen_input(
        &self,
        src: &str,
        duration: f64,
        seek: f64,
        out: f64,
        last: bool,
    ) -> (Option<RenderCommand>, Option<f64>) {
        let start = self.clock.day_start_sec();
        let ref_time = DAY_IN_SEC + start;
        let time = self.clock.wrap(self.clock.seconds_of_day());

        let time_diff = self.lead() + (out - seek) + time;

        if (time_diff <= ref_time || self.begin < DAY_IN_SEC) && !last {
            // Inside the 24 hour range: render the clip as scheduled.
            return (
                Some(self.src_or_dummy(src, duration, seek, out, None)),
                None,
            );
        }

        if time_diff <= ref_time && last {
            // Final clip with day time left: check whether its full
            // duration closes the gap.
            let time_diff = self.lead() + duration + time;
            let new_len = duration - (time_diff - ref_time);
            log::info!("Under time, new length: {:.2}", new_len);

            let cmd = if time_diff >= ref_time {
                if self.is_filler(src) {
                    // The filler may work like a clock face: start it
                    // late and play until its natural close.
                    self.src_or_dummy(
                        src,
                        duration,
                        duration - new_len,
                        duration,
                        None,
                    )
                } else {
                    self.src_or_dummy(src, duration, 0.0, new_len, None)
                }
            } else {
                self.notifier.send(
                    "Playlist is not long enough:",
                    &format!("{:.2} seconds needed", new_len),
                );
                self.src_or_dummy(src, duration, 0.0, duration, None)
            };
            return (Some(cmd), Some(new_len - duration));
        }

        // Past the 24 hour range: trim the clip to the remainder.
        let new_len = (out - seek) - (time_diff - ref_time);
        log::info!("Over time, new length: {:.2}", new_len);

        let cmd = if new_len > MIN_TRUNCATE_RENDER {
            if self.is_filler(src) {
                Some(self.src_or_dummy(src, duration, out - new_len, out, None))
            } else {
                Some(self.src_or_dummy(src, duration, seek, new_len, None))
            }
        } else if new_len > 1.0 {
            Some(ffmpeg::gen_dummy(&self.cfg, new_len))
        } else {
            None
        };
        (cmd, Some(0.0))
    }

    /// Produces the render arguments for `src`, substituting a dummy when
    /// the source turns out to be missing.
    fn src_or_dummy(
        &self,
        src: &str,
        duration: f64,
        seek: f64,
        out: f64,
        dummy_len: Option<f64>,
    ) -> RenderCommand {
        if is_live_source(src, &self.cfg.processing.live_protocols) {
            return match probe::duration(src) {
                ProbedDuration::Missing => {
                    self.missing_src(src, seek, out, dummy_len)
                }
                ProbedDuration::Known(live_duration) => {
                    if seek > 0.0 || out < live_duration {
                        ffmpeg::seek_in_cut_end(
                            &self.cfg,
                            src,
                            live_duration,
                            seek,
                            out,
                        )
                    } else {
                        ffmpeg::pass_through(&self.cfg, src, out - seek)
                    }
                }
                // Without a reported duration assume a full day, so the
                // out point is guaranteed to cut the length.
                ProbedDuration::Unknown => ffmpeg::seek_in_cut_end(
                    &self.cfg,
                    src,
                    DAY_IN_SEC,
                    0.0,
                    out - seek,
                ),
            };
        }

        if Path::new(src).is_file() {
            if seek > 0.0 || out < duration {
                ffmpeg::seek_in_cut_end(&self.cfg, src, duration, seek, out)
            } else {
                ffmpeg::pass_through(&self.cfg, src, out - seek)
            }
        } else {
            self.missing_src(src, seek, out, dummy_len)
        }
    }

    /// Reports a missing source and covers its span with a dummy.
    fn missing_src(
        &self,
        src: &str,
        seek: f64,
        out: f64,
        dummy_len: Option<f64>,
    ) -> RenderCommand {
        self.notifier.send("Clip not exist:", src);
        match dummy_len {
            Some(len) if !self.cfg.processing.copy_mode => {
                ffmpeg::gen_dummy(&self.cfg, len)
            }
            _ => ffmpeg::gen_dummy(&self.cfg, out - seek),
        }
    }
}

impl Iterator for Scheduler {
    type Item = RenderCommand;

    fn next(&mut self) -> Option<RenderCommand> {
        while !self.finished {
            // Load or refresh the active day's playlist.
            let list = match self.store.load(self.list_date) {
                Ok(list) => list,
                Err(e @ LoadError::NotFound(_)) => {
                    let detail = e.to_string();
                    return Some(self.fallback("Playlist not exist:", &detail));
                }
                Err(e) => {
                    let detail = e.to_string();
                    return Some(self.fallback("Playlist is broken:", &detail));
                }
            };

            // When the previous emission was filler (or nothing), the
            // next one has to seek back into the playlist.
            match self.emitted {
                LastEmission::Nothing if !self.last => {
                    return Some(self.prime());
                }
                LastEmission::Dummy if !self.last => {
                    self.first = true;
                    self.last_time = Some(self.clock.wrap(
                        self.clock.seconds_of_day() + self.lead(),
                    ));
                }
                _ => self.first = false,
            }

            // Anchor the playhead for this pass.
            self.begin = match list.begin_sec() {
                Some(declared) => declared,
                None => self
                    .last_time
                    .unwrap_or_else(|| self.clock.seconds_of_day()),
            };

            let total = list.program.len();
            // `None` until an entry breaks the walk; the inner `Option`
            // is the emission itself, which a suppressed sub-second
            // remainder leaves empty.
            let mut emitted: Option<Option<RenderCommand>> = None;

            for (index, node) in list.program.iter().enumerate() {
                let (seek, out, duration) = (node.seek, node.out, node.duration);

                if self.first
                    && self
                        .last_time
                        .map_or(false, |t| t < self.begin + duration)
                {
                    // Seek into the clip the recovery timestamp fell
                    // into, realigning the playhead with the wall clock.
                    let seek =
                        self.last_time.unwrap_or(self.begin) - self.begin
                            + seek;
                    let (cmd, _) = self.gen_input(
                        &node.source,
                        duration,
                        seek,
                        out,
                        false,
                    );
                    self.first = false;
                    self.last_time = Some(self.begin);
                    emitted = Some(cmd);
                    break;
                }

                if self.last_time.map_or(false, |t| t < self.begin) {
                    self.last = index + 1 == total;
                    self.check_sync();

                    let (cmd, time_left) = self.gen_input(
                        &node.source,
                        duration,
                        seek,
                        out,
                        self.last,
                    );
                    match time_left {
                        None => self.last_time = Some(self.begin),
                        Some(left) if left > 0.0 => {
                            // The playlist ran short: the next day opens
                            // with this much filler.
                            self.list_date = self.clock.date_for(false);
                            self.last_time = Some(self.begin);
                            self.dummy_len = left;
                        }
                        Some(_) => {
                            self.list_date = self.clock.date_for(false);
                            self.last_time = Some(
                                self.clock.day_start_sec()
                                    - ROLLOVER_HEADROOM,
                            );
                            self.store.invalidate();
                        }
                    }
                    emitted = Some(cmd);
                    break;
                }

                self.begin += out - seek;
            }

            match emitted {
                Some(Some(cmd)) => {
                    self.emitted = if cmd.is_dummy() {
                        LastEmission::Dummy
                    } else {
                        LastEmission::Clip
                    };
                    return Some(cmd);
                }
                Some(None) => {
                    // A sub-second remainder was suppressed; rerun.
                    self.emitted = LastEmission::Nothing;
                }
                None => {
                    // Every entry lies behind the playhead.
                    if list.begin.is_none()
                        || (list.length.is_none()
                            && self.begin < self.clock.seconds_of_day())
                    {
                        log::info!("Playlist reached end");
                        self.finished = true;
                        return None;
                    }
                    let detail = self
                        .store
                        .path_for(self.list_date)
                        .display()
                        .to_string();
                    return Some(
                        self.fallback("Playlist is not valid!", &detail),
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod scheduler_spec {
    use std::{
        fs,
        sync::{Arc, Mutex},
    };

    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    use super::{LastEmission, Scheduler, DEFAULT_DUMMY_LEN};
    use crate::{
        clock::BroadcastClock,
        config::Config,
        ffmpeg::SourceKind,
        notify::Notifier,
        playlist::day_path,
    };

    struct Rig {
        scheduler: Scheduler,
        clock: Arc<Mutex<NaiveDateTime>>,
        reports: Arc<Mutex<Vec<String>>>,
        dir: TempDir,
    }

    impl Rig {
        fn new(day_start: u8, now: NaiveDateTime) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut cfg = Config::default();
            cfg.playlist.path = dir.path().to_path_buf();
            cfg.playlist.day_start = day_start;
            cfg.buffer.length = 10.0;
            cfg.buffer.tolerance = 2.0;

            let (clock, handle) = BroadcastClock::frozen(day_start, now);
            let (notifier, reports) = Notifier::capturing();
            let scheduler =
                Scheduler::new_with(cfg, Arc::new(notifier), clock);

            Self {
                scheduler,
                clock: handle,
                reports,
                dir,
            }
        }

        fn write_list(&self, date: NaiveDate, json: &str) {
            let path = day_path(self.dir.path(), date);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, json).unwrap();
        }

        fn touch_clip(&self, name: &str) -> String {
            let path = self.dir.path().join(name);
            fs::write(&path, b"media").unwrap();
            path.display().to_string()
        }

        fn advance(&self, secs: i64) {
            let mut now = self.clock.lock().unwrap();
            *now = *now + Duration::seconds(secs);
        }

        fn reported(&self, needle: &str) -> bool {
            self.reports.lock().unwrap().iter().any(|r| r.contains(needle))
        }
    }

    fn at(date: (i32, u32, u32), h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn single_clip_list(src: &str, seek: f64, out: f64, dur: f64) -> String {
        format!(
            r#"{{"begin": "06:00:00",
                 "program": [{{"source": "{}", "in": {}, "out": {},
                               "duration": {}}}]}}"#,
            src, seek, out, dur,
        )
    }

    #[test]
    fn keeps_yielding_filler_without_a_playlist() {
        let mut rig = Rig::new(6, at((2024, 2, 1), 10, 0, 0));

        for _ in 0..3 {
            let cmd = rig.scheduler.next().unwrap();
            assert_eq!(cmd.kind, SourceKind::Dummy);
            assert_eq!(cmd.span, DEFAULT_DUMMY_LEN);
        }
        assert!(rig.reported("Playlist not exist:"));
        assert_eq!(rig.reports.lock().unwrap().len(), 3);
    }

    #[test]
    fn keeps_yielding_filler_on_a_broken_playlist() {
        let mut rig = Rig::new(6, at((2024, 2, 1), 10, 0, 0));
        rig.write_list(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            "{ not json",
        );

        let cmd = rig.scheduler.next().unwrap();

        assert_eq!(cmd.kind, SourceKind::Dummy);
        assert!(rig.reported("Playlist is broken:"));
    }

    #[test]
    fn primes_and_reseeks_after_a_late_start() {
        let mut rig = Rig::new(6, at((2024, 1, 15), 6, 0, 30));
        let src = rig.touch_clip("a.mp4");
        rig.write_list(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &single_clip_list(&src, 0.0, 3600.0, 3600.0),
        );

        // First emission is the priming filler.
        let first = rig.scheduler.next().unwrap();
        assert_eq!(first.kind, SourceKind::Dummy);
        assert_eq!(first.span, 60.0);

        // Its span runs through the backpressured buffer.
        rig.advance(60);

        // The second emission seeks to 30 + 60 + buffer + tolerance.
        let second = rig.scheduler.next().unwrap();
        assert_eq!(second.kind, SourceKind::Clip);
        assert_eq!(&second.args[..2], ["-ss", "102"]);
        assert_eq!(second.span, 3600.0 - 102.0);
    }

    #[test]
    fn substitutes_filler_for_a_missing_clip() {
        let mut rig = Rig::new(0, at((2024, 1, 15), 0, 0, 10));
        rig.write_list(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            r#"{"begin": "00:00:00",
                "program": [{"source": "/nowhere/gone.mp4", "in": 0,
                             "out": 10, "duration": 10}]}"#,
        );
        rig.scheduler.emitted = LastEmission::Clip;
        rig.scheduler.last_time = Some(-5.0);

        let cmd = rig.scheduler.next().unwrap();

        assert_eq!(cmd.kind, SourceKind::Dummy);
        assert_eq!(cmd.span, 10.0);
        assert!(rig.reported("Clip not exist: /nowhere/gone.mp4"));
    }

    #[test]
    fn renders_the_day_start_clip_without_seek() {
        // Mid-run at 05:59:55 the rollover machinery has already parked
        // the recovery timestamp just before the new day's start.
        let mut rig = Rig::new(6, at((2024, 1, 16), 5, 59, 55));
        let a = rig.touch_clip("a.mp4");
        let b = rig.touch_clip("b.mp4");
        rig.write_list(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &format!(
                r#"{{"begin": "06:00:00", "program": [
                    {{"source": "{}", "in": 0, "out": 3600,
                      "duration": 3600}},
                    {{"source": "{}", "in": 0, "out": 3600,
                      "duration": 3600}}]}}"#,
                a, b,
            ),
        );
        rig.scheduler.emitted = LastEmission::Clip;
        rig.scheduler.last_time = Some(21595.0);

        let cmd = rig.scheduler.next().unwrap();

        assert_eq!(cmd.kind, SourceKind::Clip);
        assert_eq!(cmd.span, 3600.0);
        assert!(!cmd.args.contains(&"-ss".to_string()));
        assert_eq!(rig.scheduler.last_time, Some(21600.0));
    }

    #[test]
    fn opens_the_next_day_with_the_left_over_filler() {
        // 05:56:48 wraps to 107808 in the day frame; the final 60 second
        // clip leaves 108000 - (12 + 60 + 107808) = 120 seconds open.
        let mut rig = Rig::new(6, at((2024, 1, 16), 5, 56, 48));
        let src = rig.touch_clip("a.mp4");
        rig.write_list(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &single_clip_list(&src, 0.0, 60.0, 60.0),
        );
        rig.write_list(
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            &single_clip_list(&src, 0.0, 3600.0, 3600.0),
        );
        rig.scheduler.emitted = LastEmission::Clip;
        rig.scheduler.last_time = Some(21595.0);

        let clip = rig.scheduler.next().unwrap();
        assert_eq!(clip.kind, SourceKind::Clip);
        assert_eq!(clip.span, 60.0);
        assert!(rig.reported("Playlist is not long enough:"));
        assert_eq!(
            rig.scheduler.list_date,
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
        );
        assert_eq!(rig.scheduler.dummy_len, 120.0);

        // The gap until the new day is covered by one filler emission.
        let gap = rig.scheduler.next().unwrap();
        assert_eq!(gap.kind, SourceKind::Dummy);
        assert_eq!(gap.span, 120.0);
        assert!(rig.reported("Playlist is not valid!"));
        assert_eq!(rig.scheduler.dummy_len, DEFAULT_DUMMY_LEN);
    }

    #[test]
    fn truncates_the_last_clip_at_the_day_boundary() {
        // 05:50:00 wraps to 107400; 12 + 1100 + 107400 overshoots the
        // 108000 boundary by 512 seconds.
        let mut rig = Rig::new(6, at((2024, 1, 16), 5, 50, 0));
        let src = rig.touch_clip("a.mp4");
        rig.write_list(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &single_clip_list(&src, 0.0, 1100.0, 1100.0),
        );
        rig.scheduler.emitted = LastEmission::Clip;
        rig.scheduler.last_time = Some(21595.0);

        let cmd = rig.scheduler.next().unwrap();

        assert_eq!(cmd.kind, SourceKind::Clip);
        assert_eq!(cmd.span, 588.0);
        assert!(cmd.args.contains(&"-t".to_string()));
        assert!(cmd.args.contains(&"588".to_string()));

        // The day boundary was reached: the next date is active and the
        // recovery timestamp is parked right before its start.
        assert_eq!(
            rig.scheduler.list_date,
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
        );
        assert_eq!(rig.scheduler.last_time, Some(21595.0));
    }

    #[test]
    fn advances_the_playhead_monotonically() {
        let mut rig = Rig::new(6, at((2024, 1, 15), 6, 0, 0));
        let a = rig.touch_clip("a.mp4");
        let b = rig.touch_clip("b.mp4");
        let c = rig.touch_clip("c.mp4");
        rig.write_list(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &format!(
                r#"{{"begin": "06:00:00", "program": [
                    {{"source": "{}", "in": 0, "out": 10, "duration": 10}},
                    {{"source": "{}", "in": 0, "out": 20, "duration": 20}},
                    {{"source": "{}", "in": 0, "out": 30, "duration": 30}}]}}"#,
                a, b, c,
            ),
        );
        rig.scheduler.emitted = LastEmission::Clip;
        rig.scheduler.last_time = Some(21595.0);

        let mut begins = Vec::new();
        for _ in 0..3 {
            let cmd = rig.scheduler.next().unwrap();
            assert_eq!(cmd.kind, SourceKind::Clip);
            begins.push(rig.scheduler.begin);
        }

        assert_eq!(begins, [21600.0, 21610.0, 21630.0]);
    }

    #[test]
    fn ends_when_an_unanchored_playlist_runs_out() {
        let mut rig = Rig::new(6, at((2024, 1, 15), 10, 0, 0));
        let src = rig.touch_clip("a.mp4");
        rig.write_list(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &format!(
                r#"{{"program": [{{"source": "{}", "in": 0, "out": 10,
                                   "duration": 10}}]}}"#,
                src,
            ),
        );
        rig.scheduler.emitted = LastEmission::Clip;
        rig.scheduler.last_time = Some(900.0);

        assert!(rig.scheduler.next().is_none());
        assert!(rig.scheduler.next().is_none());
    }
}
