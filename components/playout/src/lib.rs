//! 24/7 linear television playout engine.
//!
//! Reads time-anchored daily playlists, keeps a virtual playhead in sync
//! with wall-clock time across broadcast-day boundaries, and produces a
//! gap-free sequence of [FFmpeg] render commands feeding a buffered
//! encoder/streamer pipeline.
//!
//! [FFmpeg]: https://ffmpeg.org

#![deny(
    rustdoc::broken_intra_doc_links,
    missing_debug_implementations,
    nonstandard_style,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![warn(
    deprecated_in_future,
    missing_docs,
    unreachable_pub,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod ffmpeg;
pub mod notify;
pub mod pipeline;
pub mod playlist;
pub mod scheduler;
pub mod validate;

use std::{any::Any, borrow::Cow};

pub use crate::config::Config;

/// Pretty-prints the given [`panic`] `payload` to be displayed in logs.
#[must_use]
pub fn display_panic<'a>(
    payload: &'a (dyn Any + Send + 'static),
) -> Cow<'a, str> {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).into();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.as_str().into();
    }
    "Box<Any>".into()
}
