//! [FFmpeg]-based definitions and implementations.
//!
//! [FFmpeg]: https://ffmpeg.org

pub mod command;
pub mod probe;

pub use self::command::{
    gen_dummy, pass_through, pre_settings, seek_in_cut_end, RenderCommand,
    SourceKind,
};
