//! # reelcast-av
//!
//! Slideshow assembly library driving the ffmpeg CLI.
//!
//! This crate provides functionality for:
//! - Rendering an ordered set of images into a short video on a fixed
//!   (by default portrait) canvas via the ffmpeg concat demuxer
//! - Muxing an optional audio track under the rendered video
//! - Detecting the external tools the assembler relies on
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use reelcast_av::Slideshow;
//!
//! let video = Slideshow::new(vec!["a.jpg".into(), "b.jpg".into()], "./out")
//!     .music(Some("theme.mp3".into()))
//!     .render()?;
//! println!("rendered {}", video.display());
//! # Ok::<(), reelcast_av::Error>(())
//! ```

mod error;
pub mod slideshow;
pub mod tools;

// Re-exports
pub use error::{Error, Result};
pub use slideshow::Slideshow;
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
