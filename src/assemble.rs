//! Turning a selected batch of images into a slideshow video.

use crate::config::AssemblyConfig;
use crate::paths::is_audio_file;
use anyhow::{Context, Result};
use reelcast_av::Slideshow;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Inputs for one assembly: the batch images in selection order, an
/// optional accompaniment track, and where the artifact should land.
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    pub images: Vec<PathBuf>,
    pub music: Option<PathBuf>,
    pub out_dir: PathBuf,
}

/// Anything that can turn an assembly request into a video file.
///
/// Implementations do blocking work; the pipeline runs them on a blocking
/// thread.
pub trait Assembler: Send + Sync {
    fn assemble(&self, request: &AssemblyRequest) -> Result<PathBuf>;
}

/// ffmpeg-backed assembler producing a vertical slideshow.
#[derive(Debug, Clone)]
pub struct SlideshowAssembler {
    seconds_per_image: u32,
    width: u32,
    height: u32,
    fps: u32,
}

impl SlideshowAssembler {
    pub fn from_config(config: &AssemblyConfig) -> Self {
        Self {
            seconds_per_image: config.seconds_per_image,
            width: config.width,
            height: config.height,
            fps: config.fps,
        }
    }
}

impl Assembler for SlideshowAssembler {
    fn assemble(&self, request: &AssemblyRequest) -> Result<PathBuf> {
        Slideshow::new(request.images.clone(), request.out_dir.clone())
            .music(request.music.clone())
            .seconds_per_image(self.seconds_per_image)
            .canvas(self.width, self.height)
            .fps(self.fps)
            .render()
            .context("Slideshow assembly failed")
    }
}

/// The accompaniment track: the first audio file in the music directory by
/// file name, or nothing when the directory is absent or holds no audio.
pub fn pick_music(music_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = music_dir?;
    let mut tracks: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_audio_file(path))
        .collect();
    tracks.sort();
    tracks.into_iter().next()
}
