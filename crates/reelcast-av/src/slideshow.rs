//! Slideshow rendering via the ffmpeg concat demuxer.
//!
//! Rendering is a two-step process: a concat script turns the image set into
//! a silent video on a fixed canvas, and an optional second pass muxes an
//! audio track underneath with stream-copied video.

use crate::tools::require_tool;
use crate::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Seconds each image stays on screen unless overridden.
pub const DEFAULT_SECONDS_PER_IMAGE: u32 = 3;
/// Default output canvas width (portrait 9:16).
pub const DEFAULT_WIDTH: u32 = 1080;
/// Default output canvas height (portrait 9:16).
pub const DEFAULT_HEIGHT: u32 = 1920;
/// Default output frame rate.
pub const DEFAULT_FPS: u32 = 30;

/// A slideshow render job: an ordered set of images, an optional audio
/// track, and the canvas the result is rendered onto.
///
/// # Example
///
/// ```no_run
/// use reelcast_av::Slideshow;
///
/// let video = Slideshow::new(vec!["a.jpg".into(), "b.jpg".into()], "./out")
///     .music(Some("theme.mp3".into()))
///     .render()?;
/// println!("rendered {}", video.display());
/// # Ok::<(), reelcast_av::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Slideshow {
    images: Vec<PathBuf>,
    music: Option<PathBuf>,
    out_dir: PathBuf,
    seconds_per_image: u32,
    width: u32,
    height: u32,
    fps: u32,
}

impl Slideshow {
    /// Create a render job with the default portrait canvas.
    pub fn new(images: Vec<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            images,
            music: None,
            out_dir: out_dir.into(),
            seconds_per_image: DEFAULT_SECONDS_PER_IMAGE,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
        }
    }

    /// Mux the given audio track under the video.
    pub fn music(mut self, music: Option<PathBuf>) -> Self {
        self.music = music;
        self
    }

    /// Override how long each image is shown, in seconds.
    pub fn seconds_per_image(mut self, seconds: u32) -> Self {
        self.seconds_per_image = seconds;
        self
    }

    /// Override the output canvas size.
    pub fn canvas(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Override the output frame rate.
    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Render the slideshow and return the path of the finished file.
    ///
    /// Scratch files (the concat script, and the silent base video when an
    /// audio pass follows) are written next to the output and removed on
    /// both success and failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the image set is empty, an input file is missing,
    /// ffmpeg is not installed, or ffmpeg exits unsuccessfully.
    pub fn render(&self) -> Result<PathBuf> {
        if self.images.is_empty() {
            return Err(Error::InvalidInput("no images provided".to_string()));
        }
        for image in &self.images {
            if !image.exists() {
                return Err(Error::file_not_found(image));
            }
        }
        if let Some(music) = &self.music {
            if !music.exists() {
                return Err(Error::file_not_found(music));
            }
        }
        require_tool("ffmpeg")?;

        fs::create_dir_all(&self.out_dir)?;

        let id = uuid::Uuid::new_v4();
        let list_path = self.out_dir.join(format!("{id}_list.txt"));
        let final_path = self.out_dir.join(format!("{id}.mp4"));

        fs::write(&list_path, self.concat_script()?)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(images = self.images.len(), "rendering slideshow video");

        // Without music the silent render is the finished artifact.
        let Some(music) = &self.music else {
            let rendered = run_ffmpeg(&self.base_args(&list_path, &final_path));
            remove_quietly(&list_path);
            if let Err(e) = rendered {
                remove_quietly(&final_path);
                return Err(e);
            }
            return Ok(final_path);
        };

        let base_path = self.out_dir.join(format!("{id}_base.mp4"));
        if let Err(e) = run_ffmpeg(&self.base_args(&list_path, &base_path)) {
            remove_quietly(&list_path);
            remove_quietly(&base_path);
            return Err(e);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(music = %music.display(), "muxing audio track");

        let muxed = run_ffmpeg(&mux_args(&base_path, music, &final_path));
        remove_quietly(&list_path);
        remove_quietly(&base_path);
        if let Err(e) = muxed {
            remove_quietly(&final_path);
            return Err(e);
        }

        Ok(final_path)
    }

    /// Build the concat demuxer script.
    ///
    /// Every image is held for the configured duration; the last image is
    /// listed once more because the demuxer ignores the duration of the
    /// final entry otherwise.
    fn concat_script(&self) -> Result<String> {
        let mut script = String::new();
        for image in &self.images {
            let abs = std::path::absolute(image)?;
            script.push_str(&format!(
                "file '{}'\nduration {}\n",
                escape(&abs),
                self.seconds_per_image
            ));
        }
        if let Some(last) = self.images.last() {
            let abs = std::path::absolute(last)?;
            script.push_str(&format!("file '{}'\n", escape(&abs)));
        }
        Ok(script)
    }

    /// Arguments for the image-to-video pass: concat input, scaled and
    /// padded onto the canvas, at the configured frame rate.
    fn base_args(&self, list: &Path, out: &Path) -> Vec<OsString> {
        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
            w = self.width,
            h = self.height,
        );

        let mut args: Vec<OsString> = Vec::new();
        for a in ["-y", "-f", "concat", "-safe", "0", "-i"] {
            args.push(a.into());
        }
        args.push(list.as_os_str().to_owned());
        args.push("-vf".into());
        args.push(filter.into());
        args.push("-r".into());
        args.push(self.fps.to_string().into());
        args.push(out.as_os_str().to_owned());
        args
    }
}

/// Arguments for the audio pass: stream-copy the video, encode the track to
/// AAC, and end at the shorter of the two.
fn mux_args(video: &Path, music: &Path, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    args.push("-y".into());
    args.push("-i".into());
    args.push(video.as_os_str().to_owned());
    args.push("-i".into());
    args.push(music.as_os_str().to_owned());
    for a in ["-c:v", "copy", "-c:a", "aac", "-shortest"] {
        args.push(a.into());
    }
    args.push(out.as_os_str().to_owned());
    args
}

fn run_ffmpeg(args: &[OsString]) -> Result<()> {
    let result = Command::new("ffmpeg").args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::tool_not_found("ffmpeg")
        } else {
            Error::Io(e)
        }
    })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(Error::tool_failed("ffmpeg", stderr.to_string()));
    }

    Ok(())
}

/// Escape a path for a concat script entry (single quotes close, escape,
/// reopen).
fn escape(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

fn remove_quietly(path: &Path) {
    let _ = fs::remove_file(path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_script_repeats_last_image() {
        let show = Slideshow::new(
            vec![PathBuf::from("/media/a.jpg"), PathBuf::from("/media/b.jpg")],
            "/tmp/out",
        );
        let script = show.concat_script().unwrap();
        let expected = "file '/media/a.jpg'\nduration 3\n\
                        file '/media/b.jpg'\nduration 3\n\
                        file '/media/b.jpg'\n";
        assert_eq!(script, expected);
    }

    #[test]
    fn test_concat_script_honors_duration_override() {
        let show =
            Slideshow::new(vec![PathBuf::from("/media/a.jpg")], "/tmp/out").seconds_per_image(5);
        let script = show.concat_script().unwrap();
        assert!(script.contains("duration 5\n"));
    }

    #[test]
    fn test_concat_script_escapes_quotes() {
        let show = Slideshow::new(vec![PathBuf::from("/media/it's.jpg")], "/tmp/out");
        let script = show.concat_script().unwrap();
        assert!(script.contains(r"file '/media/it'\''s.jpg'"));
    }

    #[test]
    fn test_base_args_scale_and_pad_to_canvas() {
        let show = Slideshow::new(vec![PathBuf::from("/media/a.jpg")], "/tmp/out");
        let args = show.base_args(Path::new("/tmp/list.txt"), Path::new("/tmp/out.mp4"));
        let strings: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(strings[0], "-y");
        assert!(strings.contains(&"concat".to_string()));
        let vf = strings
            .iter()
            .position(|a| a == "-vf")
            .map(|i| &strings[i + 1])
            .unwrap();
        assert!(vf.contains("scale=1080:1920"));
        assert!(vf.contains("pad=1080:1920"));
        assert_eq!(strings.last().unwrap(), "/tmp/out.mp4");
    }

    #[test]
    fn test_base_args_custom_canvas_and_fps() {
        let show = Slideshow::new(vec![PathBuf::from("/media/a.jpg")], "/tmp/out")
            .canvas(720, 1280)
            .fps(24);
        let args = show.base_args(Path::new("/tmp/list.txt"), Path::new("/tmp/out.mp4"));
        let strings: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert!(strings.iter().any(|a| a.contains("scale=720:1280")));
        let r = strings
            .iter()
            .position(|a| a == "-r")
            .map(|i| &strings[i + 1])
            .unwrap();
        assert_eq!(r, "24");
    }

    #[test]
    fn test_mux_args_copy_video_encode_audio() {
        let args = mux_args(
            Path::new("/tmp/base.mp4"),
            Path::new("/music/theme.mp3"),
            Path::new("/tmp/final.mp4"),
        );
        let strings: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(strings[0], "-y");
        assert!(strings.windows(2).any(|w| w[0] == "-c:v" && w[1] == "copy"));
        assert!(strings.windows(2).any(|w| w[0] == "-c:a" && w[1] == "aac"));
        assert!(strings.contains(&"-shortest".to_string()));
        assert_eq!(strings.last().unwrap(), "/tmp/final.mp4");
    }

    #[test]
    fn test_render_rejects_empty_image_set() {
        let show = Slideshow::new(Vec::new(), "/tmp/out");
        assert!(matches!(show.render(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_render_rejects_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let show = Slideshow::new(
            vec![dir.path().join("missing.jpg")],
            dir.path().join("out"),
        );
        assert!(matches!(show.render(), Err(Error::FileNotFound { .. })));
    }

    #[test]
    fn test_render_rejects_missing_music() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.jpg");
        fs::write(&image, b"not really a jpg").unwrap();

        let show = Slideshow::new(vec![image], dir.path().join("out"))
            .music(Some(dir.path().join("missing.mp3")));
        assert!(matches!(show.render(), Err(Error::FileNotFound { .. })));
    }
}
