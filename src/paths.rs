//! Path utilities for detecting file types by extension.
//!
//! This module provides functions to check if files are images or audio
//! tracks based on their file extensions. These are used by the local asset
//! pool and the accompaniment-track picker.

use std::path::Path;

/// List of supported image file extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// List of supported audio file extensions.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "wav", "ogg", "flac"];

/// Check if a path has an image file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelcast::paths::is_image_file;
///
/// assert!(is_image_file(Path::new("cover.jpg")));
/// assert!(is_image_file(Path::new("/path/to/image.png")));
/// assert!(!is_image_file(Path::new("theme.mp3")));
/// ```
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a path has an audio file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelcast::paths::is_audio_file;
///
/// assert!(is_audio_file(Path::new("theme.mp3")));
/// assert!(is_audio_file(Path::new("/path/to/track.wav")));
/// assert!(!is_audio_file(Path::new("cover.jpg")));
/// ```
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Get the list of image file extensions.
///
/// # Examples
///
/// ```
/// use reelcast::paths::image_extensions;
///
/// let extensions = image_extensions();
/// assert!(extensions.contains(&"jpg"));
/// assert!(extensions.contains(&"png"));
/// ```
#[must_use]
pub fn image_extensions() -> &'static [&'static str] {
    IMAGE_EXTENSIONS
}

/// Get the list of audio file extensions.
///
/// # Examples
///
/// ```
/// use reelcast::paths::audio_extensions;
///
/// let extensions = audio_extensions();
/// assert!(extensions.contains(&"mp3"));
/// assert!(extensions.contains(&"wav"));
/// ```
#[must_use]
pub fn audio_extensions() -> &'static [&'static str] {
    AUDIO_EXTENSIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("cover.jpg")));
        assert!(is_image_file(Path::new("cover.jpeg")));
        assert!(is_image_file(Path::new("cover.png")));
        assert!(is_image_file(Path::new("cover.gif")));
        assert!(is_image_file(Path::new("cover.webp")));
        assert!(is_image_file(Path::new("cover.bmp")));

        // Case insensitive
        assert!(is_image_file(Path::new("cover.JPG")));
        assert!(is_image_file(Path::new("cover.Png")));

        // With paths
        assert!(is_image_file(Path::new("/path/to/image.jpg")));
        assert!(is_image_file(Path::new("relative/path/image.png")));

        // Not image files
        assert!(!is_image_file(Path::new("theme.mp3")));
        assert!(!is_image_file(Path::new("document.txt")));
        assert!(!is_image_file(Path::new("no_extension")));
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("theme.mp3")));
        assert!(is_audio_file(Path::new("theme.m4a")));
        assert!(is_audio_file(Path::new("theme.aac")));
        assert!(is_audio_file(Path::new("theme.wav")));
        assert!(is_audio_file(Path::new("theme.ogg")));
        assert!(is_audio_file(Path::new("theme.flac")));

        // Case insensitive
        assert!(is_audio_file(Path::new("theme.MP3")));
        assert!(is_audio_file(Path::new("theme.Wav")));

        // With paths
        assert!(is_audio_file(Path::new("/path/to/theme.mp3")));

        // Not audio files
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("no_extension")));
    }

    #[test]
    fn test_extension_lists() {
        assert_eq!(image_extensions().len(), 6);
        assert!(image_extensions().contains(&"webp"));
        assert_eq!(audio_extensions().len(), 6);
        assert!(audio_extensions().contains(&"flac"));
    }

    #[test]
    fn test_edge_cases() {
        // Empty path
        assert!(!is_image_file(Path::new("")));
        assert!(!is_audio_file(Path::new("")));

        // Hidden files
        assert!(is_image_file(Path::new(".hidden.jpg")));
        assert!(is_audio_file(Path::new(".hidden.mp3")));

        // Multiple dots
        assert!(is_image_file(Path::new("cover.thumb.jpg")));
        assert!(is_audio_file(Path::new("theme.v2.mp3")));
    }
}
