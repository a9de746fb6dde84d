//! Fetch task representation.

use std::fmt;
use std::path::Path;

/// Kind of media file the mirror knows how to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// RIFF/WAVE audio.
    Wav,
    /// JPEG image (`.jpg` or `.jpeg`).
    Jpeg,
}

impl MediaKind {
    /// Recognize a file extension (without dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(MediaKind::Wav),
            "jpg" | "jpeg" => Some(MediaKind::Jpeg),
            _ => None,
        }
    }

    /// Recognize the extension of a file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Recognize the extension of a path on disk.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Wav => write!(f, "wav"),
            MediaKind::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// One remote file to fetch to one local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    /// Full URL the file is downloaded from.
    pub source_url: String,

    /// Remote path of the file (its directory part becomes the local directory).
    pub remote_path: String,

    /// Target file name.
    pub file_name: String,

    /// Media kind derived from `file_name`.
    pub kind: MediaKind,
}

impl FetchTask {
    /// Remote directory of this file, without leading slashes.
    ///
    /// `"/Data/Motorboat_1/yacht_001.wav"` gives `"Data/Motorboat_1"`.
    pub fn remote_dir(&self) -> &str {
        let dir = match self.remote_path.rfind('/') {
            Some(pos) => &self.remote_path[..pos],
            None => "",
        };
        dir.trim_start_matches('/')
    }
}
