use std::fmt;

pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "avi", "mov", "m4v"];
pub const AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "flac", "m4a", "aac", "ogg", "opus", "wav"];
pub const ASSET_EXTENSIONS: [&str; 5] = ["srt", "nfo", "jpg", "jpeg", "png"];

/// Role of a file inside a media unit, decided by extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileRole {
    Primary,
    Asset,
    Ignore,
}

impl FileRole {
    /// `extension` is expected lowercased without the dot; other input is normalized.
    pub fn for_extension(extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        let ext = ext.as_str();
        if VIDEO_EXTENSIONS.contains(&ext) || AUDIO_EXTENSIONS.contains(&ext) {
            FileRole::Primary
        } else if ASSET_EXTENSIONS.contains(&ext) {
            FileRole::Asset
        } else {
            FileRole::Ignore
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileRole::Primary => "PRIMARY",
            FileRole::Asset => "ASSET",
            FileRole::Ignore => "IGNORE",
        };
        f.write_str(label)
    }
}
