use std::fmt;
use std::path::Path;

pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif"];
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mkv", "avi", "mov", "wmv", "flv", "webm", "mpg", "mpeg",
];

/// Coarse media type, decided by extension alone. Also names the folder the
/// file lands in under its destination subfolder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCategory {
    Photos,
    Videos,
}

impl MediaCategory {
    pub fn folder_name(&self) -> &'static str {
        match self {
            MediaCategory::Photos => "photos",
            MediaCategory::Videos => "videos",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder_name())
    }
}

/// Lowercased extension without the leading dot.
pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Accepts either `jpg` or `.jpg`, any case.
pub fn category_for(extension: &str) -> Option<MediaCategory> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaCategory::Photos)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaCategory::Videos)
    } else {
        None
    }
}

pub fn is_supported(path: &Path) -> bool {
    normalized_extension(path)
        .and_then(|ext| category_for(&ext))
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_case_insensitive() {
        assert!(is_supported(Path::new("/inbox/Shoot/IMG_0001.JPG")));
        assert!(is_supported(Path::new("clip.MpEg")));
        assert!(is_supported(Path::new("scan.tif")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("README")));
        assert!(!is_supported(Path::new("archive.jpg.zip")));
    }

    #[test]
    fn test_category_for() {
        assert_eq!(category_for("jpeg"), Some(MediaCategory::Photos));
        assert_eq!(category_for(".PNG"), Some(MediaCategory::Photos));
        assert_eq!(category_for("webm"), Some(MediaCategory::Videos));
        assert_eq!(category_for("m4v"), Some(MediaCategory::Videos));
        assert_eq!(category_for("heic"), None);
        assert_eq!(category_for(""), None);
    }

    #[test]
    fn test_normalized_extension() {
        assert_eq!(
            normalized_extension(Path::new("a/B.Jpg")),
            Some("jpg".to_string())
        );
        assert_eq!(normalized_extension(Path::new("a/noext")), None);
        assert_eq!(normalized_extension(Path::new("a/trailing.")), None);
    }
}
