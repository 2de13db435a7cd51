//! Output path helpers

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::domain::model::TargetFormat;

/// Default output next to the source: `montage_<format>_<YYYYmmdd_HHMMSS>.mp4`
pub fn default_output_path(source: &Path, format: TargetFormat, now: DateTime<Local>) -> PathBuf {
    let name = format!("montage_{}_{}.mp4", format.id(), now.format("%Y%m%d_%H%M%S"));
    match source.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => PathBuf::from(name),
    }
}

/// Append `.mp4` unless the path already ends with it
pub fn ensure_mp4_extension(path: &Path) -> PathBuf {
    let has_mp4 = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("mp4"))
        .unwrap_or(false);
    if has_mp4 {
        path.to_path_buf()
    } else {
        let mut raw = path.as_os_str().to_os_string();
        raw.push(".mp4");
        PathBuf::from(raw)
    }
}

/// Resolve the final output path from an optional user choice
pub fn resolve_output_path(requested: Option<&Path>, source: &Path, format: TargetFormat) -> PathBuf {
    match requested {
        Some(path) => ensure_mp4_extension(path),
        None => default_output_path(source, format, Local::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_output_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let path = default_output_path(Path::new("/videos/talk.mp4"), TargetFormat::Tiktok, now);
        assert_eq!(path, PathBuf::from("/videos/montage_tiktok_20240309_140507.mp4"));

        let bare = default_output_path(Path::new("talk.mp4"), TargetFormat::InstagramSquare, now);
        assert_eq!(bare, PathBuf::from("montage_instagram_square_20240309_140507.mp4"));
    }

    #[test]
    fn test_mp4_extension_appended() {
        assert_eq!(ensure_mp4_extension(Path::new("out")), PathBuf::from("out.mp4"));
        assert_eq!(ensure_mp4_extension(Path::new("out.MP4")), PathBuf::from("out.MP4"));
        assert_eq!(ensure_mp4_extension(Path::new("clip.mov")), PathBuf::from("clip.mov.mp4"));
    }
}
