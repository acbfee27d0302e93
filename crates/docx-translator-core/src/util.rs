//! Utility functions shared across the crate.

use std::path::{Path, PathBuf};

use crate::config::Lang;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Checkpoint directory for a source document: `<source dir>/<dir_name>`.
pub fn checkpoint_dir(source: &Path, dir_name: &str) -> PathBuf {
    source
        .parent()
        .map_or_else(|| PathBuf::from(dir_name), |parent| parent.join(dir_name))
}

/// File name of the source without directories, lossily converted.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| "document".to_string(), |n| n.to_string_lossy().into_owned())
}

/// Output path for a translated document.
///
/// `report.docx` translated to Japanese becomes `report_translated_Japanese.docx`.
/// If that file exists, `_1`, `_2`, ... are appended to the stem until a free
/// name is found, so an existing file is never overwritten.
pub fn unique_output_path(source: &Path, target: &Lang, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let base = format!("{stem}_translated_{}", target.as_str().replace(' ', "_"));

    next_free_path(source.with_file_name(format!("{base}.{extension}")))
}

/// `candidate` if no file exists there, otherwise the first free
/// `{stem}_{n}.{ext}` next to it.
pub fn next_free_path(candidate: PathBuf) -> PathBuf {
    if !candidate.exists() {
        return candidate;
    }

    let stem = candidate
        .file_stem()
        .map_or_else(|| "output".to_string(), |s| s.to_string_lossy().into_owned());
    let suffix = candidate
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|n| candidate.with_file_name(format!("{stem}_{n}{suffix}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Human-readable byte size, as shown by cache status.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    if bytes > MB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_carries_language() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.docx");
        let out = unique_output_path(&source, &Lang::new("Traditional Chinese"), "docx");
        assert_eq!(out, dir.path().join("report_translated_Traditional_Chinese.docx"));
    }

    #[test]
    fn test_output_name_never_collides() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.docx");
        let lang = Lang::new("Japanese");

        let first = unique_output_path(&source, &lang, "docx");
        std::fs::write(&first, b"taken").unwrap();
        let second = unique_output_path(&source, &lang, "docx");
        assert_ne!(first, second);
        assert!(!second.exists());
        assert_eq!(second, dir.path().join("report_translated_Japanese_1.docx"));

        std::fs::write(&second, b"taken").unwrap();
        let third = unique_output_path(&source, &lang, "docx");
        assert_eq!(third, dir.path().join("report_translated_Japanese_2.docx"));
    }

    #[test]
    fn test_explicit_path_is_kept_when_free() {
        let dir = tempfile::tempdir().unwrap();
        let wanted = dir.path().join("out.docx");
        assert_eq!(next_free_path(wanted.clone()), wanted);
        std::fs::write(&wanted, b"taken").unwrap();
        assert_eq!(next_free_path(wanted), dir.path().join("out_1.docx"));
    }

    #[test]
    fn test_checkpoint_dir_is_next_to_source() {
        let dir = checkpoint_dir(Path::new("/data/in/report.docx"), ".translation_cache");
        assert_eq!(dir, PathBuf::from("/data/in/.translation_cache"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(2048), "2.0KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0MB");
    }
}
