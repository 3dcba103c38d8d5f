use std::path::{Path, PathBuf};

/// Extensions recognized as base-image candidates when scanning a directory.
pub const BASE_IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Resolve the base images named by `path`.
///
/// A regular file is returned as-is, whatever its extension. A directory yields its direct
/// children (no recursion, subdirectories skipped) whose lowercased extension is one of
/// [`BASE_IMAGE_EXTENSIONS`], listed in file-name order. A missing or unreadable path
/// yields an empty list rather than an error.
pub fn discover_base_images(path: &Path) -> Vec<PathBuf> {
    if path.as_os_str().is_empty() {
        return Vec::new();
    }

    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "base image path not readable");
            return Vec::new();
        }
    };
    if !meta.is_dir() {
        return vec![path.to_path_buf()];
    }

    let entries = match std::fs::read_dir(path) {
        Ok(rd) => rd,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "base image directory not readable");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            continue;
        }
        let entry_path = entry.path();
        if has_base_image_extension(&entry_path) {
            out.push(entry_path);
        }
    }
    // `read_dir` order is platform-defined; sort so repeated scans agree.
    out.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    tracing::debug!(path = %path.display(), found = out.len(), "discovered base images");
    out
}

fn has_base_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| BASE_IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(has_base_image_extension(Path::new("a.PNG")));
        assert!(has_base_image_extension(Path::new("a.Jpeg")));
        assert!(has_base_image_extension(Path::new("dir/a.bmp")));
        assert!(!has_base_image_extension(Path::new("a.gif")));
        assert!(!has_base_image_extension(Path::new("png")));
    }

    #[test]
    fn empty_and_missing_paths_yield_nothing() {
        assert!(discover_base_images(Path::new("")).is_empty());
        assert!(discover_base_images(Path::new("no/such/dir/anywhere")).is_empty());
    }
}
