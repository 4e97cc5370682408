//! Discovery of release archives in the build output directory.
//!
//! Archives are located with a glob pattern (by default `*.zip`) relative to
//! the output directory. Results are sorted so that progress output is stable
//! across filesystems; an empty directory simply yields no archives.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::io;

/// Default glob pattern for release archives.
pub const DEFAULT_ARCHIVE_PATTERN: &str = "*.zip";

/// Finds archives in `dist_dir` whose file names match `pattern`.
///
/// Only regular files are returned. The pattern is applied to entries
/// directly inside `dist_dir`; it is escaped from the directory portion so
/// that directory names containing glob metacharacters still work.
///
/// # Errors
///
/// Returns an error if `dist_dir` is empty, the pattern is invalid, a
/// matched path cannot be read, or a matched path is not valid UTF-8.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use provider_index_publisher::artefact::scanner::{scan_archives, DEFAULT_ARCHIVE_PATTERN};
///
/// let archives = scan_archives(Utf8Path::new("dist"), DEFAULT_ARCHIVE_PATTERN)?;
/// for archive in archives {
///     println!("{archive}");
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn scan_archives(dist_dir: &Utf8Path, pattern: &str) -> io::Result<Vec<Utf8PathBuf>> {
    // An empty directory would turn the pattern into `/{pattern}`.
    if dist_dir.as_str().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "archive directory is empty",
        ));
    }
    let full_pattern = format!("{}/{pattern}", glob::Pattern::escape(dist_dir.as_str()));
    trace!("scan_archives: matching {full_pattern}");

    let entries = glob::glob(&full_pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let mut archives = Vec::new();
    for entry in entries {
        let path = entry.map_err(glob::GlobError::into_error)?;
        if !path.is_file() {
            trace!("scan_archives: skipping non-file {}", path.display());
            continue;
        }
        let utf8 = Utf8PathBuf::from_path_buf(path).map_err(|p| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("archive path is not valid UTF-8: {}", p.display()),
            )
        })?;
        archives.push(utf8);
    }

    archives.sort();
    debug!("found {} archive(s) in {dist_dir}", archives.len());
    Ok(archives)
}
