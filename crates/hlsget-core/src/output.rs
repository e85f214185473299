//! Output path resolution
//!
//! Turns the user-supplied path (file, directory, or nothing) into a
//! concrete writable output file before any network work starts.

use crate::error::HlsgetError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolve the output argument to a concrete file path.
///
/// No path means the current directory; a directory means a default
/// `<unix-ts>.ts` filename inside it; a missing extension gets `.ts`
/// appended. Parent directories are created, collisions are avoided
/// with a timestamp suffix, and write permission is probed up front.
pub fn resolve_output_path(output: Option<&Path>) -> Result<PathBuf, HlsgetError> {
    let default_name = format!("{}.ts", Utc::now().timestamp());

    let (dir, filename) = match output {
        None => (std::env::current_dir()?, default_name),
        Some(p) if p.as_os_str().is_empty() => (std::env::current_dir()?, default_name),
        Some(p) if p.is_dir() => (p.to_path_buf(), default_name),
        Some(p) => {
            let dir = match p.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => std::env::current_dir()?,
            };
            let name = p
                .file_name()
                .ok_or_else(|| {
                    HlsgetError::InvalidOutput(format!("{} has no filename", p.display()))
                })?
                .to_string_lossy()
                .into_owned();
            (dir, name)
        }
    };

    let filename = if Path::new(&filename).extension().is_some() {
        filename
    } else {
        format!("{filename}.ts")
    };

    std::fs::create_dir_all(&dir)?;

    let resolved = avoid_collision(&dir, &filename);
    probe_writable(&resolved)?;
    Ok(resolved)
}

/// Pick a non-existing path, suffixing the stem with the current Unix
/// timestamp (and a counter if that second is already taken).
fn avoid_collision(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let ext = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let ts = Utc::now().timestamp();
    let mut n = 0u32;
    loop {
        let alt = if n == 0 {
            format!("{stem}-{ts}{ext}")
        } else {
            format!("{stem}-{ts}-{n}{ext}")
        };
        let candidate = dir.join(&alt);
        if !candidate.exists() {
            info!("Output file exists, saving as {} instead", alt);
            return candidate;
        }
        n += 1;
    }
}

/// Verify the output location is writable by creating and removing a
/// placeholder file.
fn probe_writable(path: &Path) -> Result<(), HlsgetError> {
    std::fs::File::create(path)
        .map_err(|e| HlsgetError::InvalidOutput(format!("{}: {e}", path.display())))?;
    std::fs::remove_file(path)?;
    Ok(())
}
