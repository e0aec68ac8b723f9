//! Small filesystem helpers shared by the content providers and the sink.

use crate::error::Result;
use camino::Utf8Path;
use std::io::Read;
use xxhash_rust::xxh3::{xxh3_64, Xxh3};

/// Compute an xxHash3 fingerprint of a file's bytes.
///
/// Used to detect whether an overlay archive changed since it was last unpacked.
pub fn file_fingerprint(path: &Utf8Path) -> Result<u64> {
    let mut file = std::fs::File::open(path.as_std_path())?;
    let mut hasher = Xxh3::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hasher.digest())
}

/// Turn an overlay id into a single directory name.
///
/// `org.sample:shell:api` becomes `org.sample_shell_api`.
pub fn sanitize_dir_name(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Unpack directory name for an overlay id.
///
/// The sanitized id keeps the name readable; the hash of the raw id keeps
/// ids that sanitize alike (`g:a:b`, `g:a_b`) apart.
pub fn overlay_dir_name(id: &str) -> String {
    format!("{}-{:016x}", sanitize_dir_name(id), xxh3_64(id.as_bytes()))
}

/// Whether `dest` is missing or older than `source`.
pub fn is_stale(source: &Utf8Path, dest: &Utf8Path) -> Result<bool> {
    let Ok(dest_meta) = std::fs::metadata(dest.as_std_path()) else {
        return Ok(true);
    };
    let source_modified = std::fs::metadata(source.as_std_path())?.modified()?;
    Ok(dest_meta.modified()? < source_modified)
}

/// Remove `path` and then every parent directory below `root` left empty.
pub fn remove_file_and_empty_parents(root: &Utf8Path, path: &Utf8Path) -> Result<()> {
    match std::fs::remove_file(path.as_std_path()) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    }

    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) {
            break;
        }
        // Fails when the directory still has entries.
        if std::fs::remove_dir(current.as_std_path()).is_err() {
            break;
        }
        dir = current.parent();
    }
    Ok(())
}
