//! Archive extraction module
//!
//! Bundles arrive as gzip-compressed tar archives whose entries are rooted at
//! `<pid>/...`.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Failure to unpack a bundle archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Reading the archive or writing an entry failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An entry would land outside the destination.
    #[error("Invalid path in archive: {0}")]
    InvalidPath(PathBuf),
}

/// Extract a tar.gz archive into `dest_dir`, returning the relative paths written.
///
/// # Errors
///
/// [`ExtractError::InvalidPath`] for entries escaping `dest_dir`, otherwise IO failures.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = flate2::read::GzDecoder::new(reader);

    extract_tar(gz_decoder, dest_dir)
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    let mut extracted = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative_path: PathBuf = entry.path()?.components().collect();

        // Reject anything that could escape the bundle root
        if relative_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ExtractError::InvalidPath(relative_path));
        }

        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractError::InvalidPath(relative_path));
        }

        if !entry.header().entry_type().is_dir() {
            extracted.push(relative_path);
        }
    }

    tracing::debug!(
        "Extracted {} files into {}",
        extracted.len(),
        dest_dir.display()
    );
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_extracts_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.tar.gz");
        fs::write(
            &archive,
            build_archive(&[
                ("blog/manifest.json", br#"{"pid":"blog","version":"1.0"}"#),
                ("blog/www/index.html", b"<html></html>"),
            ]),
        )
        .unwrap();

        let dest = dir.path().join("apps");
        let files = extract_tar_gz(&archive, &dest).unwrap();

        assert_eq!(files.len(), 2);
        assert!(dest.join("blog/manifest.json").exists());
        assert!(dest.join("blog/www/index.html").exists());
    }

    #[test]
    fn test_rejects_parent_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.tar.gz");

        // tar::Builder refuses `..` in paths, so write the name into the header directly
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        let name = b"../escape.txt";
        header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name);
        header.set_size(2);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, &b"hi"[..]).unwrap();
        fs::write(&archive, builder.into_inner().unwrap().finish().unwrap()).unwrap();

        let dest = dir.path().join("apps");
        let err = extract_tar_gz(&archive, &dest).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidPath(_)));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bad.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();
        assert!(extract_tar_gz(&archive, &dir.path().join("apps")).is_err());
    }
}
