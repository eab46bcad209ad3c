//! Component archives
//!
//! A component archive is a `name-version.tgz` holding the component
//! sources under a `name-version/` prefix, with the descriptor rendered
//! from the metadata at the time of packaging.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, Header};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};
use crate::metadata::{ComponentMetadata, DESCRIPTOR_FILE};

/// Directory names never packaged
const IGNORED_DIRS: &[&str] = &[".git", ".svn", "target", "node_modules"];

/// `name-version.tgz`
#[must_use]
pub fn archive_name(name: &str, version: &str) -> String {
    format!("{}-{}.tgz", name, version)
}

/// Build a component archive from the source tree at `root`
///
/// The descriptor is always taken from `metadata`, never from the file on
/// disk. Entries are sorted and carry a zero mtime so identical inputs
/// produce identical archives.
pub fn create_archive(root: &Path, metadata: &ComponentMetadata, output: &Path) -> Result<PathBuf> {
    let prefix = format!("{}-{}", metadata.name, metadata.version.release);
    let descriptor = metadata.to_yaml()?;

    let file = File::create(output)?;
    let output_abs = output.canonicalize().ok();
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    add_bytes_to_archive(
        &mut builder,
        &format!("{}/{}", prefix, DESCRIPTOR_FILE),
        descriptor.as_bytes(),
    )?;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.depth() > 0
                && e.file_type().is_dir()
                && IGNORED_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
        });

    for entry in walker {
        let entry = entry.map_err(|e| CoreError::Archive {
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tgz") {
            continue;
        }
        if output_abs.is_some() && path.canonicalize().ok() == output_abs {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        let rel = rel.to_string_lossy().replace('\\', "/");
        if rel == DESCRIPTOR_FILE {
            continue;
        }
        let content = std::fs::read(path)?;
        add_bytes_to_archive(&mut builder, &format!("{}/{}", prefix, rel), &content)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    tracing::debug!(archive = %output.display(), "created component archive");
    Ok(output.to_path_buf())
}

/// Read a file from an archive
///
/// `file_path` is matched against the full entry path and, failing that,
/// against the path below the top-level directory.
pub fn read_file_from_archive(archive_path: &Path, file_path: &str) -> Result<Vec<u8>> {
    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().to_string();
        let below_prefix = path.split_once('/').map(|(_, rest)| rest);

        if path == file_path || below_prefix == Some(file_path) {
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            return Ok(content);
        }
    }

    Err(CoreError::Archive {
        message: format!("File not found in archive: {}", file_path),
    })
}

/// Read the component descriptor packaged in an archive
pub fn read_metadata_from_archive(archive_path: &Path) -> Result<ComponentMetadata> {
    let content = read_file_from_archive(archive_path, DESCRIPTOR_FILE)?;
    let text = String::from_utf8(content).map_err(|e| CoreError::Archive {
        message: format!("Invalid UTF-8 in {}: {}", DESCRIPTOR_FILE, e),
    })?;
    ComponentMetadata::from_yaml(&text)
}

/// Hex SHA-256 of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();

    builder.append_data(&mut header, archive_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tests::SAMPLE;
    use tempfile::TempDir;

    fn entry_paths(archive_path: &Path) -> Vec<String> {
        let mut archive = Archive::new(GzDecoder::new(File::open(archive_path).unwrap()));
        archive
            .entries()
            .unwrap()
            .map(|entry| entry.unwrap())
            .filter(|entry| !entry.header().entry_type().is_dir())
            .map(|entry| entry.path().unwrap().to_string_lossy().to_string())
            .collect()
    }

    fn create_component(dir: &Path) -> ComponentMetadata {
        std::fs::write(dir.join(DESCRIPTOR_FILE), SAMPLE).unwrap();
        std::fs::create_dir_all(dir.join("lib/Util")).unwrap();
        std::fs::write(dir.join("lib/Util/Util.php"), "<?php\n").unwrap();
        std::fs::create_dir_all(dir.join(".git")).unwrap();
        std::fs::write(dir.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        ComponentMetadata::from_yaml(SAMPLE).unwrap()
    }

    #[test]
    fn test_create_and_list() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("Util");
        std::fs::create_dir_all(&src).unwrap();
        let metadata = create_component(&src);

        let output = temp.path().join(archive_name("Util", "2.1.0"));
        create_archive(&src, &metadata, &output).unwrap();

        let paths = entry_paths(&output);
        assert_eq!(paths[0], "Util-2.1.0/component.yaml");
        assert!(paths.contains(&"Util-2.1.0/lib/Util/Util.php".to_string()));
        assert!(!paths.iter().any(|p| p.contains(".git")));
        assert_eq!(
            paths.iter().filter(|p| p.ends_with(DESCRIPTOR_FILE)).count(),
            1
        );
    }

    #[test]
    fn test_descriptor_comes_from_metadata() {
        let temp = TempDir::new().unwrap();
        let mut metadata = create_component(temp.path());
        metadata.version.release = "2.2.0".to_string();

        let output = temp.path().join("out.tgz");
        create_archive(temp.path(), &metadata, &output).unwrap();

        let packaged = read_metadata_from_archive(&output).unwrap();
        assert_eq!(packaged.version.release, "2.2.0");
        assert_eq!(packaged.name, "Util");
    }

    #[test]
    fn test_archives_are_reproducible() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let metadata = create_component(&src);

        let a = temp.path().join("a.tgz");
        let b = temp.path().join("b.tgz");
        create_archive(&src, &metadata, &a).unwrap();
        create_archive(&src, &metadata, &b).unwrap();
        assert_eq!(sha256_file(&a).unwrap(), sha256_file(&b).unwrap());
    }

    #[test]
    fn test_read_file_and_missing_file() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let metadata = create_component(&src);
        let output = temp.path().join("c.tgz");
        create_archive(&src, &metadata, &output).unwrap();

        assert_eq!(
            read_file_from_archive(&output, "lib/Util/Util.php").unwrap(),
            b"<?php\n"
        );
        assert_eq!(
            read_file_from_archive(&output, "Util-2.1.0/lib/Util/Util.php").unwrap(),
            b"<?php\n"
        );

        let err = read_file_from_archive(&output, "README").unwrap_err();
        assert!(matches!(err, CoreError::Archive { .. }));
    }
}
