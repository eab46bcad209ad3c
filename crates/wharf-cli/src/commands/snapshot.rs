//! Snapshot command - package the working tree as a development archive

use chrono::NaiveDateTime;
use std::path::Path;

use wharf_core::archive::{archive_name, create_archive, sha256_file};
use wharf_core::version::{self, ParsedVersion};
use wharf_core::{Descriptor, MetadataStore, Stability};

use crate::display::{self, format_size};
use crate::error::Result;

/// `<base>dev<YYYYMMDDHHMM>` for the release at `now`
pub fn snapshot_version(release: &str, now: NaiveDateTime) -> Result<String> {
    let base = ParsedVersion::parse(&version::validate(release)?)?.base();
    Ok(format!("{}dev{}", base, now.format("%Y%m%d%H%M")))
}

pub fn run(path: &Path, output_dir: Option<&Path>, pretend: bool) -> Result<()> {
    let descriptor = Descriptor::load(path)?;
    let mut metadata = descriptor.metadata().clone();
    metadata.version.release =
        snapshot_version(&metadata.version.release, chrono::Local::now().naive_local())?;
    metadata.stability.release = Stability::Devel;

    let dir = output_dir.unwrap_or_else(|| descriptor.root());
    let output = dir.join(archive_name(&metadata.name, &metadata.version.release));

    if pretend {
        println!("Would create snapshot {}", output.display());
        return Ok(());
    }

    std::fs::create_dir_all(dir)?;
    let created = create_archive(descriptor.root(), &metadata, &output)?;
    let size = std::fs::metadata(&created)?.len();
    let digest = sha256_file(&created)?;

    display::success(&format!("Created snapshot {}", created.display()));
    println!("  Size    {}", format_size(size));
    println!("  Digest  sha256:{}", digest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_snapshot_version() {
        let now = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(13, 7, 0)
            .unwrap();
        assert_eq!(snapshot_version("2.1.0", now).unwrap(), "2.1.0dev202405011307");
        assert_eq!(snapshot_version("2.1.0RC2", now).unwrap(), "2.1.0dev202405011307");
        assert_eq!(snapshot_version("2.1", now).unwrap(), "2.1.0dev202405011307");
        assert!(snapshot_version("two", now).is_err());
    }
}
