//! Release archive extraction
//!
//! Archives are expected to wrap their contents in a single top-level
//! directory (`tool-1.4.2/bin/tool`). That first segment is dropped, the rest
//! is written below the version directory, and every owner-executable file
//! gets one symlink per owned suffix under the link root.

use crate::error::{InstallError, Result};
use flate2::read::GzDecoder;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tar::Archive;

const OWNER_EXECUTE: u32 = 0o100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    Zip,
}

impl ArchiveFormat {
    /// Pick a decoder from the asset name. Anything unrecognised is treated
    /// as a gzipped tarball.
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            ArchiveFormat::TarXz
        } else if name.ends_with(".zip") {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::TarGz
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub links: usize,
    pub executables: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    pub dest_dir: PathBuf,
    pub link_root: PathBuf,
    pub suffixes: Vec<String>,
}

/// Drop the archive's top-level directory from an entry path.
///
/// Returns `Ok(None)` for entries that would escape the destination.
fn strip_top_level(name: &Path) -> Result<Option<PathBuf>> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in name.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => parts.push(component.as_os_str()),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return Ok(None),
        }
    }

    if parts.len() < 2 {
        return Err(InstallError::MalformedEntry(name.display().to_string()));
    }

    Ok(Some(parts[1..].iter().collect()))
}

fn zip_error(path: &Path) -> impl FnOnce(zip::result::ZipError) -> InstallError + '_ {
    move |e| InstallError::Archive {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    }
}

impl Extractor {
    pub fn extract(&self, archive_path: &Path, format: ArchiveFormat) -> Result<ExtractSummary> {
        tracing::info!(
            "Extracting {} into {}",
            archive_path.display(),
            self.dest_dir.display()
        );

        fs::create_dir_all(&self.dest_dir).map_err(InstallError::io(&self.dest_dir))?;
        // Links must point at absolute paths regardless of how the store was given.
        let dest_dir = fs::canonicalize(&self.dest_dir).map_err(InstallError::io(&self.dest_dir))?;

        let file = fs::File::open(archive_path).map_err(InstallError::io(archive_path))?;
        let summary = match format {
            ArchiveFormat::TarGz => self.extract_tar(GzDecoder::new(file), archive_path, &dest_dir)?,
            ArchiveFormat::TarXz => {
                self.extract_tar(xz2::read::XzDecoder::new(file), archive_path, &dest_dir)?
            }
            ArchiveFormat::Zip => self.extract_zip(file, archive_path, &dest_dir)?,
        };

        if summary.files > 0 && summary.links == 0 {
            tracing::warn!("No executables found in {}", archive_path.display());
        }
        Ok(summary)
    }

    fn extract_tar<R: Read>(
        &self,
        reader: R,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<ExtractSummary> {
        let mut archive = Archive::new(reader);
        let mut summary = ExtractSummary::default();

        for entry in archive.entries().map_err(InstallError::archive(archive_path))? {
            let mut entry = entry.map_err(InstallError::archive(archive_path))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = entry
                .path()
                .map_err(InstallError::archive(archive_path))?
                .into_owned();
            let mode = entry
                .header()
                .mode()
                .map_err(InstallError::archive(archive_path))?;

            self.write_entry(&name, mode, &mut entry, dest_dir, &mut summary)?;
        }

        Ok(summary)
    }

    fn extract_zip(
        &self,
        file: fs::File,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<ExtractSummary> {
        let mut archive = zip::ZipArchive::new(file).map_err(zip_error(archive_path))?;
        let mut summary = ExtractSummary::default();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(zip_error(archive_path))?;
            if !entry.is_file() {
                continue;
            }

            let name = PathBuf::from(entry.name());
            let mode = entry.unix_mode().unwrap_or(0o644);

            self.write_entry(&name, mode, &mut entry, dest_dir, &mut summary)?;
        }

        Ok(summary)
    }

    fn write_entry(
        &self,
        name: &Path,
        mode: u32,
        contents: &mut dyn Read,
        dest_dir: &Path,
        summary: &mut ExtractSummary,
    ) -> Result<()> {
        let relative = match strip_top_level(name)? {
            Some(relative) => relative,
            None => {
                tracing::warn!("Skipping unsafe path in archive: {}", name.display());
                return Ok(());
            }
        };

        let mode = mode & 0o7777;
        let target = dest_dir.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(InstallError::io(parent))?;
        }

        tracing::debug!("{} -> {} ({:o})", name.display(), target.display(), mode);

        let mut file = fs::File::create(&target).map_err(InstallError::io(&target))?;
        io::copy(contents, &mut file).map_err(InstallError::io(&target))?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                .map_err(InstallError::io(&target))?;
        }

        summary.files += 1;

        if mode & OWNER_EXECUTE != 0 {
            for suffix in &self.suffixes {
                self.link(&target, &relative, suffix)?;
                summary.links += 1;
            }
            summary.executables.push(relative);
        }

        Ok(())
    }

    /// Recreate the links of an already extracted install for the current
    /// suffixes. Returns the number of links written.
    pub fn relink(&self, executables: &[PathBuf]) -> Result<usize> {
        let dest_dir = fs::canonicalize(&self.dest_dir).map_err(InstallError::io(&self.dest_dir))?;
        let mut links = 0;

        for relative in executables {
            let target = dest_dir.join(relative);
            if !target.is_file() {
                tracing::warn!("{} is gone, not linking it", target.display());
                continue;
            }
            for suffix in &self.suffixes {
                self.link(&target, relative, suffix)?;
                links += 1;
            }
        }

        Ok(links)
    }

    fn link(&self, target: &Path, relative: &Path, suffix: &str) -> Result<()> {
        let mut link: OsString = self.link_root.join(relative).into_os_string();
        link.push(suffix);
        let link = PathBuf::from(link);

        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).map_err(InstallError::io(parent))?;
        }

        if fs::symlink_metadata(&link).is_ok() {
            fs::remove_file(&link).map_err(InstallError::io(&link))?;
        }

        tracing::info!("Linking {} to {}", link.display(), target.display());

        #[cfg(unix)]
        std::os::unix::fs::symlink(target, &link).map_err(InstallError::io(&link))?;
        #[cfg(not(unix))]
        fs::copy(target, &link).map_err(InstallError::io(&link))?;

        Ok(())
    }
}
