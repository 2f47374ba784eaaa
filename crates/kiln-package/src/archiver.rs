//! Single-binary release archives.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use kiln_core::{ArchiveFormat, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const EXECUTABLE_MODE: u32 = 0o755;

/// An entry read back from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub mode: Option<u32>,
}

/// Write `binary` as the only entry of a new archive at `dest`, stored at the
/// archive root as `entry_name`.
pub fn create_archive(
    binary: &Path,
    entry_name: &str,
    dest: &Path,
    format: ArchiveFormat,
) -> Result<()> {
    if entry_name.contains('/') || entry_name.contains('\\') {
        return Err(kiln_core::Error::Internal(format!(
            "Archive entry must sit at the archive root: {}",
            entry_name
        )));
    }
    let writer = BufWriter::new(File::create(dest)?);
    match format {
        ArchiveFormat::TarGz => write_tar_gz(binary, entry_name, writer),
        ArchiveFormat::Zip => write_zip(binary, entry_name, writer),
    }
}

fn write_tar_gz<W: Write>(binary: &Path, entry_name: &str, writer: W) -> Result<()> {
    let metadata = std::fs::metadata(binary)?;
    let encoder = GzEncoder::new(writer, Compression::best());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_metadata(&metadata);
    header.set_mode(EXECUTABLE_MODE);

    let file = File::open(binary)?;
    builder
        .append_data(&mut header, entry_name, file)
        .map_err(|e| kiln_core::Error::Internal(format!("Failed to pack file: {}", e)))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| kiln_core::Error::Internal(format!("Failed to finish tar: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| kiln_core::Error::Internal(format!("Gzip finish failed: {}", e)))?
        .flush()?;
    Ok(())
}

fn write_zip<W: Write + std::io::Seek>(binary: &Path, entry_name: &str, writer: W) -> Result<()> {
    let mut zip = zip::ZipWriter::new(writer);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(EXECUTABLE_MODE);

    zip.start_file(entry_name, options)
        .map_err(|e| kiln_core::Error::Internal(format!("Failed to start zip entry: {}", e)))?;
    let mut file = File::open(binary)?;
    std::io::copy(&mut file, &mut zip)?;
    zip.finish()
        .map_err(|e| kiln_core::Error::Internal(format!("Failed to finish zip: {}", e)))?
        .flush()?;
    Ok(())
}

/// List the entries of an archive.
pub fn list_entries(path: &Path, format: ArchiveFormat) -> Result<Vec<ArchiveEntry>> {
    let file = File::open(path)?;
    match format {
        ArchiveFormat::TarGz => {
            let mut archive = tar::Archive::new(GzDecoder::new(file));
            let mut entries = Vec::new();
            for entry in archive.entries()? {
                let entry = entry?;
                let header = entry.header();
                entries.push(ArchiveEntry {
                    name: entry.path()?.to_string_lossy().into_owned(),
                    size: header.size()?,
                    mode: header.mode().ok(),
                });
            }
            Ok(entries)
        }
        ArchiveFormat::Zip => {
            let mut archive = zip::ZipArchive::new(file)
                .map_err(|e| kiln_core::Error::Internal(format!("Failed to read zip: {}", e)))?;
            let mut entries = Vec::with_capacity(archive.len());
            for i in 0..archive.len() {
                let entry = archive.by_index(i).map_err(|e| {
                    kiln_core::Error::Internal(format!("Failed to read zip entry: {}", e))
                })?;
                entries.push(ArchiveEntry {
                    name: entry.name().to_string(),
                    size: entry.size(),
                    mode: entry.unix_mode(),
                });
            }
            Ok(entries)
        }
    }
}
