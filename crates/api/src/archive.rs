//! Directory archiving for theme downloads.

use std::io;
use std::path::Path;

use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Packages `source` (recursively) into a zip archive at `dest` and returns
/// the archive's size in bytes. Entry names are relative to `source`, with
/// forward slashes.
pub fn zip_directory(source: &Path, dest: &Path) -> io::Result<u64> {
    let file = std::fs::File::create(dest)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options)
                .map_err(io::Error::other)?;
        } else {
            zip.start_file(name, options).map_err(io::Error::other)?;
            let mut reader = std::fs::File::open(entry.path())?;
            io::copy(&mut reader, &mut zip)?;
        }
    }

    let file = zip.finish().map_err(io::Error::other)?;
    Ok(file.metadata()?.len())
}
