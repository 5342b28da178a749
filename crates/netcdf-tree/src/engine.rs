//! File engines that load a tree from disk and write it back out.
//!
//! Output is always staged in a temporary file next to the destination and
//! renamed into place once fully written, so a failed write never leaves a
//! partial artifact behind.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{TreeError, TreeResult};
use crate::tree::Tree;

/// Loads and saves trees in one on-disk format.
pub trait TreeEngine {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    /// Read a whole file into memory.
    fn load(&self, path: &Path) -> TreeResult<Tree>;

    /// Write a tree as a new file at `path`.
    fn save(&self, tree: &Tree, path: &Path) -> TreeResult<()>;

    /// Copy a file byte-for-byte without parsing it.
    fn copy(&self, input: &Path, output: &Path) -> TreeResult<()> {
        write_atomically(output, |staged| {
            std::fs::copy(input, staged)?;
            Ok(())
        })
    }
}

/// Stage output in a temporary file in the destination directory, then
/// rename it over `output`. The staged file is removed if `write` fails.
pub fn write_atomically<F>(output: &Path, write: F) -> TreeResult<()>
where
    F: FnOnce(&Path) -> TreeResult<()>,
{
    let directory = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let staged = tempfile::Builder::new()
        .prefix(".annotating-")
        .tempfile_in(directory)?;

    write(staged.path())?;

    staged
        .persist(output)
        .map_err(|e| TreeError::IoError(e.error))?;

    debug!(output = %output.display(), "Persisted staged output");
    Ok(())
}

/// Engine for JSON snapshots of a tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEngine;

impl TreeEngine for JsonEngine {
    fn name(&self) -> &'static str {
        "json"
    }

    fn load(&self, path: &Path) -> TreeResult<Tree> {
        let reader = BufReader::new(File::open(path)?);
        let tree: Tree = serde_json::from_reader(reader)?;
        tree.validate()?;
        Ok(tree)
    }

    fn save(&self, tree: &Tree, path: &Path) -> TreeResult<()> {
        write_atomically(path, |staged| {
            let mut writer = BufWriter::new(File::create(staged)?);
            serde_json::to_writer_pretty(&mut writer, tree)?;
            writer.flush()?;
            Ok(())
        })
    }
}

/// Pick an engine from the file extension.
///
/// `.json` files use [`JsonEngine`]; anything else is treated as
/// NetCDF-4/HDF5 and needs the `netcdf` feature.
pub fn engine_for_path(path: &Path) -> TreeResult<Box<dyn TreeEngine>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if extension == "json" {
        return Ok(Box::new(JsonEngine));
    }

    #[cfg(feature = "netcdf")]
    {
        Ok(Box::new(crate::native::NetCdfEngine))
    }

    #[cfg(not(feature = "netcdf"))]
    {
        Err(TreeError::UnsupportedFormat(format!(
            "{} (build with the `netcdf` feature for NetCDF-4/HDF5 files)",
            path.display()
        )))
    }
}
