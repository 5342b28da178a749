//! MIME type of an output granule, from its file name.

use std::path::Path;

pub fn get_mimetype(file_path: &Path) -> &'static str {
    let extension = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "nc" | "nc4" => "application/x-netcdf",
        "h5" | "hdf5" | "he5" => "application/x-hdf5",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
