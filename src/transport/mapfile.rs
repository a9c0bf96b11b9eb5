use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PlanError;
use crate::map::Map;
use crate::transport::wire::{decode_map, encode_map};

const MAP_EXTENSION: &str = "bin";
const PLANNED_SUFFIX: &str = ".planned.bin";

/// Write a map in wire format using atomic write.
///
/// Writes to a temporary file first, then renames over the target, so a
/// partial write never leaves a truncated map behind.
pub fn write_map(map: &Map, target: &Path) -> Result<(), PlanError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let encoded = encode_map(map)?;

    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("map");
    let tmp = target.with_file_name(format!(".{}.tmp", file_name));

    if let Err(e) = fs::write(&tmp, &encoded) {
        let _ = fs::remove_file(&tmp);
        return Err(PlanError::Io(e));
    }
    if let Err(e) = fs::rename(&tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(PlanError::Io(e));
    }
    Ok(())
}

/// Read and validate a map file.
pub fn read_map(path: &Path) -> Result<Map, PlanError> {
    let data = fs::read(path)?;
    decode_map(&data)
}

/// Where the planned version of `input` goes: `<out_dir>/<stem>.planned.bin`.
pub fn planned_path(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.strip_suffix(".bin").unwrap_or(n))
        .unwrap_or("map");
    out_dir.join(format!("{}{}", stem, PLANNED_SUFFIX))
}

/// Expand directories into the unplanned `.bin` maps they contain.
///
/// Files are kept as given. Hidden files and earlier planner output are
/// skipped. Directory entries come back sorted by path.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, PlanError> {
    let mut inputs = Vec::new();
    for path in paths {
        if !path.is_dir() {
            inputs.push(path.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry_path = entry?.path();
            if !entry_path.is_file() {
                continue;
            }
            let Some(name) = entry_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') || name.ends_with(PLANNED_SUFFIX) {
                continue;
            }
            if entry_path.extension().and_then(|e| e.to_str()) == Some(MAP_EXTENSION) {
                found.push(entry_path);
            }
        }
        found.sort();
        inputs.extend(found);
    }
    Ok(inputs)
}
