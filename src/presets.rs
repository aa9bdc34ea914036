use include_dir::{include_dir, Dir};
use std::path::Path;

use tracing::info;

use crate::error::ConfigError;
use crate::tune::TuneBook;

static PRESET_DIR: Dir = include_dir!("assets/tunes");

pub const DEFAULT_PRESET: &str = "classic";

/// Names of the tune presets bundled into the binary, sorted.
pub fn preset_names() -> Vec<String> {
    let mut names: Vec<String> = PRESET_DIR
        .files()
        .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
        .filter_map(|f| f.path().file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Loads a bundled preset by name (without the `.json` extension).
pub fn load_preset(name: &str) -> Result<TuneBook, ConfigError> {
    let file = PRESET_DIR
        .get_file(format!("{name}.json"))
        .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?;
    let (book, rejected) = TuneBook::from_json(file.contents())?;
    info!(
        preset = name,
        tunes = book.len(),
        rejected = rejected.len(),
        "loaded tune preset"
    );
    Ok(book)
}

/// Loads tune records from a JSON file on disk.
pub fn load_file(path: &Path) -> Result<TuneBook, ConfigError> {
    let bytes = std::fs::read(path)?;
    let (book, rejected) = TuneBook::from_json(&bytes)?;
    info!(
        path = %path.display(),
        tunes = book.len(),
        rejected = rejected.len(),
        "loaded tune file"
    );
    Ok(book)
}
