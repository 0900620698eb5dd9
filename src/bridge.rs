//! String-in, string-out entry point for UI bridges
//!
//! Mobile and desktop hosts call [`convert_file`] from a background thread and
//! treat an empty return value as success. Error kinds are flattened to text
//! here and nowhere else.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use crate::conversion::NcmFile;
use crate::settings::ConverterSettings;

/// Convert `input_path`, writing next to it when `output_dir` is empty
///
/// Returns an empty string on success, otherwise a human-readable message.
pub fn convert_file(input_path: &str, output_dir: &str) -> String {
    convert_file_with(input_path, output_dir, &ConverterSettings::load(), None)
}

/// [`convert_file`] with explicit settings and an optional cancel flag
pub fn convert_file_with(
    input_path: &str,
    output_dir: &str,
    settings: &ConverterSettings,
    cancel: Option<&AtomicBool>,
) -> String {
    if input_path.trim().is_empty() {
        return "read failed: input path is empty".to_string();
    }

    let ncm = match NcmFile::open(Path::new(input_path)) {
        Ok(ncm) => ncm,
        Err(e) => {
            log::error!("Failed to read {}: {}", input_path, e);
            return format!("read failed: {}", e);
        }
    };

    let output_dir = (!output_dir.is_empty()).then(|| Path::new(output_dir));
    match ncm.dump(output_dir, settings, cancel) {
        Ok(conversion) if conversion.warnings.is_empty() => String::new(),
        Ok(conversion) => format!(
            "converted but metadata fix failed: {}",
            conversion.warnings.join("; ")
        ),
        Err(e) => {
            log::error!("Failed to convert {}: {}", input_path, e);
            format!("conversion failed: {}", e)
        }
    }
}
