//! OCR processing using Tesseract.

use crate::error::{ProcessError, ProcessResult};
use crate::render::render_page;
use crate::require_tool;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Perform OCR on an image file, returning the recognized text trimmed.
pub fn ocr_image(image_path: &Path, language: &str) -> ProcessResult<String> {
    if !image_path.exists() {
        return Err(ProcessError::FileNotFound(image_path.to_path_buf()));
    }

    require_tool("tesseract")?;

    debug!("Running OCR on {:?} ({})", image_path, language);

    let output = Command::new("tesseract")
        .arg(image_path)
        .arg("stdout") // Output to stdout instead of file
        .args(["-l", language])
        .args(["--oem", "3"]) // LSTM + legacy engine
        .args(["--psm", "1"]) // Automatic page segmentation with OSD
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // Tesseract sometimes outputs warnings to stderr but still works
        if !output.stdout.is_empty() {
            debug!("Tesseract warning: {}", stderr);
        } else {
            return Err(ProcessError::OcrError(stderr.trim().to_string()));
        }
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Rasterize one PDF page (1-based) and run OCR on the image.
///
/// The intermediate PNG lives in a temporary directory removed on return.
pub fn ocr_pdf_page(pdf_path: &Path, page: u32, dpi: u32, language: &str) -> ProcessResult<String> {
    if !pdf_path.exists() {
        return Err(ProcessError::FileNotFound(pdf_path.to_path_buf()));
    }
    require_tool("tesseract")?;

    let workdir = tempfile::tempdir()?;
    let image = render_page(pdf_path, page, dpi, workdir.path())?;
    ocr_image(&image, language)
}
