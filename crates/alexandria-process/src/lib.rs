//! Alexandria Process - Page rasterization and OCR.
//!
//! This crate provides:
//! - PDF page rendering to PNG (via poppler's `pdftoppm`)
//! - OCR for rendered pages (via Tesseract CLI)
//!
//! These rely on external tools being installed on the system.

mod error;
mod ocr;
mod render;

pub use error::{ProcessError, ProcessResult};
pub use ocr::{ocr_image, ocr_pdf_page};
pub use render::render_page;

/// Check if required external tools are available.
pub fn check_dependencies() -> Vec<(&'static str, bool)> {
    vec![
        ("pdftoppm", which::which("pdftoppm").is_ok()),
        ("tesseract", which::which("tesseract").is_ok()),
    ]
}

pub(crate) fn require_tool(tool: &str) -> ProcessResult<()> {
    if which::which(tool).is_err() {
        return Err(ProcessError::ToolNotFound { tool: tool.to_string() });
    }
    Ok(())
}
