//! PDF page rasterization using poppler's `pdftoppm`.

use crate::error::{ProcessError, ProcessResult};
use crate::require_tool;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Render one page (1-based) of a PDF to a PNG inside `out_dir`.
///
/// Returns the path of the written image.
pub fn render_page(pdf_path: &Path, page: u32, dpi: u32, out_dir: &Path) -> ProcessResult<PathBuf> {
    if !pdf_path.exists() {
        return Err(ProcessError::FileNotFound(pdf_path.to_path_buf()));
    }
    if page == 0 {
        return Err(ProcessError::InvalidPage(page));
    }

    require_tool("pdftoppm")?;

    let prefix = out_dir.join(format!("page-{}", page));
    debug!("Rendering page {} of {:?} at {} dpi", page, pdf_path, dpi);

    let output = Command::new("pdftoppm")
        .args(["-f", &page.to_string()])
        .args(["-l", &page.to_string()])
        .args(["-r", &dpi.to_string()])
        .arg("-png")
        .arg("-singlefile") // Exact output name, no page-number suffix
        .arg(pdf_path)
        .arg(&prefix)
        .output()?;

    if !output.status.success() {
        return Err(ProcessError::RenderError(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let image = prefix.with_extension("png");
    if !image.exists() {
        return Err(ProcessError::RenderError(format!(
            "pdftoppm produced no image for page {}",
            page
        )));
    }

    Ok(image)
}
