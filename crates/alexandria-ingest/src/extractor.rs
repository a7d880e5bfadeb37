//! Page-wise text extraction with OCR escalation.

use crate::error::{IngestError, IngestResult};
use crate::pdf::PdfDocument;
use alexandria_config::ExtractionConfig;
use alexandria_core::sanitize_for_store;
use alexandria_process::{ocr_pdf_page, ProcessResult};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Recognizes the text of one rendered PDF page.
pub trait PageOcr: Send + Sync {
    fn recognize(&self, pdf_path: &Path, page: u32) -> ProcessResult<String>;
}

/// OCR through `pdftoppm` + `tesseract`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    dpi: u32,
    language: String,
}

impl TesseractOcr {
    pub fn new(dpi: u32, language: impl Into<String>) -> Self {
        Self {
            dpi,
            language: language.into(),
        }
    }
}

impl PageOcr for TesseractOcr {
    fn recognize(&self, pdf_path: &Path, page: u32) -> ProcessResult<String> {
        ocr_pdf_page(pdf_path, page, self.dpi, &self.language)
    }
}

/// Text recovered from a document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    /// Page number (1-based) to sanitized page text.
    pub pages: BTreeMap<u32, String>,
    /// All pages joined with blank lines.
    pub full_text: String,
    /// Pages whose native layer was too sparse and went to OCR.
    pub ocr_pages: usize,
}

pub struct TextExtractor {
    min_chars_per_page: usize,
    ocr: Box<dyn PageOcr>,
}

impl TextExtractor {
    pub fn new(min_chars_per_page: usize, ocr: Box<dyn PageOcr>) -> Self {
        Self { min_chars_per_page, ocr }
    }

    /// Extractor using Tesseract with the configured resolution and language.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            config.min_chars_per_page,
            Box::new(TesseractOcr::new(config.ocr_dpi, &config.ocr_language)),
        )
    }

    pub fn extract(&self, doc: &dyn PdfDocument) -> IngestResult<ExtractedText> {
        let page_numbers = doc.page_numbers();
        let total = page_numbers.len();

        let mut extracted = ExtractedText::default();
        let mut joined = Vec::with_capacity(total);
        let mut recovered_any = false;

        for (index, &page) in page_numbers.iter().enumerate() {
            if (index + 1) % 50 == 0 || index + 1 == total {
                info!("Extracting page {}/{}", index + 1, total);
            }

            let native = doc.page_text(page).unwrap_or_else(|e| {
                debug!("No native text on page {}: {}", page, e);
                String::new()
            });

            let (recovered, text) = if native.trim().chars().count() < self.min_chars_per_page {
                extracted.ocr_pages += 1;
                match self.ocr.recognize(doc.path(), page) {
                    Ok(ocr_text) => (ocr_text.clone(), ocr_text),
                    Err(e) => {
                        warn!("OCR failed for page {}: {}", page, e);
                        let marked = format!("{}\n[OCR unavailable: {}]", native, e);
                        (native, marked)
                    }
                }
            } else {
                (native.clone(), native)
            };

            if !sanitize_for_store(&recovered).trim().is_empty() {
                recovered_any = true;
            }

            let text = sanitize_for_store(&text);
            joined.push(text.clone());
            extracted.pages.insert(page, text);
        }

        if !recovered_any {
            return Err(IngestError::Extraction {
                path: doc.path().to_path_buf(),
                message: "no text extracted (empty PDF or OCR failed)".to_string(),
            });
        }

        extracted.full_text = joined.join("\n\n");
        Ok(extracted)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::pdf::DocumentInfo;
    use alexandria_process::ProcessError;
    use std::path::PathBuf;

    /// In-memory PDF with fixed page texts.
    pub struct FakePdf {
        pub path: PathBuf,
        pub pages: Vec<String>,
        pub info: DocumentInfo,
    }

    impl FakePdf {
        pub fn new(pages: &[&str]) -> Self {
            Self {
                path: PathBuf::from("fake.pdf"),
                pages: pages.iter().map(|p| p.to_string()).collect(),
                info: DocumentInfo::default(),
            }
        }
    }

    impl PdfDocument for FakePdf {
        fn path(&self) -> &Path {
            &self.path
        }

        fn page_numbers(&self) -> Vec<u32> {
            (1..=self.pages.len() as u32).collect()
        }

        fn page_text(&self, page: u32) -> IngestResult<String> {
            Ok(self.pages[(page - 1) as usize].clone())
        }

        fn info(&self) -> DocumentInfo {
            self.info.clone()
        }
    }

    /// OCR that always returns the same text.
    pub struct FixedOcr(pub String);

    impl PageOcr for FixedOcr {
        fn recognize(&self, _pdf_path: &Path, page: u32) -> ProcessResult<String> {
            Ok(format!("{} (page {})", self.0, page))
        }
    }

    /// OCR whose tools are missing.
    pub struct MissingOcr;

    impl PageOcr for MissingOcr {
        fn recognize(&self, _pdf_path: &Path, _page: u32) -> ProcessResult<String> {
            Err(ProcessError::ToolNotFound {
                tool: "tesseract".to_string(),
            })
        }
    }
}
