//! PDF access.

use crate::error::{IngestError, IngestResult};
use lopdf::{Dictionary, Object};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Document-level metadata from the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// An opened PDF.
pub trait PdfDocument: Send + Sync {
    /// Path of the file on disk, used to render pages for OCR.
    fn path(&self) -> &Path;

    /// 1-based page numbers in ascending order.
    fn page_numbers(&self) -> Vec<u32>;

    /// Native text layer of one page.
    fn page_text(&self, page: u32) -> IngestResult<String>;

    fn info(&self) -> DocumentInfo;
}

/// Opens files into [`PdfDocument`]s.
pub trait DocumentLoader: Send + Sync {
    fn open(&self, path: &Path) -> IngestResult<Box<dyn PdfDocument>>;
}

/// Loader backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfLoader;

impl DocumentLoader for LopdfLoader {
    fn open(&self, path: &Path) -> IngestResult<Box<dyn PdfDocument>> {
        Ok(Box::new(LopdfDocument::open(path)?))
    }
}

pub struct LopdfDocument {
    path: PathBuf,
    doc: lopdf::Document,
}

impl LopdfDocument {
    pub fn open(path: &Path) -> IngestResult<Self> {
        if !path.exists() {
            return Err(IngestError::Extraction {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }

        debug!("Opening PDF: {:?}", path);
        let doc = lopdf::Document::load(path).map_err(|e| IngestError::Extraction {
            path: path.to_path_buf(),
            message: format!("Failed to load PDF: {}", e),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    fn info_dictionary(&self) -> Option<&Dictionary> {
        match self.doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

impl PdfDocument for LopdfDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_numbers(&self) -> Vec<u32> {
        // BTreeMap keys, already sorted
        self.doc.get_pages().keys().copied().collect()
    }

    fn page_text(&self, page: u32) -> IngestResult<String> {
        self.doc.extract_text(&[page]).map_err(|e| IngestError::Extraction {
            path: self.path.clone(),
            message: format!("page {}: {}", page, e),
        })
    }

    fn info(&self) -> DocumentInfo {
        let Some(dict) = self.info_dictionary() else {
            return DocumentInfo::default();
        };

        let field = |key: &[u8]| -> Option<String> {
            match dict.get(key).ok()? {
                Object::String(bytes, _) => {
                    let value = decode_pdf_string(bytes);
                    let value = value.trim();
                    (!value.is_empty()).then(|| value.to_string())
                }
                _ => None,
            }
        };

        DocumentInfo {
            title: field(b"Title"),
            author: field(b"Author"),
        }
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM, else PDFDocEncoding.
///
/// PDFDocEncoding is treated as Latin-1, which matches it on every printable
/// character authors put in Info dictionaries.
pub(crate) fn decode_pdf_string(bytes: &[u8]) -> String {
    let text = if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| b as char).collect()
    };

    text.trim_end_matches('\0').to_string()
}
