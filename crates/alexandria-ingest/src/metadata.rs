//! Title, author and DOI heuristics.

use crate::pdf::DocumentInfo;
use alexandria_core::{sanitize_for_store, DocumentMetadata};
use regex::Regex;

const TITLE_SCAN_CHARS: usize = 3000;
const TITLE_MAX_CHARS: usize = 500;
const AUTHOR_SCAN_CHARS: usize = 4000;
const AUTHOR_SCAN_LINES: usize = 15;
const AUTHOR_LINE_MAX_CHARS: usize = 150;
const MAX_STRUCTURED_AUTHORS: usize = 50;
const MAX_HEURISTIC_AUTHORS: usize = 30;

/// Recovers bibliographic fields from a document. Never fails.
pub trait MetadataStrategy: Send + Sync {
    fn extract(&self, info: &DocumentInfo, text: &str) -> DocumentMetadata;
}

/// Heuristics for academic papers.
///
/// `journal` and `published_at` are left empty.
pub struct HeuristicMetadataExtractor {
    window: usize,
    doi: Regex,
    section_start: Regex,
    boilerplate: Regex,
    bare_number: Regex,
    author_separator: Regex,
}

impl HeuristicMetadataExtractor {
    /// `window` is how many leading characters of the text are examined.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            doi: Regex::new(r"10\.\d{4,}/\S+").expect("valid DOI regex"),
            section_start: Regex::new(r"(?i)^(?:abstract|introduction|keywords|1\.\s|I\.\s)")
                .expect("valid section regex"),
            boilerplate: Regex::new(r"(?i)^(?:(?:doi|copyright|published|received|accepted)\b|https?://|©)")
                .expect("valid boilerplate regex"),
            bare_number: Regex::new(r"^\d+\.?\s*$").expect("valid number regex"),
            author_separator: Regex::new(r",\s*and\s+|\s+and\s+|&|,").expect("valid separator regex"),
        }
    }

    fn title(&self, info: &DocumentInfo, text: &str) -> Option<String> {
        if let Some(title) = info.title.as_deref().map(clean_title).filter(|t| !t.is_empty()) {
            return Some(title);
        }

        let head: String = text.chars().take(TITLE_SCAN_CHARS).collect();
        head.split("\n\n")
            .map(str::trim)
            .find(|block| {
                let lower = block.to_lowercase();
                block.chars().count() > 10 && !lower.starts_with("abstract") && !lower.starts_with("keywords")
            })
            .map(clean_title)
            .filter(|t| !t.is_empty())
    }

    fn doi(&self, text: &str) -> Option<String> {
        self.doi
            .find(text)
            .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', ')', ']']).to_string())
            .filter(|doi| !doi.is_empty())
    }

    fn authors_from_info(&self, author: &str) -> Vec<String> {
        // "Smith, J.; Doe, A." keeps the comma inside each name
        let parts: Vec<&str> = if author.contains(';') {
            author.split(';').collect()
        } else {
            author.split(',').collect()
        };

        parts
            .into_iter()
            .map(str::trim)
            .filter(|name| (2..200).contains(&name.chars().count()))
            .map(String::from)
            .take(MAX_STRUCTURED_AUTHORS)
            .collect()
    }

    fn authors_from_text(&self, text: &str, title: Option<&str>) -> Vec<String> {
        let head: String = text.chars().take(AUTHOR_SCAN_CHARS).collect();
        let lines: Vec<&str> = head.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        let section_start = lines
            .iter()
            .position(|line| self.section_start.is_match(line))
            .unwrap_or(lines.len());

        let title_lower = title.map(str::to_lowercase);
        let candidates: Vec<&str> = lines[..section_start.min(AUTHOR_SCAN_LINES)]
            .iter()
            .copied()
            .filter(|line| line.chars().count() <= AUTHOR_LINE_MAX_CHARS)
            .filter(|line| title_lower.as_deref() != Some(line.to_lowercase().as_str()))
            .filter(|line| !self.boilerplate.is_match(line))
            .filter(|line| !self.bare_number.is_match(line))
            .collect();

        let parts: Vec<String> = match candidates.as_slice() {
            [] => return Vec::new(),
            [single] => single
                .replace(" and ", "; ")
                .split([';', ','])
                .map(|p| p.trim().to_string())
                .collect(),
            many => many
                .iter()
                .take(10)
                .flat_map(|line| self.author_separator.split(line))
                .map(|p| p.trim().trim_end_matches(['.', ',']).to_string())
                .collect(),
        };

        parts
            .into_iter()
            .filter(|name| (2..=120).contains(&name.chars().count()))
            .take(MAX_HEURISTIC_AUTHORS)
            .collect()
    }
}

impl MetadataStrategy for HeuristicMetadataExtractor {
    fn extract(&self, info: &DocumentInfo, text: &str) -> DocumentMetadata {
        let window: String = text.chars().take(self.window).collect();

        let title = self.title(info, &window);
        let doi = self.doi(&window);

        let mut authors = info
            .author
            .as_deref()
            .map(|a| self.authors_from_info(a))
            .unwrap_or_default();
        if authors.is_empty() {
            authors = self.authors_from_text(&window, title.as_deref());
        }

        DocumentMetadata {
            title,
            authors: authors.iter().map(|a| sanitize_for_store(a)).collect(),
            doi: doi.map(|d| sanitize_for_store(&d)),
            journal: None,
            published_at: None,
        }
    }
}

/// Collapse whitespace and bound the length.
fn clean_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    sanitize_for_store(&collapsed.chars().take(TITLE_MAX_CHARS).collect::<String>())
        .trim()
        .to_string()
}
