//! Article data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A crawled Wikipedia article, one JSONL record per article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Canonical absolute URL of the article
    pub url: String,
    /// Article title
    pub title: String,
    /// Lead text before the first section, may span several lines
    pub summary: String,
    /// Ordered top-level sections
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A top-level (`==name==`) section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub subsections: Vec<Subsection>,
}

/// A second-level (`--name--`) subsection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    pub name: String,
    pub text: String,
}

impl Article {
    /// Concatenated section and subsection text, in document order.
    /// Each section contributes its name, its own text, and its
    /// subsections' names and texts.
    pub fn section_text(&self) -> String {
        let mut out = String::new();
        for sec in &self.sections {
            out.push_str(&sec.name);
            out.push('\n');
            out.push_str(&sec.text);
            out.push('\n');
            let subs: Vec<String> = sec
                .subsections
                .iter()
                .map(|sub| format!("{}\n{}\n", sub.name, sub.text))
                .collect();
            out.push_str(&subs.join("\n"));
            out.push_str("\n\n");
        }
        out
    }

    /// The `all` field indexed by default: title, summary and every
    /// section in one string.
    pub fn all_text(&self) -> String {
        format!("{}\n\n{}\n\n{}", self.title, self.summary, self.section_text())
    }

    /// The `section-name` field: every section and subsection name,
    /// newline-joined, each section's name preceding its subsections'.
    pub fn section_names(&self) -> String {
        let mut names = Vec::new();
        for sec in &self.sections {
            names.push(sec.name.as_str());
            names.extend(sec.subsections.iter().map(|sub| sub.name.as_str()));
        }
        names.join("\n")
    }
}

/// Statistics about one crawl run
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    /// Article records captured and written to shards
    pub records_captured: u64,
    /// Pages fetched with a usable body
    pub pages_fetched: u64,
    /// Fetches that failed or returned non-200
    pub pages_failed: u64,
    /// URLs dequeued and marked visited
    pub urls_visited: u64,
    /// Shard files written
    pub files_written: u64,
    /// Crawl start time
    pub started_at: DateTime<Utc>,
    /// Crawl end time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            records_captured: 0,
            pages_fetched: 0,
            pages_failed: 0,
            urls_visited: 0,
            files_written: 0,
            started_at: Utc::now(),
            completed_at: None,
            duration_secs: None,
        }
    }

    pub fn finish(&mut self) {
        let now = Utc::now();
        self.duration_secs = Some((now - self.started_at).num_milliseconds() as f64 / 1000.0);
        self.completed_at = Some(now);
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Article {
        Article {
            url: "https://es.wikipedia.org/wiki/Prueba".to_string(),
            title: "Prueba".to_string(),
            summary: "Una entrada de ejemplo.".to_string(),
            sections: vec![Section {
                name: "Historia".to_string(),
                text: "Texto de historia.".to_string(),
                subsections: vec![Subsection {
                    name: "Siglo XX".to_string(),
                    text: "Texto del siglo.".to_string(),
                }],
            }],
        }
    }

    #[test]
    fn all_text_concatenates_title_summary_and_sections() {
        let all = sample().all_text();
        assert!(all.starts_with("Prueba\n\nUna entrada de ejemplo.\n\n"));
        assert!(all.contains("Historia\nTexto de historia.\n"));
        assert!(all.contains("Siglo XX\nTexto del siglo.\n"));
    }

    #[test]
    fn section_names_keeps_document_order() {
        assert_eq!(sample().section_names(), "Historia\nSiglo XX");
    }

    #[test]
    fn jsonl_roundtrip() {
        let article = sample();
        let line = serde_json::to_string(&article).unwrap();
        let back: Article = serde_json::from_str(&line).unwrap();
        assert_eq!(article, back);
    }
}
