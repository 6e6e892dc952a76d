//! Flattened-text article parser
//!
//! The crawler flattens each page into marker-wrapped lines
//! (`##title##`, `==section==`, `--subsection--`, plain text). This
//! module recovers the structured record from that text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::article::{Article, Section, Subsection};

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A##(.+)##\z").unwrap());
static SECTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A==(.+)==\z").unwrap());
static SUBSECTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A--(.+)--\z").unwrap());

fn section_name(line: &str) -> Option<&str> {
    SECTION_RE.captures(line).map(|c| c.get(1).unwrap().as_str())
}

fn subsection_name(line: &str) -> Option<&str> {
    SUBSECTION_RE.captures(line).map(|c| c.get(1).unwrap().as_str())
}

/// Drop blank lines, keep the rest newline-joined.
fn clean_text(lines: &[&str]) -> String {
    lines
        .iter()
        .filter(|l| !l.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse the flattened text of one page into a structured [`Article`].
///
/// Returns `None` when the text does not begin with a `##title##` line
/// followed by at least some summary content; such pages are skipped by
/// the crawler without counting against its document limit.
pub fn parse_flattened(text: &str, url: &str) -> Option<Article> {
    let (first_line, rest) = text.split_once('\n')?;
    let title = TITLE_RE.captures(first_line)?.get(1).unwrap().as_str().to_string();
    if rest.is_empty() {
        return None;
    }

    let lines: Vec<&str> = rest.split('\n').collect();
    if section_name(lines[0]).is_some() {
        // A section header directly after the title means no summary.
        return None;
    }

    let mut idx = 0;
    let mut summary_lines = Vec::new();
    while idx < lines.len() && section_name(lines[idx]).is_none() {
        summary_lines.push(lines[idx]);
        idx += 1;
    }
    let summary = clean_text(&summary_lines);

    let mut sections = Vec::new();
    while idx < lines.len() {
        let name = section_name(lines[idx]).unwrap().to_string();
        idx += 1;

        let mut text_lines = Vec::new();
        while idx < lines.len()
            && section_name(lines[idx]).is_none()
            && subsection_name(lines[idx]).is_none()
        {
            text_lines.push(lines[idx]);
            idx += 1;
        }

        let mut subsections = Vec::new();
        while idx < lines.len() && section_name(lines[idx]).is_none() {
            let sub_name = subsection_name(lines[idx]).unwrap().to_string();
            idx += 1;
            let mut sub_lines = Vec::new();
            while idx < lines.len()
                && section_name(lines[idx]).is_none()
                && subsection_name(lines[idx]).is_none()
            {
                sub_lines.push(lines[idx]);
                idx += 1;
            }
            subsections.push(Subsection {
                name: sub_name,
                text: clean_text(&sub_lines),
            });
        }

        sections.push(Section {
            name,
            text: clean_text(&text_lines),
            subsections,
        });
    }

    Some(Article {
        url: url.to_string(),
        title,
        summary,
        sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://es.wikipedia.org/wiki/Prueba";

    #[test]
    fn parses_title_summary_sections_and_subsections() {
        let text = "##Valencia##\n\
                    Ciudad de España.\n\
                    Capital de la provincia homónima.\n\
                    ==Historia==\n\
                    Fundada por los romanos.\n\
                    --Edad Media--\n\
                    Conquistada en 1238.\n\
                    ==Geografía==\n\
                    Junto al Turia.";
        let article = parse_flattened(text, URL).unwrap();
        assert_eq!(article.title, "Valencia");
        assert_eq!(
            article.summary,
            "Ciudad de España.\nCapital de la provincia homónima."
        );
        assert_eq!(article.sections.len(), 2);
        assert_eq!(article.sections[0].name, "Historia");
        assert_eq!(article.sections[0].text, "Fundada por los romanos.");
        assert_eq!(article.sections[0].subsections.len(), 1);
        assert_eq!(article.sections[0].subsections[0].name, "Edad Media");
        assert_eq!(article.sections[0].subsections[0].text, "Conquistada en 1238.");
        assert_eq!(article.sections[1].name, "Geografía");
        assert!(article.sections[1].subsections.is_empty());
    }

    #[test]
    fn summary_only_article() {
        let article = parse_flattened("##Turia##\nUn río.", URL).unwrap();
        assert_eq!(article.summary, "Un río.");
        assert!(article.sections.is_empty());
    }

    #[test]
    fn blank_lines_are_dropped_from_text() {
        let text = "##X##\nuno\n\ndos\n==S==\n\ntres\n";
        let article = parse_flattened(text, URL).unwrap();
        assert_eq!(article.summary, "uno\ndos");
        assert_eq!(article.sections[0].text, "tres");
    }

    #[test]
    fn missing_title_is_a_parse_miss() {
        assert!(parse_flattened("Valencia\nCiudad de España.", URL).is_none());
        assert!(parse_flattened("==Historia==\ntexto", URL).is_none());
    }

    #[test]
    fn title_without_summary_is_a_parse_miss() {
        assert!(parse_flattened("##Valencia##", URL).is_none());
        assert!(parse_flattened("##Valencia##\n", URL).is_none());
        assert!(parse_flattened("##Valencia##\n==Historia==\ntexto", URL).is_none());
    }

    #[test]
    fn section_with_empty_text_before_subsection() {
        let text = "##X##\nresumen\n==S==\n--Sub--\ncontenido";
        let article = parse_flattened(text, URL).unwrap();
        assert_eq!(article.sections[0].text, "");
        assert_eq!(article.sections[0].subsections[0].text, "contenido");
    }
}
