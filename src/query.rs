//! Boolean query evaluation and result presentation
//!
//! Queries are whitespace-separated terms joined by `and` / `or` / `not`
//! (case-insensitive, no parentheses), with optional `field:` qualifiers
//! and a single `*` or `?` wildcard per term. Evaluation anchors on the
//! second-to-last token and recurses leftward, which yields the
//! left-to-right semantics users expect from a flat operator chain.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::article::Article;
use crate::error::QueryError;
use crate::index::{tokenize, FieldIndex, Indexer, DEFAULT_FIELD, FIELDS};
use crate::postings::{and_posting, minus_posting, or_posting, ArtId, PostingList};
use crate::store::read_record_line;

/// Result cap when `show_all` is off.
pub const SHOW_MAX: usize = 10;

/// Splitter for queries carrying wildcards or field qualifiers; keeps
/// `*`, `?`, `:` and `-` (for `section-name`) inside tokens.
static QUERY_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_*?:\-]+").unwrap());

fn query_tokens(query: &str) -> Vec<String> {
    if query.contains(|c| matches!(c, '*' | '?' | ':')) {
        QUERY_TOKEN_RE
            .split(&query.to_lowercase())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        tokenize(query)
    }
}

impl Indexer {
    /// Resolve a query into a posting list. Empty queries resolve to the
    /// empty list; a token in operator position that is not an operator,
    /// or an unknown field in multifield mode, is a [`QueryError`].
    pub fn solve_query(&self, query: &str) -> Result<PostingList, QueryError> {
        let tokens = query_tokens(query);
        if tokens.is_empty() {
            return Ok(PostingList::new());
        }
        self.solve_tokens(&tokens)
    }

    fn solve_tokens(&self, tokens: &[String]) -> Result<PostingList, QueryError> {
        if tokens.len() == 1 {
            let (term, field) = self.split_field(&tokens[0])?;
            return Ok(self.get_posting(term, field));
        }
        // The operator guards below never recurse into an empty slice, so
        // this only trips on an empty top-level token list, which the
        // counting modes expect to resolve, not fail.
        let Some(opi) = tokens.len().checked_sub(2) else {
            return Ok(PostingList::new());
        };
        match tokens[opi].as_str() {
            "not" => {
                if opi == 0 {
                    Ok(self.reverse_posting(&self.solve_tokens(&tokens[1..])?))
                } else {
                    let prev = opi - 1;
                    match tokens[prev].as_str() {
                        // An `and`/`or` at the very start has no left
                        // operand; that is a malformed query, not an
                        // empty one.
                        "and" if prev > 0 => Ok(minus_posting(
                            &self.solve_tokens(&tokens[..prev])?,
                            &self.solve_tokens(&tokens[opi + 1..])?,
                        )),
                        "or" if prev > 0 => Ok(or_posting(
                            &self.solve_tokens(&tokens[..prev])?,
                            &self.reverse_posting(&self.solve_tokens(&tokens[opi + 1..])?),
                        )),
                        other => Err(QueryError::Malformed(other.to_string())),
                    }
                }
            }
            "and" | "or" if opi == 0 => Err(QueryError::Malformed(tokens[opi].clone())),
            "and" => Ok(and_posting(
                &self.solve_tokens(&tokens[..opi])?,
                &self.solve_tokens(&tokens[opi + 1..])?,
            )),
            "or" => Ok(or_posting(
                &self.solve_tokens(&tokens[..opi])?,
                &self.solve_tokens(&tokens[opi + 1..])?,
            )),
            other => Err(QueryError::Malformed(other.to_string())),
        }
    }

    /// Split an optional `field:term` qualifier. Multifield indices
    /// validate the field name; a single-field index ignores the
    /// qualifier and always resolves against `all`.
    fn split_field<'a>(&self, token: &'a str) -> Result<(&'a str, &'a str), QueryError> {
        match token.split_once(':') {
            None => Ok((token, DEFAULT_FIELD)),
            Some((field, term)) => {
                if !self.options.multifield {
                    return Ok((term, DEFAULT_FIELD));
                }
                if FIELDS.iter().any(|&(name, _)| name == field) {
                    Ok((term, field))
                } else {
                    Err(QueryError::UnknownField(field.to_string()))
                }
            }
        }
    }

    /// Posting list for one term: wildcard terms go through the permuterm
    /// index, otherwise the stem index when stemming mode is on, otherwise
    /// a direct lookup. Anything absent resolves to the empty list.
    pub fn get_posting(&self, term: &str, field: &str) -> PostingList {
        if term.contains(|c| matches!(c, '*' | '?')) {
            self.get_permuterm(term, field)
        } else if self.use_stemming {
            self.get_stemming(term, field)
        } else {
            self.direct_posting(term, field)
        }
    }

    fn direct_posting(&self, term: &str, field: &str) -> PostingList {
        match self.index.get(field) {
            Some(FieldIndex::Tokens(map)) => map.get(term).cloned().unwrap_or_default(),
            _ => PostingList::new(),
        }
    }

    /// Union of the posting lists of every surface term sharing the
    /// query term's stem.
    pub fn get_stemming(&self, term: &str, field: &str) -> PostingList {
        let stem = self.stemmer.stem(term).into_owned();
        let Some(surfaces) = self.sindex.get(field).and_then(|m| m.get(&stem)) else {
            return PostingList::new();
        };
        surfaces.iter().fold(PostingList::new(), |acc, surface| {
            or_posting(&acc, &self.direct_posting(surface, field))
        })
    }

    /// Expand a wildcard term through the permuterm index: rotate the
    /// pattern to `right$left`, prefix-scan the rotation keys, and union
    /// the surface terms' posting lists. `?` additionally requires the
    /// surface term to have exactly the pattern's character length.
    pub fn get_permuterm(&self, term: &str, field: &str) -> PostingList {
        let Some(pos) = term.find(|c| matches!(c, '*' | '?')) else {
            return PostingList::new();
        };
        let wildcard = term.as_bytes()[pos];
        let left = &term[..pos];
        let right = &term[pos + 1..];
        let rotated = format!("{right}${left}");

        let Some(by_rotation) = self.ptindex.get(field) else {
            return PostingList::new();
        };
        let pattern_len = term.chars().count();
        let mut surfaces: BTreeSet<&String> = BTreeSet::new();
        for (key, terms) in by_rotation.range(rotated.clone()..) {
            if !key.starts_with(&rotated) {
                break;
            }
            for surface in terms {
                if wildcard == b'?' && surface.chars().count() != pattern_len {
                    continue;
                }
                surfaces.insert(surface);
            }
        }
        surfaces.iter().fold(PostingList::new(), |acc, surface| {
            or_posting(&acc, &self.direct_posting(surface, field))
        })
    }

    /// Complement of `p` within the universe of known article ids.
    pub fn reverse_posting(&self, p: &[ArtId]) -> PostingList {
        let universe: PostingList = self.articles.keys().copied().collect();
        minus_posting(&universe, p)
    }

    /// Re-read the stored record behind an article id.
    pub fn article(&self, artid: ArtId) -> Result<Article> {
        let (docid, line_index) = self
            .articles
            .get(&artid)
            .copied()
            .with_context(|| format!("unknown article id {artid}"))?;
        let path = self
            .docs
            .get(&docid)
            .with_context(|| format!("unknown shard id {docid}"))?;
        read_record_line(path, line_index)
            .with_context(|| format!("failed to re-read {}", path.display()))
    }

    /// Resolve a query and print its results as `# NN <title>: <url>`
    /// lines, capped at [`SHOW_MAX`] unless `show_all` is set. Returns
    /// the total number of results.
    pub fn solve_and_show(&self, query: &str) -> Result<usize> {
        let posting = match self.solve_query(query) {
            Ok(posting) => posting,
            Err(err) => {
                tracing::warn!(%query, error = %err, "query rejected");
                PostingList::new()
            }
        };
        let shown = if self.show_all {
            posting.len()
        } else {
            posting.len().min(SHOW_MAX)
        };
        println!("========================================");
        for (i, artid) in posting.iter().take(shown).enumerate() {
            let article = self.article(*artid)?;
            println!("# {:02} {}: {}", i + 1, article.title, article.url);
        }
        println!("========================================");
        println!("Number of results: {}", posting.len());
        Ok(posting.len())
    }

    fn count_query(&self, query: &str) -> usize {
        match self.solve_query(query) {
            Ok(posting) => posting.len(),
            Err(err) => {
                tracing::warn!(%query, error = %err, "query rejected");
                0
            }
        }
    }

    /// Print `query<TAB>count` for every non-comment line and return the
    /// counts. Comment (`#`) and empty lines count as 0.
    pub fn solve_and_count(&self, queries: &[String]) -> Vec<usize> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            if !query.is_empty() && !query.starts_with('#') {
                let count = self.count_query(query);
                results.push(count);
                println!("{query}\t{count}");
            } else {
                results.push(0);
                println!("{query}");
            }
        }
        results
    }

    /// Check `query<TAB>expected` reference lines against the index.
    /// Returns true when every line matches.
    pub fn solve_and_test(&self, lines: &[String]) -> bool {
        let mut errors = false;
        for line in lines {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((query, reference)) = line.split_once('\t') else {
                tracing::warn!(%line, "reference line without a tab, skipped");
                errors = true;
                continue;
            };
            let Ok(expected) = reference.trim().parse::<usize>() else {
                tracing::warn!(%line, "reference count is not a number, skipped");
                errors = true;
                continue;
            };
            let result = self.count_query(query);
            if result == expected {
                println!("{query}\t{result}");
            } else {
                println!(">>>>{query}\t{expected} != {result}<<<<");
                errors = true;
            }
        }
        !errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexOptions;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn shard_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let records = [
            r#"{"url":"https://es.wikipedia.org/wiki/A","title":"perro gato","summary":"mesa","sections":[]}"#,
            r#"{"url":"https://es.wikipedia.org/wiki/B","title":"gato azul","summary":"","sections":[]}"#,
            r#"{"url":"https://es.wikipedia.org/wiki/C","title":"perro azul","summary":"silla","sections":[]}"#,
        ];
        let mut file = File::create(dir.path().join("corpus.json")).unwrap();
        for record in records {
            writeln!(file, "{record}").unwrap();
        }
        dir
    }

    fn build(options: IndexOptions) -> (TempDir, Indexer) {
        let dir = shard_dir();
        let mut indexer = Indexer::new(options);
        indexer.index_dir(dir.path()).unwrap();
        (dir, indexer)
    }

    #[test]
    fn empty_query_resolves_to_the_empty_list() {
        let (_dir, indexer) = build(IndexOptions::default());
        assert_eq!(indexer.solve_query("").unwrap(), Vec::<ArtId>::new());
        assert_eq!(indexer.solve_query("   ").unwrap(), Vec::<ArtId>::new());
    }

    #[test]
    fn operators_are_case_insensitive() {
        let (_dir, indexer) = build(IndexOptions::default());
        assert_eq!(indexer.solve_query("perro AND gato").unwrap(), vec![1]);
        assert_eq!(indexer.solve_query("perro and gato").unwrap(), vec![1]);
        assert_eq!(indexer.solve_query("NOT gato").unwrap(), vec![3]);
    }

    #[test]
    fn non_operator_in_operator_position_is_malformed() {
        let (_dir, indexer) = build(IndexOptions::default());
        assert!(matches!(
            indexer.solve_query("perro gato azul"),
            Err(QueryError::Malformed(_))
        ));
    }

    #[test]
    fn leading_binary_operator_is_malformed_not_a_crash() {
        let (_dir, indexer) = build(IndexOptions::default());
        for query in ["and gato", "or perro", "and not gato", "or not gato"] {
            assert!(
                matches!(indexer.solve_query(query), Err(QueryError::Malformed(_))),
                "query '{query}' must be rejected"
            );
        }
        // A leading `not` is the one operator allowed to open a query.
        assert_eq!(indexer.solve_query("not gato").unwrap(), vec![3]);
    }

    #[test]
    fn unknown_field_is_rejected_in_multifield_mode() {
        let (_dir, indexer) = build(IndexOptions::default().with_multifield(true));
        assert_eq!(
            indexer.solve_query("autor:cervantes"),
            Err(QueryError::UnknownField("autor".to_string()))
        );
    }

    #[test]
    fn single_field_mode_ignores_the_qualifier() {
        let (_dir, indexer) = build(IndexOptions::default());
        assert_eq!(
            indexer.solve_query("title:silla").unwrap(),
            indexer.solve_query("silla").unwrap()
        );
    }

    #[test]
    fn minus_equals_and_with_reverse() {
        let (_dir, indexer) = build(IndexOptions::default());
        let p = indexer.solve_query("perro").unwrap();
        let q = indexer.solve_query("azul").unwrap();
        assert_eq!(
            minus_posting(&p, &q),
            and_posting(&p, &indexer.reverse_posting(&q))
        );
    }

    #[test]
    fn double_reverse_is_identity_over_the_universe() {
        let (_dir, indexer) = build(IndexOptions::default());
        let p = indexer.solve_query("perro").unwrap();
        assert_eq!(indexer.reverse_posting(&indexer.reverse_posting(&p)), p);
    }

    #[test]
    fn missing_indices_resolve_to_empty_lists() {
        // Stemming/permuterm dispatch against an index built without
        // those structures must not panic, just return nothing.
        let (_dir, mut indexer) = build(IndexOptions::default());
        indexer.set_stemming(true);
        assert_eq!(indexer.solve_query("perros").unwrap(), Vec::<ArtId>::new());
        assert_eq!(indexer.solve_query("per*").unwrap(), Vec::<ArtId>::new());
    }
}
