//! Inverted index
//!
//! The [`Indexer`] owns every retrieval structure: the main inverted
//! index (single-field or per-field), the optional stem and permuterm
//! indices, and the article/shard bookkeeping needed to resolve results
//! back to stored records. Lifecycle: `new -> index_dir -> (query |
//! save_to | load_from)`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bincode::Options;
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::config::IndexOptions;
use crate::postings::{ArtId, PostingList};

/// 1-based shard-file identifier, assigned in enumeration order.
pub type DocId = u32;

/// Locator of an article inside its shard: `(DocId, 0-based line index)`.
pub type ArticleRef = (DocId, usize);

/// Record fields in their fixed order; the flag marks tokenised fields.
/// `url` is stored verbatim and never participates in token lookups.
pub const FIELDS: &[(&str, bool)] = &[
    ("all", true),
    ("title", true),
    ("summary", true),
    ("section-name", true),
    ("url", false),
];

/// Field queried when a term carries no `field:` qualifier.
pub const DEFAULT_FIELD: &str = "all";

const INDEX_FORMAT_VERSION: u32 = 1;
const STEMMER_LANG: &str = "spanish";
const TOKENIZER_PATTERN: &str = "[^A-Za-z0-9_]+";

static TOKEN_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(TOKENIZER_PATTERN).unwrap());

/// Lowercase and split on runs of non-word characters (ASCII word class),
/// dropping empty tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_SPLIT_RE
        .split(&text.to_lowercase())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// All rotations of `token + "$"`, the permuterm keys of one term.
pub(crate) fn rotations(token: &str) -> Vec<String> {
    let term: Vec<char> = format!("{token}$").chars().collect();
    (0..term.len())
        .map(|i| term[i..].iter().chain(term[..i].iter()).collect())
        .collect()
}

/// Per-field index payload: a token map for tokenised fields, the raw
/// URL list for the `url` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldIndex {
    Tokens(BTreeMap<String, PostingList>),
    Raw(Vec<String>),
}

type SurfaceMap = BTreeMap<String, Vec<String>>;

/// In-memory index over crawled JSONL shards.
pub struct Indexer {
    pub(crate) options: IndexOptions,
    /// URLs already indexed; a record whose URL is here is skipped
    pub(crate) urls: BTreeSet<String>,
    /// field -> token map (single-field mode keeps only `all`)
    pub(crate) index: BTreeMap<String, FieldIndex>,
    /// field -> stem -> surface terms sharing that stem
    pub(crate) sindex: BTreeMap<String, SurfaceMap>,
    /// field -> rotation -> surface terms
    pub(crate) ptindex: BTreeMap<String, SurfaceMap>,
    /// shard id -> shard path
    pub(crate) docs: BTreeMap<DocId, PathBuf>,
    /// article id -> shard locator
    pub(crate) articles: BTreeMap<ArtId, ArticleRef>,
    /// term weights for ranked retrieval; reserved, never populated
    pub(crate) weight: BTreeMap<String, f64>,
    pub(crate) show_all: bool,
    pub(crate) use_stemming: bool,
    pub(crate) stemmer: Stemmer,
}

impl Indexer {
    pub fn new(options: IndexOptions) -> Self {
        let mut index = BTreeMap::new();
        if options.multifield {
            for &(field, tokenised) in FIELDS {
                let payload = if tokenised {
                    FieldIndex::Tokens(BTreeMap::new())
                } else {
                    FieldIndex::Raw(Vec::new())
                };
                index.insert(field.to_string(), payload);
            }
        } else {
            index.insert(DEFAULT_FIELD.to_string(), FieldIndex::Tokens(BTreeMap::new()));
        }
        Self {
            options,
            urls: BTreeSet::new(),
            index,
            sindex: BTreeMap::new(),
            ptindex: BTreeMap::new(),
            docs: BTreeMap::new(),
            articles: BTreeMap::new(),
            weight: BTreeMap::new(),
            show_all: false,
            use_stemming: false,
            stemmer: Stemmer::create(Algorithm::Spanish),
        }
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    /// Show every result instead of capping at `SHOW_MAX`.
    pub fn set_showall(&mut self, v: bool) {
        self.show_all = v;
    }

    /// Resolve query terms through the stem index by default.
    pub fn set_stemming(&mut self, v: bool) {
        self.use_stemming = v;
    }

    pub fn num_files(&self) -> usize {
        self.docs.len()
    }

    pub fn num_articles(&self) -> usize {
        self.articles.len()
    }

    fn already_indexed(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Index a JSONL file, or every `.json` file under a directory
    /// (recursive, filenames sorted within each directory level). Builds
    /// the stem and permuterm indices afterwards when the options ask
    /// for them.
    pub fn index_dir(&mut self, root: &Path) -> Result<()> {
        let files = if root.is_file() {
            vec![root.to_path_buf()]
        } else if root.is_dir() {
            let mut files = Vec::new();
            collect_json_files(root, &mut files)?;
            files
        } else {
            bail!("{} is neither a file nor a directory", root.display());
        };

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        for file in &files {
            self.index_file(file)?;
            pb.inc(1);
            pb.set_message(format!("{} articles", self.articles.len()));
        }
        pb.finish_and_clear();

        if self.options.stemming {
            self.make_stemming();
        }
        if self.options.permuterm {
            self.make_permuterm();
        }

        tracing::info!(
            files = self.docs.len(),
            articles = self.articles.len(),
            "index built"
        );
        Ok(())
    }

    /// Index one crawler-generated JSONL file. Records whose URL is
    /// already indexed are skipped; malformed lines are logged and
    /// skipped, never fatal.
    pub fn index_file(&mut self, filename: &Path) -> Result<()> {
        let docid = self.docs.len() as DocId + 1;
        self.docs.insert(docid, filename.to_path_buf());

        let file = File::open(filename)
            .with_context(|| format!("failed to open {}", filename.display()))?;
        for (line_index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let article: Article = match serde_json::from_str(&line) {
                Ok(article) => article,
                Err(err) => {
                    tracing::warn!(
                        file = %filename.display(),
                        line = line_index,
                        error = %err,
                        "skipping malformed record"
                    );
                    continue;
                }
            };
            if self.already_indexed(&article.url) {
                continue;
            }

            let artid = self.articles.len() as ArtId + 1;
            self.articles.insert(artid, (docid, line_index));

            if self.options.multifield {
                for &(field, tokenised) in FIELDS {
                    if tokenised {
                        self.insert_tokens(field, &field_text(&article, field), artid);
                    } else if let Some(FieldIndex::Raw(urls)) = self.index.get_mut(field) {
                        urls.push(article.url.clone());
                    }
                }
            } else {
                self.insert_tokens(DEFAULT_FIELD, &article.all_text(), artid);
            }
            self.urls.insert(article.url);
        }
        Ok(())
    }

    fn insert_tokens(&mut self, field: &str, text: &str, artid: ArtId) {
        let Some(FieldIndex::Tokens(map)) = self.index.get_mut(field) else {
            return;
        };
        for token in tokenize(text) {
            let posting = map.entry(token).or_default();
            // ArtIds arrive in ascending order, so append keeps the
            // list sorted and duplicate-free.
            if posting.last() != Some(&artid) {
                posting.push(artid);
            }
        }
    }

    /// Build the stem index from the main index's term keys. Surface
    /// terms are grouped under their stem; posting lists stay unmerged
    /// until query time.
    pub fn make_stemming(&mut self) {
        self.sindex.clear();
        for (field, payload) in &self.index {
            let FieldIndex::Tokens(map) = payload else {
                continue;
            };
            let by_stem = self.sindex.entry(field.clone()).or_default();
            for token in map.keys() {
                let stem = self.stemmer.stem(token).into_owned();
                let surfaces = by_stem.entry(stem).or_default();
                if !surfaces.contains(token) {
                    surfaces.push(token.clone());
                }
            }
        }
    }

    /// Build the permuterm index: every rotation of `term$` becomes a key
    /// pointing back at the surface term.
    pub fn make_permuterm(&mut self) {
        self.ptindex.clear();
        for (field, payload) in &self.index {
            let FieldIndex::Tokens(map) = payload else {
                continue;
            };
            let by_rotation = self.ptindex.entry(field.clone()).or_default();
            for token in map.keys() {
                for rotation in rotations(token) {
                    let surfaces = by_rotation.entry(rotation).or_default();
                    if !surfaces.contains(token) {
                        surfaces.push(token.clone());
                    }
                }
            }
        }
    }

    /// Human-readable index statistics, one block per index kind.
    pub fn show_stats(&self) -> String {
        let sep = "----------------------------------------\n";
        let mut out = String::from("========================================\n");
        out.push_str(&format!("Number of indexed files: {}\n", self.docs.len()));
        out.push_str(sep);
        out.push_str(&format!("Number of indexed articles: {}\n", self.articles.len()));
        out.push_str(sep);
        out.push_str("TOKENS\n");
        if self.options.multifield {
            for &(field, _) in FIELDS {
                if let Some(FieldIndex::Tokens(map)) = self.index.get(field) {
                    out.push_str(&format!("\t# of tokens in '{field}': {}\n", map.len()));
                }
            }
        } else if let Some(FieldIndex::Tokens(map)) = self.index.get(DEFAULT_FIELD) {
            out.push_str(&format!("\t# of tokens: {}\n", map.len()));
        }
        if self.options.stemming {
            out.push_str(sep);
            out.push_str("STEMS\n");
            if self.options.multifield {
                for &(field, _) in FIELDS {
                    if let Some(map) = self.sindex.get(field) {
                        out.push_str(&format!("\t# of stems in '{field}': {}\n", map.len()));
                    }
                }
            } else if let Some(map) = self.sindex.get(DEFAULT_FIELD) {
                out.push_str(&format!("\t# of stems: {}\n", map.len()));
            }
        }
        if self.options.permuterm {
            out.push_str(sep);
            out.push_str("PERMUTERMS\n");
            if self.options.multifield {
                for &(field, _) in FIELDS {
                    if let Some(map) = self.ptindex.get(field) {
                        out.push_str(&format!("\t# of permuterms in '{field}': {}\n", map.len()));
                    }
                }
            } else if let Some(map) = self.ptindex.get(DEFAULT_FIELD) {
                out.push_str(&format!("\t# of permuterms: {}\n", map.len()));
            }
        }
        out.push_str("========================================");
        out
    }

    /// Persist the whole indexer state as one bincode blob, written to a
    /// temp file and renamed into place.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
        }

        let snapshot = IndexSnapshotSer {
            version: INDEX_FORMAT_VERSION,
            options: self.options,
            urls: &self.urls,
            index: &self.index,
            sindex: &self.sindex,
            ptindex: &self.ptindex,
            docs: &self.docs,
            weight: &self.weight,
            articles: &self.articles,
            tokenizer: TOKENIZER_PATTERN,
            stemmer: STEMMER_LANG,
            show_all: self.show_all,
            use_stemming: self.use_stemming,
        };

        let tmp_path = path.with_extension("tmp");
        let file = File::create(&tmp_path)
            .with_context(|| format!("failed to create {}", tmp_path.display()))?;
        let writer = BufWriter::new(file);
        bincode::DefaultOptions::new()
            .serialize_into(writer, &snapshot)
            .context("failed to serialize index")?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename into {}", path.display()))?;

        tracing::info!(path = %path.display(), articles = self.articles.len(), "index saved");
        Ok(())
    }

    /// Load an indexer persisted with [`Indexer::save_to`].
    pub fn load_from(path: &Path) -> Result<Self> {
        let file_size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let reader = BufReader::new(file);

        let snapshot: IndexSnapshotDe = bincode::options()
            .with_limit(file_size.saturating_add(1024))
            .deserialize_from(reader)
            .context("failed to deserialize index")?;

        if snapshot.version != INDEX_FORMAT_VERSION {
            bail!(
                "index format version mismatch: file has {}, this build reads {}",
                snapshot.version,
                INDEX_FORMAT_VERSION
            );
        }
        if snapshot.tokenizer != TOKENIZER_PATTERN {
            bail!("index was built with an incompatible tokenizer ({})", snapshot.tokenizer);
        }
        let stemmer = match snapshot.stemmer.as_str() {
            STEMMER_LANG => Stemmer::create(Algorithm::Spanish),
            other => bail!("unsupported stemmer language '{other}'"),
        };

        tracing::info!(
            path = %path.display(),
            articles = snapshot.articles.len(),
            "index loaded"
        );
        Ok(Self {
            options: snapshot.options,
            urls: snapshot.urls,
            index: snapshot.index,
            sindex: snapshot.sindex,
            ptindex: snapshot.ptindex,
            docs: snapshot.docs,
            articles: snapshot.articles,
            weight: snapshot.weight,
            show_all: snapshot.show_all,
            use_stemming: snapshot.use_stemming,
            stemmer,
        })
    }
}

fn field_text(article: &Article, field: &str) -> String {
    match field {
        "all" => article.all_text(),
        "title" => article.title.clone(),
        "summary" => article.summary.clone(),
        "section-name" => article.section_names(),
        _ => String::new(),
    }
}

/// Files sorted by name within each directory level, directories visited
/// in sorted order after the files of their parent.
fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    entries.sort();

    for entry in &entries {
        if entry.is_file() && entry.extension().is_some_and(|ext| ext == "json") {
            out.push(entry.clone());
        }
    }
    for entry in &entries {
        if entry.is_dir() {
            collect_json_files(entry, out)?;
        }
    }
    Ok(())
}

/// Borrows the live maps so saving does not clone the whole index.
#[derive(Serialize)]
struct IndexSnapshotSer<'a> {
    version: u32,
    options: IndexOptions,
    urls: &'a BTreeSet<String>,
    index: &'a BTreeMap<String, FieldIndex>,
    sindex: &'a BTreeMap<String, SurfaceMap>,
    ptindex: &'a BTreeMap<String, SurfaceMap>,
    docs: &'a BTreeMap<DocId, PathBuf>,
    weight: &'a BTreeMap<String, f64>,
    articles: &'a BTreeMap<ArtId, ArticleRef>,
    tokenizer: &'a str,
    stemmer: &'a str,
    show_all: bool,
    use_stemming: bool,
}

#[derive(Deserialize)]
struct IndexSnapshotDe {
    version: u32,
    options: IndexOptions,
    urls: BTreeSet<String>,
    index: BTreeMap<String, FieldIndex>,
    sindex: BTreeMap<String, SurfaceMap>,
    ptindex: BTreeMap<String, SurfaceMap>,
    docs: BTreeMap<DocId, PathBuf>,
    weight: BTreeMap<String, f64>,
    articles: BTreeMap<ArtId, ArticleRef>,
    tokenizer: String,
    stemmer: String,
    show_all: bool,
    use_stemming: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_shard(dir: &TempDir, name: &str, records: &[&str]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        for record in records {
            writeln!(file, "{record}").unwrap();
        }
        path
    }

    fn record(url: &str, title: &str, summary: &str) -> String {
        serde_json::to_string(&Article {
            url: url.to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            sections: Vec::new(),
        })
        .unwrap()
    }

    #[test]
    fn tokenize_lowercases_and_splits_on_non_word_runs() {
        assert_eq!(tokenize("Perro, GATO; mesa!"), vec!["perro", "gato", "mesa"]);
        assert_eq!(tokenize("  "), Vec::<String>::new());
        assert_eq!(tokenize("un_dos 3"), vec!["un_dos", "3"]);
    }

    #[test]
    fn rotations_cover_every_offset() {
        assert_eq!(rotations("ab"), vec!["ab$", "b$a", "$ab"]);
        assert_eq!(rotations("a").len(), 2);
    }

    #[test]
    fn repeated_urls_are_indexed_once() {
        let dir = TempDir::new().unwrap();
        let line = record("https://es.wikipedia.org/wiki/A", "perro", "gato");
        let shard = write_shard(&dir, "a.json", &[&line, &line]);

        let mut indexer = Indexer::new(IndexOptions::default());
        indexer.index_file(&shard).unwrap();
        assert_eq!(indexer.num_articles(), 1);
    }

    #[test]
    fn posting_lists_stay_sorted_and_distinct() {
        let dir = TempDir::new().unwrap();
        let lines = [
            record("https://es.wikipedia.org/wiki/A", "perro gato", "perro"),
            record("https://es.wikipedia.org/wiki/B", "gato", "gato azul"),
        ];
        let shard = write_shard(&dir, "a.json", &[&lines[0], &lines[1]]);

        let mut indexer = Indexer::new(IndexOptions::default());
        indexer.index_file(&shard).unwrap();

        let FieldIndex::Tokens(map) = &indexer.index[DEFAULT_FIELD] else {
            panic!("single-field index must be tokenised");
        };
        assert_eq!(map["perro"], vec![1]);
        assert_eq!(map["gato"], vec![1, 2]);
        for posting in map.values() {
            assert!(posting.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn stem_index_groups_surface_terms() {
        let dir = TempDir::new().unwrap();
        let line = record("https://es.wikipedia.org/wiki/A", "perro perros", "");
        let shard = write_shard(&dir, "a.json", &[&line]);

        let mut indexer = Indexer::new(IndexOptions::default().with_stemming(true));
        indexer.index_file(&shard).unwrap();
        indexer.make_stemming();

        let by_stem = &indexer.sindex[DEFAULT_FIELD];
        for (stem, surfaces) in by_stem {
            for surface in surfaces {
                assert_eq!(&indexer.stemmer.stem(surface).into_owned(), stem);
            }
        }
        let stem = indexer.stemmer.stem("perros").into_owned();
        assert!(by_stem[&stem].contains(&"perro".to_string()));
        assert!(by_stem[&stem].contains(&"perros".to_string()));
    }

    #[test]
    fn permuterm_index_keys_every_rotation() {
        let dir = TempDir::new().unwrap();
        let line = record("https://es.wikipedia.org/wiki/A", "mesa", "");
        let shard = write_shard(&dir, "a.json", &[&line]);

        let mut indexer = Indexer::new(IndexOptions::default().with_permuterm(true));
        indexer.index_file(&shard).unwrap();
        indexer.make_permuterm();

        let by_rotation = &indexer.ptindex[DEFAULT_FIELD];
        for rotation in rotations("mesa") {
            assert!(by_rotation[&rotation].contains(&"mesa".to_string()));
        }
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let good = record("https://es.wikipedia.org/wiki/A", "perro", "");
        let shard = write_shard(&dir, "a.json", &["{not json", &good]);

        let mut indexer = Indexer::new(IndexOptions::default());
        indexer.index_file(&shard).unwrap();
        assert_eq!(indexer.num_articles(), 1);
        // The surviving record keeps its real line number.
        assert_eq!(indexer.articles[&1], (1, 1));
    }

    #[test]
    fn docids_follow_sorted_filename_order() {
        let dir = TempDir::new().unwrap();
        let a = record("https://es.wikipedia.org/wiki/A", "uno", "");
        let b = record("https://es.wikipedia.org/wiki/B", "dos", "");
        write_shard(&dir, "corpus_2_2.json", &[&b]);
        write_shard(&dir, "corpus_1_2.json", &[&a]);

        let mut indexer = Indexer::new(IndexOptions::default());
        indexer.index_dir(dir.path()).unwrap();
        assert_eq!(indexer.num_files(), 2);
        assert!(indexer.docs[&1].ends_with("corpus_1_2.json"));
        assert!(indexer.docs[&2].ends_with("corpus_2_2.json"));
    }
}
