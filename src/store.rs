//! JSONL record store
//!
//! One crawled article per line, ASCII-escaped JSON, sharded by batch.
//! Shard names carry a 1-based file number zero-padded to the width of
//! the expected total, so `ls` sorts them in capture order.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::article::Article;

/// `serde_json` formatter that `\uXXXX`-escapes everything outside ASCII,
/// so shards stay 7-bit clean regardless of the platform encoding they
/// are later reopened with.
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units).iter() {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Name of the shard `num_file` out of `total_files`, or the bare base
/// filename when the crawl runs unbatched. Zero-padding width follows the
/// decimal width of `total_files`.
pub fn shard_filename(base_filename: &str, shard: Option<(usize, usize)>) -> String {
    match shard {
        Some((num_file, total_files)) => {
            let stem = base_filename.strip_suffix(".json").unwrap_or(base_filename);
            let width = total_files.to_string().len();
            format!("{stem}_{num_file:0width$}_{total_files}.json")
        }
        None => base_filename.to_string(),
    }
}

/// Append-free shard write: one JSON object per line, `\n` delimited.
/// Returns the path actually written.
pub fn save_documents(
    documents: &[Article],
    base_filename: &str,
    shard: Option<(usize, usize)>,
) -> io::Result<PathBuf> {
    let path = PathBuf::from(shard_filename(base_filename, shard));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    for doc in documents {
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, AsciiFormatter);
        doc.serialize(&mut ser).map_err(io::Error::from)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    tracing::info!(records = documents.len(), path = %path.display(), "shard written");
    Ok(path)
}

/// Re-read the `line_index`-th (0-based) record of a shard; used by the
/// result presenter to resolve an ArtId back to its stored record.
pub fn read_record_line(path: &Path, line_index: usize) -> io::Result<Article> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let line = reader
        .lines()
        .nth(line_index)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} has no line {line_index}", path.display()),
            )
        })??;
    serde_json::from_str(&line).map_err(io::Error::from)
}
