//! Corpus loader - parses `key=text` source files / 文本文件读取
//!
//! Each line is split on the first `=` only, the text itself may contain `=`.

use std::path::Path;

use crate::error::{DictError, Result};
use crate::search::schema::Language;

/// Read and parse one language's source file / 读取语言文本文件
///
/// A missing file is fatal for the rebuild of that language.
pub fn load_source(language: &Language, path: &Path) -> Result<Vec<(String, String)>> {
    if !path.exists() {
        return Err(DictError::SourceMissing {
            language: language.clone(),
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    let pairs = parse_source(&content);
    tracing::debug!("Parsed {} entries for {} from {:?}", pairs.len(), language, path);
    Ok(pairs)
}

/// Parse source content into (key, raw text) pairs in file order / 解析文本内容
pub fn parse_source(content: &str) -> Vec<(String, String)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut pairs = Vec::new();
    let mut skipped = 0usize;

    for line in content.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }

        match line.split_once('=') {
            Some((key, text)) if !key.trim().is_empty() => {
                pairs.push((key.trim().to_string(), text.to_string()));
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} malformed lines", skipped);
    }

    pairs
}
