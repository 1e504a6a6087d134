// src/config/lists.rs
//! Where the polled list ids come from.
//!
//! First match wins: the `DONKEE_LIST_IDS` value, the file named by
//! `DONKEE_LISTS_PATH`, then `config/lists.toml` and `config/lists.json`
//! relative to the working directory. None of them means "query only".

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_LIST_IDS: &str = "DONKEE_LIST_IDS";
pub const ENV_LISTS_PATH: &str = "DONKEE_LISTS_PATH";

const DEFAULT_LIST_FILES: [&str; 2] = ["config/lists.toml", "config/lists.json"];

/// `lists = ["…", "…"]`
#[derive(Deserialize)]
struct ListsToml {
    lists: Vec<String>,
}

/// Resolve list ids from an inline csv, an explicit file, or the default files.
pub fn resolve_list_ids(csv: Option<&str>, path: Option<&Path>) -> Result<Vec<String>> {
    if let Some(csv) = csv {
        return Ok(parse_list_ids_csv(csv));
    }
    if let Some(path) = path {
        if !path.exists() {
            bail!("{ENV_LISTS_PATH}={} does not exist", path.display());
        }
        return read_list_file(path);
    }
    match DEFAULT_LIST_FILES.iter().map(PathBuf::from).find(|p| p.exists()) {
        Some(found) => read_list_file(&found),
        None => Ok(Vec::new()),
    }
}

/// Read a list id file; the format follows the extension (`.toml` or `.json`).
pub fn read_list_file(path: &Path) -> Result<Vec<String>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading list ids from {}", path.display()))?;

    let ids = match ext.as_deref() {
        Some("toml") => {
            toml::from_str::<ListsToml>(&raw)
                .with_context(|| format!("parsing {}", path.display()))?
                .lists
        }
        Some("json") => serde_json::from_str::<Vec<String>>(&raw)
            .with_context(|| format!("parsing {}", path.display()))?,
        _ => bail!(
            "unsupported list id file {} (expected .toml or .json)",
            path.display()
        ),
    };
    Ok(dedup_ids(ids))
}

/// Comma-separated ids.
pub fn parse_list_ids_csv(csv: &str) -> Vec<String> {
    dedup_ids(csv.split(','))
}

/// Trimmed, non-blank, first occurrence only. Order is the polling order.
fn dedup_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        let id = id.as_ref().trim();
        if !id.is_empty() && !out.iter().any(|seen| seen == id) {
            out.push(id.to_owned());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_keeps_first_occurrence_order() {
        assert_eq!(
            parse_list_ids_csv("12, 34,,12 ,56"),
            vec!["12".to_string(), "34".into(), "56".into()]
        );
    }

    #[test]
    fn inline_csv_beats_any_file() {
        let ids = resolve_list_ids(Some("5"), Some(Path::new("/definitely/missing.toml"))).unwrap();
        assert_eq!(ids, vec!["5".to_string()]);
    }
}
