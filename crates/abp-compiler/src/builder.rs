//! Top-level compile: sources on disk -> one `FilterIndex` -> a binary
//! snapshot.

use std::path::PathBuf;

use abp_core::{snapshot, FilterIndex, ParseError};

use crate::optimizer::dedup_lines;
use crate::parser::read_sources;

/// Read every file in `paths`, merge and de-duplicate their rule lines,
/// parse the result into a `FilterIndex`, and serialize it to the binary
/// snapshot format.
pub fn compile(paths: &[PathBuf]) -> Result<Vec<u8>, ParseError> {
    let merged = read_sources(paths)?;
    let deduped = dedup_lines(&merged);

    let mut index = FilterIndex::new();
    index.parse(&deduped);

    Ok(snapshot::serialize(&index))
}

/// Like [`compile`], but returns the built index alongside its snapshot
/// bytes - useful for tooling that wants to report rule counts without a
/// second parse pass (e.g. the CLI's `compile`/`info` subcommands).
pub fn compile_with_index(paths: &[PathBuf]) -> Result<(FilterIndex<'static>, Vec<u8>), ParseError> {
    let merged = read_sources(paths)?;
    let deduped = dedup_lines(&merged);

    let mut index = FilterIndex::new();
    index.parse(&deduped);
    let bytes = snapshot::serialize(&index);
    Ok((index, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_small_merged_list_into_a_loadable_snapshot() {
        let dir = std::env::temp_dir();
        let path = dir.join("abp_compiler_builder_test.txt");
        std::fs::write(&path, "/banner-ads/\n||ads.example.com^\n").unwrap();

        let bytes = compile(&[path.clone()]).expect("compile should succeed");
        let loaded = snapshot::load(&bytes).expect("snapshot should load");
        assert_eq!(loaded.rule_count(), 2);

        let _ = std::fs::remove_file(path);
    }
}
