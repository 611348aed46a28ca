//! Thin disk I/O wrappers around `abp_compiler`/`abp_core::snapshot` shared
//! by more than one subcommand.

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct CompileStats {
    pub rule_count: usize,
    pub snapshot_bytes: usize,
    pub total_ms: f64,
}

pub fn compile_snapshot_bytes(inputs: &[PathBuf]) -> Result<(Vec<u8>, CompileStats), String> {
    if inputs.is_empty() {
        return Err("no input files specified".to_string());
    }
    let start = Instant::now();
    let (index, bytes) = abp_compiler::compile_with_index(inputs)
        .map_err(|e| format!("failed to compile input lists: {e}"))?;
    let stats = CompileStats {
        rule_count: index.rule_count(),
        snapshot_bytes: bytes.len(),
        total_ms: start.elapsed().as_secs_f64() * 1000.0,
    };
    Ok((bytes, stats))
}

pub fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create '{}': {e}", parent.display()))?;
        }
    }
    std::fs::write(path, bytes).map_err(|e| format!("failed to write '{}': {e}", path.display()))
}

pub fn read_snapshot(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("failed to read '{}': {e}", path.display()))
}
