//! Reading and merging filter-list sources from disk.
//!
//! Rule lexing itself lives in `abp_core::parser`; this module is only
//! concerned with gathering raw text from one or more list files before it
//! reaches [`abp_core::FilterIndex::parse`].

use std::path::PathBuf;

use abp_core::ParseError;

/// Read and concatenate every file in `paths`, in order, separated by a
/// newline. A leading UTF-8 BOM on any file is stripped so it doesn't get
/// lexed as a stray character on the first line.
pub fn read_sources(paths: &[PathBuf]) -> Result<String, ParseError> {
    let mut merged = String::new();
    for path in paths {
        let text = std::fs::read_to_string(path)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        merged.push_str(text);
        if !merged.ends_with('\n') {
            merged.push('\n');
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn merges_multiple_files_in_order() {
        let dir = std::env::temp_dir();
        let a = dir.join("abp_compiler_test_a.txt");
        let b = dir.join("abp_compiler_test_b.txt");
        std::fs::File::create(&a).unwrap().write_all(b"rule-a\n").unwrap();
        std::fs::File::create(&b).unwrap().write_all(b"rule-b\n").unwrap();

        let merged = read_sources(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(merged, "rule-a\nrule-b\n");

        let _ = std::fs::remove_file(a);
        let _ = std::fs::remove_file(b);
    }

    #[test]
    fn strips_leading_bom() {
        let dir = std::env::temp_dir();
        let p = dir.join("abp_compiler_test_bom.txt");
        std::fs::write(&p, "\u{feff}rule\n").unwrap();
        let merged = read_sources(&[p.clone()]).unwrap();
        assert_eq!(merged, "rule\n");
        let _ = std::fs::remove_file(p);
    }
}
