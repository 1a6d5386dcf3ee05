use crate::error::{Error, Result};
use crate::newick::{self, NewickFormat};
use crate::tree::Tree;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

fn is_gz(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

/// Open a file for buffered reading, transparently decompressing `.gz`.
/// `-` reads standard input.
pub fn open_input<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let p = path.as_ref();
    if p.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(p)?;
    if is_gz(p) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Load the reference tree.
///
/// `source` is a path to a Newick file; when no such file exists but the
/// argument itself looks like a Newick string (ends in `;`), it is parsed
/// directly.
pub fn read_reference_tree(source: &str) -> Result<Tree> {
    let path = Path::new(source);
    if !path.exists() && source.trim_end().ends_with(';') {
        return newick::parse(source.trim());
    }
    let mut text = String::new();
    open_input(path)?.read_to_string(&mut text)?;
    newick::parse(text.trim())
}

/// Parse one tree per non-empty line.
///
/// Errors are tagged with the 0-based index of the tree (blank lines are not
/// counted).
pub fn read_replicate_trees<R: BufRead>(reader: R) -> Result<Vec<Tree>> {
    reader
        .lines()
        .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .enumerate()
        .map(|(idx, line)| {
            let line = line.map_err(|e| Error::from(e).in_replicate(idx))?;
            newick::parse(line.trim()).map_err(|e| e.in_replicate(idx))
        })
        .collect()
}

/// Read all bootstrap trees from a file (plain or `.gz`).
pub fn read_replicate_file<P: AsRef<Path>>(path: P) -> Result<Vec<Tree>> {
    read_replicate_trees(open_input(path)?)
}

/// Write a tree followed by a newline to `path`, or to stdout when `path`
/// is `None` or `-`. If `path` ends with `.gz`, the output is
/// gzip-compressed.
pub fn write_tree<P: AsRef<Path>>(
    path: Option<P>,
    tree: &Tree,
    format: &NewickFormat,
) -> io::Result<()> {
    let path: Option<&Path> = path.as_ref().map(|p| p.as_ref());
    let line = newick::to_newick_with(tree, format);
    match path {
        Some(p) if is_gz(p) => {
            let f = File::create(p)?;
            let mut encoder = GzEncoder::new(BufWriter::new(f), Compression::default());
            writeln!(encoder, "{line}")?;
            // finish() writes the trailer and reports its errors
            encoder.finish()?.flush()
        }
        Some(p) if p.as_os_str() != "-" => {
            let mut out = BufWriter::new(File::create(p)?);
            writeln!(out, "{line}")?;
            out.flush()
        }
        _ => {
            let mut out = BufWriter::new(io::stdout().lock());
            writeln!(out, "{line}")?;
            out.flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("subset-support-{}-{name}", std::process::id()))
    }

    #[test]
    fn replicate_lines_are_parsed_and_blank_lines_skipped() {
        let input = "((A,B),(C,D));\n\n((A,C),(B,D));\r\n   \n((A,D),(B,C));";
        let trees = read_replicate_trees(Cursor::new(input)).unwrap();
        assert_eq!(trees.len(), 3);
        assert!(trees.iter().all(|t| t.n_leaves() == 4));
    }

    #[test]
    fn broken_replicate_reports_its_index() {
        let input = "((A,B),(C,D));\n((A,C),(B,D);\n";
        match read_replicate_trees(Cursor::new(input)) {
            Err(Error::Replicate { index, source }) => {
                assert_eq!(index, 1);
                assert!(matches!(*source, Error::Format { .. }));
            }
            other => panic!("expected replicate error, got {other:?}"),
        }
    }

    #[test]
    fn inline_reference_tree() {
        let tree = read_reference_tree("((A:1,B:1):1,C:2);").unwrap();
        assert_eq!(tree.n_leaves(), 3);
    }

    #[test]
    fn missing_reference_file_is_io_error() {
        assert!(matches!(
            read_reference_tree("/definitely/not/here.nwk"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn gzip_round_trip_through_files() {
        let tree = newick::parse("((A:1,B:2)50:3,C:4);").unwrap();
        let path = scratch("tree.nwk.gz");

        write_tree(Some(&path), &tree, &NewickFormat::default()).unwrap();
        let back = read_reference_tree(path.to_str().unwrap()).unwrap();
        assert_eq!(back, tree);

        let many = read_replicate_file(&path).unwrap();
        assert_eq!(many.len(), 1);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn gzip_output_is_complete() {
        let tree = newick::parse("((A:1,B:2)50:3,(C:4,D:5)75:6);").unwrap();
        let path = scratch("complete.nwk.gz");
        write_tree(Some(&path), &tree, &NewickFormat::default()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let mut text = String::new();
        MultiGzDecoder::new(&bytes[..])
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "((A:1,B:2)50:3,(C:4,D:5)75:6);\n");

        // gzip trailer: CRC32 then ISIZE (uncompressed length, little endian)
        let isize_bytes: [u8; 4] = bytes[bytes.len() - 4..].try_into().unwrap();
        assert_eq!(u32::from_le_bytes(isize_bytes) as usize, text.len());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn plain_file_output() {
        let tree = newick::parse("((A,B)66.666,C);").unwrap();
        let path = scratch("tree.nwk");
        let format = NewickFormat {
            support_decimals: Some(0),
        };

        write_tree(Some(&path), &tree, &format).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "((A,B)67,C);\n");
        std::fs::remove_file(path).unwrap();
    }
}
