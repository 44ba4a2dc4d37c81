use crate::error::Result;
use crate::types::PageRecord;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Line-oriented sink for crawl results. Each page's records are flushed
/// before the next page is requested.
pub struct LinkLogger<W: Write> {
    out: W,
    written: usize,
}

impl LinkLogger<BufWriter<File>> {
    /// Starts a fresh link log at `path`, creating parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> LinkLogger<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn append(&mut self, records: &[PageRecord]) -> Result<()> {
        for record in records {
            writeln!(self.out, "{}", record)?;
        }
        self.out.flush()?;
        self.written += records.len();
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Reads the link log back as raw lines, without trailing newlines.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageStatus;

    #[test]
    fn test_append_writes_one_line_per_record() {
        let mut logger = LinkLogger::new(Vec::new());
        logger
            .append(&[
                PageRecord::found(1, "https://h/1/", "https://h/a.jpg"),
                PageRecord::found(1, "https://h/1/", "https://h/b.jpg"),
            ])
            .unwrap();
        logger
            .append(&[PageRecord::failed(2, PageStatus::NoImage, "https://h/2/")])
            .unwrap();

        assert_eq!(logger.written(), 3);
        let text = String::from_utf8(logger.into_inner()).unwrap();
        assert_eq!(
            text,
            "1,1,https://h/1/,https://h/a.jpg\n1,1,https://h/1/,https://h/b.jpg\n2,2,https://h/2/,failed\n"
        );
    }

    #[test]
    fn test_create_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parser").join("image_links.txt");

        let mut logger = LinkLogger::create(&path).unwrap();
        logger
            .append(&[PageRecord::failed(9, PageStatus::Timeout, "https://h/9/")])
            .unwrap();
        drop(logger);

        assert_eq!(read_lines(&path).unwrap(), vec!["9,3,https://h/9/,failed"]);
    }
}
