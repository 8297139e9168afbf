// Feed module entrypoint
pub mod normaliser; // converts strings -> ticks/shares
pub mod parser;     // one record -> OrderEvent

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{PricerError, Result};

/// Line-oriented feed source. Yields `(line_number, record)` pairs, skipping
/// blank lines. A line that is not valid UTF-8 is a bad record, not a read
/// failure; only read errors end the feed.
pub struct FeedReader<R> {
    inner: R,
    line_no: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> FeedReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, line_no: 0, buf: Vec::new() }
    }
}

impl FeedReader<BufReader<File>> {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Iterator for FeedReader<R> {
    type Item = io::Result<(usize, Result<String>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let record = match std::str::from_utf8(&self.buf) {
                        Ok(text) => {
                            let line = text.trim();
                            if line.is_empty() {
                                continue;
                            }
                            Ok(line.to_string())
                        }
                        Err(_) => Err(PricerError::format(
                            String::from_utf8_lossy(&self.buf).trim(),
                            "record is not valid UTF-8",
                        )),
                    };
                    return Some(Ok((self.line_no, record)));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
