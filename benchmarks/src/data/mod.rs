/// Utilities to load from files or generate keyed event streams for the
/// estimator runs.
use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    iter::Iterator,
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;

pub mod synth;

/// A replayable stream of keys; every event counts for one occurrence.
/// `iter` must yield the same stream on every call, so the ground-truth pass
/// and the estimator passes see identical data.
pub trait Dataset: fmt::Display {
    type Key;

    fn iter(&self) -> Box<dyn Iterator<Item = Self::Key>>;
}

/// One gzipped file, one key per line.
#[derive(Clone, Debug)]
pub struct FileDataset {
    path: PathBuf,
    max_lines: usize,
}

impl FileDataset {
    pub fn new(path: impl AsRef<Path>, max_lines: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_lines,
        }
    }
}

impl fmt::Display for FileDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.file_name().unwrap().to_str().unwrap())
    }
}

impl Dataset for FileDataset {
    type Key = String;

    fn iter(&self) -> Box<dyn Iterator<Item = Self::Key>> {
        Box::new(
            BufReader::new(GzDecoder::new(File::open(&self.path).unwrap()))
                .lines()
                .take(self.max_lines)
                .map(|line| line.unwrap()),
        )
    }
}
