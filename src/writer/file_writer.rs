// Append-only file sink, the default destination for download tasks.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use super::traits::ByteSink;

pub struct FileWriter {
    file: File,
    offset: u64,
}

impl FileWriter {
    /// Open (or create) `path` for appending. Existing content is preserved
    /// so a resumed task can pick up where the file ends.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("cannot open output file {}", path.display()))?;
        let offset = file
            .metadata()
            .with_context(|| format!("cannot stat output file {}", path.display()))?
            .len();
        Ok(Self { file, offset })
    }
}

impl ByteSink for FileWriter {
    fn append(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write_all(data)?;
        self.offset += data.len() as u64;
        Ok(data.len())
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn truncate(&mut self) -> io::Result<()> {
        self.file.set_len(0)?;
        self.offset = 0;
        Ok(())
    }

    fn remaining_capacity(&self) -> u64 {
        u64::MAX
    }
}
