use anyhow::{anyhow, Context};
use formatx::formatx;
use std::fmt::Debug;
use std::fs::{self, File};
use std::io;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Where the result tables of a run are written. Each table is addressed by a location key
/// (`results`, `results_summary`).
pub trait Output: Debug {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write>;
    /// True when nothing written is kept, so result tables need not be produced at all.
    fn is_noop(&self) -> bool {
        false
    }
}

/// One CSV file per table inside `directory_path`, named by substituting the location key
/// for `{}` in the file template (`house_{}.csv`).
#[derive(Debug)]
pub struct FileOutput {
    directory_path: PathBuf,
    file_template: String,
}

impl FileOutput {
    pub fn new(directory_path: PathBuf, file_template: String) -> Self {
        Self {
            directory_path,
            file_template,
        }
    }

    fn file_name(&self, location_key: &str) -> anyhow::Result<String> {
        formatx!(&self.file_template, location_key)
            .map_err(|err| anyhow!("Invalid output file template {}: {err:?}", self.file_template))
    }
}

impl Output for FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        fs::create_dir_all(&self.directory_path).with_context(|| {
            format!(
                "Could not create output directory {}",
                self.directory_path.display()
            )
        })?;
        let path = self.directory_path.join(self.file_name(location_key)?);
        let file = File::create(&path)
            .with_context(|| format!("Could not create result file {}", path.display()))?;

        Ok(BufWriter::new(file))
    }
}

impl Output for &FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        <FileOutput as Output>::writer_for_location_key(self, location_key)
    }
}

/// Discards the result tables, for callers that only need the returned summary.
#[derive(Debug, Default)]
pub struct SinkOutput;

impl Output for SinkOutput {
    fn writer_for_location_key(&self, _location_key: &str) -> anyhow::Result<impl Write> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        true
    }
}
