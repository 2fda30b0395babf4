//! Conversion facade: format inference, registry lookup, decode, encode

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{BatchMode, Config};
use crate::error::{Error, Result};
use crate::infer::infer_format;
use crate::model::Table;
use crate::registry::Registry;

/// Formats the registry can read and write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatList {
    pub read: Vec<String>,
    pub write: Vec<String>,
}

/// Outcome of a best-effort batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Destinations written, in input order
    pub converted: Vec<PathBuf>,
    /// Sources that failed, with their error, in input order
    pub failed: Vec<(PathBuf, Error)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Converts files between formats through the canonical table
pub struct Engine<'r> {
    registry: &'r Registry,
    config: Config,
}

impl Default for Engine<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine<'static> {
    /// An engine over the global registry with default options
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// An engine over the global registry
    pub fn with_config(config: Config) -> Self {
        Self {
            registry: Registry::global(),
            config,
        }
    }
}

impl<'r> Engine<'r> {
    /// An engine over a caller-built registry
    pub fn with_registry(registry: &'r Registry, config: Config) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Convert one file. The source format is always inferred from its
    /// extension; the destination format is `to` or inferred.
    pub fn convert(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        to: Option<&str>,
    ) -> Result<PathBuf> {
        let source = source.as_ref();
        let destination = destination.as_ref();

        let from = infer_format(source)?;
        let to = match to {
            Some(name) => name,
            None => infer_format(destination)?,
        };

        let decoder = self.registry.decoder(from, &self.config)?;
        let encoder = self.registry.encoder(to, &self.config)?;

        let table = decoder.decode(source)?;
        encoder.encode(&table, destination)?;

        info!(
            source = %source.display(),
            destination = %destination.display(),
            from,
            to,
            rows = table.row_count(),
            "converted"
        );
        Ok(destination.to_path_buf())
    }

    /// Convert many files into `output_dir/<stem>.<to>`, honouring the
    /// configured batch mode. Fail-fast stops at the first error, leaving
    /// earlier outputs on disk.
    pub fn batch_convert<P: AsRef<Path> + Sync>(
        &self,
        sources: &[P],
        output_dir: impl AsRef<Path>,
        to: &str,
    ) -> Result<Vec<PathBuf>> {
        let output_dir = output_dir.as_ref();
        create_output_dir(output_dir)?;

        match self.config.batch.mode {
            BatchMode::FailFast => {
                if self.run_parallel(sources) {
                    self.convert_all_parallel(sources, output_dir, to)
                        .into_iter()
                        .collect()
                } else {
                    sources
                        .iter()
                        .map(|source| self.convert_into(source.as_ref(), output_dir, to))
                        .collect()
                }
            }
            BatchMode::BestEffort => {
                let report = self.collect_report(sources, output_dir, to);
                for (source, err) in &report.failed {
                    warn!(source = %source.display(), error = %err, "batch entry failed");
                }
                Ok(report.converted)
            }
        }
    }

    /// Convert every source, collecting failures instead of stopping
    pub fn batch_convert_report<P: AsRef<Path> + Sync>(
        &self,
        sources: &[P],
        output_dir: impl AsRef<Path>,
        to: &str,
    ) -> Result<BatchReport> {
        let output_dir = output_dir.as_ref();
        create_output_dir(output_dir)?;
        Ok(self.collect_report(sources, output_dir, to))
    }

    /// Read a file into a validated table
    pub fn parse(&self, source: impl AsRef<Path>, format: Option<&str>) -> Result<Table> {
        let source = source.as_ref();
        let format = match format {
            Some(name) => name,
            None => infer_format(source)?,
        };
        self.registry.decoder(format, &self.config)?.decode(source)
    }

    /// Write a table to a file
    pub fn serialize(
        &self,
        table: &Table,
        destination: impl AsRef<Path>,
        format: Option<&str>,
    ) -> Result<PathBuf> {
        let destination = destination.as_ref();
        let format = match format {
            Some(name) => name,
            None => infer_format(destination)?,
        };
        self.registry
            .encoder(format, &self.config)?
            .encode(table, destination)?;
        Ok(destination.to_path_buf())
    }

    /// Formats available for reading and writing
    pub fn formats(&self) -> FormatList {
        FormatList {
            read: self.registry.readable_formats(),
            write: self.registry.writable_formats(),
        }
    }

    fn convert_into(&self, source: &Path, output_dir: &Path, to: &str) -> Result<PathBuf> {
        self.convert(source, batch_destination(source, output_dir, to), Some(to))
    }

    fn collect_report<P: AsRef<Path> + Sync>(
        &self,
        sources: &[P],
        output_dir: &Path,
        to: &str,
    ) -> BatchReport {
        let results: Vec<Result<PathBuf>> = if self.run_parallel(sources) {
            self.convert_all_parallel(sources, output_dir, to)
        } else {
            sources
                .iter()
                .map(|source| self.convert_into(source.as_ref(), output_dir, to))
                .collect()
        };

        let mut report = BatchReport::default();
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(path) => report.converted.push(path),
                Err(err) => report.failed.push((source.as_ref().to_path_buf(), err)),
            }
        }
        report
    }

    fn convert_all_parallel<P: AsRef<Path> + Sync>(
        &self,
        sources: &[P],
        output_dir: &Path,
        to: &str,
    ) -> Vec<Result<PathBuf>> {
        sources
            .par_iter()
            .map(|source| self.convert_into(source.as_ref(), output_dir, to))
            .collect()
    }

    /// Parallel only when asked for and every destination is distinct
    fn run_parallel<P: AsRef<Path>>(&self, sources: &[P]) -> bool {
        if !self.config.batch.parallel || sources.len() < 2 {
            return false;
        }

        let mut stems: FxHashSet<&OsStr> = FxHashSet::default();
        let distinct = sources.iter().all(|s| stems.insert(stem_of(s.as_ref())));
        if !distinct {
            debug!("duplicate source stems, running batch sequentially");
        }
        distinct
    }
}

fn create_output_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir).map_err(|e| Error::encode("batch", output_dir, e))
}

fn stem_of(source: &Path) -> &OsStr {
    source.file_stem().unwrap_or_else(|| source.as_os_str())
}

/// `output_dir/<stem>.<to>`
fn batch_destination(source: &Path, output_dir: &Path, to: &str) -> PathBuf {
    let mut name = stem_of(source).to_os_string();
    name.push(".");
    name.push(to.to_lowercase());
    output_dir.join(name)
}
