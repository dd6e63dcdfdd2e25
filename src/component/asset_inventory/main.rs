//! 素材清單主模組
//!
//! 掃描目錄、建立序列與影片資料、計算欄位並輸出報表

use super::field_evaluator::{Entity, FieldEvaluator, FieldFuncs};
use super::mov_builder::{Mov, MovBuilder};
use super::report_writer::{print_table, write_spreadsheet};
use super::sequence_grouper::{Sequence, SequenceGrouper};
use super::table_assembler::TableAssembler;
use crate::config::Config;
use crate::tools::{
    Ffprobe, MovieProbe, lowercase_extension, scan_media_files, validate_directory_exists,
};
use anyhow::{Context, Result};
use log::{error, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 執行選項（來自命令列）
#[derive(Debug, Clone)]
pub struct InventoryOptions {
    pub search_root: PathBuf,
    pub image_extensions: Vec<String>,
    pub movie_extensions: Vec<String>,
    pub separator: String,
    pub verbose: bool,
    /// Spreadsheet to write; the report is printed when `None`.
    pub output: Option<PathBuf>,
}

/// 掃描結果：依發現順序排列
#[derive(Debug, Default)]
pub struct ScannedAssets {
    pub sequences: Vec<Sequence>,
    pub movies: Vec<Mov>,
}

impl ScannedAssets {
    /// Sequences first, then movies, each in walk order.
    #[must_use]
    pub fn into_entities(self) -> Vec<Entity> {
        self.sequences
            .into_iter()
            .map(Entity::Sequence)
            .chain(self.movies.into_iter().map(Entity::Movie))
            .collect()
    }
}

fn extension_set(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// 掃描目錄下的影像序列與影片
///
/// Runs on the calling thread. A probe failure aborts the scan.
pub fn scan_assets(
    root: &Path,
    image_extensions: &[String],
    movie_extensions: &[String],
    probe: &dyn MovieProbe,
    builder: MovBuilder,
) -> Result<ScannedAssets> {
    let image_extensions = extension_set(image_extensions);
    let movie_extensions = extension_set(movie_extensions);

    let mut grouper = SequenceGrouper::new();
    let mut movies = Vec::new();

    for path in scan_media_files(root)? {
        let Some(ext) = lowercase_extension(&path) else {
            continue;
        };
        if image_extensions.contains(&ext) {
            grouper.push(&path);
        }
        if movie_extensions.contains(&ext) {
            let file = path.to_string_lossy();
            let record = probe
                .probe(&path)
                .with_context(|| format!("could not probe {file}"))?;
            let mov = builder
                .build(&file, &record)
                .with_context(|| format!("could not read video stream of {file}"))?;
            movies.push(mov);
        }
    }

    let assets = ScannedAssets {
        sequences: grouper.finish(),
        movies,
    };
    info!(
        "found {} sequences and {} movies under {}",
        assets.sequences.len(),
        assets.movies.len(),
        root.display()
    );
    Ok(assets)
}

/// 素材清單產生器
pub struct AssetInventory {
    config: Config,
    options: InventoryOptions,
}

impl AssetInventory {
    #[must_use]
    pub const fn new(config: Config, options: InventoryOptions) -> Self {
        Self { config, options }
    }

    pub fn run(&self) -> Result<()> {
        self.run_with_probe(&Ffprobe)
    }

    pub fn run_with_probe(&self, probe: &dyn MovieProbe) -> Result<()> {
        let rows = self.build_report(probe)?;

        match &self.options.output {
            Some(path) => {
                // The report is already computed; a failed save is only logged.
                if let Err(e) = write_spreadsheet(&rows, path) {
                    error!("{e:#}");
                }
            }
            None => {
                let stdout = std::io::stdout();
                print_table(&rows, &self.options.separator, &mut stdout.lock())?;
            }
        }
        Ok(())
    }

    /// 產生完整報表（含標題列）
    pub fn build_report(&self, probe: &dyn MovieProbe) -> Result<Vec<Vec<String>>> {
        let options = &self.options;
        validate_directory_exists(&options.search_root)?;

        let funcs = FieldFuncs::new(self.config.allowed_commands.iter().cloned());
        let evaluator = FieldEvaluator::compile(&self.config, funcs)?;

        let assets = scan_assets(
            &options.search_root,
            &options.image_extensions,
            &options.movie_extensions,
            probe,
            MovBuilder::new(options.verbose),
        )?;
        let entities = assets.into_entities();

        TableAssembler::new(&evaluator)
            .with_verbose(options.verbose)
            .assemble(&self.config, &entities)
    }
}
