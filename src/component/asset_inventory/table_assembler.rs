//! 報表組裝
//!
//! Every (entity, field) pair becomes a job. A dispatcher thread feeds the
//! jobs through a bounded queue to a fixed pool of workers; each worker
//! evaluates its field and writes the cell under the table lock. `assemble`
//! returns only after every dispatched job has been acknowledged.

use super::field_evaluator::{Entity, FieldEvaluator};
use crate::config::Config;
use anyhow::{Context, Result, anyhow, bail};
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::sync::Mutex;
use std::thread;

/// Workers per available CPU.
const WORKERS_PER_CPU: usize = 2;

/// 組裝狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Pending,
    Dispatching,
    Draining,
    Complete,
}

/// 報表：第 0 列為欄位名稱，其後每列對應一筆資料
#[derive(Debug)]
pub struct Table {
    cells: Mutex<Vec<Vec<String>>>,
}

impl Table {
    #[must_use]
    pub fn new(labels: &[String], data_rows: usize) -> Self {
        let mut cells = vec![vec![String::new(); labels.len()]; data_rows + 1];
        cells[0] = labels.to_vec();
        Self {
            cells: Mutex::new(cells),
        }
    }

    /// 寫入單一儲存格；`row` 以資料列計算（不含標題列）
    pub fn set(&self, row: usize, column: usize, value: String) -> Result<()> {
        let mut cells = self
            .cells
            .lock()
            .map_err(|e| anyhow!("Lock failed: {e}"))?;
        let cell = cells
            .get_mut(row + 1)
            .and_then(|r| r.get_mut(column))
            .ok_or_else(|| anyhow!("cell ({row}, {column}) is outside the table"))?;
        *cell = value;
        Ok(())
    }

    pub fn into_rows(self) -> Result<Vec<Vec<String>>> {
        self.cells
            .into_inner()
            .map_err(|e| anyhow!("Mutex poisoned: {e}"))
    }
}

/// One cell to compute.
#[derive(Debug)]
struct Job<'a> {
    row: usize,
    column: usize,
    field: &'a str,
    entity: &'a Entity,
}

pub struct TableAssembler<'a> {
    evaluator: &'a FieldEvaluator,
    workers: usize,
    verbose: bool,
    show_progress: bool,
    state: AssemblyState,
}

impl<'a> TableAssembler<'a> {
    #[must_use]
    pub fn new(evaluator: &'a FieldEvaluator) -> Self {
        Self {
            evaluator,
            workers: num_cpus::get() * WORKERS_PER_CPU,
            verbose: false,
            show_progress: true,
            state: AssemblyState::Pending,
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[must_use]
    pub const fn state(&self) -> AssemblyState {
        self.state
    }

    fn transition(&mut self, state: AssemblyState) {
        debug!("table assembly: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Builds the jobs for every entity and its category's fields.
    fn jobs<'e>(config: &'e Config, entities: &'e [Entity]) -> Result<Vec<Job<'e>>> {
        let mut jobs = Vec::new();
        for (row, entity) in entities.iter().enumerate() {
            let fields = match entity {
                Entity::Sequence(_) => &config.seq.fields,
                Entity::Movie(_) => &config.mov.fields,
            };
            for field in fields {
                let column = config
                    .column_of(&field.name)
                    .with_context(|| format!("field {:?} has no column", field.name))?;
                jobs.push(Job {
                    row,
                    column,
                    field: &field.name,
                    entity,
                });
            }
        }
        Ok(jobs)
    }

    /// 平行計算所有儲存格並回傳完整報表
    pub fn assemble(&mut self, config: &Config, entities: &[Entity]) -> Result<Vec<Vec<String>>> {
        if self.state != AssemblyState::Pending {
            bail!("table assembler already used");
        }

        let table = Table::new(&config.fields, entities.len());
        let jobs = Self::jobs(config, entities)?;
        let total = jobs.len();
        info!(
            "evaluating {total} cells for {} entities with {} workers",
            entities.len(),
            self.workers
        );

        let progress_bar = if self.show_progress {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );

        self.transition(AssemblyState::Dispatching);
        let evaluator = self.evaluator;
        let verbose = self.verbose;
        let workers = self.workers;
        let (sender, receiver) = bounded::<Job<'_>>(workers * 2);

        let acknowledged = thread::scope(|scope| -> Result<usize> {
            let mut handles = Vec::with_capacity(workers);
            for worker_id in 0..workers {
                let receiver = receiver.clone();
                let table = &table;
                let progress_bar = &progress_bar;
                let handle = thread::Builder::new()
                    .name(format!("seqinfo-worker-{worker_id}"))
                    .spawn_scoped(scope, move || -> Result<usize> {
                        let mut done = 0;
                        while let Ok(job) = receiver.recv() {
                            match evaluator.evaluate(job.field, job.entity) {
                                Ok(value) => table.set(job.row, job.column, value)?,
                                Err(e) => {
                                    if verbose {
                                        warn!("failed to execute {}: {e}", job.field);
                                    }
                                }
                            }
                            done += 1;
                            progress_bar.inc(1);
                        }
                        Ok(done)
                    })
                    .context("Failed to spawn worker thread")?;
                handles.push(handle);
            }
            drop(receiver);

            let dispatcher = thread::Builder::new()
                .name("seqinfo-dispatch".to_string())
                .spawn_scoped(scope, move || {
                    let mut sent = 0;
                    for job in jobs {
                        if sender.send(job).is_err() {
                            break;
                        }
                        sent += 1;
                    }
                    // Dropping the sender lets the workers drain the queue and stop.
                    sent
                })
                .context("Failed to spawn dispatch thread")?;

            let dispatched = dispatcher
                .join()
                .map_err(|_| anyhow!("dispatch thread panicked"))?;
            debug!("dispatched {dispatched} jobs");
            self.transition(AssemblyState::Draining);

            let mut acknowledged = 0;
            for handle in handles {
                acknowledged += handle
                    .join()
                    .map_err(|_| anyhow!("worker thread panicked"))??;
            }
            if acknowledged != dispatched {
                bail!("{acknowledged} of {dispatched} jobs acknowledged");
            }
            Ok(acknowledged)
        })?;

        progress_bar.finish_and_clear();
        if acknowledged != total {
            bail!("{acknowledged} of {total} jobs completed");
        }

        let rows = table.into_rows()?;
        self.transition(AssemblyState::Complete);
        Ok(rows)
    }
}
