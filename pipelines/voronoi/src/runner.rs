//! 程序运行函数.

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use log::{debug, info, warn};
use mri_berry::dataset;
use mri_berry::pipeline::{self, PipelineError, VoronoiConfig};
use mri_berry::table::LabelTable;
use rayon::prelude::*;
use utils::loader;

use crate::result::{BatchResult, FileOutcome};
use crate::Args;

/// 参数未给出且无法从环境变量或主目录推断时的错误.
fn not_found(what: &str) -> PipelineError {
    io::Error::new(io::ErrorKind::NotFound, format!("cannot locate {what}")).into()
}

/// 实际运行.
///
/// 目录、查找表或线程池准备失败时返回 `Err`; 单个文件的失败记录在返回的 [`BatchResult`] 中.
pub fn run(args: &Args) -> Result<BatchResult, PipelineError> {
    let dir = match &args.dir {
        Some(d) => d.clone(),
        None => loader::segmented_dir_from_env_or_home().ok_or_else(|| not_found("segmentation directory"))?,
    };
    let table_path = match &args.table {
        Some(t) => t.clone(),
        None => loader::label_table_from_env_or_home().ok_or_else(|| not_found("label table"))?,
    };

    let table = LabelTable::open(&table_path)?;
    let config = VoronoiConfig::default();
    debug!("{config:?}");

    let paths = dataset::segmentation_paths(&dir, &config.input_suffix)?;
    if paths.is_empty() {
        warn!(
            "No file ending with `{}` in `{}`",
            config.input_suffix,
            dir.display()
        );
    }

    let jobs = args.jobs.unwrap_or_else(utils::cpus).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    info!(
        "Subparcellating {} files in `{}` with {jobs} jobs...",
        paths.len(),
        dir.display()
    );
    let start = Instant::now();
    let outcomes: Vec<(PathBuf, FileOutcome)> = pool.install(|| {
        paths
            .par_iter()
            .map(|p| {
                let t = Instant::now();
                let outcome = match pipeline::process_file(p, &table, &config) {
                    Ok(out) => {
                        info!("Done: `{}`", out.display());
                        FileOutcome::Done {
                            output: out,
                            elapsed: t.elapsed(),
                        }
                    }
                    Err(e) => {
                        warn!("Failed: `{}`: {e}", p.display());
                        FileOutcome::Failed(e.to_string())
                    }
                };
                (p.clone(), outcome)
            })
            .collect()
    });

    Ok(BatchResult::new(outcomes, start.elapsed()))
}
