//! 对目录下所有 SynthSeg 分割结果进行脑白质 Voronoi 子分区.
//!
//! 每个 `*_MP2RAGE_synthseg_labels.nii.gz` 会在同一目录下生成对应的
//! `*_MP2RAGE_WM_voronoi_labels.nii.gz`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, LevelFilter};

mod result;
mod runner;

/// 命令行参数.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// 分割结果目录. 默认为 `$MLD_T1_SEGMENTED_DIR`, 其次为 `$HOME/dataset/temp_images/T1_images_segm`.
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// `;` 分隔的标签查找表. 默认为 `$MLD_LABEL_TABLE`, 其次为 `$HOME/dataset/freesurfer_labelmap.csv`.
    #[arg(short, long)]
    table: Option<PathBuf>,

    /// 同时处理的文件个数. 默认为可用核心数.
    #[arg(short, long)]
    jobs: Option<usize>,

    /// 输出调试日志.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialise logger: {e}");
    }

    match runner::run(&args) {
        Ok(res) => {
            res.analyze();
            if res.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
