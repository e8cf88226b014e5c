//! 将标签图重编号为连续标签, 以便在 nifti 查看器中获得更好的显示效果.
//!
//! - 默认进行顺序重编号: `[0, 1, 2, 1000, 1001] -> [0, 1, 2, 3, 4]`;
//! - 给出 `--structures` 时, 按查找表中的 `Structure` 列合并为结构类别.
//!
//! 结果与输入位于同一目录, 文件名追加后缀.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn, LevelFilter};
use mri_berry::consts::{SUFFIX_META, SUFFIX_RELABELED};
use mri_berry::dataset::out_path_with_suffix;
use mri_berry::pipeline::{relabel_volume, relabel_volume_to_structures, PipelineError};
use mri_berry::table::{LabelTable, TableError};
use mri_berry::{save_label_slice, LabelVolume, ScalarVolume};

/// 命令行参数.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 输入标签图 (`.nii` 或 `.nii.gz`).
    input: PathBuf,

    /// `;` 分隔的标签查找表. 给出时按 `Structure` 列进行结构类别重编号.
    #[arg(short, long)]
    structures: Option<PathBuf>,

    /// 输出文件名后缀. 默认为 `_relabeled` (顺序重编号) 或 `_meta` (结构类别重编号).
    #[arg(long)]
    suffix: Option<String>,

    /// 将中间水平切片保存为灰度 PNG.
    #[arg(long)]
    png: Option<PathBuf>,

    /// 将所用的映射表 (`;` 分隔) 保存到该路径.
    #[arg(long)]
    map: Option<PathBuf>,
}

/// 以 `write` 将映射表写入 `path`.
fn write_map<F>(path: Option<&Path>, write: F) -> Result<(), PipelineError>
where
    F: FnOnce(File) -> csv::Result<()>,
{
    if let Some(path) = path {
        write(File::create(path)?).map_err(TableError::from)?;
        info!("Mapping written to `{}`", path.display());
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), PipelineError> {
    let volume = ScalarVolume::open(&args.input)?;

    let (relabeled, suffix): (LabelVolume, &str) = match &args.structures {
        Some(table) => {
            let table = LabelTable::open(table)?.structure_table();
            let (v, map) = relabel_volume_to_structures(&volume, &table)?;
            info!("{} structures", map.len());
            write_map(args.map.as_deref(), |f| map.write_table(f))?;
            (v, SUFFIX_META)
        }
        None => {
            let (v, map) = relabel_volume(&volume)?;
            info!("{} distinct non-zero labels", map.len());
            write_map(args.map.as_deref(), |f| map.write_table(f))?;
            (v, SUFFIX_RELABELED)
        }
    };

    let output = out_path_with_suffix(&args.input, args.suffix.as_deref().unwrap_or(suffix));
    relabeled.save(&output)?;
    info!("Saved `{}`", output.display());

    if let Some(png) = &args.png {
        match relabeled.middle_slice() {
            Some((z, slice)) => {
                save_label_slice(slice, png)?;
                info!("Slice {z} saved to `{}`", png.display());
            }
            None => warn!("`{}` has no slice, skip `{}`", output.display(), png.display()),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
    {
        eprintln!("failed to initialise logger: {e}");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("`{}`: {e}", args.input.display());
            ExitCode::FAILURE
        }
    }
}
