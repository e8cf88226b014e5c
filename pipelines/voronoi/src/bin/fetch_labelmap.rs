//! 由 `FreeSurferColorLUT.txt` 生成子分区所用的标签查找表.
//!
//! 1. 读取 `$FREESURFER_HOME/FreeSurferColorLUT.txt`;
//! 2. 收集分割结果目录下所有标签图中实际出现的标签值, 只保留这些行;
//! 3. 按标签名合并人工整理的 `Label;Structure` 表, 并由标签名推断半球;
//! 4. 写出 `;` 分隔的查找表.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn, LevelFilter};
use mri_berry::consts::{SUFFIX_LABEL_MAP, TABLE_DELIMITER};
use mri_berry::pipeline::{build_label_table, used_label_ids, PipelineError};
use mri_berry::table::{parse_freesurfer_lut, read_structure_names, TableError};
use utils::loader;

/// 命令行参数.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 分割结果目录. 默认为 `$MLD_T1_SEGMENTED_DIR`, 其次为 `$HOME/dataset/temp_images/T1_images_segm`.
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// FreeSurfer 颜色查找表. 默认为 `$FREESURFER_HOME/FreeSurferColorLUT.txt`.
    #[arg(long)]
    lut: Option<PathBuf>,

    /// 人工整理的 `;` 分隔 `Label;Structure` 表. 未给出时结构类别一律留空.
    #[arg(short, long)]
    structures: Option<PathBuf>,

    /// 输出路径. 默认为 `$MLD_LABEL_TABLE`, 其次为 `$HOME/dataset/freesurfer_labelmap.csv`.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn not_found(what: &str) -> PipelineError {
    io::Error::new(io::ErrorKind::NotFound, format!("cannot locate {what}")).into()
}

fn read_structures(path: Option<&Path>) -> Result<BTreeMap<String, String>, PipelineError> {
    let Some(path) = path else {
        warn!("No structure table given, `Structure` column left blank");
        return Ok(BTreeMap::new());
    };
    let file = File::open(path)?;
    Ok(read_structure_names(BufReader::new(file), TABLE_DELIMITER)?)
}

fn run(args: &Args) -> Result<(), PipelineError> {
    let lut_path = match &args.lut {
        Some(p) => p.clone(),
        None => loader::freesurfer_lut_from_env().ok_or_else(|| not_found("`$FREESURFER_HOME`"))?,
    };
    let dir = match &args.dir {
        Some(d) => d.clone(),
        None => loader::segmented_dir_from_env_or_home().ok_or_else(|| not_found("segmentation directory"))?,
    };
    let output = match &args.output {
        Some(o) => o.clone(),
        None => loader::label_table_from_env_or_home().ok_or_else(|| not_found("output path"))?,
    };

    let lut = parse_freesurfer_lut(BufReader::new(File::open(&lut_path)?))?;
    info!("{} entries in `{}`", lut.len(), lut_path.display());

    let used = used_label_ids(&dir, SUFFIX_LABEL_MAP)?;
    info!("{} distinct labels used in `{}`", used.len(), dir.display());

    let structures = read_structures(args.structures.as_deref())?;
    let table = build_label_table(lut, &used, &structures);
    if table.len() < used.len() {
        warn!("{} used labels are missing from the LUT", used.len() - table.len());
    }

    table
        .write_table(File::create(&output)?)
        .map_err(TableError::from)?;
    info!("{} rows written to `{}`", table.len(), output.display());
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
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
