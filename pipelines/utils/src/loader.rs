//! 对 `mri-berry::dataset` 的更一层封装. 提供更直接的数据集路径.

use mri_berry::consts::FREESURFER_LUT;
use mri_berry::dataset;
use std::env;
use std::path::PathBuf;

/// 存放 SynthSeg 分割结果的目录所对应的环境变量.
pub const SEGMENTED_DIR_ENV: &str = "MLD_T1_SEGMENTED_DIR";

/// FreeSurfer 安装目录所对应的环境变量.
pub const FREESURFER_HOME_ENV: &str = "FREESURFER_HOME";

/// 标签查找表所对应的环境变量.
pub const LABEL_TABLE_ENV: &str = "MLD_LABEL_TABLE";

/// 获取 T1 分割结果基本路径.
///
/// 1. 若环境变量 `$MLD_T1_SEGMENTED_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/temp_images/T1_images_segm`.
///
/// 两者都无法获取时返回 `None`.
pub fn segmented_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var(SEGMENTED_DIR_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with(["temp_images", "T1_images_segm"]),
    }
}

/// 获取标签查找表路径.
///
/// 1. 若环境变量 `$MLD_LABEL_TABLE` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/freesurfer_labelmap.csv`.
pub fn label_table_from_env_or_home() -> Option<PathBuf> {
    match env::var(LABEL_TABLE_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with(["freesurfer_labelmap.csv"]),
    }
}

/// 获取 `$FREESURFER_HOME/FreeSurferColorLUT.txt`. 环境变量不存在或为空时返回 `None`.
pub fn freesurfer_lut_from_env() -> Option<PathBuf> {
    match env::var(FREESURFER_HOME_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d).join(FREESURFER_LUT)),
        _ => None,
    }
}
