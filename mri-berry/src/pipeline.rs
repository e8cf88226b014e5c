//! 脑白质 Voronoi 子分区流水线.
//!
//! 对每个半球:
//!
//! 1. 根据查找表选出种子标签 (去掉白质等结构、背景和对侧标签) 和白质标签;
//! 2. 以白质为待细分掩膜, 以种子标签为种子, 按体素实际分辨率进行 Voronoi 子分区.
//!
//! 最后将两个半球的结果合并.
//!
//! 所需的查找表可由 [`used_label_ids`] 与 [`build_label_table`] 从 FreeSurfer LUT 生成.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::Array3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{
    BACKGROUND_LABEL, LEFT_CEREBRAL_WM, NON_SEED_STRUCTURES, RIGHT_CEREBRAL_WM, SUFFIX_LABEL_MAP,
    SUFFIX_WM_VORONOI,
};
use crate::data::{LabelVolume, NiftiHeaderAttr, ScalarVolume};
use crate::dataset::{replace_suffix, segmentation_loader};
use crate::error::{LabelError, LabelResult};
use crate::relabel::{relabel_ordinal, relabel_to_structures, RelabelMap, StructureMap, StructureTable};
use crate::table::{Hemisphere, LabelTable, TableError};
use crate::voronoi::{combine_hemispheres, VoxelSpacing};

/// 流水线错误.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// nii 文件读写错误.
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),

    /// 子分区或重编号错误.
    #[error(transparent)]
    Label(#[from] LabelError),

    /// 查找表错误.
    #[error(transparent)]
    Table(#[from] TableError),

    /// 图像保存错误.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// 文件系统错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 文件名不以输入后缀结尾.
    #[error("`{path}` does not end with `{suffix}`")]
    UnexpectedFileName {
        /// 输入文件.
        path: PathBuf,
        /// 期望的后缀.
        suffix: String,
    },
}

/// 白质子分区配置.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoronoiConfig {
    /// 左半球白质标签名.
    pub left_wm_labels: Vec<String>,

    /// 右半球白质标签名.
    pub right_wm_labels: Vec<String>,

    /// 不作为种子的结构类别.
    pub non_seed_structures: Vec<String>,

    /// 背景标签名.
    pub background_label: String,

    /// 输入分割文件名后缀.
    pub input_suffix: String,

    /// 输出文件名后缀.
    pub output_suffix: String,
}

impl Default for VoronoiConfig {
    fn default() -> Self {
        Self {
            left_wm_labels: vec![LEFT_CEREBRAL_WM.to_string()],
            right_wm_labels: vec![RIGHT_CEREBRAL_WM.to_string()],
            non_seed_structures: NON_SEED_STRUCTURES.map(String::from).to_vec(),
            background_label: BACKGROUND_LABEL.to_string(),
            input_suffix: SUFFIX_LABEL_MAP.to_string(),
            output_suffix: SUFFIX_WM_VORONOI.to_string(),
        }
    }
}

impl VoronoiConfig {
    /// 获取某一侧的白质标签名.
    #[inline]
    pub fn wm_labels(&self, hemisphere: Hemisphere) -> &[String] {
        match hemisphere {
            Hemisphere::Left => &self.left_wm_labels,
            Hemisphere::Right => &self.right_wm_labels,
        }
    }

    /// 由输入文件路径得到输出文件路径. 文件名不以输入后缀结尾时返回 `None`.
    #[inline]
    pub fn output_path(&self, input: &Path) -> Option<PathBuf> {
        replace_suffix(input, &self.input_suffix, &self.output_suffix)
    }
}

/// 单个半球子分区所需的标签集合.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HemisphereIds {
    /// 所属半球.
    pub hemisphere: Hemisphere,

    /// 种子标签.
    pub seeds: Vec<i32>,

    /// 待细分的白质标签.
    pub white_matter: Vec<i32>,
}

impl HemisphereIds {
    /// 从查找表中选出 `hemisphere` 一侧的种子标签和白质标签.
    ///
    /// - 种子: 结构类别不在 `config.non_seed_structures` 中, 标签名不是背景, 且不属于对侧;
    ///   不属于任何一侧的结构 (如脑干) 两侧都会使用;
    /// - 白质: 标签名在该侧白质标签名列表中.
    ///
    /// 超出 `i32` 范围的标签不可能出现在标签图中, 因此会被忽略.
    pub fn from_table(table: &LabelTable, hemisphere: Hemisphere, config: &VoronoiConfig) -> Self {
        let opposite = hemisphere.opposite();
        let seeds = table
            .records()
            .iter()
            .filter(|r| {
                !r.structure
                    .as_ref()
                    .is_some_and(|s| config.non_seed_structures.contains(s))
            })
            .filter(|r| r.label != config.background_label)
            .filter(|r| r.hemisphere != Some(opposite))
            .filter_map(|r| i32::try_from(r.id).ok())
            .collect();

        let wm_labels = config.wm_labels(hemisphere);
        let white_matter = table
            .records()
            .iter()
            .filter(|r| wm_labels.contains(&r.label))
            .filter_map(|r| i32::try_from(r.id).ok())
            .collect();

        Self {
            hemisphere,
            seeds,
            white_matter,
        }
    }
}

/// 对单个半球进行子分区.
fn subparcellate_hemisphere(
    volume: &LabelVolume,
    ids: &HemisphereIds,
    spacing: &VoxelSpacing,
) -> LabelResult<Array3<i32>> {
    let seeds = volume.keep_labels(&ids.seeds);
    let white_matter = volume.keep_labels(&ids.white_matter);
    debug!(
        "{} hemisphere: {} seed labels, {} white matter labels",
        ids.hemisphere,
        ids.seeds.len(),
        ids.white_matter.len()
    );

    #[cfg(feature = "rayon")]
    let ans = crate::voronoi::par_voronoi_subparcellate(
        white_matter.view(),
        seeds.view(),
        Some(spacing.as_slice()),
    );
    #[cfg(not(feature = "rayon"))]
    let ans = crate::voronoi::voronoi_subparcellate(
        white_matter.view(),
        seeds.view(),
        Some(spacing.as_slice()),
    );
    ans
}

/// 对一个分割标签图进行两侧白质 Voronoi 子分区, 返回合并后的标签图.
///
/// 结果沿用 `volume` 的 header. 任一半球子分区失败或两侧结果重叠时, 返回对应的 [`LabelError`].
pub fn subparcellate_white_matter(
    volume: &LabelVolume,
    table: &LabelTable,
    config: &VoronoiConfig,
) -> LabelResult<LabelVolume> {
    let spacing = volume.spacing()?;
    let left = HemisphereIds::from_table(table, Hemisphere::Left, config);
    let right = HemisphereIds::from_table(table, Hemisphere::Right, config);

    let left = subparcellate_hemisphere(volume, &left, &spacing)?;
    let right = subparcellate_hemisphere(volume, &right, &spacing)?;
    let whole = combine_hemispheres(left.view(), right.view())?;
    Ok(volume.with_data(whole))
}

/// 读取 `input`, 完成白质子分区, 并保存到由 [`VoronoiConfig::output_path`] 给出的路径.
///
/// 成功时返回输出路径.
pub fn process_file(
    input: &Path,
    table: &LabelTable,
    config: &VoronoiConfig,
) -> Result<PathBuf, PipelineError> {
    let output = config
        .output_path(input)
        .ok_or_else(|| PipelineError::UnexpectedFileName {
            path: input.to_owned(),
            suffix: config.input_suffix.clone(),
        })?;

    let volume = LabelVolume::open(input)?;
    let ans = subparcellate_white_matter(&volume, table, config)?;
    ans.save(&output)?;
    debug!("`{}` -> `{}`", input.display(), output.display());
    Ok(output)
}

/// 对按标量图读取的标签图进行顺序重编号, 结果沿用其 header.
pub fn relabel_volume(volume: &ScalarVolume) -> LabelResult<(LabelVolume, RelabelMap)> {
    let (data, map) = relabel_ordinal(volume.data())?;
    Ok((LabelVolume::from_header(volume.header(), data)?, map))
}

/// 对按标量图读取的标签图进行结构类别重编号, 结果沿用其 header.
pub fn relabel_volume_to_structures(
    volume: &ScalarVolume,
    table: &StructureTable,
) -> LabelResult<(LabelVolume, StructureMap)> {
    let (data, map) = relabel_to_structures(volume.data(), table)?;
    Ok((LabelVolume::from_header(volume.header(), data)?, map))
}

/// 收集 `dir` 下所有文件名以 `suffix` 结尾的分割标签图中出现过的标签值, 包括背景.
///
/// 任一文件读取失败时返回 `Err`.
pub fn used_label_ids<P: AsRef<Path>>(dir: P, suffix: &str) -> Result<BTreeSet<i64>, PipelineError> {
    let mut ans = BTreeSet::new();
    for (path, volume) in segmentation_loader(dir, suffix)? {
        let counts = volume?.label_counts();
        debug!("`{}`: {} labels", path.display(), counts.len());
        ans.extend(counts.into_keys().map(i64::from));
    }
    Ok(ans)
}

/// 由 FreeSurfer LUT 条目生成查找表.
///
/// 只保留 `used` 中的标签. 结构类别按标签名从 `structures` 中查得, 半球由标签名推断.
pub fn build_label_table<I>(
    lut: I,
    used: &BTreeSet<i64>,
    structures: &BTreeMap<String, String>,
) -> LabelTable
where
    I: IntoIterator<Item = (i64, String)>,
{
    let mut table = LabelTable::from_lut(lut, |label| structures.get(label).cloned());
    table.retain_ids(used);
    table
}
