//! 基于种子标签的 Voronoi 子分区.
//!
//! 1. [`nearest_seed_transform`]: 对整个数组计算到最近非零种子体素的 (物理) 欧氏距离及其索引;
//! 2. [`voronoi_subparcellate`]: 仅在待细分掩膜内赋予最近种子的标签, 掩膜外一律为 0;
//! 3. [`combine_hemispheres`]: 合并两个互不重叠的半球子分区结果.
//!
//! 所有函数都是纯函数, 对相同输入运行多次的结果完全一致.
//!
//! # 平局
//!
//! 当一个体素到两个 (或更多) 种子的距离严格相等时, 它会被分配给距离变换逐轴扫描时
//! 位置更靠前的那个种子. 该规则是确定的, 但 **不保证** 与任何参考实现的平局规则一致.

use ndarray::{Array, ArrayView, Axis, Dimension, Zip};
use num::NumCast;

use crate::error::{LabelError, LabelResult};
use crate::voxel::{Label, MaskVoxel};

mod edt;
mod spacing;

use edt::{LineScratch, NO_FEATURE};
pub use spacing::VoxelSpacing;

/// 多源最近种子变换的结果.
///
/// 对于数组中的每个体素, 记录了到最近种子体素的平方物理距离,
/// 以及该种子按行优先序展开后的一维索引.
#[derive(Debug, Clone)]
pub struct SeedTransform<D: Dimension> {
    sq_dist: Array<f64, D>,
    index: Array<usize, D>,
}

impl<D: Dimension> SeedTransform<D> {
    /// 获取到最近种子的平方物理距离.
    #[inline]
    pub fn squared_distances(&self) -> ArrayView<'_, f64, D> {
        self.sq_dist.view()
    }

    /// 获取到最近种子的物理欧氏距离.
    pub fn distances(&self) -> Array<f64, D> {
        self.sq_dist.mapv(f64::sqrt)
    }

    /// 获取最近种子的行优先一维索引.
    #[inline]
    pub fn indices(&self) -> ArrayView<'_, usize, D> {
        self.index.view()
    }

    /// 根据最近种子索引从 `seed_labels` 中收集标签.
    ///
    /// `seed_labels` 应当就是计算该变换时的输入; 若形状不一致则返回
    /// `Err(LabelError::ShapeMismatch)`.
    pub fn labels<T: Label>(&self, seed_labels: ArrayView<'_, T, D>) -> LabelResult<Array<T, D>> {
        if seed_labels.shape() != self.index.shape() {
            return Err(LabelError::shape_mismatch(
                self.index.shape(),
                seed_labels.shape(),
            ));
        }
        // 按行优先序 (即 `iter()` 的逻辑顺序) 展开, 与索引编码一致.
        let flat: Vec<T> = seed_labels.iter().copied().collect();
        Ok(self
            .index
            .mapv(|i| flat.get(i).copied().unwrap_or_else(T::zero)))
    }
}

/// 检查数组至少是二维的.
#[inline]
fn check_ndim(shape: &[usize]) -> LabelResult<()> {
    if shape.len() < 2 {
        return Err(LabelError::too_few_dims(shape));
    }
    Ok(())
}

/// 检查输入并初始化变换: 种子处平方距离为 0, 特征为自身索引; 其余为 `INFINITY` 和 [`NO_FEATURE`].
fn init_transform<T: Label, D: Dimension>(
    seed_labels: &ArrayView<'_, T, D>,
    spacing: Option<&[f64]>,
) -> LabelResult<(SeedTransform<D>, VoxelSpacing)> {
    check_ndim(seed_labels.shape())?;
    let spacing = VoxelSpacing::resolve(spacing, seed_labels.ndim())?;
    if seed_labels.iter().all(|l| l.is_background()) {
        return Err(LabelError::EmptySeedSet);
    }

    let index: Vec<usize> = seed_labels
        .iter()
        .enumerate()
        .map(|(i, l)| if l.is_background() { NO_FEATURE } else { i })
        .collect();
    let index = Array::from_shape_vec(seed_labels.raw_dim(), index)
        .map_err(|e| LabelError::ShapeMismatch(e.to_string()))?;
    let sq_dist = index.mapv(|i| if i == NO_FEATURE { f64::INFINITY } else { 0.0 });

    Ok((SeedTransform { sq_dist, index }, spacing))
}

/// 计算多源最近种子变换.
///
/// `seed_labels` 中所有非零体素均为种子. `spacing` 为各坐标轴的体素物理尺寸,
/// `None` 代表单位间距. 算法为逐轴的精确欧氏距离变换, 复杂度与体素总数成线性关系.
///
/// # 返回值
///
/// - 当 `seed_labels` 维度小于 2 时, 返回 `Err(LabelError::ShapeMismatch)`;
/// - 当 `spacing` 长度与维度不符或存在非正分量时, 返回 `Err(LabelError::InvalidSpacing)`;
/// - 当 `seed_labels` 不含非零体素时 (包括空数组), 返回 `Err(LabelError::EmptySeedSet)`;
/// - 其他情况下返回 `Ok(SeedTransform)`.
pub fn nearest_seed_transform<T: Label, D: Dimension>(
    seed_labels: ArrayView<'_, T, D>,
    spacing: Option<&[f64]>,
) -> LabelResult<SeedTransform<D>> {
    let (mut st, spacing) = init_transform(&seed_labels, spacing)?;

    let mut scratch = LineScratch::default();
    for axis in 0..st.index.ndim() {
        let weight = spacing.axis(axis).powi(2);
        Zip::from(st.sq_dist.lanes_mut(Axis(axis)))
            .and(st.index.lanes_mut(Axis(axis)))
            .for_each(|d, f| scratch.transform(d, f, weight));
    }
    Ok(st)
}

/// 计算每个体素最近的非零种子的标签.
///
/// 错误情况与 [`nearest_seed_transform`] 相同.
pub fn nearest_seed_labels<T: Label, D: Dimension>(
    seed_labels: ArrayView<'_, T, D>,
    spacing: Option<&[f64]>,
) -> LabelResult<Array<T, D>> {
    nearest_seed_transform(seed_labels.view(), spacing)?.labels(seed_labels)
}

/// 检查 Voronoi 子分区的掩膜输入.
fn check_subdivide_inputs<T: Label, M: MaskVoxel, D: Dimension>(
    to_subdivide: &ArrayView<'_, M, D>,
    seed_labels: &ArrayView<'_, T, D>,
) -> LabelResult<()> {
    if to_subdivide.shape() != seed_labels.shape() {
        return Err(LabelError::shape_mismatch(
            seed_labels.shape(),
            to_subdivide.shape(),
        ));
    }
    check_ndim(seed_labels.shape())?;
    if !to_subdivide.iter().any(|m| m.is_set()) {
        return Err(LabelError::EmptyMask);
    }
    Ok(())
}

/// 将最近种子标签限制在掩膜内.
#[inline]
fn restrict_to_mask<T: Label, M: MaskVoxel, D: Dimension>(
    to_subdivide: &ArrayView<'_, M, D>,
    nearest: &Array<T, D>,
) -> Array<T, D> {
    Zip::from(to_subdivide)
        .and(nearest)
        .map_collect(|m, &l| if m.is_set() { l } else { T::zero() })
}

/// Voronoi 子分区.
///
/// 将 `to_subdivide` 中每个非零体素赋值为 `seed_labels` 中距其最近的非零标签,
/// 其余体素为 0. 距离以 `spacing` 给出的物理尺寸计算, `None` 代表单位间距.
/// 输出类型与 `seed_labels` 相同; 需要其它整数类型时请使用 [`voronoi_subparcellate_as`].
///
/// 只有一种种子标签时, 该操作仍然成功, 掩膜内所有体素都会得到该标签.
///
/// # 返回值
///
/// - 两个输入形状不一致, 或维度小于 2 时, 返回 `Err(LabelError::ShapeMismatch)`;
/// - `to_subdivide` 不含非零体素时, 返回 `Err(LabelError::EmptyMask)`;
/// - `spacing` 非法时, 返回 `Err(LabelError::InvalidSpacing)`;
/// - `seed_labels` 不含非零体素时, 返回 `Err(LabelError::EmptySeedSet)`.
pub fn voronoi_subparcellate<T: Label, M: MaskVoxel, D: Dimension>(
    to_subdivide: ArrayView<'_, M, D>,
    seed_labels: ArrayView<'_, T, D>,
    spacing: Option<&[f64]>,
) -> LabelResult<Array<T, D>> {
    check_subdivide_inputs(&to_subdivide, &seed_labels)?;
    let nearest = nearest_seed_labels(seed_labels, spacing)?;
    Ok(restrict_to_mask(&to_subdivide, &nearest))
}

/// 与 [`voronoi_subparcellate`] 相同, 但输出为整数类型 `U`.
///
/// 若某个输出标签无法用 `U` 表示, 则返回 `Err(LabelError::LabelCast)`.
pub fn voronoi_subparcellate_as<U: Label, T: Label, M: MaskVoxel, D: Dimension>(
    to_subdivide: ArrayView<'_, M, D>,
    seed_labels: ArrayView<'_, T, D>,
    spacing: Option<&[f64]>,
) -> LabelResult<Array<U, D>> {
    cast_labels(voronoi_subparcellate(to_subdivide, seed_labels, spacing)?)
}

/// 将标签数组转换为整数类型 `U`. 失败时报告第一个无法表示的标签.
fn cast_labels<U: Label, T: Label, D: Dimension>(labels: Array<T, D>) -> LabelResult<Array<U, D>> {
    let mut overflow = None;
    let cast = labels.mapv(|l| {
        <U as NumCast>::from(l).unwrap_or_else(|| {
            overflow.get_or_insert(l);
            U::zero()
        })
    });
    match overflow {
        Some(l) => Err(LabelError::LabelCast(l.to_string())),
        None => Ok(cast),
    }
}

/// 合并左右两个半球的标签数组. 0 代表背景.
///
/// 输出体素在 `left` 非零时取 `left` 的值, 否则取 `right` 的值.
///
/// # 返回值
///
/// - 形状不一致时, 返回 `Err(LabelError::ShapeMismatch)`;
/// - 存在两边同时非零的体素时, 返回 `Err(LabelError::Overlap)`, 其中包含重叠体素的精确个数.
///   该函数从不静默地选择其中一边.
pub fn combine_hemispheres<T: Label, D: Dimension>(
    left: ArrayView<'_, T, D>,
    right: ArrayView<'_, T, D>,
) -> LabelResult<Array<T, D>> {
    if left.shape() != right.shape() {
        return Err(LabelError::shape_mismatch(left.shape(), right.shape()));
    }
    let voxels = left
        .iter()
        .zip(right.iter())
        .filter(|(l, r)| !l.is_background() && !r.is_background())
        .count();
    if voxels != 0 {
        return Err(LabelError::Overlap { voxels });
    }
    Ok(Zip::from(&left)
        .and(&right)
        .map_collect(|&l, &r| if l.is_background() { r } else { l }))
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        /// 借助 `rayon`, 并行地计算多源最近种子变换.
        ///
        /// 每一轮中各条扫描线相互独立, 因此结果与 [`nearest_seed_transform`] 逐位一致.
        pub fn par_nearest_seed_transform<T: Label, D: Dimension>(
            seed_labels: ArrayView<'_, T, D>,
            spacing: Option<&[f64]>,
        ) -> LabelResult<SeedTransform<D>> {
            let (mut st, spacing) = init_transform(&seed_labels, spacing)?;

            for axis in 0..st.index.ndim() {
                let weight = spacing.axis(axis).powi(2);
                Zip::from(st.sq_dist.lanes_mut(Axis(axis)))
                    .and(st.index.lanes_mut(Axis(axis)))
                    .par_for_each(|d, f| LineScratch::default().transform(d, f, weight));
            }
            Ok(st)
        }

        /// 借助 `rayon`, 并行地进行 Voronoi 子分区. 语义与 [`voronoi_subparcellate`] 完全相同.
        pub fn par_voronoi_subparcellate<T: Label, M: MaskVoxel, D: Dimension>(
            to_subdivide: ArrayView<'_, M, D>,
            seed_labels: ArrayView<'_, T, D>,
            spacing: Option<&[f64]>,
        ) -> LabelResult<Array<T, D>> {
            check_subdivide_inputs(&to_subdivide, &seed_labels)?;
            let nearest = par_nearest_seed_transform(seed_labels.view(), spacing)?
                .labels(seed_labels)?;
            Ok(restrict_to_mask(&to_subdivide, &nearest))
        }
    }
}

#[cfg(test)]
mod tests;
