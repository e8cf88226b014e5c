//! 运行时错误.

use thiserror::Error;

/// [`LabelError::UnknownLabel`] 中最多列出的标签个数.
pub const UNKNOWN_LABEL_REPORT_LIMIT: usize = 20;

/// 子分区、半球合并和标签重编号的运行时错误.
///
/// 所有错误都在违例处同步返回, 不会返回部分结果.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabelError {
    /// 输入数组的形状或维度不符合要求. 参数为具体描述.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// 种子标签中没有任何非零体素.
    #[error("seed labels contain no non-zero voxel")]
    EmptySeedSet,

    /// 待细分掩膜中没有任何非零体素.
    #[error("`to_subdivide` contains no non-zero voxels to assign")]
    EmptyMask,

    /// 体素间距长度与维度不符, 或存在非有限/非正值.
    #[error("invalid voxel spacing {spacing:?} for a {ndim}-d volume")]
    InvalidSpacing {
        /// 用户给出的间距.
        spacing: Vec<f64>,
        /// 数组维度.
        ndim: usize,
    },

    /// 左右半球标签存在重叠体素. 参数为重叠体素个数.
    #[error("left/right overlap at {voxels} voxels")]
    Overlap {
        /// 重叠体素个数.
        voxels: usize,
    },

    /// 标签图中存在非整数或非有限值. 参数为第一个违例值的文本表示.
    #[error("input is not an integer label map (found `{0}`)")]
    NonIntegerLabelMap(String),

    /// 标签图中不存在背景值 0.
    #[error("expected background label 0, but 0 is missing")]
    MissingBackground,

    /// 查找表中不存在某些非零标签, 或其类别为空.
    ///
    /// `ids` 最多包含 [`UNKNOWN_LABEL_REPORT_LIMIT`] 个升序标签, `total` 为全部未知标签个数.
    #[error(
        "found label ids not mapped to a structure: {ids:?}{}",
        ellipsis(.ids, .total)
    )]
    UnknownLabel {
        /// 升序排列的前若干个未知标签.
        ids: Vec<i64>,
        /// 未知标签总数.
        total: usize,
    },

    /// 标签值无法用目标整数类型表示.
    #[error("label `{0}` does not fit in the output label type")]
    LabelCast(String),
}

/// 未知标签被截断时追加省略号.
fn ellipsis(ids: &[i64], total: &usize) -> &'static str {
    if *total > ids.len() {
        " ..."
    } else {
        ""
    }
}

/// 子分区 / 重编号运行时错误.
pub type LabelResult<T> = Result<T, LabelError>;

impl LabelError {
    /// 由一组升序未知标签构造 [`LabelError::UnknownLabel`].
    pub(crate) fn unknown_labels(mut ids: Vec<i64>) -> Self {
        let total = ids.len();
        ids.truncate(UNKNOWN_LABEL_REPORT_LIMIT);
        Self::UnknownLabel { ids, total }
    }

    /// 由两个不一致的形状构造 [`LabelError::ShapeMismatch`].
    #[inline]
    pub(crate) fn shape_mismatch(expected: &[usize], found: &[usize]) -> Self {
        Self::ShapeMismatch(format!("expected {expected:?}, found {found:?}"))
    }

    /// 数组维度小于 2 时的 [`LabelError::ShapeMismatch`].
    #[inline]
    pub(crate) fn too_few_dims(shape: &[usize]) -> Self {
        Self::ShapeMismatch(format!("expected at least 2-d arrays, found {shape:?}"))
    }
}
