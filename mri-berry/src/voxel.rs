//! 体素值的类型约束.
//!
//! - [`Label`]: 整数标签, 0 代表背景;
//! - [`MaskVoxel`]: 掩膜体素, 非零即选中;
//! - [`LabelValue`]: 可能来自浮点 nifti 数据的 "标签", 需要检查是否为整数.

use num::PrimInt;
use std::fmt::{Debug, Display};

/// 整数标签类型. 0 代表背景, 其它值代表某个解剖区域或种子区域.
pub trait Label: PrimInt + Debug + Display + Send + Sync + 'static {
    /// 是否为背景.
    #[inline]
    fn is_background(self) -> bool {
        self.is_zero()
    }
}

impl<T> Label for T where T: PrimInt + Debug + Display + Send + Sync + 'static {}

/// 掩膜体素. 非零值 (或 `true`) 表示该体素被选中.
pub trait MaskVoxel: Copy + Send + Sync {
    /// 该体素是否被选中.
    fn is_set(self) -> bool;
}

impl MaskVoxel for bool {
    #[inline]
    fn is_set(self) -> bool {
        self
    }
}

macro_rules! impl_mask_int {
    ($($t: ty),+) => {
        $(
            impl MaskVoxel for $t {
                #[inline]
                fn is_set(self) -> bool {
                    self != 0
                }
            }
        )+
    };
}

macro_rules! impl_mask_float {
    ($($t: ty),+) => {
        $(
            /// 与 `!= 0.0` 一致, 因此 `NaN` 视为选中.
            impl MaskVoxel for $t {
                #[inline]
                fn is_set(self) -> bool {
                    self != 0.0
                }
            }
        )+
    };
}

impl_mask_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
impl_mask_float!(f32, f64);

/// 可以被精确解释为 `i64` 标签的体素值.
///
/// nifti 标签图经常以浮点格式存储, 因此重编号前需要逐体素检查.
pub trait LabelValue: Copy + Debug + Send + Sync {
    /// 精确转换为 `i64`. 非有限、非整数或超出 `i64` 范围时返回 `None`.
    fn exact_label(self) -> Option<i64>;
}

macro_rules! impl_label_value_int {
    ($($t: ty),+) => {
        $(
            impl LabelValue for $t {
                #[inline]
                fn exact_label(self) -> Option<i64> {
                    i64::try_from(self).ok()
                }
            }
        )+
    };
}

macro_rules! impl_label_value_float {
    ($($t: ty),+) => {
        $(
            impl LabelValue for $t {
                #[inline]
                fn exact_label(self) -> Option<i64> {
                    // `i64::MAX as $t` 向上取整, 因此使用严格小于.
                    let in_range = self >= i64::MIN as $t && self < i64::MAX as $t;
                    (self.is_finite() && self.fract() == 0.0 && in_range).then(|| self as i64)
                }
            }
        )+
    };
}

impl_label_value_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
impl_label_value_float!(f32, f64);
