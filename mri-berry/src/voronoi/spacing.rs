use crate::error::{LabelError, LabelResult};

/// 每个坐标轴方向上单个体素的物理尺寸 (一般以毫米为单位).
///
/// 该结构保证长度与目标数组维度一致, 且所有分量有限且为正.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelSpacing(Vec<f64>);

impl VoxelSpacing {
    /// 从给定分量创建 `ndim` 维体素间距.
    ///
    /// 当 `spacing.len() != ndim` 或任一分量非有限、非正时返回
    /// `Err(LabelError::InvalidSpacing)`.
    pub fn new(spacing: &[f64], ndim: usize) -> LabelResult<Self> {
        let valid = spacing.len() == ndim && spacing.iter().all(|s| s.is_finite() && *s > 0.0);
        if !valid {
            return Err(LabelError::InvalidSpacing {
                spacing: spacing.to_vec(),
                ndim,
            });
        }
        Ok(Self(spacing.to_vec()))
    }

    /// 创建 `ndim` 维的单位 (各向同性) 体素间距.
    #[inline]
    pub fn isotropic(ndim: usize) -> Self {
        Self(vec![1.0; ndim])
    }

    /// 由可选的间距创建. `None` 代表单位间距.
    #[inline]
    pub fn resolve(spacing: Option<&[f64]>, ndim: usize) -> LabelResult<Self> {
        match spacing {
            Some(s) => Self::new(s, ndim),
            None => Ok(Self::isotropic(ndim)),
        }
    }

    /// 维度.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// 第 `axis` 个坐标轴的体素尺寸. 越界时 panic.
    #[inline]
    pub fn axis(&self, axis: usize) -> f64 {
        self.0[axis]
    }

    /// 获取全部分量.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// 体素间距在所有维度上是否是各向同的?
    #[inline]
    pub fn is_isotropic(&self) -> bool {
        self.0.windows(2).all(|w| w[0] == w[1])
    }

    /// 单个体素的物理体积 (各分量之积).
    #[inline]
    pub fn voxel(&self) -> f64 {
        self.0.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::VoxelSpacing;
    use crate::LabelError;

    #[test]
    fn test_spacing_validation() {
        assert!(VoxelSpacing::new(&[1.0, 0.5, 2.0], 3).is_ok());
        assert!(VoxelSpacing::resolve(None, 4).is_ok_and(|s| s.ndim() == 4 && s.is_isotropic()));

        for bad in [&[1.0, 1.0][..], &[1.0, 0.0, 1.0], &[1.0, -1.0, 1.0], &[1.0, f64::NAN, 1.0]] {
            assert!(matches!(
                VoxelSpacing::new(bad, 3),
                Err(LabelError::InvalidSpacing { ndim: 3, .. })
            ));
        }
        assert!(VoxelSpacing::new(&[1.0, f64::INFINITY], 2).is_err());
    }

    #[test]
    fn test_spacing_voxel() {
        let s = VoxelSpacing::new(&[2.0, 0.5, 3.0], 3).unwrap();
        assert_eq!(s.voxel(), 3.0);
        assert!(!s.is_isotropic());
        assert_eq!(s.axis(2), 3.0);
    }
}
