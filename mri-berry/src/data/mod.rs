use std::collections::BTreeMap;
use std::io;
use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayView, ArrayView2, ArrayViewMut, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::{LabelError, LabelResult};
use crate::voronoi::VoxelSpacing;
use crate::{Idx2d, Idx3d};

mod save;

pub use save::save_label_slice;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 读取 nii 文件, 返回 header 和 (z, H, W) 格式的 `f32` 数据.
fn read_volume(path: &Path) -> nifti::Result<(BoxedHeader, Array3<f32>)> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = Box::new(obj.header().clone());

    // [W, H, z] -> [z, H, W].
    // hint: 原第一维向下增长, 原第二维向右增长.
    let data = obj
        .into_volume()
        .into_ndarray::<f32>()?
        .permuted_axes([2, 1, 0].as_slice());

    // The nature of nifti data field layout.
    debug_assert!(data.is_standard_layout());

    let data = Array3::<f32>::from_shape_vec(get_shape_from_header(&header), data.into_raw_vec())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    Ok((header, data))
}

/// 3D MRI nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据水平切片形状大小.
    #[inline]
    fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    ///
    /// 部分软件会写出负的 pixdim, 因此这里取绝对值.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z.abs() as f64, h.abs() as f64, w.abs() as f64]
    }

    /// 按 (z, H, W) 顺序获取 Voronoi 子分区所用的体素间距.
    ///
    /// header 中存在为 0 的 pixdim 时返回 `Err(LabelError::InvalidSpacing)`.
    #[inline]
    fn spacing(&self) -> LabelResult<VoxelSpacing> {
        VoxelSpacing::new(&self.pix_dim(), 3)
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [z, h, w] = self.pix_dim();
        z == h && z == w
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }

    /// 获取体素的实际体积值, 以毫升为单位.
    #[inline]
    fn voxel_ml(&self) -> f64 {
        self.voxel() / 1000.0
    }
}

/// nii 格式 3D MRI 扫描 (或任意标量图), 包括 header 和体素值. 体素值以 `f32` 保存.
///
/// 标签图同样可以按标量图读取, 以便在重编号前检查其是否确实只含整数.
#[derive(Debug, Clone)]
pub struct ScalarVolume {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl NiftiHeaderAttr for ScalarVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for ScalarVolume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl ScalarVolume {
    /// 打开 nii 文件格式的 3D 图像. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let (header, data) = read_volume(path.as_ref())?;
        Ok(Self { header, data })
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }
}

/// nii 格式 3D 分割标签图, 包括 header 和标签. 标签值以 `i32` 保存.
#[derive(Debug, Clone)]
pub struct LabelVolume {
    header: BoxedHeader,
    data: Array3<i32>,
}

impl NiftiHeaderAttr for LabelVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for LabelVolume {
    type Output = i32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for LabelVolume {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl LabelVolume {
    /// 打开 nii 文件格式的 3D 标签图. `path` 为 nii 文件的本地路径.
    ///
    /// 体素值先按 `f32` 读取, 再四舍五入为 `i32`. 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let (header, data) = read_volume(path.as_ref())?;
        Ok(Self {
            header,
            data: data.mapv(|v| v.round() as i32),
        })
    }

    /// 以 `header` 为参考, 根据 (z, H, W) 格式的 `data` 创建标签图.
    ///
    /// header 中的维度信息会被替换为 `data` 的实际形状, 其余信息 (体素分辨率, 方向等) 保持不变.
    ///
    /// nii 格式的每个维度最多为 `u16::MAX`, 超出时返回 `Err(LabelError::ShapeMismatch)`.
    pub fn from_header(header: &NiftiHeader, data: Array3<i32>) -> LabelResult<Self> {
        let (z, h, w) = data.dim();
        let dim = |n: usize| {
            u16::try_from(n).map_err(|_| {
                LabelError::ShapeMismatch(format!(
                    "nifti dimensions are at most {}, found {:?}",
                    u16::MAX,
                    [z, h, w]
                ))
            })
        };
        let mut header = Box::new(header.clone());
        header.dim[..4].copy_from_slice(&[3, dim(w)?, dim(h)?, dim(z)?]);
        header.dim[4..].fill(1);
        Ok(Self { header, data })
    }

    /// 以 `self` 的 header 为参考, 创建同形状的新标签图.
    ///
    /// 若 `data` 形状与 `self` 不同, 则程序 panic.
    #[inline]
    pub fn with_data(&self, data: Array3<i32>) -> Self {
        assert_eq!(data.dim(), self.data.dim(), "标签图形状不一致");
        Self {
            header: self.header.clone(),
            data,
        }
    }

    /// 将标签图以 `i32` 格式保存到 `path`. 以 `.gz` 结尾时会进行压缩.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> nifti::Result<()> {
        // [z, H, W] -> [W, H, z]
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&self.data.view().permuted_axes([2, 1, 0]))
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, i32, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, i32, Ix3> {
        self.data.view_mut()
    }

    /// 取出数据.
    #[inline]
    pub fn into_data(self) -> Array3<i32> {
        self.data
    }

    /// 获取 3D 标签图 z 空间的第 `z_index` 层切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ArrayView2<'_, i32> {
        self.data.index_axis(Axis(0), z_index)
    }

    /// 获取中间的水平切片. 没有任何切片时返回 `None`.
    pub fn middle_slice(&self) -> Option<(usize, ArrayView2<'_, i32>)> {
        let len_z = self.data.len_of(Axis(0));
        (len_z > 0).then(|| (len_z / 2, self.slice_at(len_z / 2)))
    }

    /// 获取 3D 标签图中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: i32) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 统计每个标签 (含 0) 的体素个数. 未出现的标签不在结果中.
    pub fn label_counts(&self) -> BTreeMap<i32, usize> {
        let mut ans = BTreeMap::new();
        for &p in self.data.iter() {
            *ans.entry(p).or_insert(0) += 1;
        }
        ans
    }

    /// 复制一份标签图, 其中不在 `ids` 中的标签全部置为 0.
    pub fn keep_labels(&self, ids: &[i32]) -> Array3<i32> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        self.data
            .mapv(|p| if ids.binary_search(&p).is_ok() { p } else { 0 })
    }
}
