#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供基于 SynthSeg 分割结果的脑白质 Voronoi 子分区、半球合并和标签重编号.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 核心算法 ([`voronoi`], [`relabel`]) 对任意维度 (至少二维) 的 `ndarray` 数组工作;
//!   nii 文件相关的功能 ([`LabelVolume`], [`ScalarVolume`]) 只处理 3D 数据, 并按照 (z, H, W) 模式访问.
//! 2. 所有核心操作都是纯函数. 输入不合规时返回 [`LabelError`], 不会返回部分结果.
//!
//! # 开发计划
//!
//! ### 多源精确欧氏距离变换 ✅
//!
//! 逐轴的抛物线下包络算法, 同时传播最近种子的索引. 复杂度与体素个数成线性关系,
//! 支持各向异性体素.
//!
//! ref: Felzenszwalb & Huttenlocher, "Distance Transforms of Sampled Functions".
//!
//! 实现位于 `mri-berry/src/voronoi/edt.rs`.
//!
//! ### Voronoi 子分区与半球合并 ✅
//!
//! 实现位于 `mri-berry/src/voronoi`.
//!
//! ### 标签重编号 ✅
//!
//! 1. 顺序重编号: 非零标签按升序压缩为 `1..=K`. ✅
//! 2. 结构类别重编号: 借助查找表将标签合并为类别. ✅
//!
//! 实现位于 `mri-berry/src/relabel`.
//!
//! ### FreeSurfer 标签查找表 ✅
//!
//! `;` 分隔的 CSV 查找表读写, `FreeSurferColorLUT.txt` 解析, 半球推断.
//!
//! 实现位于 `mri-berry/src/table.rs`.
//!
//! ### 白质子分区流水线 ✅
//!
//! 实现位于 `mri-berry/src/pipeline.rs`.
//!
//! ### 并行化 ✅
//!
//! 开启 `rayon` feature 后, 距离变换的每一轮扫描线并行处理, 结果与串行版本逐位一致.
//!
//! ### 平局规则与参考实现对齐 ⌛️
//!
//! 目前到多个种子距离严格相等的体素归属于扫描时位置更靠前的种子.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 3D MRI nii 文件基础数据结构.
mod data;

pub use data::{save_label_slice, LabelVolume, NiftiHeaderAttr, ScalarVolume};

pub mod consts;

mod error;

pub use error::{LabelError, LabelResult, UNKNOWN_LABEL_REPORT_LIMIT};

mod voxel;

pub use voxel::{Label, LabelValue, MaskVoxel};

pub mod voronoi;

pub mod relabel;

pub mod table;

pub mod pipeline;

pub mod dataset;
pub mod prelude;
