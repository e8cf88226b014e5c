//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;
}

/// 标签查找表的列名.
pub mod column {
    /// 标签值所在列.
    pub const ID: &str = "id";

    /// FreeSurfer 标签名所在列.
    pub const LABEL: &str = "Label";

    /// 结构类别所在列.
    pub const STRUCTURE: &str = "Structure";

    /// 半球所在列.
    pub const HEMISPHERE: &str = "Hemisphere";
}

/// 半球名称及从 FreeSurfer 标签名推断半球所用的标记.
pub mod hemisphere {
    /// 左半球.
    pub const LEFT: &str = "Left";

    /// 右半球.
    pub const RIGHT: &str = "Right";

    /// 不属于任何一侧.
    pub const NONE: &str = "None";

    /// 标签名含有其中之一即为右半球.
    pub const RIGHT_TAGS: [&str; 2] = ["Right", "-rh-"];

    /// 标签名含有其中之一即为左半球.
    pub const LEFT_TAGS: [&str; 2] = ["Left", "-lh-"];
}

/// 查找表 CSV 的分隔符.
pub const TABLE_DELIMITER: u8 = b';';

/// 左半球大脑白质标签名.
pub const LEFT_CEREBRAL_WM: &str = "Left-Cerebral-White-Matter";

/// 右半球大脑白质标签名.
pub const RIGHT_CEREBRAL_WM: &str = "Right-Cerebral-White-Matter";

/// 背景标签名.
pub const BACKGROUND_LABEL: &str = "Unknown";

/// 默认不作为 Voronoi 种子的结构类别.
pub const NON_SEED_STRUCTURES: [&str; 2] = ["White_Matter", "CSF"];

/// SynthSeg 分割结果文件名后缀.
pub const SUFFIX_LABEL_MAP: &str = "_MP2RAGE_synthseg_labels.nii.gz";

/// 白质 Voronoi 子分区结果文件名后缀.
pub const SUFFIX_WM_VORONOI: &str = "_MP2RAGE_WM_voronoi_labels.nii.gz";

/// 顺序重编号结果文件名默认后缀.
pub const SUFFIX_RELABELED: &str = "_relabeled";

/// 结构类别重编号结果文件名默认后缀.
pub const SUFFIX_META: &str = "_meta";

/// FreeSurfer 安装目录下的颜色查找表文件名.
pub const FREESURFER_LUT: &str = "FreeSurferColorLUT.txt";
