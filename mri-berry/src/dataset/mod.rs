//! 数据集操作.
//!
//! 提供迭代器风格的分割结果加载器, 以及输出文件路径的推导.

use std::io;
use std::path::{Path, PathBuf};

use crate::data::LabelVolume;

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 按文件名升序列出 `dir` 下所有文件名以 `suffix` 结尾的文件.
pub fn segmentation_paths<P: AsRef<Path>>(dir: P, suffix: &str) -> io::Result<Vec<PathBuf>> {
    let mut ans = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        let matched = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(suffix));
        if matched && entry.file_type()?.is_file() {
            ans.push(entry.path());
        }
    }
    ans.sort_unstable();
    Ok(ans)
}

/// 创建 `dir` 下所有文件名以 `suffix` 结尾的分割标签图的加载器.
///
/// 目录无法读取时返回 `Err`. 单个文件读取失败不会影响其它文件, 加载器在迭代时会返回对应的 `Err`.
pub fn segmentation_loader<P: AsRef<Path>>(dir: P, suffix: &str) -> io::Result<SegmentationLoader> {
    let mut paths_rev = segmentation_paths(dir, suffix)?;
    paths_rev.reverse();
    Ok(SegmentationLoader { paths_rev })
}

/// 3D 分割标签图加载器. 按文件名升序依次打开.
#[derive(Debug)]
pub struct SegmentationLoader {
    paths_rev: Vec<PathBuf>,
}

impl Iterator for SegmentationLoader {
    type Item = (PathBuf, nifti::Result<LabelVolume>);

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths_rev.pop()?;
        let data = LabelVolume::open(path.as_path());
        Some((path, data))
    }
}

impl ExactSizeIterator for SegmentationLoader {
    #[inline]
    fn len(&self) -> usize {
        self.paths_rev.len()
    }
}

/// 将文件名末尾的 `from` 替换为 `to`. 文件名不以 `from` 结尾时返回 `None`.
pub fn replace_suffix(path: &Path, from: &str, to: &str) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(from)?;
    Some(path.with_file_name(format!("{stem}{to}")))
}

/// 在文件名的扩展名之前插入 `suffix`. `.nii.gz` 视为一个整体.
///
/// - `a/b.nii.gz` -> `a/b{suffix}.nii.gz`;
/// - `a/b.nii` -> `a/b{suffix}.nii`;
/// - `a/b` -> `a/b{suffix}`.
pub fn out_path_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    const NII_GZ: &str = ".nii.gz";

    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    if let Some(stem) = name.strip_suffix(NII_GZ) {
        return path.with_file_name(format!("{stem}{suffix}{NII_GZ}"));
    }

    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let out_name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(out_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_path_with_suffix() {
        let p = |s: &str| out_path_with_suffix(Path::new(s), "_relabeled");
        assert_eq!(p("/x/s1.nii.gz"), PathBuf::from("/x/s1_relabeled.nii.gz"));
        assert_eq!(p("/x/s1.nii"), PathBuf::from("/x/s1_relabeled.nii"));
        assert_eq!(p("s1"), PathBuf::from("s1_relabeled"));
        assert_eq!(p("/x/s.1.nii"), PathBuf::from("/x/s.1_relabeled.nii"));
    }

    #[test]
    fn test_replace_suffix() {
        assert_eq!(
            replace_suffix(Path::new("/x/a_in.nii.gz"), "_in.nii.gz", "_out.nii.gz"),
            Some(PathBuf::from("/x/a_out.nii.gz"))
        );
        assert_eq!(replace_suffix(Path::new("/x/a.nii"), "_in.nii.gz", "_out"), None);
    }

    #[test]
    fn test_segmentation_loader() {
        let dir = std::env::temp_dir().join(format!("mri-berry-{}-loader", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b_seg.nii.gz", "a_seg.nii.gz", "a_other.nii.gz"] {
            std::fs::write(dir.join(name), b"not a nifti file").unwrap();
        }
        std::fs::create_dir_all(dir.join("c_seg.nii.gz")).unwrap();

        let loader = segmentation_loader(&dir, "_seg.nii.gz").unwrap();
        assert_eq!(loader.len(), 2);
        let items: Vec<_> = loader.collect();
        assert_eq!(items[0].0, dir.join("a_seg.nii.gz"));
        assert_eq!(items[1].0, dir.join("b_seg.nii.gz"));
        assert!(items.iter().all(|(_, r)| r.is_err()));

        std::fs::remove_dir_all(&dir).unwrap();
        assert!(segmentation_loader(&dir, "_seg.nii.gz").is_err());
    }
}
