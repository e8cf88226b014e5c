//! 标签重编号, 主要用于可视化.
//!
//! 1. [`relabel_ordinal`]: 将所有非零标签按升序压缩为 `1..=K`;
//! 2. [`relabel_to_structures`]: 借助 `id -> 结构类别` 查找表, 将标签合并为按类别名排序的 `1..=K`.
//!
//! 两者的输入都可以是浮点标签图 (nifti 常见存储方式), 输出均为 `i32`, 背景 0 保持不变.

use std::collections::BTreeMap;
use std::io;

use itertools::Itertools;
use ndarray::{Array, ArrayView, Dimension};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{LabelError, LabelResult};
use crate::voxel::LabelValue;

mod lut;

use lut::LabelLut;

/// 旧标签到新的连续标签的映射. 背景 `0 -> 0` 是隐含的, 不在其中.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RelabelMap {
    /// 按旧标签升序排列.
    pairs: Vec<(i64, i32)>,
}

impl RelabelMap {
    /// 获取旧标签 `old` 的新标签. 0 总是映射到 0.
    pub fn get(&self, old: i64) -> Option<i32> {
        if old == 0 {
            return Some(0);
        }
        self.pairs
            .binary_search_by_key(&old, |&(k, _)| k)
            .ok()
            .map(|i| self.pairs[i].1)
    }

    /// 非零标签个数, 即 `K`.
    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// 是否不含任何非零标签?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// 按旧标签升序迭代 `(旧标签, 新标签)`, 不含背景.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (i64, i32)> + '_ {
        self.pairs.iter().copied()
    }

    /// 以 `;` 分隔的表格形式 (列 `old`, `new`, 含背景行) 写入 `w`.
    pub fn write_table<W: io::Write>(&self, w: W) -> csv::Result<()> {
        let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(w);
        wtr.write_record(["old", "new"])?;
        for (old, new) in std::iter::once((0, 0)).chain(self.iter()) {
            wtr.write_record([old.to_string(), new.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// 将标签图逐体素精确转换为 `i64`. 报告第一个违例值.
fn exact_labels<T: LabelValue, D: Dimension>(
    labels: &ArrayView<'_, T, D>,
) -> LabelResult<Array<i64, D>> {
    let mut bad = None;
    let ids = labels.mapv(|v| {
        v.exact_label().unwrap_or_else(|| {
            bad.get_or_insert(v);
            0
        })
    });
    match bad {
        Some(v) => Err(LabelError::NonIntegerLabelMap(format!("{v:?}"))),
        None => Ok(ids),
    }
}

/// 按升序收集所有不同标签.
#[inline]
fn distinct_labels<D: Dimension>(ids: &Array<i64, D>) -> Vec<i64> {
    ids.iter().copied().sorted_unstable().dedup().collect()
}

/// 第 `i` 个 (从 0 开始) 非零标签的新标签.
#[inline]
fn ordinal(i: usize) -> LabelResult<i32> {
    i32::try_from(i + 1).map_err(|_| LabelError::LabelCast((i + 1).to_string()))
}

/// 顺序重编号.
///
/// 所有不同的非零标签按升序依次映射为 `1, 2, ..., K`, 0 保持为 0.
/// 例如 `{0, 5, 1000, 1001}` 会被映射为 `{0, 1, 2, 3}`. 负标签同样按升序参与编号.
///
/// # 返回值
///
/// - 存在非有限或非整数体素时, 返回 `Err(LabelError::NonIntegerLabelMap)`;
/// - 标签图中不存在 0 (包括空数组) 时, 返回 `Err(LabelError::MissingBackground)`;
/// - 否则返回与输入同形状的 `i32` 标签图, 以及所用的 [`RelabelMap`].
pub fn relabel_ordinal<T: LabelValue, D: Dimension>(
    labels: ArrayView<'_, T, D>,
) -> LabelResult<(Array<i32, D>, RelabelMap)> {
    let ids = exact_labels(&labels)?;
    let distinct = distinct_labels(&ids);
    if distinct.binary_search(&0).is_err() {
        return Err(LabelError::MissingBackground);
    }

    let pairs = distinct
        .into_iter()
        .filter(|&l| l != 0)
        .enumerate()
        .map(|(i, old)| Ok((old, ordinal(i)?)))
        .collect::<LabelResult<Vec<_>>>()?;
    let map = RelabelMap { pairs };

    let lut = LabelLut::new(&with_background(map.pairs.iter().copied()));
    Ok((ids.mapv(|v| lut.get(v).unwrap_or(0)), map))
}

/// 插入背景映射 `0 -> 0`, 并保持旧标签升序.
fn with_background<I: IntoIterator<Item = (i64, i32)>>(pairs: I) -> Vec<(i64, i32)> {
    let mut ans: Vec<_> = pairs.into_iter().filter(|&(old, _)| old != 0).collect();
    let pos = ans.partition_point(|&(old, _)| old < 0);
    ans.insert(pos, (0, 0));
    ans
}

/// 标签 -> 结构类别 查找表.
///
/// 构造时去除类别两端空白, 丢弃类别为空的行和标签 0. 同一标签出现多次时, 以最后一次为准.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureTable {
    entries: BTreeMap<i64, String>,
}

impl<S: AsRef<str>> FromIterator<(i64, S)> for StructureTable {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .filter(|(id, _)| *id != 0)
            .filter_map(|(id, s)| {
                let s = s.as_ref().trim();
                (!s.is_empty()).then(|| (id, s.to_string()))
            })
            .collect();
        Self { entries }
    }
}

impl StructureTable {
    /// 获取标签 `id` 的结构类别.
    #[inline]
    pub fn get(&self, id: i64) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// 表中标签个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空表?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按标签升序迭代 `(标签, 类别)`.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> + '_ {
        self.entries.iter().map(|(id, s)| (*id, s.as_str()))
    }

    /// 所有类别按字典序依次编号为 `1..=K`.
    ///
    /// 编号覆盖整张表, 与具体标签图中出现了哪些类别无关, 因此同一张表总是得到相同的编号.
    pub fn structure_map(&self) -> LabelResult<StructureMap> {
        let ordinals: BTreeMap<String, i32> = self
            .entries
            .values()
            .map(String::as_str)
            .sorted_unstable()
            .dedup()
            .enumerate()
            .map(|(i, s)| Ok((s.to_string(), ordinal(i)?)))
            .collect::<LabelResult<_>>()?;
        Ok(StructureMap { ordinals })
    }
}

/// 结构类别 -> 新标签 映射.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StructureMap {
    ordinals: BTreeMap<String, i32>,
}

impl StructureMap {
    /// 获取类别 `structure` 的新标签.
    #[inline]
    pub fn get(&self, structure: &str) -> Option<i32> {
        self.ordinals.get(structure).copied()
    }

    /// 类别个数, 即 `K`.
    #[inline]
    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    /// 是否不含任何类别?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }

    /// 按类别名字典序 (亦即新标签升序) 迭代 `(类别, 新标签)`.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.ordinals.iter().map(|(s, i)| (s.as_str(), *i))
    }

    /// 以 `;` 分隔的表格形式 (列 `Structure`, `new`) 写入 `w`.
    pub fn write_table<W: io::Write>(&self, w: W) -> csv::Result<()> {
        let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(w);
        wtr.write_record(["Structure", "new"])?;
        for (s, i) in self.iter() {
            wtr.write_record([s.to_string(), i.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// 按结构类别重编号.
///
/// 值为 `id` 的体素会被赋值为 `table` 中 `id` 所属类别的编号 (见 [`StructureTable::structure_map`]),
/// 0 保持为 0. 与 [`relabel_ordinal`] 不同, 该函数不要求标签图中存在 0.
///
/// # 返回值
///
/// - 存在非有限或非整数体素时, 返回 `Err(LabelError::NonIntegerLabelMap)`;
/// - 标签图中存在 `table` 未收录的非零标签时, 返回 `Err(LabelError::UnknownLabel)`,
///   其中列出升序的前若干个未知标签及其总数. 该函数从不静默丢弃未知标签;
/// - 否则返回与输入同形状的 `i32` 标签图, 以及完整的 [`StructureMap`].
pub fn relabel_to_structures<T: LabelValue, D: Dimension>(
    labels: ArrayView<'_, T, D>,
    table: &StructureTable,
) -> LabelResult<(Array<i32, D>, StructureMap)> {
    let ids = exact_labels(&labels)?;
    let present: Vec<i64> = distinct_labels(&ids)
        .into_iter()
        .filter(|&l| l != 0)
        .collect();

    let unknown: Vec<i64> = present
        .iter()
        .copied()
        .filter(|&l| table.get(l).is_none())
        .collect();
    if !unknown.is_empty() {
        return Err(LabelError::unknown_labels(unknown));
    }

    let map = table.structure_map()?;
    let pairs = present
        .into_iter()
        .filter_map(|id| Some((id, map.get(table.get(id)?)?)));
    let lut = LabelLut::new(&with_background(pairs));
    Ok((ids.mapv(|v| lut.get(v).unwrap_or(0)), map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array3};

    #[test]
    fn test_ordinal_compaction() {
        let data = arr2(&[[0, 5, 1000], [1001, 5, 0]]);
        let (out, map) = relabel_ordinal(data.view()).unwrap();
        assert_eq!(out, arr2(&[[0, 1, 2], [3, 1, 0]]));
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(5, 1), (1000, 2), (1001, 3)]);
        assert_eq!(map.get(0), Some(0));
        assert_eq!(map.get(4), None);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_ordinal_from_float() {
        let data = arr1(&[0.0f32, 2.0, 7.0, 2.0]);
        let (out, map) = relabel_ordinal(data.view()).unwrap();
        assert_eq!(out, arr1(&[0, 1, 2, 1]));
        assert_eq!(map.len(), 2);

        let data = arr1(&[0.0f64, 2.5]);
        assert_eq!(
            relabel_ordinal(data.view()).unwrap_err(),
            LabelError::NonIntegerLabelMap("2.5".to_string())
        );
        let data = arr1(&[0.0f64, f64::NAN]);
        assert!(matches!(
            relabel_ordinal(data.view()),
            Err(LabelError::NonIntegerLabelMap(_))
        ));
    }

    #[test]
    fn test_ordinal_negative_and_sparse() {
        let data = arr1(&[0i64, -4, 1 << 40, -4]);
        let (out, map) = relabel_ordinal(data.view()).unwrap();
        assert_eq!(out, arr1(&[0, 1, 2, 1]));
        assert_eq!(map.get(1 << 40), Some(2));
    }

    #[test]
    fn test_ordinal_missing_background() {
        let data = arr1(&[1u8, 2, 3]);
        assert_eq!(
            relabel_ordinal(data.view()).unwrap_err(),
            LabelError::MissingBackground
        );
        let empty = Array3::<i32>::zeros((0, 2, 2));
        assert_eq!(
            relabel_ordinal(empty.view()).unwrap_err(),
            LabelError::MissingBackground
        );
    }

    #[test]
    fn test_ordinal_only_background() {
        let data = Array3::<u16>::zeros((2, 2, 2));
        let (out, map) = relabel_ordinal(data.view()).unwrap();
        assert!(out.iter().all(|&v| v == 0));
        assert!(map.is_empty());
    }

    #[test]
    fn test_relabel_map_table() {
        let data = arr1(&[0, 9, 3]);
        let (_, map) = relabel_ordinal(data.view()).unwrap();
        let mut buf = Vec::new();
        map.write_table(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "old;new\n0;0\n3;1\n9;2\n");
    }

    fn abc_table() -> StructureTable {
        [(1, "A"), (2, "A"), (3, "B")].into_iter().collect()
    }

    #[test]
    fn test_structure_table_cleaning() {
        let table: StructureTable = [(0, "Background"), (1, "  B "), (2, ""), (3, "   "), (4, "A")]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1), Some("B"));
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(2), None);

        let map = table.structure_map().unwrap();
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("A", 1), ("B", 2)]);
    }

    #[test]
    fn test_structure_collapse() {
        let data = arr2(&[[0, 1, 2], [3, 3, 0]]);
        let (out, map) = relabel_to_structures(data.view(), &abc_table()).unwrap();
        assert_eq!(out, arr2(&[[0, 1, 1], [2, 2, 0]]));
        assert_eq!(map.get("A"), Some(1));
        assert_eq!(map.get("B"), Some(2));

        let distinct: Vec<i32> = out.iter().copied().filter(|&v| v != 0).sorted().dedup().collect();
        assert_eq!(distinct, vec![1, 2]);
    }

    #[test]
    fn test_structure_ordinals_cover_whole_table() {
        // 只出现了 "B", 但编号仍然由整张表决定.
        let data = arr1(&[3.0f32, 3.0]);
        let (out, map) = relabel_to_structures(data.view(), &abc_table()).unwrap();
        assert_eq!(out, arr1(&[2, 2]));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_structure_unknown_label() {
        let data = arr1(&[0, 1, 4, 2]);
        let err = relabel_to_structures(data.view(), &abc_table()).unwrap_err();
        assert_eq!(err, LabelError::UnknownLabel { ids: vec![4], total: 1 });
        assert!(err.to_string().contains("[4]"));

        let data: ndarray::Array1<i32> = (0..40).collect();
        let err = relabel_to_structures(data.view(), &abc_table()).unwrap_err();
        let LabelError::UnknownLabel { ids, total } = err else {
            unreachable!()
        };
        assert_eq!(total, 36);
        assert_eq!(ids, (4..24).collect::<Vec<_>>());
    }
}
