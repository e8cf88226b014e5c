//! FreeSurfer 标签查找表.
//!
//! 查找表是以 `;` 分隔的 CSV 文件, 每一行描述一个分割标签:
//!
//! | id | Label                      | Structure    | Hemisphere |
//! |----|----------------------------|--------------|------------|
//! | 0  | Unknown                    |              | None       |
//! | 2  | Left-Cerebral-White-Matter | White_Matter | Left       |
//! | 17 | Left-Hippocampus           | Hippocampus  | Left       |
//!
//! 该表可由 `FreeSurferColorLUT.txt` ([`parse_freesurfer_lut`]) 加上人工整理的结构类别得到.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::io::{self, BufRead};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{column, hemisphere, TABLE_DELIMITER};
use crate::relabel::StructureTable;

/// 大脑半球.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Hemisphere {
    /// 左半球.
    Left,

    /// 右半球.
    Right,
}

impl Hemisphere {
    /// 另一侧半球.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// 名称, 即 `"Left"` 或 `"Right"`.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => hemisphere::LEFT,
            Self::Right => hemisphere::RIGHT,
        }
    }

    /// 解析查找表中的半球列. 除 `"Left"`, `"Right"` 以外一律视为不属于任何一侧.
    #[inline]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            hemisphere::LEFT => Some(Self::Left),
            hemisphere::RIGHT => Some(Self::Right),
            _ => None,
        }
    }

    /// 根据 FreeSurfer 标签名推断半球. 右半球标记优先.
    pub fn from_label_name(name: &str) -> Option<Self> {
        if hemisphere::RIGHT_TAGS.iter().any(|t| name.contains(t)) {
            Some(Self::Right)
        } else if hemisphere::LEFT_TAGS.iter().any(|t| name.contains(t)) {
            Some(Self::Left)
        } else {
            None
        }
    }
}

impl Display for Hemisphere {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 查找表中的一行.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LabelRecord {
    /// 标签值.
    pub id: i64,

    /// FreeSurfer 标签名.
    pub label: String,

    /// 结构类别. 空白时为 `None`.
    pub structure: Option<String>,

    /// 所属半球.
    pub hemisphere: Option<Hemisphere>,
}

/// 查找表读取错误.
#[derive(Debug, Error)]
pub enum TableError {
    /// CSV 读写错误 (包括 IO 错误).
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// 缺少必需的列.
    #[error("missing column `{0}` in label table")]
    MissingColumn(&'static str),

    /// `id` 列无法解析为整数.
    #[error("invalid id `{value}` at row {row}")]
    InvalidId {
        /// 数据行号, 从 1 开始, 不含表头.
        row: usize,
        /// 原始文本.
        value: String,
    },
}

/// 获取列 `name` 的位置.
#[inline]
fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// 空白字段视为 `None`.
#[inline]
fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// 标签查找表.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LabelTable {
    records: Vec<LabelRecord>,
}

impl FromIterator<LabelRecord> for LabelTable {
    fn from_iter<I: IntoIterator<Item = LabelRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl LabelTable {
    /// 从 CSV 读取查找表. 第一行必须是表头.
    ///
    /// `id` 与 `Label` 列必须存在; `Structure` 与 `Hemisphere` 列可选.
    pub fn from_reader<R: io::Read>(reader: R, delimiter: u8) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let id_col = column_index(&headers, column::ID).ok_or(TableError::MissingColumn(column::ID))?;
        let label_col =
            column_index(&headers, column::LABEL).ok_or(TableError::MissingColumn(column::LABEL))?;
        let structure_col = column_index(&headers, column::STRUCTURE);
        let hemisphere_col = column_index(&headers, column::HEMISPHERE);

        let mut records = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let raw_id = record.get(id_col).unwrap_or_default();
            let id = raw_id.trim().parse().map_err(|_| TableError::InvalidId {
                row: row + 1,
                value: raw_id.to_string(),
            })?;
            let field = |col: Option<usize>| non_blank(col.and_then(|c| record.get(c)));

            records.push(LabelRecord {
                id,
                label: record.get(label_col).unwrap_or_default().trim().to_string(),
                structure: field(structure_col).map(str::to_string),
                hemisphere: field(hemisphere_col).and_then(Hemisphere::parse),
            });
        }
        Ok(Self { records })
    }

    /// 打开 `;` 分隔的查找表文件.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
        Self::from_reader(io::BufReader::new(file), TABLE_DELIMITER)
    }

    /// 由 FreeSurfer LUT 条目创建查找表.
    ///
    /// 半球由标签名推断, 结构类别由 `structure_of` 按标签名给出.
    pub fn from_lut<I, F>(entries: I, mut structure_of: F) -> Self
    where
        I: IntoIterator<Item = (i64, String)>,
        F: FnMut(&str) -> Option<String>,
    {
        entries
            .into_iter()
            .map(|(id, label)| LabelRecord {
                id,
                structure: structure_of(&label),
                hemisphere: Hemisphere::from_label_name(&label),
                label,
            })
            .collect()
    }

    /// 只保留 `ids` 中的标签, 例如分割结果中实际出现过的那些.
    pub fn retain_ids(&mut self, ids: &BTreeSet<i64>) {
        self.records.retain(|r| ids.contains(&r.id));
    }

    /// 以 `;` 分隔的 CSV 形式写入 `w`. 可由 [`LabelTable::from_reader`] 读回.
    pub fn write_table<W: io::Write>(&self, w: W) -> csv::Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(TABLE_DELIMITER)
            .from_writer(w);
        wtr.write_record([
            column::ID,
            column::LABEL,
            column::STRUCTURE,
            column::HEMISPHERE,
        ])?;
        for r in self.records.iter() {
            wtr.write_record([
                r.id.to_string().as_str(),
                r.label.as_str(),
                r.structure.as_deref().unwrap_or_default(),
                r.hemisphere.map_or(hemisphere::NONE, Hemisphere::as_str),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// 全部行.
    #[inline]
    pub fn records(&self) -> &[LabelRecord] {
        &self.records
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否为空表?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按标签名查找标签值.
    pub fn id_of(&self, label: &str) -> Option<i64> {
        self.records.iter().find(|r| r.label == label).map(|r| r.id)
    }

    /// 构造结构类别重编号所需的 `id -> Structure` 表.
    #[inline]
    pub fn structure_table(&self) -> StructureTable {
        self.records
            .iter()
            .filter_map(|r| Some((r.id, r.structure.as_deref()?)))
            .collect()
    }
}

/// 读取人工整理的 `Label;Structure` 表, 返回 `标签名 -> 结构类别`.
///
/// 结构类别为空白的行会被跳过; 标签名重复时以最后一行为准.
pub fn read_structure_names<R: io::Read>(
    reader: R,
    delimiter: u8,
) -> Result<BTreeMap<String, String>, TableError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let label_col =
        column_index(&headers, column::LABEL).ok_or(TableError::MissingColumn(column::LABEL))?;
    let structure_col = column_index(&headers, column::STRUCTURE)
        .ok_or(TableError::MissingColumn(column::STRUCTURE))?;

    let mut ans = BTreeMap::new();
    for record in rdr.records() {
        let record = record?;
        let label = non_blank(record.get(label_col));
        let structure = non_blank(record.get(structure_col));
        if let (Some(label), Some(structure)) = (label, structure) {
            ans.insert(label.to_string(), structure.to_string());
        }
    }
    Ok(ans)
}

/// 解析 `FreeSurferColorLUT.txt`.
///
/// 每个数据行形如 `id name r g b a`, 名称中可能含有空格. 空行、注释行 (`#` 开头)
/// 以及字段不足或 `id` 非整数的行会被跳过. 结果按 `id` 升序排列.
pub fn parse_freesurfer_lut<R: BufRead>(reader: R) -> io::Result<Vec<(i64, String)>> {
    let mut ans = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            continue;
        }
        let Ok(id) = parts[0].parse::<i64>() else {
            continue;
        };
        ans.push((id, parts[1..parts.len() - 4].join(" ")));
    }
    ans.sort_by_key(|(id, _)| *id);
    Ok(ans)
}
