//! 标签查找表. 重编号时对每个体素做一次查找.

/// 稠密表中表示 "不存在" 的值. 合法的新标签都是非负的.
const ABSENT: i32 = -1;

/// 最大标签不超过该值时使用稠密表.
const DENSE_LIMIT: i64 = 1 << 20;

/// 旧标签 -> 新标签 查找表.
///
/// - 所有旧标签均非负且最大值不超过 [`DENSE_LIMIT`] 时, 直接按下标查找;
/// - 否则在升序键上二分查找.
#[derive(Debug, Clone)]
pub(crate) enum LabelLut {
    Dense(Vec<i32>),
    Sparse { keys: Vec<i64>, values: Vec<i32> },
}

impl LabelLut {
    /// 由按旧标签严格升序排列的 `(旧标签, 新标签)` 序列构造查找表. 新标签必须非负.
    pub fn new(pairs: &[(i64, i32)]) -> Self {
        debug_assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
        debug_assert!(pairs.iter().all(|(_, new)| *new >= 0));

        let dense = match (pairs.first(), pairs.last()) {
            (Some(&(min, _)), Some(&(max, _))) => min >= 0 && max <= DENSE_LIMIT,
            _ => true,
        };
        if dense {
            let len = pairs.last().map_or(0, |&(max, _)| max as usize + 1);
            let mut table = vec![ABSENT; len];
            for &(old, new) in pairs {
                table[old as usize] = new;
            }
            Self::Dense(table)
        } else {
            let (keys, values) = pairs.iter().copied().unzip();
            Self::Sparse { keys, values }
        }
    }

    /// 查找旧标签 `old` 对应的新标签.
    #[inline]
    pub fn get(&self, old: i64) -> Option<i32> {
        match self {
            Self::Dense(table) => usize::try_from(old)
                .ok()
                .and_then(|i| table.get(i).copied())
                .filter(|&v| v != ABSENT),
            Self::Sparse { keys, values } => keys.binary_search(&old).ok().map(|i| values[i]),
        }
    }

    /// 是否为稠密表?
    #[cfg(test)]
    fn is_dense(&self) -> bool {
        matches!(self, Self::Dense(_))
    }
}
