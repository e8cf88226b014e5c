//! 一维抛物线下包络 (lower envelope of parabolas) 平方距离 + 特征变换.
//!
//! 对每个坐标轴依次做一维变换即可得到精确的多源欧氏距离变换.
//! 第 `k` 轮的输入是前 `k` 个坐标轴上的平方距离, 因此单轮复杂度与扫描线长度成线性关系.
//!
//! ref: Felzenszwalb & Huttenlocher, "Distance Transforms of Sampled Functions".

use ndarray::ArrayViewMut1;

/// 尚未找到任何种子的体素的特征值.
pub(crate) const NO_FEATURE: usize = usize::MAX;

/// 单条扫描线的工作缓冲区. 可在同一线程内的多条扫描线间复用, 以减少内存分配.
#[derive(Debug, Default)]
pub(crate) struct LineScratch {
    dist: Vec<f64>,
    feat: Vec<usize>,
    /// 下包络中各抛物线的顶点位置.
    sites: Vec<usize>,
    /// `bounds[k]` 为 `sites[k]` 主导区间的左端点.
    bounds: Vec<f64>,
}

impl LineScratch {
    /// 对一条扫描线原地实施一维变换.
    ///
    /// 进入时 `dist[q]` 为到目前为止的平方距离 (无种子时为 `f64::INFINITY`),
    /// 返回时为 `min_p dist[p] + weight * (q - p)^2`.
    /// `feat[q]` 同步更新为取到最小值的 `p` 的特征.
    ///
    /// 两条抛物线在整数位置恰好相等时, 保留位置更小的那一条.
    pub fn transform(
        &mut self,
        mut dist: ArrayViewMut1<f64>,
        mut feat: ArrayViewMut1<usize>,
        weight: f64,
    ) {
        self.dist.clear();
        self.dist.extend(dist.iter().copied());
        self.feat.clear();
        self.feat.extend(feat.iter().copied());

        self.build_envelope(weight);
        if self.sites.is_empty() {
            // 整条扫描线都没有种子, 保持 `INFINITY`.
            return;
        }

        let mut k = 0usize;
        for (q, (d, f)) in dist.iter_mut().zip(feat.iter_mut()).enumerate() {
            while k + 1 < self.sites.len() && self.bounds[k + 1] < q as f64 {
                k += 1;
            }
            let p = self.sites[k];
            let offset = q.abs_diff(p) as f64;
            *d = weight * offset * offset + self.dist[p];
            *f = self.feat[p];
        }
    }

    /// 构造下包络. 跳过所有 `INFINITY` 位置.
    fn build_envelope(&mut self, weight: f64) {
        self.sites.clear();
        self.bounds.clear();

        for (q, &fq) in self.dist.iter().enumerate() {
            if !fq.is_finite() {
                continue;
            }
            let mut s = f64::NEG_INFINITY;
            while let (Some(&p), Some(&left)) = (self.sites.last(), self.bounds.last()) {
                s = intersect(p, self.dist[p], q, fq, weight);
                if s <= left {
                    // `p` 的主导区间为空.
                    self.sites.pop();
                    self.bounds.pop();
                    s = f64::NEG_INFINITY;
                } else {
                    break;
                }
            }
            self.sites.push(q);
            self.bounds.push(s);
        }
    }
}

/// 以 `p`, `q` (`p < q`) 为顶点的两条抛物线 `fp + w(x - p)^2`, `fq + w(x - q)^2` 的交点横坐标.
#[inline]
fn intersect(p: usize, fp: f64, q: usize, fq: f64, weight: f64) -> f64 {
    debug_assert!(p < q);
    let (p, q) = (p as f64, q as f64);
    ((fq + weight * q * q) - (fp + weight * p * p)) / (2.0 * weight * (q - p))
}
