use super::*;
use ndarray::{Array2, Array3, Array4, Ix3};

/// 简单线性同余生成器, 用于构造可复现的测试体数据.
fn lcg(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state >> 33
}

/// 约 `1 / density` 的体素会成为种子, 标签取 `1..=labels`. 至少包含一个种子.
fn random_seeds(shape: (usize, usize, usize), density: u64, labels: u64, seed: u64) -> Array3<i32> {
    let mut state = seed;
    let mut ans = Array3::from_shape_fn(shape, |_| {
        if lcg(&mut state) % density == 0 {
            (lcg(&mut state) % labels + 1) as i32
        } else {
            0
        }
    });
    if ans.iter().all(|&l| l == 0) {
        ans[(0, 0, 0)] = 1;
    }
    ans
}

/// 暴力计算每个体素的最近平方距离和标签.
/// 第三个数组标记该体素是否存在不同标签的等距 (平局) 种子.
fn brute_force(seeds: &Array3<i32>, spacing: [f64; 3]) -> (Array3<f64>, Array3<i32>, Array3<bool>) {
    let sources: Vec<((usize, usize, usize), i32)> = seeds
        .indexed_iter()
        .filter(|(_, &l)| l != 0)
        .map(|(p, &l)| (p, l))
        .collect();
    let sq = |a: usize, b: usize, s: f64| (a as f64 - b as f64).powi(2) * s * s;

    let dim = seeds.raw_dim();
    let mut dist = Array3::<f64>::zeros(dim);
    let mut label = Array3::<i32>::zeros(dim);
    let mut tie = Array3::from_elem(dim, false);

    for ((z, h, w), d) in dist.indexed_iter_mut() {
        let all: Vec<(f64, i32)> = sources
            .iter()
            .map(|&((sz, sh, sw), l)| {
                let v = sq(z, sz, spacing[0]) + sq(h, sh, spacing[1]) + sq(w, sw, spacing[2]);
                (v, l)
            })
            .collect();
        let (best, best_label) = all
            .iter()
            .copied()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .unwrap();
        *d = best;
        label[(z, h, w)] = best_label;
        tie[(z, h, w)] = all
            .iter()
            .any(|&(v, l)| l != best_label && v <= best + 1e-9);
    }
    (dist, label, tie)
}

fn f64_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// 4x4x4 体数据, 两个种子分别位于对角.
#[test]
fn test_two_corner_seeds() {
    let mut seeds = Array3::<i32>::zeros((4, 4, 4));
    seeds[(0, 0, 0)] = 1;
    seeds[(3, 3, 3)] = 2;
    let mask = Array3::<u8>::ones((4, 4, 4));

    let out = voronoi_subparcellate(mask.view(), seeds.view(), Some(&[1.0, 1.0, 1.0])).unwrap();
    assert_eq!(out[(0, 0, 0)], 1);
    assert_eq!(out[(3, 3, 3)], 2);
    // sqrt(3) < sqrt(12)
    assert_eq!(out[(1, 1, 1)], 1);
    assert_eq!(out[(2, 2, 2)], 2);

    // 任何体素都只能是某个合法种子标签, 绝不为 0.
    assert!(out.iter().all(|&l| l == 1 || l == 2));

    // d1 - d2 == 6 * (z + h + w) - 27 != 0, 因此不存在等距体素, 每个体素都被分配给严格更近的种子.
    for ((z, h, w), &l) in out.indexed_iter() {
        let d1 = z * z + h * h + w * w;
        let d2 = (3 - z).pow(2) + (3 - h).pow(2) + (3 - w).pow(2);
        assert_ne!(d1, d2);
        assert_eq!(l, if d1 < d2 { 1 } else { 2 }, "({z}, {h}, {w})");
    }
}

/// 与暴力算法对照: 距离处处相等, 标签在非平局处相等.
#[test]
fn test_against_brute_force() {
    for (i, spacing) in [[1.0, 1.0, 1.0], [2.5, 0.7, 1.1], [0.5, 3.0, 0.5]]
        .into_iter()
        .enumerate()
    {
        let seeds = random_seeds((6, 7, 9), 23, 4, 17 + i as u64);
        assert!(seeds.iter().any(|&l| l != 0));

        let st = nearest_seed_transform(seeds.view(), Some(&spacing)).unwrap();
        let labels = st.labels(seeds.view()).unwrap();
        let (dist, expected, tie) = brute_force(&seeds, spacing);

        for (pos, &d) in st.squared_distances().indexed_iter() {
            assert!(f64_eq(d, dist[pos]), "{pos:?}: {d} vs {}", dist[pos]);
            if !tie[pos] {
                assert_eq!(labels[pos], expected[pos], "{pos:?}");
            }
        }
        for (pos, d) in st.distances().indexed_iter() {
            assert!(f64_eq(*d, dist[pos].sqrt()));
        }
    }
}

/// 最近种子索引必须指向某个非零种子, 且该种子确实是最近的.
#[test]
fn test_indices_point_to_seeds() {
    let seeds = random_seeds((5, 5, 5), 11, 3, 5);
    let spacing = [1.0, 2.0, 0.5];
    let st = nearest_seed_transform(seeds.view(), Some(&spacing)).unwrap();
    let flat: Vec<i32> = seeds.iter().copied().collect();
    let (dist, ..) = brute_force(&seeds, spacing);

    for ((z, h, w), &i) in st.indices().indexed_iter() {
        assert_ne!(flat[i], 0);
        let (sz, sh, sw) = (i / 25, i / 5 % 5, i % 5);
        let d = (z as f64 - sz as f64).powi(2)
            + (h as f64 - sh as f64).powi(2) * 4.0
            + (w as f64 - sw as f64).powi(2) * 0.25;
        assert!(f64_eq(d, dist[(z, h, w)]));
    }
}

#[test]
fn test_mask_containment_and_seed_fidelity() {
    let seeds = random_seeds((8, 6, 7), 9, 5, 99);
    let mut state = 3u64;
    let mask = Array3::from_shape_fn((8, 6, 7), |_| lcg(&mut state) % 3 == 0);

    let out = voronoi_subparcellate(mask.view(), seeds.view(), Some(&[1.2, 1.0, 0.8])).unwrap();
    for (pos, &l) in out.indexed_iter() {
        if !mask[pos] {
            assert_eq!(l, 0);
        } else {
            assert_ne!(l, 0);
            if seeds[pos] != 0 {
                assert_eq!(l, seeds[pos]);
            }
        }
    }
}

#[test]
fn test_single_seed_label() {
    let mut seeds = Array3::<u16>::zeros((5, 4, 3));
    seeds[(0, 0, 0)] = 7;
    seeds[(4, 3, 2)] = 7;
    seeds[(2, 1, 0)] = 7;
    let mut mask = Array3::<i32>::zeros((5, 4, 3));
    mask.slice_mut(ndarray::s![1..4, .., ..]).fill(1);

    let out = voronoi_subparcellate(mask.view(), seeds.view(), None).unwrap();
    for (pos, &l) in out.indexed_iter() {
        assert_eq!(l, if mask[pos] != 0 { 7 } else { 0 });
    }
}

#[test]
fn test_determinism() {
    let seeds = random_seeds((7, 7, 7), 13, 6, 1);
    let mask = Array3::<bool>::from_elem((7, 7, 7), true);
    let a = voronoi_subparcellate(mask.view(), seeds.view(), Some(&[1.0, 1.0, 1.0])).unwrap();
    let b = voronoi_subparcellate(mask.view(), seeds.view(), Some(&[1.0, 1.0, 1.0])).unwrap();
    assert_eq!(a, b);
}

/// 非标准内存布局 (转置视图) 不影响结果.
#[test]
fn test_non_standard_layout() {
    let seeds = random_seeds((4, 5, 6), 7, 3, 42);
    let spacing = [0.9, 1.7, 1.3];
    let transposed = seeds.t();
    assert!(!transposed.is_standard_layout());

    let a = nearest_seed_labels(transposed, Some(&spacing)).unwrap();
    let owned = transposed.as_standard_layout().into_owned();
    let b = nearest_seed_labels(owned.view(), Some(&spacing)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_other_dimensions() {
    // 2D
    let mut seeds = Array2::<i64>::zeros((3, 6));
    seeds[(1, 0)] = 4;
    seeds[(1, 5)] = 9;
    let out = nearest_seed_labels(seeds.view(), None).unwrap();
    assert_eq!(out.row(0).to_vec(), vec![4, 4, 4, 9, 9, 9]);

    // 各向异性使 (0, 2) 更接近下方的种子.
    let mut seeds = Array2::<i64>::zeros((3, 3));
    seeds[(2, 2)] = 1;
    seeds[(0, 0)] = 2;
    let out = nearest_seed_labels(seeds.view(), Some(&[0.1, 10.0])).unwrap();
    assert_eq!(out[(0, 2)], 1);
    assert_eq!(out[(2, 0)], 2);

    // 4D
    let mut seeds = Array4::<u8>::zeros((2, 3, 3, 2));
    seeds[(0, 0, 0, 0)] = 1;
    seeds[(1, 2, 2, 1)] = 2;
    let out = nearest_seed_labels(seeds.view(), None).unwrap();
    assert_eq!(out[(0, 0, 1, 0)], 1);
    assert_eq!(out[(1, 2, 1, 1)], 2);
    assert!(out.iter().all(|&l| l != 0));
}

#[test]
fn test_invalid_inputs() {
    let seeds = Array3::<i32>::zeros((3, 3, 3));
    let mask = Array3::<i32>::ones((3, 3, 3));

    assert_eq!(
        voronoi_subparcellate(mask.view(), seeds.view(), None),
        Err(LabelError::EmptySeedSet)
    );
    assert_eq!(
        nearest_seed_labels(Array3::<i32>::zeros((0, 3, 3)).view(), None),
        Err(LabelError::EmptySeedSet)
    );

    let mut seeds = seeds;
    seeds[(1, 1, 1)] = 3;
    assert_eq!(
        voronoi_subparcellate(Array3::<i32>::zeros((3, 3, 3)).view(), seeds.view(), None),
        Err(LabelError::EmptyMask)
    );
    assert!(matches!(
        voronoi_subparcellate(Array3::<i32>::ones((3, 3, 2)).view(), seeds.view(), None),
        Err(LabelError::ShapeMismatch(_))
    ));
    assert!(matches!(
        nearest_seed_labels(ndarray::arr1(&[0, 1, 0]).view(), None),
        Err(LabelError::ShapeMismatch(_))
    ));
    assert!(matches!(
        voronoi_subparcellate(mask.view(), seeds.view(), Some(&[1.0, 1.0])),
        Err(LabelError::InvalidSpacing { ndim: 3, .. })
    ));
    assert!(matches!(
        voronoi_subparcellate(mask.view(), seeds.view(), Some(&[1.0, 0.0, 1.0])),
        Err(LabelError::InvalidSpacing { .. })
    ));
}

#[test]
fn test_output_type() {
    let mut seeds = Array3::<i32>::zeros((2, 2, 2));
    seeds[(0, 0, 0)] = 300;
    let mask = Array3::<bool>::from_elem((2, 2, 2), true);

    let out: Array3<i64> = voronoi_subparcellate_as(mask.view(), seeds.view(), None).unwrap();
    assert!(out.iter().all(|&l| l == 300));

    let err = voronoi_subparcellate_as::<u8, _, _, Ix3>(mask.view(), seeds.view(), None);
    assert_eq!(err, Err(LabelError::LabelCast("300".to_string())));
}

#[test]
fn test_combine_disjoint() {
    let mut left = Array3::<i32>::zeros((3, 3, 4));
    let mut right = Array3::<i32>::zeros((3, 3, 4));
    left.slice_mut(ndarray::s![.., .., ..2]).fill(5);
    right.slice_mut(ndarray::s![.., .., 3..]).fill(1002);
    right[(0, 0, 2)] = 1001;

    let out = combine_hemispheres(left.view(), right.view()).unwrap();
    assert_eq!(out, &left + &right);
    assert_eq!(out, combine_hemispheres(left.view(), right.view()).unwrap());
}

#[test]
fn test_combine_overlap() {
    let mut left = Array3::<u32>::zeros((4, 4, 4));
    let mut right = Array3::<u32>::zeros((4, 4, 4));
    left.slice_mut(ndarray::s![..2, .., ..]).fill(1);
    right.slice_mut(ndarray::s![1.., .., ..]).fill(2);

    // 第 1 层 4 * 4 个体素重叠.
    assert_eq!(
        combine_hemispheres(left.view(), right.view()),
        Err(LabelError::Overlap { voxels: 16 })
    );

    right.fill(0);
    right[(0, 0, 0)] = 9;
    assert_eq!(
        combine_hemispheres(left.view(), right.view()),
        Err(LabelError::Overlap { voxels: 1 })
    );

    assert!(matches!(
        combine_hemispheres(left.view(), Array3::<u32>::zeros((4, 4, 3)).view()),
        Err(LabelError::ShapeMismatch(_))
    ));
}

#[cfg(feature = "rayon")]
#[test]
fn test_parallel_matches_sequential() {
    let seeds = random_seeds((9, 8, 10), 17, 5, 7);
    let mut state = 11u64;
    let mask = Array3::from_shape_fn((9, 8, 10), |_| (lcg(&mut state) % 4) as u8);
    let spacing = [1.5, 0.8, 1.0];

    let a = voronoi_subparcellate(mask.view(), seeds.view(), Some(&spacing)).unwrap();
    let b = par_voronoi_subparcellate(mask.view(), seeds.view(), Some(&spacing)).unwrap();
    assert_eq!(a, b);

    let st = nearest_seed_transform(seeds.view(), Some(&spacing)).unwrap();
    let pst = par_nearest_seed_transform(seeds.view(), Some(&spacing)).unwrap();
    assert_eq!(st.indices(), pst.indices());
    assert_eq!(st.squared_distances(), pst.squared_distances());
}
