use crate::core::forest::SimpleRng;
use crate::models::Label;

/// Fraction of matching labels; 0.0 for empty input
pub fn accuracy(truth: &[Label], predicted: &[Label]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

/// Area under the ROC curve via the rank-sum statistic
///
/// Tied scores receive their average rank. `None` when only one class is
/// present, where the curve is undefined.
pub fn roc_auc(truth: &[Label], scores: &[f64]) -> Option<f64> {
    let positives = truth.iter().filter(|l| l.is_positive()).count();
    let negatives = truth.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based
        let average = (start + end) as f64 / 2.0 + 1.0;
        for &i in &order[start..=end] {
            ranks[i] = average;
        }
        start = end + 1;
    }

    let positive_rank_sum: f64 = truth
        .iter()
        .zip(&ranks)
        .filter(|(l, _)| l.is_positive())
        .map(|(_, r)| r)
        .sum();

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Per-class member counts `[negatives, positives]`
pub fn class_counts(labels: &[Label]) -> [usize; 2] {
    let mut counts = [0; 2];
    for label in labels {
        counts[label.index()] += 1;
    }
    counts
}

/// Rows held out for `test_fraction`, rounded up
fn test_size(n: usize, test_fraction: f64) -> usize {
    // Guard against 0.2 * 10 landing a hair above 2.0
    ((n as f64) * test_fraction - 1e-9).ceil().max(0.0) as usize
}

/// Split indices into (train, test) keeping class proportions
///
/// The test side gets `ceil(n * test_fraction)` rows, allocated to classes
/// by largest remainder. Every class keeps at least one training row.
pub fn stratified_split(labels: &[Label], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let n = labels.len();
    let n_test = test_size(n, test_fraction);
    let mut rng = SimpleRng::new(seed);

    let mut members: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, label) in labels.iter().enumerate() {
        members[label.index()].push(i);
    }

    let exact: Vec<f64> = members
        .iter()
        .map(|m| n_test as f64 * m.len() as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut remainder = n_test.saturating_sub(alloc.iter().sum());
    let mut by_fraction: Vec<usize> = vec![0, 1];
    by_fraction.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });
    for &class in by_fraction.iter().cycle().take(4) {
        if remainder == 0 {
            break;
        }
        if alloc[class] + 1 < members[class].len() {
            alloc[class] += 1;
            remainder -= 1;
        }
    }

    let mut train = Vec::with_capacity(n);
    let mut test = Vec::with_capacity(n_test);
    for (class, indices) in members.iter_mut().enumerate() {
        rng.shuffle(indices);
        let take = alloc[class].min(indices.len().saturating_sub(1));
        test.extend_from_slice(&indices[..take]);
        train.extend_from_slice(&indices[take..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Seeded shuffle split ignoring labels
pub fn shuffle_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let n_test = test_size(n, test_fraction).min(n.saturating_sub(1));
    let mut indices: Vec<usize> = (0..n).collect();
    SimpleRng::new(seed).shuffle(&mut indices);

    let mut test = indices[..n_test].to_vec();
    let mut train = indices[n_test..].to_vec();
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Test-fold indices for stratified k-fold without shuffling
///
/// Each class is cut into `k` contiguous chunks in original order; the
/// first `len % k` chunks take one extra member.
pub fn stratified_folds(labels: &[Label], k: usize) -> Vec<Vec<usize>> {
    let mut folds = vec![Vec::new(); k];
    if k == 0 {
        return folds;
    }

    for class in [Label::Negative, Label::Positive] {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == class)
            .map(|(i, _)| i)
            .collect();

        let base = members.len() / k;
        let extra = members.len() % k;
        let mut start = 0;
        for (fold, bucket) in folds.iter_mut().enumerate() {
            let size = base + usize::from(fold < extra);
            bucket.extend_from_slice(&members[start..start + size]);
            start += size;
        }
    }

    folds.iter_mut().for_each(|f| f.sort_unstable());
    folds
}
