//! Dominance, non-dominated sorting and crowding distance.

use crate::trial::{ObjectiveDirection, Trial};

/// `a` dominates `b` when it is no worse in every objective and strictly
/// better in at least one.
pub fn dominates(a: &[f64], b: &[f64], directions: &[ObjectiveDirection]) -> bool {
    let mut strictly_better = false;
    for ((x, y), direction) in a.iter().zip(b).zip(directions) {
        let (x, y) = match direction {
            ObjectiveDirection::Maximize => (*x, *y),
            ObjectiveDirection::Minimize => (-*x, -*y),
        };
        if x < y {
            return false;
        }
        if x > y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Partition points into successive non-dominated fronts (indices into `values`).
pub fn non_dominated_sort(values: &[&[f64]], directions: &[ObjectiveDirection]) -> Vec<Vec<usize>> {
    let n = values.len();
    let mut dominated_by_count = vec![0usize; n];
    let mut dominates_list: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(values[i], values[j], directions) {
                dominates_list[i].push(j);
                dominated_by_count[j] += 1;
            } else if dominates(values[j], values[i], directions) {
                dominates_list[j].push(i);
                dominated_by_count[i] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| dominated_by_count[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominates_list[i] {
                dominated_by_count[j] -= 1;
                if dominated_by_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }
    fronts
}

/// Crowding distance of each point within one front. Boundary points get
/// infinity.
pub fn crowding_distance(front: &[&[f64]]) -> Vec<f64> {
    let n = front.len();
    let mut distance = vec![0.0; n];
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }

    let objectives = front[0].len();
    for m in 0..objectives {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            front[a][m]
                .partial_cmp(&front[b][m])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let min = front[order[0]][m];
        let max = front[order[n - 1]][m];
        distance[order[0]] = f64::INFINITY;
        distance[order[n - 1]] = f64::INFINITY;
        let span = max - min;
        if span <= 0.0 {
            continue;
        }
        for w in 1..(n - 1) {
            let gap = front[order[w + 1]][m] - front[order[w - 1]][m];
            distance[order[w]] += gap / span;
        }
    }
    distance
}

/// Non-dominated trials, ordered by trial number so the result does not
/// depend on the order of `trials`.
pub fn pareto_front<'a>(trials: &'a [Trial], directions: &[ObjectiveDirection]) -> Vec<&'a Trial> {
    let mut front: Vec<&Trial> = trials
        .iter()
        .filter(|candidate| {
            !trials
                .iter()
                .any(|other| dominates(&other.values, &candidate.values, directions))
        })
        .collect();
    front.sort_by_key(|t| t.number);
    front
}
