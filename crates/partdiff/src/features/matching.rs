//! Brute-force descriptor matching with the Lowe ratio test.

use super::Feature;

/// One accepted correspondence: indices into the query (master) and train
/// (candidate) feature lists plus the descriptor L2 distance.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorMatch {
    pub query: usize,
    pub train: usize,
    pub distance: f32,
}

/// Configuration for descriptor matching.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Ratio-test bound: keep a match only when the best distance is
    /// strictly below `ratio` × the second-best distance.
    pub ratio: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { ratio: 0.75 }
    }
}

/// Match each query descriptor against its two nearest train descriptors
/// and keep the ratio-test survivors, sorted by ascending distance.
pub fn match_descriptors(
    query: &[Feature],
    train: &[Feature],
    config: &MatchConfig,
) -> Vec<DescriptorMatch> {
    let mut matches = Vec::new();
    if train.len() < 2 {
        return matches;
    }
    for (qi, q) in query.iter().enumerate() {
        let mut best = f32::INFINITY;
        let mut second = f32::INFINITY;
        let mut best_ti = 0usize;
        for (ti, t) in train.iter().enumerate() {
            let d2: f32 = q
                .descriptor
                .iter()
                .zip(t.descriptor.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            if d2 < best {
                second = best;
                best = d2;
                best_ti = ti;
            } else if d2 < second {
                second = d2;
            }
        }
        let (d1, d2) = (best.sqrt(), second.sqrt());
        if d1 < config.ratio * d2 {
            matches.push(DescriptorMatch {
                query: qi,
                train: best_ti,
                distance: d1,
            });
        }
    }
    matches.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    tracing::debug!("{} matches after ratio test", matches.len());
    matches
}
