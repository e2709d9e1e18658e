//! Cosine similarity ranking over embedding vectors

use serde::{Deserialize, Serialize};

use crate::models::{Node, NodeSummary};

/// Cosine similarity of two vectors in `[-1, 1]`
///
/// Mismatched lengths, empty input and all-zero vectors yield 0: they come
/// from incomplete data rather than programming errors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilaritySuggestion {
    pub person: NodeSummary,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn reason_for(person: &Node, score: f64) -> String {
    let percent = (score * 100.0).round();
    match person.sector() {
        Some(sector) => format!("{}% semantic match; works in {}", percent, sector),
        None => format!("{}% semantic match", percent),
    }
}

/// Rank candidates by similarity to `target`
///
/// Candidates without an embedding are skipped and only strictly positive
/// scores are kept. Ties keep candidate order. Truncated to `max(limit, 1)`.
pub fn rank_by_similarity<'n>(
    target: &[f32],
    candidates: impl IntoIterator<Item = &'n Node>,
    limit: usize,
) -> Vec<SimilaritySuggestion> {
    let mut scored: Vec<(&Node, f64)> = candidates
        .into_iter()
        .filter_map(|node| {
            let embedding = node.embedding.as_deref()?;
            let score = cosine_similarity(target, embedding);
            (score > 0.0).then_some((node, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit.max(1));

    scored
        .into_iter()
        .map(|(node, score)| SimilaritySuggestion {
            person: NodeSummary::from(node),
            score,
            reason: Some(reason_for(node, score)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_self_similarity_is_one() {
        let v = [0.3_f32, -1.2, 4.5, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_opposite_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < TOLERANCE);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < TOLERANCE);
    }

    #[test]
    fn test_degenerate_inputs_are_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_bounds_over_assorted_vectors() {
        let vectors: Vec<Vec<f32>> = vec![
            vec![1.0, 2.0, 3.0],
            vec![-0.5, 0.25, 9.0],
            vec![1e-20, 1e-20, 1e-20],
            vec![3.0e38, -3.0e38, 1.0],
            vec![0.0, 0.0, -7.0],
        ];
        for a in &vectors {
            for b in &vectors {
                let s = cosine_similarity(a, b);
                assert!((-1.0..=1.0).contains(&s), "{} out of bounds", s);
                assert!((s - cosine_similarity(b, a)).abs() < TOLERANCE);
            }
        }
    }

    #[test]
    fn test_ranking_keeps_positive_scores_only() {
        let close = Node::person("o", "Close").with_embedding(vec![1.0, 0.1]);
        let far = Node::person("o", "Far").with_embedding(vec![-1.0, 0.0]);
        let unembedded = Node::person("o", "Unknown");
        let middling = Node::person("o", "Middling")
            .with_sector("Design")
            .with_embedding(vec![1.0, 1.0]);

        let ranked = rank_by_similarity(&[1.0, 0.0], [&close, &far, &unembedded, &middling], 10);
        let names: Vec<&str> = ranked.iter().map(|s| s.person.name.as_str()).collect();
        assert_eq!(names, vec!["Close", "Middling"]);
        assert!(ranked[0].score > ranked[1].score);
        assert_eq!(
            ranked[1].reason.as_deref(),
            Some("71% semantic match; works in Design")
        );

        let top = rank_by_similarity(&[1.0, 0.0], [&close, &middling], 0);
        assert_eq!(top.len(), 1);
    }
}
