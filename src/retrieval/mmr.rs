//! Maximal marginal relevance re-ranking.

/// Cosine similarity of two vectors; zero when either has no magnitude or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Greedily pick up to `k` candidates balancing relevance against redundancy.
///
/// The first pick is the candidate most similar to `query`. Every following pick maximizes
/// `lambda * sim(query, c) - (1 - lambda) * max(sim(c, s))` over the already selected `s`.
/// Returns candidate indices in pick order; ties go to the lower index.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    lambda: f32,
) -> Vec<usize> {
    let limit = k.min(candidates.len());
    if limit == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|candidate| cosine_similarity(query, candidate))
        .collect();
    let mut selected: Vec<usize> = Vec::with_capacity(limit);
    // Highest similarity to any selected candidate, per candidate.
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];

    while selected.len() < limit {
        let mut best: Option<(usize, f32)> = None;
        for (index, candidate_relevance) in relevance.iter().enumerate() {
            if selected.contains(&index) {
                continue;
            }
            let score = if selected.is_empty() {
                *candidate_relevance
            } else {
                lambda * candidate_relevance - (1.0 - lambda) * redundancy[index]
            };
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }

        let Some((picked, _)) = best else {
            break;
        };
        selected.push(picked);
        for (index, candidate) in candidates.iter().enumerate() {
            let similarity = cosine_similarity(&candidates[picked], candidate);
            if similarity > redundancy[index] {
                redundancy[index] = similarity;
            }
        }
    }

    selected
}
