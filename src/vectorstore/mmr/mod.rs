
/// Cosine similarity of two vectors. Zero-length or zero-norm inputs score 0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f32, 0.0_f32, 0.0_f32);
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

/// Cosine distance, `1 - cosine_similarity`
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Greedy maximal marginal relevance selection.
///
/// Returns up to `k` indices into `candidates`, in pick order. The first pick
/// is the candidate most similar to the query; each following pick maximises
/// `lambda_mult * sim(query, c) - (1 - lambda_mult) * max(sim(c, s) for s picked)`.
/// Ties keep the earlier candidate.
#[inline]
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[&[f32]],
    k: usize,
    lambda_mult: f32,
) -> Vec<usize> {
    let limit = k.min(candidates.len());
    if limit == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut selected: Vec<usize> = Vec::with_capacity(limit);
    // Highest similarity of each candidate to anything picked so far
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];

    while selected.len() < limit {
        let mut best: Option<(usize, f32)> = None;
        for (idx, rel) in relevance.iter().enumerate() {
            if selected.contains(&idx) {
                continue;
            }
            let score = if selected.is_empty() {
                *rel
            } else {
                lambda_mult * rel - (1.0 - lambda_mult) * redundancy[idx]
            };
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((idx, score));
            }
        }

        let Some((pick, _)) = best else {
            break;
        };
        selected.push(pick);

        for (idx, candidate) in candidates.iter().enumerate() {
            let sim = cosine_similarity(candidates[pick], candidate);
            if sim > redundancy[idx] {
                redundancy[idx] = sim;
            }
        }
    }

    selected
}
