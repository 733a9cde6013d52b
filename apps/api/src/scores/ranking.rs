//! Standard competition ranking ("1224") over a group's scores.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct RankCandidate {
    pub student_id: Uuid,
    pub student_name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankEntry {
    pub student_id: Uuid,
    pub student_name: String,
    pub score: f64,
    pub rank: usize,
}

/// Sorts by score, highest first, and assigns ranks.
///
/// Tied scores share a rank and keep their input order. The next lower
/// score gets its 1-based position, so `[90, 90, 80]` ranks `[1, 1, 3]`.
pub fn rank_entries(mut candidates: Vec<RankCandidate>) -> Vec<RankEntry> {
    // `sort_by` is stable, which preserves input order among ties.
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut ranked: Vec<RankEntry> = Vec::with_capacity(candidates.len());
    for (position, c) in candidates.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(prev) if c.score >= prev.score => prev.rank,
            _ => position + 1,
        };
        ranked.push(RankEntry {
            student_id: c.student_id,
            student_name: c.student_name,
            score: c.score,
            rank,
        });
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(scores: &[(&str, f64)]) -> Vec<RankCandidate> {
        scores
            .iter()
            .map(|(name, score)| RankCandidate {
                student_id: Uuid::new_v4(),
                student_name: name.to_string(),
                score: *score,
            })
            .collect()
    }

    fn summary(ranked: &[RankEntry]) -> Vec<(String, usize)> {
        ranked
            .iter()
            .map(|e| (e.student_name.clone(), e.rank))
            .collect()
    }

    #[test]
    fn test_ties_share_rank_and_skip() {
        let ranked = rank_entries(candidates(&[("A", 90.0), ("B", 90.0), ("C", 80.0)]));
        assert_eq!(
            summary(&ranked),
            vec![("A".into(), 1), ("B".into(), 1), ("C".into(), 3)]
        );
    }

    #[test]
    fn test_sorts_descending_and_keeps_tie_order() {
        let ranked = rank_entries(candidates(&[
            ("C", 80.0),
            ("B", 90.0),
            ("D", 70.0),
            ("A", 90.0),
        ]));
        assert_eq!(
            summary(&ranked),
            vec![
                ("B".into(), 1),
                ("A".into(), 1),
                ("C".into(), 3),
                ("D".into(), 4)
            ]
        );
    }

    #[test]
    fn test_middle_tie() {
        let ranked = rank_entries(candidates(&[("A", 90.0), ("B", 80.0), ("C", 80.0), ("D", 70.0)]));
        let ranks: Vec<usize> = ranked.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 2, 4]);
    }

    #[test]
    fn test_single_entry_is_first() {
        let ranked = rank_entries(candidates(&[("Solo", 42.0)]));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].rank, 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(rank_entries(Vec::new()).is_empty());
    }

    #[test]
    fn test_all_equal() {
        let ranked = rank_entries(candidates(&[("A", 50.0), ("B", 50.0), ("C", 50.0)]));
        assert!(ranked.iter().all(|e| e.rank == 1));
    }
}
