//! Recommendation scorer for candidate protocols
//!
//! `final = match_weight * match + effectiveness_weight * effectiveness`,
//! where match is the fraction of the target symptoms a protocol covers and
//! effectiveness comes from its usage history.

use crate::config::ScoringConfig;
use crate::recommend::types::{ProtocolCandidate, RankedRecommendation, UsageLog};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Effectiveness assumed for a protocol with no usable history
pub const NEUTRAL_EFFECTIVENESS: f64 = 0.5;

/// Valid explicit effectiveness ratings; anything else is ignored
const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Highest explicit effectiveness rating
const MAX_RATING: f64 = 5.0;

/// How a candidate's effectiveness was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectivenessSource {
    /// Mean of explicit 1-5 ratings
    Ratings,
    /// Mean fractional severity improvement per group
    SeverityDelta,
    /// No usable history
    Neutral,
}

/// Ranks protocols for a set of target symptoms
#[derive(Debug, Clone)]
pub struct RecommendationScorer {
    config: ScoringConfig,
}

impl RecommendationScorer {
    /// Create a scorer with default weights (0.6 match, 0.4 effectiveness)
    pub fn new() -> Self {
        Self {
            config: ScoringConfig::default(),
        }
    }

    /// Create with custom weights
    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Rank candidates against the target symptoms.
    ///
    /// Candidates sharing no symptom with the target are excluded, so an
    /// empty target yields an empty ranking. Ties are broken by protocol id.
    pub fn rank(
        &self,
        target: &BTreeSet<String>,
        candidates: &[ProtocolCandidate],
    ) -> Vec<RankedRecommendation> {
        if target.is_empty() {
            tracing::debug!("Empty target symptom set, nothing to rank");
            return Vec::new();
        }

        let mut ranked: Vec<RankedRecommendation> = candidates
            .iter()
            .filter_map(|candidate| {
                let overlap = candidate.symptoms.intersection(target).count();
                if overlap == 0 {
                    return None;
                }

                let match_score = overlap as f64 / target.len() as f64;
                let (effectiveness_score, source) = effectiveness_score(&candidate.usage_logs);
                let final_score = self.config.match_weight * match_score
                    + self.config.effectiveness_weight * effectiveness_score;

                tracing::trace!(
                    protocol = %candidate.id,
                    match_score,
                    effectiveness_score,
                    source = ?source,
                    final_score,
                    "Scored protocol"
                );

                Some(RankedRecommendation {
                    protocol_id: candidate.id.clone(),
                    final_score,
                    match_score,
                    effectiveness_score,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.protocol_id.cmp(&b.protocol_id))
        });

        ranked
    }
}

impl Default for RecommendationScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Effectiveness of a protocol from its usage logs, in [0, 1].
///
/// Explicit ratings win; otherwise severity improvement across each group's
/// chronologically ordered logs; otherwise the neutral prior.
pub fn effectiveness_score(logs: &[UsageLog]) -> (f64, EffectivenessSource) {
    if let Some(rating) = mean_rating(logs) {
        return ((rating / MAX_RATING).clamp(0.0, 1.0), EffectivenessSource::Ratings);
    }

    if let Some(improvement) = mean_severity_improvement(logs) {
        return (
            (0.5 + improvement / 2.0).clamp(0.0, 1.0),
            EffectivenessSource::SeverityDelta,
        );
    }

    (NEUTRAL_EFFECTIVENESS, EffectivenessSource::Neutral)
}

fn mean_rating(logs: &[UsageLog]) -> Option<f64> {
    let ratings: Vec<f64> = logs
        .iter()
        .filter_map(|log| log.effectiveness_rating)
        .filter(|rating| RATING_RANGE.contains(rating))
        .map(f64::from)
        .collect();

    if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
    }
}

/// Mean of `(first - last) / first` over groups with at least two logs
fn mean_severity_improvement(logs: &[UsageLog]) -> Option<f64> {
    let mut groups: BTreeMap<&str, Vec<&UsageLog>> = BTreeMap::new();
    for log in logs {
        groups.entry(log.group_key.as_str()).or_default().push(log);
    }

    let improvements: Vec<f64> = groups
        .into_values()
        .filter(|group| group.len() >= 2)
        .filter_map(|mut group| {
            group.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            let first = group.first()?.severity;
            let last = group.last()?.severity;
            // A zero starting severity has no meaningful relative change
            if first > 0.0 && first.is_finite() && last.is_finite() {
                Some((first - last) / first)
            } else {
                None
            }
        })
        .collect();

    if improvements.is_empty() {
        None
    } else {
        Some(improvements.iter().sum::<f64>() / improvements.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::types::ProtocolDefinition;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn symptoms(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_candidate(id: &str, items: &[&str], logs: Vec<UsageLog>) -> ProtocolCandidate {
        ProtocolCandidate::new(ProtocolDefinition::new(id, items.iter().copied()), logs)
    }

    #[test]
    fn test_scenario_c_full_coverage_ranks_first() {
        let scorer = RecommendationScorer::new();
        let target = symptoms(&["Headache", "Nausea"]);
        let candidates = vec![
            create_test_candidate("P1", &["Headache"], vec![]),
            create_test_candidate("P2", &["Headache", "Nausea"], vec![]),
        ];

        let ranked = scorer.rank(&target, &candidates);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].protocol_id, "P2");
        assert!((ranked[0].match_score - 1.0).abs() < 1e-9);
        assert!((ranked[0].final_score - 0.8).abs() < 1e-9);
        assert_eq!(ranked[1].protocol_id, "P1");
        assert!((ranked[1].match_score - 0.5).abs() < 1e-9);
        assert!((ranked[1].final_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_candidates_excluded() {
        let scorer = RecommendationScorer::new();
        let target = symptoms(&["Headache"]);
        let candidates = vec![
            create_test_candidate("sleep", &["Insomnia"], vec![]),
            create_test_candidate("hydrate", &["Headache", "Fatigue"], vec![]),
        ];

        let ranked = scorer.rank(&target, &candidates);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].protocol_id, "hydrate");
        assert!((ranked[0].match_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_target_yields_nothing() {
        let scorer = RecommendationScorer::new();
        let candidates = vec![create_test_candidate("P1", &["Headache"], vec![])];
        assert!(scorer.rank(&BTreeSet::new(), &candidates).is_empty());
    }

    #[test]
    fn test_ties_broken_by_id() {
        let scorer = RecommendationScorer::new();
        let target = symptoms(&["Headache"]);
        let candidates = vec![
            create_test_candidate("zeta", &["Headache"], vec![]),
            create_test_candidate("alpha", &["Headache"], vec![]),
            create_test_candidate("mid", &["Headache"], vec![]),
        ];

        let first: Vec<String> = scorer
            .rank(&target, &candidates)
            .into_iter()
            .map(|r| r.protocol_id)
            .collect();
        assert_eq!(first, vec!["alpha", "mid", "zeta"]);

        let mut reversed = candidates.clone();
        reversed.reverse();
        let second: Vec<String> = scorer
            .rank(&target, &reversed)
            .into_iter()
            .map(|r| r.protocol_id)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_effectiveness_from_ratings() {
        let logs = vec![
            UsageLog::new("a", 6.0, t0()).with_rating(4),
            UsageLog::new("a", 3.0, t0()).with_rating(5),
            UsageLog::new("b", 8.0, t0()),
        ];
        let (score, source) = effectiveness_score(&logs);
        assert_eq!(source, EffectivenessSource::Ratings);
        assert!((score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_ratings_ignored() {
        let logs = vec![
            UsageLog::new("a", 6.0, t0()).with_rating(0),
            UsageLog::new("a", 3.0, t0()).with_rating(9),
            UsageLog::new("b", 8.0, t0()).with_rating(4),
        ];
        let (score, source) = effectiveness_score(&logs);
        assert_eq!(source, EffectivenessSource::Ratings);
        assert!((score - 0.8).abs() < 1e-9);

        // With no valid rating left, severity history decides
        let logs = vec![
            UsageLog::new("a", 8.0, t0()).with_rating(0),
            UsageLog::new("a", 4.0, t0() + Duration::hours(1)).with_rating(7),
        ];
        let (score, source) = effectiveness_score(&logs);
        assert_eq!(source, EffectivenessSource::SeverityDelta);
        assert!((score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_effectiveness_from_severity_delta() {
        // Group a: 8 -> 4 (0.5 improvement), logged out of order
        // Group b: 5 -> 5 (no change)
        // Group c: single log, ignored
        let logs = vec![
            UsageLog::new("a", 4.0, t0() + Duration::hours(2)),
            UsageLog::new("a", 8.0, t0()),
            UsageLog::new("b", 5.0, t0()),
            UsageLog::new("b", 5.0, t0() + Duration::hours(1)),
            UsageLog::new("c", 9.0, t0()),
        ];
        let (score, source) = effectiveness_score(&logs);
        assert_eq!(source, EffectivenessSource::SeverityDelta);
        // mean improvement 0.25 -> 0.5 + 0.125
        assert!((score - 0.625).abs() < 1e-9);
    }

    #[test]
    fn test_effectiveness_worsening_below_neutral() {
        let logs = vec![
            UsageLog::new("a", 2.0, t0()),
            UsageLog::new("a", 8.0, t0() + Duration::hours(1)),
        ];
        let (score, _) = effectiveness_score(&logs);
        // improvement -3.0 clamps to 0
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_effectiveness_neutral_without_history() {
        assert_eq!(effectiveness_score(&[]), (0.5, EffectivenessSource::Neutral));

        let single_logs = vec![UsageLog::new("a", 7.0, t0()), UsageLog::new("b", 3.0, t0())];
        assert_eq!(effectiveness_score(&single_logs), (0.5, EffectivenessSource::Neutral));

        let zero_start = vec![
            UsageLog::new("a", 0.0, t0()),
            UsageLog::new("a", 0.0, t0() + Duration::hours(1)),
        ];
        assert_eq!(effectiveness_score(&zero_start), (0.5, EffectivenessSource::Neutral));
    }

    #[test]
    fn test_history_changes_ranking() {
        let scorer = RecommendationScorer::new();
        let target = symptoms(&["Headache"]);
        let candidates = vec![
            create_test_candidate("a-untested", &["Headache"], vec![]),
            create_test_candidate(
                "b-proven",
                &["Headache"],
                vec![UsageLog::new("x", 5.0, t0()).with_rating(5)],
            ),
        ];
        let ranked = scorer.rank(&target, &candidates);
        assert_eq!(ranked[0].protocol_id, "b-proven");
        assert!((ranked[0].final_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_weights() {
        let scorer = RecommendationScorer::with_config(ScoringConfig {
            match_weight: 1.0,
            effectiveness_weight: 0.0,
        });
        let target = symptoms(&["Headache", "Nausea"]);
        let candidates = vec![create_test_candidate("P1", &["Headache"], vec![])];
        let ranked = scorer.rank(&target, &candidates);
        assert!((ranked[0].final_score - 0.5).abs() < 1e-9);
    }
}
