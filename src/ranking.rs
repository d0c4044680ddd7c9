use std::cmp::Ordering;

use crate::metrics;
use crate::models::{CohortMember, MetricsOutcome, RankedEntry};

pub fn rank_cohort(cohort: &[CohortMember]) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = cohort
        .iter()
        .filter_map(
            |member| match metrics::compute_trainee_metrics(&member.attempts) {
                MetricsOutcome::Metrics(metrics) => Some(RankedEntry {
                    rank: 0,
                    trainee: member.trainee.clone(),
                    metrics,
                }),
                MetricsOutcome::NoData => None,
            },
        )
        .collect();

    // Best score descending, then average descending, then trainee id so
    // repeated runs over unchanged data agree.
    ranked.sort_by(|a, b| {
        b.metrics
            .best_score
            .cmp(&a.metrics.best_score)
            .then_with(|| {
                b.metrics
                    .average_score
                    .partial_cmp(&a.metrics.average_score)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.trainee.id.cmp(&b.trainee.id))
    });

    for (index, entry) in ranked.iter_mut().enumerate() {
        entry.rank = index as u32 + 1;
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttemptRecord, TraineeIdentity};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn member(id: u128, name: &str, scores: &[&str]) -> CohortMember {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let attempts = scores
            .iter()
            .enumerate()
            .map(|(day, score)| AttemptRecord {
                id: Uuid::new_v4(),
                score: score.to_string(),
                total_time_secs: 600,
                attempt_date: base + Duration::days(day as i64),
                is_completed: true,
            })
            .collect();

        CohortMember {
            trainee: TraineeIdentity {
                id: Uuid::from_u128(id),
                name: name.to_string(),
                email: format!("{}@orthosim.example", name.to_lowercase()),
                institution: "General Hospital".to_string(),
                graduation_year: 2027,
            },
            attempts,
        }
    }

    #[test]
    fn ranks_descend_from_best_score() {
        let cohort = vec![
            member(1, "Bela", &["75%"]),
            member(2, "Alia", &["90%"]),
            member(3, "Ciro", &["82%"]),
        ];

        let ranked = rank_cohort(&cohort);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].trainee.name, "Alia");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].trainee.name, "Ciro");
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[2].trainee.name, "Bela");
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn ranks_are_dense_and_complete() {
        let cohort = vec![
            member(1, "Bela", &["75%"]),
            member(2, "Alia", &["90%"]),
            member(3, "Ciro", &["82%"]),
            member(4, "Dara", &["61%"]),
        ];

        let ranks: Vec<u32> = rank_cohort(&cohort).iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn trainees_without_scores_stay_unranked() {
        let cohort = vec![
            member(1, "Alia", &["90%"]),
            member(2, "Noel", &[]),
            member(3, "Mara", &["abc"]),
        ];

        let ranked = rank_cohort(&cohort);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].trainee.name, "Alia");
        assert_eq!(ranked[0].rank, 1);
    }

    #[test]
    fn equal_best_scores_break_on_average_then_id() {
        let cohort = vec![
            member(2, "Lena", &["70%", "90%"]),
            member(1, "Kira", &["90%", "90%"]),
        ];

        let ranked = rank_cohort(&cohort);
        assert_eq!(ranked[0].trainee.name, "Kira");
        assert_eq!(ranked[1].trainee.name, "Lena");

        let tied = vec![
            member(9, "Same", &["88%"]),
            member(4, "Also", &["88%"]),
        ];
        let ranked = rank_cohort(&tied);
        assert_eq!(ranked[0].trainee.id, Uuid::from_u128(4));
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn repeated_runs_agree() {
        let cohort = vec![
            member(3, "Alia", &["88%", "92%"]),
            member(1, "Bela", &["92%", "88%"]),
            member(2, "Ciro", &["92%", "60%", "92%"]),
        ];

        let first: Vec<(Uuid, u32)> = rank_cohort(&cohort)
            .iter()
            .map(|e| (e.trainee.id, e.rank))
            .collect();
        let second: Vec<(Uuid, u32)> = rank_cohort(&cohort)
            .iter()
            .map(|e| (e.trainee.id, e.rank))
            .collect();
        assert_eq!(first, second);
    }
}
