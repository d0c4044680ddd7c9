use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::metrics;
use crate::models::{CohortMember, CohortStats, RecentAttempt};
use crate::ranking;

pub fn format_score(score: i32) -> String {
    format!("{score}%")
}

pub fn format_average(average: f64) -> String {
    format!("{average:.1}%")
}

pub fn format_improvement(rate: f64) -> String {
    format!("{rate:+.1}%")
}

pub fn format_training_time(secs: i64) -> String {
    let hours = (secs as f64 / 3600.0).round() as i64;
    format!("{hours}h")
}

pub fn last_activity_label(last: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now.date_naive() - last.date_naive()).num_days().max(0);
    match days {
        0 => "Today".to_string(),
        1 => "1 day ago".to_string(),
        n => format!("{n} days ago"),
    }
}

pub fn cohort_stats(cohort: &[CohortMember]) -> CohortStats {
    let total_trainees = cohort.len();
    let active_trainees = cohort
        .iter()
        .filter(|member| !member.attempts.is_empty())
        .count();

    let mut total_attempts = 0;
    let mut completed_attempts = 0;
    let mut total_training_secs = 0;
    let mut scores: Vec<i32> = Vec::new();

    for attempt in cohort.iter().flat_map(|member| member.attempts.iter()) {
        total_attempts += 1;
        total_training_secs += attempt.total_time_secs;
        if attempt.is_completed {
            completed_attempts += 1;
            if let Some(score) = metrics::parse_score(&attempt.score) {
                scores.push(score);
            }
        }
    }

    let average_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().map(|score| f64::from(*score)).sum::<f64>() / scores.len() as f64
    };

    CohortStats {
        total_trainees,
        active_trainees,
        total_attempts,
        completed_attempts,
        average_score,
        total_training_secs,
    }
}

pub fn recent_attempts(cohort: &[CohortMember], limit: usize) -> Vec<RecentAttempt> {
    let mut recent: Vec<RecentAttempt> = cohort
        .iter()
        .flat_map(|member| {
            member.attempts.iter().map(|attempt| RecentAttempt {
                trainee_name: member.trainee.name.clone(),
                score: attempt.score.clone(),
                attempt_date: attempt.attempt_date,
                is_completed: attempt.is_completed,
            })
        })
        .collect();

    recent.sort_by(|a, b| b.attempt_date.cmp(&a.attempt_date));
    recent.truncate(limit);
    recent
}

pub fn build_report(scope_label: &str, cohort: &[CohortMember], now: DateTime<Utc>) -> String {
    let ranked = ranking::rank_cohort(cohort);
    let stats = cohort_stats(cohort);
    let recent = recent_attempts(cohort, 5);

    let mut output = String::new();

    let _ = writeln!(output, "# OrthoSim Cohort Leaderboard");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        scope_label,
        now.date_naive()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohort Summary");
    let _ = writeln!(
        output,
        "- {} trainees ({} active)",
        stats.total_trainees, stats.active_trainees
    );
    let _ = writeln!(
        output,
        "- {} attempts recorded, {} completed",
        stats.total_attempts, stats.completed_attempts
    );
    let _ = writeln!(
        output,
        "- Cohort average score {}",
        format_average(stats.average_score)
    );
    let _ = writeln!(
        output,
        "- Total simulator time {}",
        format_training_time(stats.total_training_secs)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Leaderboard");

    if ranked.is_empty() {
        let _ = writeln!(output, "No ranked trainees yet.");
    } else {
        for entry in ranked.iter() {
            let _ = writeln!(
                output,
                "{}. {} ({}, {}) best {} avg {} across {} attempts, trend {}, last active {}",
                entry.rank,
                entry.trainee.name,
                entry.trainee.email,
                entry.trainee.institution,
                format_score(entry.metrics.best_score),
                format_average(entry.metrics.average_score),
                entry.metrics.total_attempts,
                format_improvement(entry.metrics.improvement_rate),
                last_activity_label(entry.metrics.last_activity, now)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Attempts");

    if recent.is_empty() {
        let _ = writeln!(output, "No attempts recorded for this cohort.");
    } else {
        for attempt in recent.iter() {
            let status = if attempt.is_completed {
                "completed"
            } else {
                "abandoned"
            };
            let _ = writeln!(
                output,
                "- {} scored {} on {} ({})",
                attempt.trainee_name,
                attempt.score,
                attempt.attempt_date.date_naive(),
                status
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttemptRecord, TraineeIdentity};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 10, 12, 0, 0).unwrap()
    }

    fn member(name: &str, scores: &[(&str, bool)]) -> CohortMember {
        let base = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
        let attempts = scores
            .iter()
            .enumerate()
            .map(|(day, (score, completed))| AttemptRecord {
                id: Uuid::new_v4(),
                score: score.to_string(),
                total_time_secs: 1800,
                attempt_date: base + Duration::days(day as i64),
                is_completed: *completed,
            })
            .collect();

        CohortMember {
            trainee: TraineeIdentity {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: format!("{}@orthosim.example", name.to_lowercase()),
                institution: "General Hospital".to_string(),
                graduation_year: 2027,
            },
            attempts,
        }
    }

    #[test]
    fn activity_labels_cover_day_boundaries() {
        let now = now();
        assert_eq!(last_activity_label(now, now), "Today");
        assert_eq!(last_activity_label(now - Duration::days(1), now), "1 day ago");
        assert_eq!(
            last_activity_label(now - Duration::days(12), now),
            "12 days ago"
        );
    }

    #[test]
    fn averages_render_with_one_decimal() {
        assert_eq!(format_average(86.5), "86.5%");
        assert_eq!(format_average(86.0), "86.0%");
        assert_eq!(format_improvement(28.5714), "+28.6%");
        assert_eq!(format_improvement(-4.0), "-4.0%");
    }

    #[test]
    fn training_time_rounds_to_hours() {
        assert_eq!(format_training_time(3600), "1h");
        assert_eq!(format_training_time(5500), "2h");
        assert_eq!(format_training_time(0), "0h");
    }

    #[test]
    fn stats_for_empty_cohort_are_zero() {
        let stats = cohort_stats(&[]);
        assert_eq!(stats.total_trainees, 0);
        assert_eq!(stats.active_trainees, 0);
        assert_eq!(stats.total_attempts, 0);
        assert_eq!(stats.average_score, 0.0);
    }

    #[test]
    fn stats_count_active_and_completed() {
        let cohort = vec![
            member("Alia", &[("80%", true), ("", false)]),
            member("Noel", &[]),
        ];
        let stats = cohort_stats(&cohort);
        assert_eq!(stats.total_trainees, 2);
        assert_eq!(stats.active_trainees, 1);
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.completed_attempts, 1);
        assert!((stats.average_score - 80.0).abs() < 0.001);
        assert_eq!(stats.total_training_secs, 3600);
    }

    #[test]
    fn recent_attempts_are_newest_first() {
        let cohort = vec![member("Alia", &[("80%", true), ("85%", true), ("90%", true)])];
        let recent = recent_attempts(&cohort, 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].score, "90%");
        assert_eq!(recent[1].score, "85%");
    }

    #[test]
    fn report_lists_ranked_trainees() {
        let cohort = vec![
            member("Alia", &[("90%", true)]),
            member("Bela", &[("75%", true)]),
        ];
        let report = build_report("Dr. Haddad", &cohort, now());
        assert!(report.contains("# OrthoSim Cohort Leaderboard"));
        assert!(report.contains("1. Alia"));
        assert!(report.contains("2. Bela"));
        assert!(report.contains("## Recent Attempts"));
    }

    #[test]
    fn report_handles_empty_cohort() {
        let report = build_report("Dr. Haddad", &[], now());
        assert!(report.contains("No ranked trainees yet."));
        assert!(report.contains("No attempts recorded for this cohort."));
    }
}
