use crate::models::{AttemptRecord, MetricsOutcome, TraineeMetrics};

const TREND_WINDOW: usize = 3;

pub fn parse_score(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix('%').unwrap_or(trimmed);
    match digits.trim().parse::<i32>() {
        Ok(value) if (0..=100).contains(&value) => Some(value),
        _ => None,
    }
}

pub fn compute_trainee_metrics(attempts: &[AttemptRecord]) -> MetricsOutcome {
    if attempts.is_empty() {
        return MetricsOutcome::NoData;
    }

    // Trend windows need chronological order regardless of fetch order.
    let mut ordered: Vec<&AttemptRecord> = attempts.iter().collect();
    ordered.sort_by_key(|attempt| attempt.attempt_date);

    let scores: Vec<i32> = ordered
        .iter()
        .filter(|attempt| attempt.is_completed)
        .filter_map(|attempt| parse_score(&attempt.score))
        .collect();

    if scores.is_empty() {
        return MetricsOutcome::NoData;
    }

    let best_score = scores.iter().copied().max().unwrap_or(0);
    let average_score =
        scores.iter().map(|score| f64::from(*score)).sum::<f64>() / scores.len() as f64;
    let total_attempts = ordered
        .iter()
        .filter(|attempt| attempt.is_completed)
        .count();
    // Simulator time accrues whether or not the run finished.
    let total_training_secs = ordered
        .iter()
        .map(|attempt| attempt.total_time_secs)
        .sum();
    let last_activity = ordered[ordered.len() - 1].attempt_date;

    MetricsOutcome::Metrics(TraineeMetrics {
        best_score,
        average_score,
        total_attempts,
        total_training_secs,
        improvement_rate: improvement_rate(&scores),
        last_activity,
    })
}

pub fn improvement_rate(scores: &[i32]) -> f64 {
    if scores.len() < 2 * TREND_WINDOW {
        return 0.0;
    }

    let first_mean = mean(&scores[..TREND_WINDOW]);
    let last_mean = mean(&scores[scores.len() - TREND_WINDOW..]);

    if first_mean == 0.0 {
        return 0.0;
    }

    (last_mean - first_mean) / first_mean * 100.0
}

fn mean(scores: &[i32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|score| f64::from(*score)).sum::<f64>() / scores.len() as f64
}
