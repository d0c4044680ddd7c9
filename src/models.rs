use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub id: Uuid,
    pub score: String,
    pub total_time_secs: i64,
    pub attempt_date: DateTime<Utc>,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraineeIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub institution: String,
    pub graduation_year: i32,
}

#[derive(Debug, Clone)]
pub struct CohortMember {
    pub trainee: TraineeIdentity,
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraineeMetrics {
    pub best_score: i32,
    pub average_score: f64,
    pub total_attempts: usize,
    pub total_training_secs: i64,
    pub improvement_rate: f64,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricsOutcome {
    Metrics(TraineeMetrics),
    NoData,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub rank: u32,
    pub trainee: TraineeIdentity,
    pub metrics: TraineeMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortStats {
    pub total_trainees: usize,
    pub active_trainees: usize,
    pub total_attempts: usize,
    pub completed_attempts: usize,
    pub average_score: f64,
    pub total_training_secs: i64,
}

#[derive(Debug, Clone)]
pub struct RecentAttempt {
    pub trainee_name: String,
    pub score: String,
    pub attempt_date: DateTime<Utc>,
    pub is_completed: bool,
}
