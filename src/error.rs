use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cohort fetch failed")]
    Fetch(#[source] sqlx::Error),

    #[error("leaderboard upsert failed for trainee {trainee_id}")]
    Persist {
        trainee_id: Uuid,
        #[source]
        source: sqlx::Error,
    },

    #[error("no mentor registered under {0}")]
    UnknownMentor(String),

    #[error("no trainee registered under {0}")]
    UnknownTrainee(String),

    #[error("a cohort scope is required")]
    MissingScope,
}
