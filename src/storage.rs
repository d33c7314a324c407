use crate::errors::AppError;
use crate::models::{AppData, GoalTable, LegacySnapshot};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{error, info};

pub async fn load_data(path: &Path, goals: &GoalTable, today: NaiveDate) -> AppData {
    match fs::read(path).await {
        Ok(bytes) => parse_data(&bytes, goals).unwrap_or_else(|err| {
            error!("failed to parse data file: {err}");
            AppData::new(today)
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::new(today),
        Err(err) => {
            error!("failed to read data file: {err}");
            AppData::new(today)
        }
    }
}

/// Parses a snapshot, migrating the flattened per-nutrient layout when the
/// current one does not match.
pub fn parse_data(bytes: &[u8], goals: &GoalTable) -> Result<AppData, serde_json::Error> {
    match serde_json::from_slice::<AppData>(bytes) {
        Ok(data) => Ok(data),
        Err(err) => match serde_json::from_slice::<LegacySnapshot>(bytes) {
            Ok(legacy) => {
                info!(
                    days = legacy.nutrition_logs.len(),
                    "migrating flattened nutrition logs"
                );
                Ok(legacy.migrate(goals))
            }
            Err(_) => Err(err),
        },
    }
}

pub async fn load_goals(path: &Path) -> GoalTable {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(goals) => goals,
            Err(err) => {
                error!("failed to parse goal config: {err}");
                GoalTable::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => GoalTable::default(),
        Err(err) => {
            error!("failed to read goal config: {err}");
            GoalTable::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    write_json(path, data).await
}

pub async fn persist_goals(path: &Path, goals: &GoalTable) -> Result<(), AppError> {
    write_json(path, goals).await
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(value).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}
