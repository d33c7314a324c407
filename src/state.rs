use crate::config::Config;
use crate::models::{AppData, GoalTable};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Store {
    pub data: AppData,
    pub goals: GoalTable,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Mutex<Store>>,
}

impl AppState {
    pub fn new(config: Config, data: AppData, goals: GoalTable) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(Store { data, goals })),
        }
    }
}
