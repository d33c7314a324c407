use std::{env, path::PathBuf};

const DEFAULT_DATA_PATH: &str = "data/state.json";
const DEFAULT_GOALS_PATH: &str = "data/goals.json";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_USER: &str = "guest";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub goals_path: PathBuf,
    pub port: u16,
    pub access_token: Option<String>,
    pub user: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            data_path: non_empty("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            goals_path: non_empty("APP_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GOALS_PATH)),
            port: non_empty("PORT")
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            access_token: non_empty("APP_ACCESS_TOKEN"),
            user: non_empty("APP_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
        }
    }
}
