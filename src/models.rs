use crate::errors::TrackerError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalId {
    #[serde(alias = "eau")]
    Water,
    Calories,
    #[serde(alias = "proteines")]
    Protein,
    #[serde(alias = "glucides")]
    Carbs,
    #[serde(alias = "lipides")]
    Fat,
}

impl GoalId {
    pub const ALL: [GoalId; 5] = [
        GoalId::Water,
        GoalId::Calories,
        GoalId::Protein,
        GoalId::Carbs,
        GoalId::Fat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GoalId::Water => "water",
            GoalId::Calories => "calories",
            GoalId::Protein => "protein",
            GoalId::Carbs => "carbs",
            GoalId::Fat => "fat",
        }
    }

    /// Maps a legacy identifier or display name onto the canonical id.
    ///
    /// Older snapshots keyed goals by their French display names; matching is
    /// case-insensitive and ignores the accent in "Protéines".
    pub fn from_legacy_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace('é', "e");
        match normalized.as_str() {
            "water" | "eau" => Some(GoalId::Water),
            "calories" => Some(GoalId::Calories),
            "protein" | "proteines" => Some(GoalId::Protein),
            "carbs" | "glucides" => Some(GoalId::Carbs),
            "fat" | "lipides" => Some(GoalId::Fat),
            _ => None,
        }
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalId {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        GoalId::from_legacy_name(value)
            .ok_or_else(|| TrackerError::InvalidArgument(format!("unknown goal id '{value}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Health,
    Diet,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Health => Mode::Diet,
            Mode::Diet => Mode::Health,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Target {
    pub health: f64,
    pub diet: f64,
}

impl Target {
    pub fn new(health: f64, diet: f64) -> Self {
        Self { health, diet }
    }

    pub fn get(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Health => self.health,
            Mode::Diet => self.diet,
        }
    }

    pub fn with(self, mode: Mode, value: f64) -> Self {
        match mode {
            Mode::Health => Self { health: value, ..self },
            Mode::Diet => Self { diet: value, ..self },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UnitRepr")]
pub struct MeasurementUnit {
    pub id: String,
    pub name: String,
}

impl MeasurementUnit {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// Snapshots written before units carried an id store the display name only.
#[derive(Deserialize)]
#[serde(untagged)]
enum UnitRepr {
    Full { id: String, name: String },
    Name(String),
}

impl From<UnitRepr> for MeasurementUnit {
    fn from(repr: UnitRepr) -> Self {
        match repr {
            UnitRepr::Full { id, name } => Self { id, name },
            UnitRepr::Name(name) => Self {
                id: name.to_lowercase(),
                name,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionGoal {
    pub id: GoalId,
    pub name: String,
    pub current: f64,
    pub target: Target,
    pub unit: MeasurementUnit,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub date: NaiveDate,
    pub nutrition_goals: Vec<NutritionGoal>,
    #[serde(default)]
    pub active_mode: Mode,
}

impl DailyLog {
    pub fn goal(&self, id: GoalId) -> Option<&NutritionGoal> {
        self.nutrition_goals.iter().find(|goal| goal.id == id)
    }

    /// Flattened per-nutrient view: one log per goal, carrying the target of
    /// the record's active mode only.
    pub fn flatten(&self, user: &str) -> Vec<NutritionLog> {
        self.nutrition_goals
            .iter()
            .map(|goal| NutritionLog {
                id: goal.id,
                name: goal.name.clone(),
                current_value: goal.current,
                target_value: goal.target.get(self.active_mode),
                mode: self.active_mode,
                unit: goal.unit.clone(),
                user: user.to_string(),
                date: self.date,
            })
            .collect()
    }

    /// Rebuilds a record from flattened logs. The first log seen for a nutrient
    /// wins, the inactive-mode target and any missing nutrient come from
    /// `defaults`.
    pub fn from_nutrition_logs(date: NaiveDate, logs: &[NutritionLog], defaults: &GoalTable) -> Self {
        let active_mode = logs.first().map(|log| log.mode).unwrap_or_default();
        let nutrition_goals = defaults
            .goals()
            .iter()
            .map(|default| match logs.iter().find(|log| log.id == default.id) {
                Some(log) => NutritionGoal {
                    id: default.id,
                    name: log.name.clone(),
                    current: non_negative(log.current_value).unwrap_or(0.0),
                    target: match non_negative(log.target_value) {
                        Some(value) => default.target.with(log.mode, value),
                        None => default.target,
                    },
                    unit: log.unit.clone(),
                    color: default.color.clone(),
                },
                None => default.clone(),
            })
            .collect();

        Self {
            date,
            nutrition_goals,
            active_mode,
        }
    }
}

fn non_negative(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionLog {
    #[serde(deserialize_with = "deserialize_goal_id")]
    pub id: GoalId,
    pub name: String,
    pub current_value: f64,
    pub target_value: f64,
    pub mode: Mode,
    pub unit: MeasurementUnit,
    #[serde(default)]
    pub user: String,
    #[serde(deserialize_with = "deserialize_log_date")]
    pub date: NaiveDate,
}

pub(crate) fn deserialize_goal_id<'de, D>(deserializer: D) -> Result<GoalId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

// Flattened logs were stored with a full timestamp; only the calendar day matters.
fn deserialize_log_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let day = raw.get(..10).unwrap_or(&raw);
    day.parse().map_err(serde::de::Error::custom)
}

/// The tracker's full state: the displayed date plus every daily record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub current_date: NaiveDate,
    pub daily_logs: BTreeMap<NaiveDate, DailyLog>,
}

impl AppData {
    pub fn new(current_date: NaiveDate) -> Self {
        Self {
            current_date,
            daily_logs: BTreeMap::new(),
        }
    }
}

/// Snapshot layout of the flattened variant, accepted on load and migrated.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySnapshot {
    pub current_date: NaiveDate,
    pub nutrition_logs: BTreeMap<NaiveDate, Vec<NutritionLog>>,
}

impl LegacySnapshot {
    pub fn migrate(self, defaults: &GoalTable) -> AppData {
        let daily_logs = self
            .nutrition_logs
            .into_iter()
            .map(|(date, logs)| (date, DailyLog::from_nutrition_logs(date, &logs, defaults)))
            .collect();

        AppData {
            current_date: self.current_date,
            daily_logs,
        }
    }
}

/// Default goal records used to seed every new day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NutritionGoal>", into = "Vec<NutritionGoal>")]
pub struct GoalTable {
    goals: Vec<NutritionGoal>,
}

impl GoalTable {
    /// Builds a table from arbitrary records: `current` is zeroed, duplicates
    /// keep their first occurrence, and missing goals are appended from the
    /// built-in defaults so every fixed id is always present.
    pub fn new(goals: Vec<NutritionGoal>) -> Result<Self, TrackerError> {
        let mut table: Vec<NutritionGoal> = Vec::with_capacity(GoalId::ALL.len());
        for mut goal in goals {
            if !goal.target.health.is_finite()
                || !goal.target.diet.is_finite()
                || goal.target.health < 0.0
                || goal.target.diet < 0.0
            {
                return Err(TrackerError::InvalidArgument(format!(
                    "target for '{}' must be a non-negative number",
                    goal.id
                )));
            }
            if table.iter().any(|existing| existing.id == goal.id) {
                continue;
            }
            goal.current = 0.0;
            table.push(goal);
        }

        for default in GoalTable::default().goals {
            if !table.iter().any(|goal| goal.id == default.id) {
                table.push(default);
            }
        }

        Ok(Self { goals: table })
    }

    pub fn goals(&self) -> &[NutritionGoal] {
        &self.goals
    }

    pub fn goal(&self, id: GoalId) -> Option<&NutritionGoal> {
        self.goals.iter().find(|goal| goal.id == id)
    }
}

impl TryFrom<Vec<NutritionGoal>> for GoalTable {
    type Error = TrackerError;

    fn try_from(goals: Vec<NutritionGoal>) -> Result<Self, Self::Error> {
        GoalTable::new(goals)
    }
}

impl From<GoalTable> for Vec<NutritionGoal> {
    fn from(table: GoalTable) -> Self {
        table.goals
    }
}

impl Default for GoalTable {
    fn default() -> Self {
        let goal = |id: GoalId, name: &str, health: f64, diet: f64, unit: &str, color: &str| {
            NutritionGoal {
                id,
                name: name.to_string(),
                current: 0.0,
                target: Target::new(health, diet),
                unit: MeasurementUnit::new(id.as_str(), unit),
                color: color.to_string(),
            }
        };

        Self {
            goals: vec![
                goal(GoalId::Water, "Eau", 2.5, 2.5, "L", "blue"),
                goal(GoalId::Calories, "Calories", 2000.0, 1800.0, "kcal", "orange"),
                goal(GoalId::Protein, "Protéines", 60.0, 90.0, "g", "red"),
                goal(GoalId::Carbs, "Glucides", 250.0, 150.0, "g", "yellow"),
                goal(GoalId::Fat, "Lipides", 70.0, 50.0, "g", "purple"),
            ],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalView {
    pub id: GoalId,
    pub name: String,
    pub current: f64,
    pub target: f64,
    pub unit: String,
    pub color: String,
    pub progress: u32,
    pub bar_width: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayResponse {
    pub date: NaiveDate,
    pub active_mode: Mode,
    pub goals: Vec<GoalView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AveragePoint {
    pub id: GoalId,
    pub average: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub window: usize,
    pub dates: Vec<NaiveDate>,
    pub averages: Vec<AveragePoint>,
    pub achievements: Vec<GoalId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressBand {
    Great,
    Good,
    Fair,
    Low,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day: u32,
    pub date: NaiveDate,
    pub progress: Option<u32>,
    pub band: Option<ProgressBand>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<Option<CalendarDay>>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}
