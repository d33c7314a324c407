//! Resolution of per-date records and the mutations applied to them.
//!
//! Every operation takes the current [`AppData`] by reference and returns a new
//! value; the input is never modified. Dates that have no record yet are
//! synthesized from the injected [`GoalTable`] before a mutation is applied.

use crate::errors::TrackerError;
use crate::models::{deserialize_goal_id, AppData, DailyLog, GoalId, GoalTable};
use chrono::NaiveDate;
use serde::Deserialize;

/// A single user action, applied with [`Resolver::apply`].
///
/// Mutations without an explicit `date` target the state's current date.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Increment {
        date: Option<NaiveDate>,
        #[serde(deserialize_with = "deserialize_goal_id")]
        goal: GoalId,
        amount: f64,
    },
    Reset {
        date: Option<NaiveDate>,
        #[serde(deserialize_with = "deserialize_goal_id")]
        goal: GoalId,
    },
    SetTarget {
        date: Option<NaiveDate>,
        #[serde(deserialize_with = "deserialize_goal_id")]
        goal: GoalId,
        value: f64,
    },
    ToggleMode {
        date: Option<NaiveDate>,
    },
    SelectDate {
        date: NaiveDate,
    },
    PreviousDay,
    NextDay,
}

impl Action {
    /// The explicitly addressed date of a mutation, if any.
    pub fn target_date(&self) -> Option<NaiveDate> {
        match *self {
            Action::Increment { date, .. }
            | Action::Reset { date, .. }
            | Action::SetTarget { date, .. }
            | Action::ToggleMode { date } => date,
            Action::SelectDate { .. } | Action::PreviousDay | Action::NextDay => None,
        }
    }
}

pub struct Resolver<'a> {
    goals: &'a GoalTable,
}

impl<'a> Resolver<'a> {
    pub fn new(goals: &'a GoalTable) -> Self {
        Self { goals }
    }

    /// Returns the record for `date`, or a fresh one seeded from the goal table
    /// with every value at zero and the mode of the nearest earlier record.
    pub fn daily_log(&self, data: &AppData, date: NaiveDate) -> DailyLog {
        if let Some(log) = data.daily_logs.get(&date) {
            return log.clone();
        }

        let active_mode = data
            .daily_logs
            .range(..date)
            .next_back()
            .map(|(_, log)| log.active_mode)
            .unwrap_or_default();

        DailyLog {
            date,
            nutrition_goals: self.goals.goals().to_vec(),
            active_mode,
        }
    }

    pub fn ensure_date(&self, data: &AppData, date: NaiveDate) -> AppData {
        with_log(data, self.daily_log(data, date))
    }

    /// Adds `delta` to the goal's accumulated value, never going below zero.
    pub fn update_goal(
        &self,
        data: &AppData,
        date: NaiveDate,
        goal: GoalId,
        delta: f64,
    ) -> Result<AppData, TrackerError> {
        ensure_finite("amount", delta)?;

        let mut log = self.daily_log(data, date);
        if log.goal(goal).is_none() {
            let default = self
                .goals
                .goal(goal)
                .ok_or_else(|| TrackerError::NotFound(format!("default for goal '{goal}'")))?;
            log.nutrition_goals.push(default.clone());
        }

        if let Some(entry) = log.nutrition_goals.iter_mut().find(|entry| entry.id == goal) {
            let total = entry.current + delta;
            ensure_finite("current", total)?;
            entry.current = total.max(0.0);
        }

        Ok(with_log(data, log))
    }

    pub fn reset_goal(
        &self,
        data: &AppData,
        date: NaiveDate,
        goal: GoalId,
    ) -> Result<AppData, TrackerError> {
        let mut log = self.daily_log(data, date);
        let entry = log
            .nutrition_goals
            .iter_mut()
            .find(|entry| entry.id == goal)
            .ok_or_else(|| TrackerError::NotFound(format!("goal '{goal}' on {date}")))?;
        entry.current = 0.0;

        Ok(with_log(data, log))
    }

    /// Sets the active-mode target of `goal` on `date` and on every later
    /// record already present. Earlier records keep their targets.
    pub fn update_target(
        &self,
        data: &AppData,
        date: NaiveDate,
        goal: GoalId,
        value: f64,
    ) -> Result<AppData, TrackerError> {
        ensure_finite("target", value)?;
        if value < 0.0 {
            return Err(TrackerError::InvalidArgument(format!(
                "target must not be negative, got {value}"
            )));
        }

        let mut next = with_log(data, self.daily_log(data, date));
        for (_, log) in next.daily_logs.range_mut(date..) {
            let mode = log.active_mode;
            if let Some(entry) = log.nutrition_goals.iter_mut().find(|entry| entry.id == goal) {
                entry.target = entry.target.with(mode, value);
            }
        }

        Ok(next)
    }

    pub fn toggle_mode(&self, data: &AppData, date: NaiveDate) -> Result<AppData, TrackerError> {
        let mut log = self.daily_log(data, date);
        log.active_mode = log.active_mode.toggled();
        Ok(with_log(data, log))
    }

    /// Moves the displayed date, materializing its record.
    pub fn select_date(&self, data: &AppData, date: NaiveDate) -> AppData {
        let mut next = self.ensure_date(data, date);
        next.current_date = date;
        next
    }

    pub fn apply(&self, data: &AppData, action: &Action) -> Result<AppData, TrackerError> {
        let current = data.current_date;
        match *action {
            Action::Increment { date, goal, amount } => {
                self.update_goal(data, date.unwrap_or(current), goal, amount)
            }
            Action::Reset { date, goal } => self.reset_goal(data, date.unwrap_or(current), goal),
            Action::SetTarget { date, goal, value } => {
                self.update_target(data, date.unwrap_or(current), goal, value)
            }
            Action::ToggleMode { date } => self.toggle_mode(data, date.unwrap_or(current)),
            Action::SelectDate { date } => Ok(self.select_date(data, date)),
            Action::PreviousDay => {
                let date = current.pred_opt().ok_or_else(out_of_range)?;
                Ok(self.select_date(data, date))
            }
            Action::NextDay => {
                let date = current.succ_opt().ok_or_else(out_of_range)?;
                Ok(self.select_date(data, date))
            }
        }
    }
}

fn with_log(data: &AppData, log: DailyLog) -> AppData {
    let mut next = data.clone();
    next.daily_logs.insert(log.date, log);
    next
}

fn ensure_finite(field: &str, value: f64) -> Result<(), TrackerError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TrackerError::InvalidArgument(format!("{field} must be a finite number")))
    }
}

fn out_of_range() -> TrackerError {
    TrackerError::InvalidArgument("date out of range".to_string())
}
