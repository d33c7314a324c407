use crate::models::{
    AppData, AveragePoint, CalendarDay, CalendarMonth, DailyLog, GoalId, Mode, NutritionGoal,
    ProgressBand, ProgressResponse,
};
use chrono::{Datelike, NaiveDate};

pub const ROLLING_WINDOW: usize = 7;
pub const ACHIEVEMENT_THRESHOLD: u32 = 90;

/// Raw completion percentage, unclamped. A zero target yields 0.
pub fn progress_percent(goal: &NutritionGoal, mode: Mode) -> u32 {
    to_percent(ratio_percent(goal, mode))
}

/// Completion percentage clamped to `0..=100`, for bar widths.
pub fn progress_bar_width(goal: &NutritionGoal, mode: Mode) -> u32 {
    progress_percent(goal, mode).min(100)
}

fn ratio_percent(goal: &NutritionGoal, mode: Mode) -> f64 {
    let target = goal.target.get(mode);
    if target > 0.0 {
        goal.current / target * 100.0
    } else {
        0.0
    }
}

fn to_percent(value: f64) -> u32 {
    // `as` saturates, so oversized or negative inputs cannot wrap.
    value.round() as u32
}

/// Dates included in the rolling window: the last `window` records present.
pub fn window_dates(data: &AppData, window: usize) -> Vec<NaiveDate> {
    let skip = data.daily_logs.len().saturating_sub(window);
    data.daily_logs.keys().skip(skip).copied().collect()
}

/// Average completion per goal over the last `window` records present.
///
/// A goal counts on a given day when it has any signal, i.e. a positive
/// value or a positive target in that day's mode.
pub fn rolling_averages(data: &AppData, window: usize) -> Vec<AveragePoint> {
    let logs: Vec<&DailyLog> = window_dates(data, window)
        .iter()
        .filter_map(|date| data.daily_logs.get(date))
        .collect();

    GoalId::ALL
        .iter()
        .map(|&id| {
            let mut sum = 0.0;
            let mut count = 0u32;
            for log in &logs {
                let Some(goal) = log.goal(id) else {
                    continue;
                };
                if goal.current > 0.0 || goal.target.get(log.active_mode) > 0.0 {
                    sum += ratio_percent(goal, log.active_mode);
                    count += 1;
                }
            }

            let average = if count > 0 {
                to_percent(sum / f64::from(count))
            } else {
                0
            };
            AveragePoint { id, average }
        })
        .collect()
}

pub fn achievements(averages: &[AveragePoint]) -> Vec<GoalId> {
    averages
        .iter()
        .filter(|point| point.average >= ACHIEVEMENT_THRESHOLD)
        .map(|point| point.id)
        .collect()
}

/// Mean completion of a day's goals, skipping goals without a target.
/// `None` when the day has no record.
pub fn daily_score(data: &AppData, date: NaiveDate) -> Option<u32> {
    let log = data.daily_logs.get(&date)?;

    let mut total = 0.0;
    let mut counted = 0u32;
    for goal in &log.nutrition_goals {
        if goal.target.get(log.active_mode) > 0.0 {
            total += ratio_percent(goal, log.active_mode);
            counted += 1;
        }
    }

    if counted == 0 {
        return Some(0);
    }
    Some(to_percent(total / f64::from(counted)))
}

pub fn progress_band(progress: u32) -> ProgressBand {
    match progress {
        p if p >= 90 => ProgressBand::Great,
        p if p >= 70 => ProgressBand::Good,
        p if p >= 50 => ProgressBand::Fair,
        _ => ProgressBand::Low,
    }
}

pub fn build_progress(data: &AppData) -> ProgressResponse {
    let averages = rolling_averages(data, ROLLING_WINDOW);
    ProgressResponse {
        window: ROLLING_WINDOW,
        dates: window_dates(data, ROLLING_WINDOW),
        achievements: achievements(&averages),
        averages,
    }
}

/// Six-week, Sunday-first grid for the given month. Cells outside the month
/// are `None`. Returns `None` for an invalid year/month.
pub fn build_calendar(data: &AppData, year: i32, month: u32) -> Option<CalendarMonth> {
    const CELL_COUNT: u32 = 42;

    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = shift_month(year, month, 1);
    let days_in_month = NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .signed_duration_since(first)
        .num_days() as u32;
    let leading = first.weekday().num_days_from_sunday();

    let cells = (0..CELL_COUNT)
        .map(|index| {
            let day = (index + 1).checked_sub(leading).filter(|day| (1..=days_in_month).contains(day))?;
            let date = first.with_day(day)?;
            let progress = daily_score(data, date);
            Some(CalendarDay {
                day,
                date,
                progress,
                band: progress.map(progress_band),
            })
        })
        .collect();

    Some(CalendarMonth { year, month, cells })
}

/// Moves `(year, month)` by `delta` months, `month` being 1-based.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}
