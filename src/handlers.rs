use crate::errors::{AppError, TrackerError};
use crate::models::{
    AppData, CalendarMonth, CalendarQuery, DailyLog, DayResponse, GoalTable, GoalView,
    NutritionGoal, NutritionLog, ProgressResponse,
};
use crate::resolver::{Action, Resolver};
use crate::session::authorize;
use crate::state::AppState;
use crate::stats::{build_calendar, build_progress, progress_bar_width, progress_percent};
use crate::storage::{persist_data, persist_goals};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{Datelike, Local, NaiveDate};
use tracing::{info, warn};

pub async fn get_today(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DayResponse>, AppError> {
    authorize(&state.config, &headers).map_err(reject)?;
    let date = today();
    let mut store = state.store.lock().await;

    if !store.data.daily_logs.contains_key(&date) {
        let next = Resolver::new(&store.goals).ensure_date(&store.data, date);
        persist_data(&state.config.data_path, &next).await?;
        store.data = next;
        info!(%date, "created daily record");
    }

    let log = Resolver::new(&store.goals).daily_log(&store.data, date);
    Ok(Json(to_response(&log)))
}

pub async fn get_day(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(date): Path<NaiveDate>,
) -> Result<Json<DayResponse>, AppError> {
    authorize(&state.config, &headers).map_err(reject)?;
    let store = state.store.lock().await;
    let log = Resolver::new(&store.goals).daily_log(&store.data, date);
    Ok(Json(to_response(&log)))
}

pub async fn get_day_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Vec<NutritionLog>>, AppError> {
    let session = authorize(&state.config, &headers).map_err(reject)?;
    let store = state.store.lock().await;
    let log = Resolver::new(&store.goals).daily_log(&store.data, date);
    Ok(Json(log.flatten(&session.user)))
}

pub async fn get_state(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AppData>, AppError> {
    authorize(&state.config, &headers).map_err(reject)?;
    let store = state.store.lock().await;
    Ok(Json(store.data.clone()))
}

pub async fn apply_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Action>, JsonRejection>,
) -> Result<Json<DayResponse>, AppError> {
    authorize(&state.config, &headers).map_err(reject)?;
    let Json(action) = payload.map_err(|err| {
        warn!("rejected action payload: {err}");
        AppError::bad_request(err.body_text())
    })?;

    let mut store = state.store.lock().await;
    let resolver = Resolver::new(&store.goals);
    let next = resolver.apply(&store.data, &action).map_err(|err| {
        warn!(?action, "rejected action: {err}");
        err
    })?;
    let date = action.target_date().unwrap_or(next.current_date);
    let log = resolver.daily_log(&next, date);

    persist_data(&state.config.data_path, &next).await?;
    store.data = next;
    info!(?action, %date, "applied action");

    Ok(Json(to_response(&log)))
}

pub async fn get_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProgressResponse>, AppError> {
    authorize(&state.config, &headers).map_err(reject)?;
    let store = state.store.lock().await;
    Ok(Json(build_progress(&store.data)))
}

pub async fn get_calendar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarMonth>, AppError> {
    authorize(&state.config, &headers).map_err(reject)?;
    let now = today();
    let year = query.year.unwrap_or(now.year());
    let month = query.month.unwrap_or(now.month());

    let store = state.store.lock().await;
    build_calendar(&store.data, year, month)
        .map(Json)
        .ok_or_else(|| AppError::bad_request(format!("invalid month {year}-{month}")))
}

pub async fn get_goals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GoalTable>, AppError> {
    authorize(&state.config, &headers).map_err(reject)?;
    let store = state.store.lock().await;
    Ok(Json(store.goals.clone()))
}

pub async fn put_goals(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Vec<NutritionGoal>>, JsonRejection>,
) -> Result<Json<GoalTable>, AppError> {
    authorize(&state.config, &headers).map_err(reject)?;
    let Json(goals) = payload.map_err(|err| {
        warn!("rejected goal config payload: {err}");
        AppError::bad_request(err.body_text())
    })?;
    let table = GoalTable::new(goals).map_err(reject)?;
    replace_goals(&state, table).await
}

pub async fn reset_goals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GoalTable>, AppError> {
    authorize(&state.config, &headers).map_err(reject)?;
    replace_goals(&state, GoalTable::default()).await
}

async fn replace_goals(state: &AppState, table: GoalTable) -> Result<Json<GoalTable>, AppError> {
    let mut store = state.store.lock().await;
    persist_goals(&state.config.goals_path, &table).await?;
    store.goals = table.clone();
    info!("updated default goal table");
    Ok(Json(table))
}

fn reject(err: TrackerError) -> AppError {
    warn!("rejected request: {err}");
    err.into()
}

fn to_response(log: &DailyLog) -> DayResponse {
    let goals = log
        .nutrition_goals
        .iter()
        .map(|goal| GoalView {
            id: goal.id,
            name: goal.name.clone(),
            current: goal.current,
            target: goal.target.get(log.active_mode),
            unit: goal.unit.name.clone(),
            color: goal.color.clone(),
            progress: progress_percent(goal, log.active_mode),
            bar_width: progress_bar_width(goal, log.active_mode),
        })
        .collect();

    DayResponse {
        date: log.date,
        active_mode: log.active_mode,
        goals,
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
