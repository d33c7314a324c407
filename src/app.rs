use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/today", get(handlers::get_today))
        .route("/api/state", get(handlers::get_state))
        .route("/api/days/:date", get(handlers::get_day))
        .route("/api/days/:date/logs", get(handlers::get_day_logs))
        .route("/api/actions", post(handlers::apply_action))
        .route("/api/progress", get(handlers::get_progress))
        .route("/api/calendar", get(handlers::get_calendar))
        .route(
            "/api/config",
            get(handlers::get_goals)
                .put(handlers::put_goals)
                .delete(handlers::reset_goals),
        )
        .with_state(state)
}
