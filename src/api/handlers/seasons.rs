use axum::{response::IntoResponse, Json};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CurrentSeason {
    /// Season label, the year the season kicks off in.
    pub season: i32,
    pub phase: String,
}

/// Seasons are labeled by kickoff year. Playoff games in January and
/// February still belong to the previous year's season.
fn season_for(year: i32, month: u32) -> (i32, &'static str) {
    match month {
        1 | 2 => (year - 1, "postseason"),
        3..=7 => (year, "offseason"),
        8 => (year, "preseason"),
        _ => (year, "regular"),
    }
}

#[utoipa::path(
    get,
    path= "/v1/seasons/current",
    responses (
        (status = 200, description = "The season in progress", body = [CurrentSeason], content_type = "application/json"),
    ),
    tag= "seasons"
)]
// axum handler for the public current-season carve-out
pub async fn current_season() -> impl IntoResponse {
    let now = Utc::now();
    let (season, phase) = season_for(now.year(), now.month());

    Json(CurrentSeason {
        season,
        phase: phase.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::season_for;

    #[test]
    fn playoff_months_belong_to_the_previous_season() {
        assert_eq!(season_for(2026, 1), (2025, "postseason"));
        assert_eq!(season_for(2026, 2), (2025, "postseason"));
    }

    #[test]
    fn kickoff_year_labels_the_season() {
        assert_eq!(season_for(2026, 8), (2026, "preseason"));
        assert_eq!(season_for(2026, 9), (2026, "regular"));
        assert_eq!(season_for(2026, 12), (2026, "regular"));
        assert_eq!(season_for(2026, 5), (2026, "offseason"));
    }
}
