use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::match_session::{GameMode, MatchSession, MatchStatus};
use crate::models::matches::requests::HistoryQuery;
use crate::models::matches::responses::{
    HistoryItem, HistoryResponse, MatchResult, PlayerStats, PlayerSummary, StatsResponse,
};
use crate::repositories::match_repository::MatchRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::services::errors::match_service_errors::MatchServiceError;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 50;
const RECENT_FORM_LEN: usize = 5;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn played_at(session: &MatchSession) -> DateTime<Utc> {
    session.completed_at.unwrap_or(session.created_at)
}

/// Outcome of a completed match for `user_id`.
pub fn result_for(session: &MatchSession, user_id: &str) -> MatchResult {
    match session.winner_id.as_deref() {
        None => MatchResult::Draw,
        Some(winner) if winner == user_id => MatchResult::Win,
        Some(_) => MatchResult::Loss,
    }
}

/// (scored, conceded) for `user_id` in a completed match.
fn goals_for(session: &MatchSession, user_id: &str) -> (u32, u32) {
    let p1 = session.player1_score.unwrap_or(0);
    let p2 = session.player2_score.unwrap_or(0);
    if session.is_player1(user_id) {
        (p1, p2)
    } else {
        (p2, p1)
    }
}

/// Aggregates over completed matches given newest first.
pub fn compute_stats(user_id: &str, completed: &[MatchSession]) -> PlayerStats {
    let mut stats = PlayerStats::default();
    if completed.is_empty() {
        return stats;
    }

    for session in completed {
        let (scored, conceded) = goals_for(session, user_id);
        let result = result_for(session, user_id);
        stats.total_matches += 1;
        stats.goals_scored += scored;
        stats.goals_conceded += conceded;
        if conceded == 0 {
            stats.clean_sheets += 1;
        }
        match result {
            MatchResult::Win => stats.wins += 1,
            MatchResult::Loss => stats.losses += 1,
            MatchResult::Draw => stats.draws += 1,
        }
        if session.mode == GameMode::Ranked {
            stats.ranked_matches += 1;
            if result == MatchResult::Win {
                stats.ranked_wins += 1;
            }
        }
    }

    let results: Vec<MatchResult> = completed.iter().map(|s| result_for(s, user_id)).collect();
    stats.current_streak = match results[0] {
        MatchResult::Draw => 0,
        latest => {
            let run = results.iter().take_while(|r| **r == latest).count() as i32;
            if latest == MatchResult::Win {
                run
            } else {
                -run
            }
        }
    };

    let (mut wins_run, mut losses_run) = (0u32, 0u32);
    for result in results.iter().rev() {
        match result {
            MatchResult::Win => {
                wins_run += 1;
                losses_run = 0;
            }
            MatchResult::Loss => {
                losses_run += 1;
                wins_run = 0;
            }
            MatchResult::Draw => {
                wins_run = 0;
                losses_run = 0;
            }
        }
        stats.longest_win_streak = stats.longest_win_streak.max(wins_run);
        stats.longest_loss_streak = stats.longest_loss_streak.max(losses_run);
    }

    let total = stats.total_matches as f64;
    stats.win_rate = round2(stats.wins as f64 / total * 100.0);
    stats.avg_goals_per_match = round2(stats.goals_scored as f64 / total);
    stats
}

/// Read-only views over a player's finished matches.
pub struct StatsService {
    matches: Arc<dyn MatchRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl StatsService {
    pub fn new(matches: Arc<dyn MatchRepository>, profiles: Arc<dyn ProfileRepository>) -> Self {
        StatsService { matches, profiles }
    }

    async fn completed(&self, user_id: &str) -> Result<Vec<MatchSession>, MatchServiceError> {
        let mut sessions = self
            .matches
            .list_for_player(user_id, &[MatchStatus::Completed])
            .await?;
        sessions.sort_by(|a, b| played_at(b).cmp(&played_at(a)));
        Ok(sessions)
    }

    pub async fn history(&self, user_id: &str, query: &HistoryQuery) -> Result<HistoryResponse, MatchServiceError> {
        let page = query.page.unwrap_or(1);
        let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE);
        if page == 0 {
            return Err(MatchServiceError::ValidationError("page starts at 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&per_page) {
            return Err(MatchServiceError::ValidationError(format!(
                "per_page must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let filtered: Vec<MatchSession> = self
            .completed(user_id)
            .await?
            .into_iter()
            .filter(|s| query.mode.map(|mode| s.mode == mode).unwrap_or(true))
            .filter(|s| query.result.map(|r| result_for(s, user_id) == r).unwrap_or(true))
            .collect();
        let total = filtered.len();
        let start = (page - 1).saturating_mul(per_page);
        let page_items: Vec<MatchSession> = filtered.into_iter().skip(start).take(per_page).collect();

        let opponent_ids: Vec<String> = page_items
            .iter()
            .filter_map(|s| s.opponent_of(user_id).map(str::to_string))
            .collect();
        let opponents: HashMap<String, PlayerSummary> = self
            .profiles
            .get_profiles(&opponent_ids)
            .await?
            .iter()
            .map(|p| (p.user_id.clone(), PlayerSummary::from(p)))
            .collect();

        let matches = page_items
            .iter()
            .map(|session| {
                let opponent_id = session.opponent_of(user_id).unwrap_or_default();
                HistoryItem {
                    id: session.id.clone(),
                    mode: session.mode,
                    status: session.status,
                    opponent: opponents
                        .get(opponent_id)
                        .cloned()
                        .unwrap_or_else(|| PlayerSummary::unknown(opponent_id)),
                    score: session.score_for(user_id),
                    result: result_for(session, user_id),
                    rating_change: session.rating_change_for(user_id).unwrap_or(0),
                    played_at: played_at(session),
                }
            })
            .collect();

        Ok(HistoryResponse {
            matches,
            total,
            page,
            per_page,
            has_next: start + per_page < total,
            has_prev: page > 1,
        })
    }

    pub async fn stats(&self, user_id: &str) -> Result<StatsResponse, MatchServiceError> {
        let profile = self.profiles.get_profile(user_id).await?;
        let completed = self.completed(user_id).await?;

        let mut overview = compute_stats(user_id, &completed);
        overview.ranked_rating = profile.rating;
        let recent_form = completed
            .iter()
            .take(RECENT_FORM_LEN)
            .map(|s| result_for(s, user_id).form_letter().to_string())
            .collect();

        Ok(StatsResponse {
            overview,
            recent_form,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::match_session::Reconciliation;
    use crate::models::profile::Profile;
    use crate::repositories::match_repository::InMemoryMatchRepository;
    use crate::repositories::profile_repository::InMemoryProfileRepository;
    use chrono::Duration;
    use rstest::rstest;

    /// A completed match between "me" and `opponent`, finished `age_minutes` ago.
    fn finished(opponent: &str, mode: GameMode, mine: u32, theirs: u32, age_minutes: i64) -> MatchSession {
        let mut session = MatchSession::paired("me", opponent, mode);
        session.record_claim("me", mine, theirs, None);
        session.record_claim(opponent, theirs, mine, None);
        let Reconciliation::Agreed(outcome) = session.reconcile() else {
            panic!("claims agree");
        };
        session.apply_outcome(&outcome);
        let at = Utc::now() - Duration::minutes(age_minutes);
        session.transition(MatchStatus::ResultSubmitted, at).unwrap();
        session.transition(MatchStatus::Completed, at).unwrap();
        session
    }

    async fn service(sessions: Vec<MatchSession>) -> StatsService {
        let matches = Arc::new(InMemoryMatchRepository::new());
        for session in &sessions {
            matches.create_match(session).await.unwrap();
        }
        let profiles = Arc::new(InMemoryProfileRepository::new());
        profiles.insert(Profile::new("me", Some("Me"))).await;
        profiles.insert(Profile::new("rival", Some("Rival"))).await;
        StatsService::new(matches, profiles)
    }

    #[test]
    fn test_stats_for_no_matches_are_zero() {
        assert_eq!(compute_stats("me", &[]), PlayerStats::default());
    }

    #[test]
    fn test_compute_stats_aggregates() {
        // newest first: W W L D W
        let sessions = vec![
            finished("rival", GameMode::Ranked, 2, 0, 1),
            finished("rival", GameMode::Friendly, 3, 1, 2),
            finished("rival", GameMode::Ranked, 0, 1, 3),
            finished("rival", GameMode::Ranked, 1, 1, 4),
            finished("rival", GameMode::Ranked, 4, 0, 5),
        ];

        let stats = compute_stats("me", &sessions);

        assert_eq!(stats.total_matches, 5);
        assert_eq!((stats.wins, stats.losses, stats.draws), (3, 1, 1));
        assert_eq!(stats.win_rate, 60.0);
        assert_eq!((stats.goals_scored, stats.goals_conceded), (10, 3));
        assert_eq!(stats.avg_goals_per_match, 2.0);
        assert_eq!(stats.clean_sheets, 2);
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_win_streak, 2);
        assert_eq!(stats.longest_loss_streak, 1);
        assert_eq!((stats.ranked_matches, stats.ranked_wins), (4, 2));
    }

    #[rstest]
    #[case(vec![(0, 1), (0, 2), (1, 0)], -2)]
    #[case(vec![(1, 1), (1, 0)], 0)]
    #[case(vec![(5, 0)], 1)]
    fn test_current_streak(#[case] scores: Vec<(u32, u32)>, #[case] expected: i32) {
        let sessions: Vec<MatchSession> = scores
            .into_iter()
            .enumerate()
            .map(|(age, (mine, theirs))| finished("rival", GameMode::Ranked, mine, theirs, age as i64))
            .collect();

        assert_eq!(compute_stats("me", &sessions).current_streak, expected);
    }

    #[tokio::test]
    async fn test_history_is_rendered_from_viewer_perspective() {
        let service = service(vec![finished("rival", GameMode::Ranked, 3, 1, 1)]).await;

        let history = service.history("rival", &HistoryQuery::default()).await.unwrap();

        assert_eq!(history.total, 1);
        let item = &history.matches[0];
        assert_eq!(item.score, "1-3");
        assert_eq!(item.result, MatchResult::Loss);
        assert_eq!(item.rating_change, -25);
        assert_eq!(item.opponent.nickname, "Me");
    }

    #[tokio::test]
    async fn test_history_filters_before_paginating() {
        let mut sessions = Vec::new();
        for age in 0..7 {
            let (mine, theirs) = if age % 2 == 0 { (1, 0) } else { (0, 1) };
            sessions.push(finished("rival", GameMode::Ranked, mine, theirs, age));
        }
        let service = service(sessions).await;
        let query = HistoryQuery {
            result: Some(MatchResult::Win),
            page: Some(2),
            per_page: Some(3),
            ..HistoryQuery::default()
        };

        let history = service.history("me", &query).await.unwrap();

        assert_eq!(history.total, 4);
        assert_eq!(history.matches.len(), 1);
        assert!(history.has_prev);
        assert!(!history.has_next);
        assert!(history.matches.iter().all(|m| m.result == MatchResult::Win));
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_ignores_unfinished() {
        let older = finished("rival", GameMode::Ranked, 1, 0, 30);
        let newer = finished("rival", GameMode::Friendly, 0, 0, 5);
        let unfinished = MatchSession::paired("me", "rival", GameMode::Ranked);
        let service = service(vec![older.clone(), unfinished, newer.clone()]).await;

        let history = service.history("me", &HistoryQuery::default()).await.unwrap();

        let ids: Vec<&str> = history.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
    }

    #[rstest]
    #[case(Some(0), None)]
    #[case(None, Some(0))]
    #[case(None, Some(51))]
    #[tokio::test]
    async fn test_history_rejects_bad_paging(#[case] page: Option<usize>, #[case] per_page: Option<usize>) {
        let service = service(vec![]).await;
        let query = HistoryQuery {
            page,
            per_page,
            ..HistoryQuery::default()
        };

        assert!(matches!(
            service.history("me", &query).await,
            Err(MatchServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_stats_include_rating_and_recent_form() {
        let sessions = (0..6)
            .map(|age| finished("rival", GameMode::Ranked, (age % 2) as u32, 0, age))
            .collect();
        let service = service(sessions).await;

        let stats = service.stats("me").await.unwrap();

        assert_eq!(stats.overview.ranked_rating, 1000);
        assert_eq!(stats.recent_form, vec!["D", "W", "D", "W", "D"]);
    }
}
