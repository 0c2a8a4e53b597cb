//! Pure computation of a team's play window from game configuration and "now".

use time::{Duration, OffsetDateTime};

use crate::dao::models::SessionStamp;

/// A team's play window. Computed once per start batch and applied identically
/// to every team so synchronized games share one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    /// Window start; always the captured "now" of the batch.
    pub begin: OffsetDateTime,
    /// Window end, clamped to the game end on a late start.
    pub end: OffsetDateTime,
    /// Effective length in whole minutes.
    pub length_minutes: i64,
    /// Whether the nominal window was truncated against the game end.
    pub is_late_start: bool,
}

impl SessionWindow {
    /// Session fields as written to storage for the whole batch.
    pub fn stamp(&self) -> SessionStamp {
        SessionStamp {
            begin: self.begin,
            end: self.end,
            length_minutes: self.length_minutes,
            is_late_start: self.is_late_start,
        }
    }
}

/// Compute the play window for a start at `now`.
///
/// The nominal window is `now + session_minutes`. When that would run past
/// `game_end` the window is clamped and flagged as a late start, unless the
/// caller is privileged: an elevated operator always gets the full nominal
/// window, even past game end.
///
/// Pure and deterministic; callers must pass the same `now` for every team in
/// a batch.
pub fn calculate(
    session_minutes: i64,
    game_end: OffsetDateTime,
    is_privileged_caller: bool,
    now: OffsetDateTime,
) -> SessionWindow {
    let nominal_end = now + Duration::minutes(session_minutes);

    if !is_privileged_caller && nominal_end > game_end {
        return SessionWindow {
            begin: now,
            end: game_end,
            length_minutes: round_whole_minutes(game_end - now),
            is_late_start: true,
        };
    }

    SessionWindow {
        begin: now,
        end: nominal_end,
        length_minutes: session_minutes,
        is_late_start: false,
    }
}

/// Round a duration to whole minutes, half-up.
fn round_whole_minutes(duration: Duration) -> i64 {
    (duration.whole_seconds() + 30).div_euclid(60)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const NOW: OffsetDateTime = datetime!(2026-03-14 12:00 UTC);

    #[test]
    fn same_inputs_same_window() {
        let game_end = NOW + Duration::minutes(90);
        let first = calculate(60, game_end, false, NOW);
        let second = calculate(60, game_end, false, NOW);
        assert_eq!(first, second);
    }

    #[test]
    fn nominal_window_fits_before_game_end() {
        let window = calculate(60, NOW + Duration::minutes(120), false, NOW);
        assert_eq!(window.begin, NOW);
        assert_eq!(window.end, NOW + Duration::minutes(60));
        assert_eq!(window.length_minutes, 60);
        assert!(!window.is_late_start);
    }

    #[test]
    fn late_start_clamps_to_game_end() {
        let game_end = NOW + Duration::minutes(60);
        let window = calculate(120, game_end, false, NOW);
        assert_eq!(window.end, game_end);
        assert!(window.is_late_start);
        assert_eq!(window.length_minutes, 60);
    }

    #[test]
    fn privileged_caller_skips_truncation() {
        let game_end = NOW + Duration::minutes(60);
        let window = calculate(120, game_end, true, NOW);
        assert!(!window.is_late_start);
        assert_eq!(window.end, NOW + Duration::minutes(120));
        assert_eq!(window.length_minutes, 120);
    }

    #[test]
    fn truncated_length_rounds_to_whole_minutes() {
        let game_end = NOW + Duration::seconds(45 * 60 + 29);
        assert_eq!(calculate(120, game_end, false, NOW).length_minutes, 45);

        let game_end = NOW + Duration::seconds(45 * 60 + 31);
        assert_eq!(calculate(120, game_end, false, NOW).length_minutes, 46);
    }

    #[test]
    fn session_ending_exactly_at_game_end_is_not_late() {
        let game_end = NOW + Duration::minutes(60);
        let window = calculate(60, game_end, false, NOW);
        assert!(!window.is_late_start);
        assert_eq!(window.end, game_end);
    }
}
