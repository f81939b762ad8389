// Leaderboard derived from user statistics. Never persisted.

use crate::domain::user::User;
use std::cmp::Ordering;

pub const DEFAULT_RANKING_LIMIT: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub rank: u32,
    pub display_name: String,
    pub games_won: u32,
    pub best_duration: Option<f64>,
}

/// Ranks every user that played at least once.
///
/// Users are ordered by games won (descending), ties by best duration (ascending, unset
/// last). The sort is stable, so equal users keep store order. At most `limit` entries are
/// returned, ranked 1..=limit.
pub fn compute_ranking(users: &[User], limit: usize) -> Vec<Ranking> {
    let mut players: Vec<&User> = users.iter().filter(|u| u.played_games > 0).collect();
    players.sort_by(|a, b| {
        b.games_won
            .cmp(&a.games_won)
            .then_with(|| compare_durations(a.best_duration, b.best_duration))
    });

    players
        .into_iter()
        .take(limit)
        .zip(1u32..)
        .map(|(user, rank)| Ranking {
            rank,
            display_name: user.display_name.clone(),
            games_won: user.games_won,
            best_duration: user.best_duration,
        })
        .collect()
}

fn compare_durations(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, played: u32, won: u32, best: Option<f64>) -> User {
        User {
            played_games: played,
            games_won: won,
            best_duration: best,
            ..User::new(name)
        }
    }

    #[test]
    fn orders_by_wins_then_fastest_round() {
        let users = vec![
            player("slow-winner", 5, 2, Some(90.0)),
            player("champion", 6, 3, Some(120.0)),
            player("fast-winner", 3, 2, Some(45.5)),
            player("rookie", 1, 0, Some(200.0)),
        ];

        let ranking = compute_ranking(&users, DEFAULT_RANKING_LIMIT);

        let names: Vec<&str> = ranking.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["champion", "fast-winner", "slow-winner", "rookie"]);
        let ranks: Vec<u32> = ranking.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn skips_users_without_played_games() {
        let users = vec![player("spectator", 0, 0, None), player("anna", 1, 1, Some(10.0))];

        let ranking = compute_ranking(&users, DEFAULT_RANKING_LIMIT);

        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].display_name, "anna");
    }

    #[test]
    fn truncates_to_the_inclusive_limit() {
        let users: Vec<User> = (0..40)
            .map(|i| player(&format!("p{i}"), 1, 0, Some(f64::from(i))))
            .collect();

        let ranking = compute_ranking(&users, 30);

        assert_eq!(ranking.len(), 30);
        assert_eq!(ranking.last().map(|r| r.rank), Some(30));
        assert_eq!(ranking[0].display_name, "p0");
    }

    #[test]
    fn equal_users_keep_store_order() {
        let users = vec![
            player("first", 2, 1, Some(50.0)),
            player("second", 2, 1, Some(50.0)),
        ];

        let ranking = compute_ranking(&users, DEFAULT_RANKING_LIMIT);

        assert_eq!(ranking[0].display_name, "first");
        assert_eq!(ranking[1].display_name, "second");
    }
}
