use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::errors::StoreError;
use crate::domain::game::{CoinSlot, Game, GameId, GameState, PlayerSlot};
use crate::domain::ports::{GameStore, UserStore};
use crate::domain::user::{User, UserState};

const GAME_COLUMNS: &str = "id, state, duration, \
     player1_name, player1_coins, player2_name, player2_coins, player3_name, player3_coins, \
     computer_name, computer_coins";

const USER_COLUMNS: &str =
    "id, display_name, game_id, position, state, played_games, games_won, best_duration, is_computer";

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn to_coins(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn to_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

#[derive(sqlx::FromRow)]
struct GameRow {
    id: String,
    state: String,
    duration: Option<f64>,
    player1_name: Option<String>,
    player1_coins: i64,
    player2_name: Option<String>,
    player2_coins: i64,
    player3_name: Option<String>,
    player3_coins: i64,
    computer_name: String,
    computer_coins: i64,
}

impl TryFrom<GameRow> for Game {
    type Error = StoreError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let state = GameState::parse(&row.state)
            .ok_or_else(|| StoreError::Backend(format!("unknown game state {:?}", row.state)))?;
        let slot = |name: Option<String>, coins: i64| {
            name.map(|name| PlayerSlot {
                name,
                coins: to_coins(coins),
            })
        };

        Ok(Game {
            id: GameId::from(row.id),
            state,
            duration: row.duration,
            players: [
                slot(row.player1_name, row.player1_coins),
                slot(row.player2_name, row.player2_coins),
                slot(row.player3_name, row.player3_coins),
            ],
            computer: PlayerSlot {
                name: row.computer_name,
                coins: to_coins(row.computer_coins),
            },
        })
    }
}

fn coin_column(slot: CoinSlot) -> &'static str {
    match slot {
        CoinSlot::Player1 => "player1_coins",
        CoinSlot::Player2 => "player2_coins",
        CoinSlot::Player3 => "player3_coins",
        CoinSlot::Computer => "computer_coins",
    }
}

// PostgreSQL-backed game store. The `singleton` unique column admits one game row.
#[derive(Clone)]
pub struct PostgresGameStore {
    pub db: PgPool,
}

impl PostgresGameStore {
    async fn fetch_updated(
        &self,
        id: &GameId,
        query: sqlx::query::QueryAs<'_, sqlx::Postgres, GameRow, sqlx::postgres::PgArguments>,
    ) -> Result<Game, StoreError> {
        match query.fetch_optional(&self.db).await.map_err(backend)? {
            Some(row) => Game::try_from(row),
            None => Err(StoreError::GameNotFound(id.clone())),
        }
    }
}

#[async_trait]
impl GameStore for PostgresGameStore {
    async fn create_if_absent(&self, game: Game) -> Result<Option<GameId>, StoreError> {
        let name = |index: usize| game.players[index].as_ref().map(|p| p.name.clone());
        let coins = |index: usize| {
            game.players[index]
                .as_ref()
                .map_or(0, |p| i64::from(p.coins))
        };

        let created: Option<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO games (id, singleton, state, duration,
                player1_name, player1_coins, player2_name, player2_coins,
                player3_name, player3_coins, computer_name, computer_coins)
            VALUES ($1, TRUE, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (singleton) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(game.id.as_str())
        .bind(game.state.as_str())
        .bind(game.duration)
        .bind(name(0))
        .bind(coins(0))
        .bind(name(1))
        .bind(coins(1))
        .bind(name(2))
        .bind(coins(2))
        .bind(&game.computer.name)
        .bind(i64::from(game.computer.coins))
        .fetch_optional(&self.db)
        .await
        .map_err(backend)?;

        Ok(created.map(|(id,)| GameId::from(id)))
    }

    async fn current(&self) -> Result<Option<Game>, StoreError> {
        let row: Option<GameRow> =
            sqlx::query_as(&format!("SELECT {GAME_COLUMNS} FROM games LIMIT 1"))
                .fetch_optional(&self.db)
                .await
                .map_err(backend)?;
        row.map(Game::try_from).transpose()
    }

    async fn update_state(&self, id: &GameId, state: GameState) -> Result<Game, StoreError> {
        let sql = format!("UPDATE games SET state = $1 WHERE id = $2 RETURNING {GAME_COLUMNS}");
        let query = sqlx::query_as(&sql).bind(state.as_str()).bind(id.as_str());
        self.fetch_updated(id, query).await
    }

    async fn update_duration(&self, id: &GameId, duration: f64) -> Result<Game, StoreError> {
        let sql = format!("UPDATE games SET duration = $1 WHERE id = $2 RETURNING {GAME_COLUMNS}");
        let query = sqlx::query_as(&sql).bind(duration).bind(id.as_str());
        self.fetch_updated(id, query).await
    }

    async fn update_coins(
        &self,
        id: &GameId,
        slot: CoinSlot,
        coins: u32,
    ) -> Result<Game, StoreError> {
        let column = coin_column(slot);
        let sql = format!("UPDATE games SET {column} = $1 WHERE id = $2 RETURNING {GAME_COLUMNS}");
        let query = sqlx::query_as(&sql).bind(i64::from(coins)).bind(id.as_str());
        self.fetch_updated(id, query).await
    }

    async fn remove(&self, id: &GameId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.db)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    display_name: String,
    game_id: Option<String>,
    position: Option<i16>,
    state: String,
    played_games: i32,
    games_won: i32,
    best_duration: Option<f64>,
    is_computer: bool,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let state = UserState::parse(&row.state)
            .ok_or_else(|| StoreError::Backend(format!("unknown user state {:?}", row.state)))?;
        Ok(User {
            id: row.id,
            display_name: row.display_name,
            game_id: row.game_id.map(GameId::from),
            position: row.position.and_then(|p| u8::try_from(p).ok()),
            state,
            played_games: to_count(row.played_games),
            games_won: to_count(row.games_won),
            best_duration: row.best_duration,
            is_computer: row.is_computer,
        })
    }
}

fn to_users(rows: Vec<UserRow>) -> Result<Vec<User>, StoreError> {
    rows.into_iter().map(User::try_from).collect()
}

// PostgreSQL-backed user registry. Rows come back in registration order.
#[derive(Clone)]
pub struct PostgresUserStore {
    pub db: PgPool,
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn all(&self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY seq"))
                .fetch_all(&self.db)
                .await
                .map_err(backend)?;
        to_users(rows)
    }

    async fn active(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE state = $1 ORDER BY seq");
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(UserState::Active.as_str())
            .fetch_all(&self.db)
            .await
            .map_err(backend)?;
        to_users(rows)
    }

    async fn by_game(&self, game_id: &GameId) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE game_id = $1 ORDER BY seq");
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(game_id.as_str())
            .fetch_all(&self.db)
            .await
            .map_err(backend)?;
        to_users(rows)
    }

    async fn set_game(&self, user_id: &str, game_id: Option<&GameId>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET game_id = $1 WHERE id = $2")
            .bind(game_id.map(GameId::as_str))
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    async fn update_statistics(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET played_games = $1, games_won = $2, best_duration = $3
            WHERE id = $4
            "#,
        )
        .bind(i32::try_from(user.played_games).unwrap_or(i32::MAX))
        .bind(i32::try_from(user.games_won).unwrap_or(i32::MAX))
        .bind(user.best_duration)
        .bind(&user.id)
        .execute(&self.db)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(user.id.clone()));
        }
        Ok(())
    }

    async fn insert(&self, user: User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, game_id, position, state,
                played_games, games_won, best_duration, is_computer)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&user.id)
        .bind(&user.display_name)
        .bind(user.game_id.as_ref().map(GameId::as_str))
        .bind(user.position.map(i16::from))
        .bind(user.state.as_str())
        .bind(i32::try_from(user.played_games).unwrap_or(i32::MAX))
        .bind(i32::try_from(user.games_won).unwrap_or(i32::MAX))
        .bind(user.best_duration)
        .bind(user.is_computer)
        .execute(&self.db)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn set_state(&self, user_id: &str, state: UserState) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET state = $1 WHERE id = $2")
            .bind(state.as_str())
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    async fn set_position(&self, user_id: &str, position: Option<u8>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET position = $1 WHERE id = $2")
            .bind(position.map(i16::from))
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    async fn set_all_waiting(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE users SET state = $1 WHERE NOT is_computer")
            .bind(UserState::Waiting.as_str())
            .execute(&self.db)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn remove_computer(&self) -> Result<Option<User>, StoreError> {
        let sql = format!("DELETE FROM users WHERE is_computer RETURNING {USER_COLUMNS}");
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .fetch_all(&self.db)
            .await
            .map_err(backend)?;
        Ok(to_users(rows)?.into_iter().next())
    }
}
