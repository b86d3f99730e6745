//! SQLite-backed store.

use super::{MatchRecord, Store, StoreError, StoreResult};
use crate::models::{Gender, GroupConfig, MatchHistory, Player, PlayerId, RatingLogEntry};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = include_str!("schema.sql");

const PLAYER_COLUMNS: &str =
    "id, name, rating, matches_played, victories, group_name, gender, is_setter";
const HISTORY_COLUMNS: &str = "id, played_at, team_a, team_b, winner, rating_delta, group_name";
const LOG_COLUMNS: &str = "id, player_id, player_name, log_date, rating, group_name";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        log::info!("Opened database at {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    /// Private in-memory database (tests, previews).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

fn parse_player_row(row: &rusqlite::Row) -> rusqlite::Result<Player> {
    let gender: Option<String> = row.get(6)?;
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        rating: row.get(2)?,
        matches_played: row.get(3)?,
        victories: row.get(4)?,
        group: row.get(5)?,
        gender: gender.as_deref().and_then(Gender::from_code),
        is_setter: row.get(7)?,
    })
}

fn parse_history_row(row: &rusqlite::Row) -> rusqlite::Result<MatchHistory> {
    Ok(MatchHistory {
        id: row.get(0)?,
        played_at: row.get(1)?,
        team_a: row.get(2)?,
        team_b: row.get(3)?,
        winner: row.get(4)?,
        rating_delta: row.get(5)?,
        group: row.get(6)?,
    })
}

fn parse_log_row(row: &rusqlite::Row) -> rusqlite::Result<RatingLogEntry> {
    Ok(RatingLogEntry {
        id: row.get(0)?,
        player_id: row.get(1)?,
        name: row.get(2)?,
        date: row.get(3)?,
        rating: row.get(4)?,
        group: row.get(5)?,
    })
}

fn parse_config_row(row: &rusqlite::Row) -> rusqlite::Result<GroupConfig> {
    Ok(GroupConfig {
        group: row.get(0)?,
        team_size: row.get(1)?,
        victory_limit: row.get(2)?,
        gender_priority: row.get(3)?,
    })
}

fn write_player(conn: &Connection, verb: &str, player: &Player) -> rusqlite::Result<usize> {
    let sql = format!(
        "{verb} INTO players ({PLAYER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    );
    conn.execute(
        &sql,
        params![
            player.id,
            player.name,
            player.rating,
            player.matches_played,
            player.victories,
            player.group,
            player.gender.map(Gender::code),
            player.is_setter,
        ],
    )
}

fn update_player_row(conn: &Connection, player: &Player) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE players SET name = ?2, rating = ?3, matches_played = ?4, victories = ?5, group_name = ?6, gender = ?7, is_setter = ?8 WHERE id = ?1",
        params![
            player.id,
            player.name,
            player.rating,
            player.matches_played,
            player.victories,
            player.group,
            player.gender.map(Gender::code),
            player.is_setter,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::PlayerNotFound(player.id));
    }
    Ok(())
}

fn insert_history_row(conn: &Connection, verb: &str, record: &MatchHistory) -> rusqlite::Result<usize> {
    let sql = format!("{verb} INTO match_history ({HISTORY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)");
    conn.execute(
        &sql,
        params![
            record.id,
            record.played_at,
            record.team_a,
            record.team_b,
            record.winner,
            record.rating_delta,
            record.group,
        ],
    )
}

fn history_row_exists(conn: &Connection, record: &MatchHistory) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM match_history WHERE played_at = ?1 AND team_a = ?2 AND team_b = ?3 AND group_name = ?4)",
        params![record.played_at, record.team_a, record.team_b, record.group],
        |row| row.get(0),
    )
}

fn log_row_exists(conn: &Connection, entry: &RatingLogEntry) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM rating_log WHERE player_id = ?1 AND log_date = ?2 AND rating = ?3 AND group_name = ?4)",
        params![entry.player_id, entry.date, entry.rating, entry.group],
        |row| row.get(0),
    )
}

fn insert_log_row(conn: &Connection, verb: &str, entry: &RatingLogEntry) -> rusqlite::Result<usize> {
    let sql = format!("{verb} INTO rating_log ({LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)");
    conn.execute(
        &sql,
        params![
            entry.id,
            entry.player_id,
            entry.name,
            entry.date,
            entry.rating,
            entry.group,
        ],
    )
}

impl Store for SqliteStore {
    fn players(&self) -> StoreResult<Vec<Player>> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY rating DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], parse_player_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn players_in_group(&self, group: &str) -> StoreResult<Vec<Player>> {
        let sql = format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE group_name = ?1 ORDER BY rating DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![group], parse_player_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn player(&self, id: PlayerId) -> StoreResult<Option<Player>> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], parse_player_row)
            .optional()?)
    }

    fn insert_player(&mut self, player: &Player) -> StoreResult<()> {
        write_player(&self.conn, "INSERT OR REPLACE", player)?;
        Ok(())
    }

    fn insert_players_if_absent(&mut self, players: &[Player]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        for p in players {
            inserted += write_player(&tx, "INSERT OR IGNORE", p)?;
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn update_player(&mut self, player: &Player) -> StoreResult<()> {
        update_player_row(&self.conn, player)
    }

    fn update_players(&mut self, players: &[Player]) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        for p in players {
            update_player_row(&tx, p)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_player(&mut self, id: PlayerId) -> StoreResult<()> {
        self.conn.execute("DELETE FROM players WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn history(&self, group: &str) -> StoreResult<Vec<MatchHistory>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM match_history WHERE group_name = ?1 ORDER BY id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![group], parse_history_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert_match(&mut self, record: &MatchHistory) -> StoreResult<i64> {
        insert_history_row(&self.conn, "INSERT", record)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_history_if_absent(&mut self, records: &[MatchHistory]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        for r in records {
            // Rows without an id (CSV imports) are matched on content instead.
            if r.id.is_none() && history_row_exists(&tx, r)? {
                continue;
            }
            inserted += insert_history_row(&tx, "INSERT OR IGNORE", r)?;
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn insert_rating_log(&mut self, entry: &RatingLogEntry) -> StoreResult<i64> {
        insert_log_row(&self.conn, "INSERT", entry)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_rating_logs_if_absent(&mut self, entries: &[RatingLogEntry]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        for e in entries {
            if e.id.is_none() && log_row_exists(&tx, e)? {
                continue;
            }
            inserted += insert_log_row(&tx, "INSERT OR IGNORE", e)?;
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn rating_logs(&self, group: &str) -> StoreResult<Vec<RatingLogEntry>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM rating_log WHERE group_name = ?1 ORDER BY log_date ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![group], parse_log_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn group_config(&self, group: &str) -> StoreResult<Option<GroupConfig>> {
        Ok(self
            .conn
            .query_row(
                "SELECT group_name, team_size, victory_limit, gender_priority FROM group_configs WHERE group_name = ?1",
                params![group],
                parse_config_row,
            )
            .optional()?)
    }

    fn save_group_config(&mut self, config: &GroupConfig) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO group_configs (group_name, team_size, victory_limit, gender_priority) VALUES (?1, ?2, ?3, ?4)",
            params![
                config.group,
                config.team_size,
                config.victory_limit,
                config.gender_priority,
            ],
        )?;
        Ok(())
    }

    fn rename_group(&mut self, old: &str, new: &str) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE players SET group_name = ?2 WHERE group_name = ?1",
            params![old, new],
        )?;
        tx.execute(
            "UPDATE match_history SET group_name = ?2 WHERE group_name = ?1",
            params![old, new],
        )?;
        // A config already stored under the new name is replaced by the renamed one.
        tx.execute(
            "UPDATE OR REPLACE group_configs SET group_name = ?2 WHERE group_name = ?1",
            params![old, new],
        )?;
        tx.execute(
            "UPDATE rating_log SET group_name = ?2 WHERE group_name = ?1",
            params![old, new],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_group(&mut self, group: &str) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        for table in ["players", "match_history", "group_configs", "rating_log"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE group_name = ?1"),
                params![group],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn group_names(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT group_name FROM group_configs UNION SELECT group_name FROM players ORDER BY 1",
        )?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
    }

    fn commit_match(&mut self, record: &MatchRecord) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        for p in &record.players {
            update_player_row(&tx, p)?;
        }
        for entry in &record.log_entries {
            insert_log_row(&tx, "INSERT", entry)?;
        }
        insert_history_row(&tx, "INSERT", &record.history)?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_replaces_existing_target_config() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut old = GroupConfig::new("Tuesday");
        old.team_size = 4;
        store.save_group_config(&old).unwrap();
        store.save_group_config(&GroupConfig::new("Thursday")).unwrap();

        store.rename_group("Tuesday", "Thursday").unwrap();

        let cfg = store.group_config("Thursday").unwrap().unwrap();
        assert_eq!(cfg.team_size, 4);
        assert!(store.group_config("Tuesday").unwrap().is_none());
    }

    #[test]
    fn update_of_missing_player_is_an_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let p = Player::new("Ghost", "General");
        assert!(matches!(
            store.update_player(&p),
            Err(StoreError::PlayerNotFound(id)) if id == p.id
        ));
    }

    #[test]
    fn failed_commit_leaves_no_partial_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let stored = Player::new("Ana", "General");
        store.insert_player(&stored).unwrap();
        let missing = Player::new("Ghost", "General");
        let record = MatchRecord {
            players: vec![stored.clone().with_rating(1216.0), missing],
            log_entries: Vec::new(),
            history: MatchHistory {
                id: None,
                played_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                team_a: "Ana".into(),
                team_b: "Ghost".into(),
                winner: "Team A".into(),
                rating_delta: 16.0,
                group: "General".into(),
            },
        };

        assert!(store.commit_match(&record).is_err());
        assert_eq!(store.player(stored.id).unwrap().unwrap().rating, 1200.0);
        assert!(store.history("General").unwrap().is_empty());
    }
}
