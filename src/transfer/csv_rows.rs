//! Row-level CSV encoding. Rows that fail to parse are skipped with a warning.

use super::TransferError;
use crate::models::{
    Gender, MatchHistory, Player, RatingLogEntry, DEFAULT_RATING, MATCH_TIME_FORMAT,
};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use uuid::Uuid;

const PLAYER_HEADER: [&str; 7] = ["id", "name", "rating", "matchesPlayed", "victories", "group", "gender"];
const HISTORY_HEADER: [&str; 6] = ["date", "teamA", "teamB", "winner", "ratingDelta", "group"];
const LOG_HEADER: [&str; 6] = ["id", "playerId", "name", "date", "rating", "group"];
const LOG_DATE_FORMAT: &str = "%Y-%m-%d";

fn fmt_rating(value: f64) -> String {
    format!("{value:.2}")
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String, TransferError> {
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Parse every data row with `parse`, skipping (and logging) the ones it rejects.
fn read_rows<T>(
    data: &str,
    kind: &str,
    parse: impl Fn(&StringRecord) -> Option<T>,
) -> Vec<T> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // +2: one for the header, one for 1-based numbering.
        let line = idx + 2;
        match record {
            Ok(record) => match parse(&record) {
                Some(row) => rows.push(row),
                None => log::warn!("Skipping malformed {kind} row at line {line}"),
            },
            Err(e) => log::warn!("Skipping unreadable {kind} row at line {line}: {e}"),
        }
    }
    rows
}

/// Empty means `default`; anything else must parse.
fn parse_or<T: std::str::FromStr>(field: &str, default: T) -> Option<T> {
    if field.is_empty() {
        Some(default)
    } else {
        field.parse().ok()
    }
}

pub fn players_to_csv(players: &[Player]) -> Result<String, TransferError> {
    let mut w = Writer::from_writer(Vec::new());
    w.write_record(PLAYER_HEADER)?;
    for p in players {
        w.write_record([
            p.id.to_string(),
            p.name.clone(),
            fmt_rating(p.rating),
            p.matches_played.to_string(),
            p.victories.to_string(),
            p.group.clone(),
            p.gender.map(Gender::code).unwrap_or_default().to_string(),
        ])?;
    }
    finish(w)
}

/// `id,name,rating,matchesPlayed,victories,group[,gender]`. An empty id gets a fresh one.
pub fn players_from_csv(data: &str) -> Vec<Player> {
    read_rows(data, "player", |r| {
        if r.len() < 6 || r[1].is_empty() || r[5].is_empty() {
            return None;
        }
        let id = if r[0].is_empty() {
            Uuid::new_v4()
        } else {
            Uuid::parse_str(&r[0]).ok()?
        };
        Some(Player {
            id,
            name: r[1].to_string(),
            rating: parse_or(&r[2], DEFAULT_RATING)?,
            matches_played: parse_or(&r[3], 0)?,
            victories: parse_or(&r[4], 0)?,
            group: r[5].to_string(),
            gender: r.get(6).and_then(Gender::from_code),
            is_setter: false,
        })
    })
}

pub fn history_to_csv(history: &[MatchHistory]) -> Result<String, TransferError> {
    let mut w = Writer::from_writer(Vec::new());
    w.write_record(HISTORY_HEADER)?;
    for h in history {
        w.write_record([
            h.display_time(),
            h.team_a.clone(),
            h.team_b.clone(),
            h.winner.clone(),
            fmt_rating(h.rating_delta),
            h.group.clone(),
        ])?;
    }
    finish(w)
}

/// `date,teamA,teamB,winner,ratingDelta,group` with `dd/mm/yyyy HH:MM` dates.
pub fn history_from_csv(data: &str) -> Vec<MatchHistory> {
    read_rows(data, "history", |r| {
        if r.len() < 6 || r[5].is_empty() {
            return None;
        }
        Some(MatchHistory {
            id: None,
            played_at: NaiveDateTime::parse_from_str(&r[0], MATCH_TIME_FORMAT).ok()?,
            team_a: r[1].to_string(),
            team_b: r[2].to_string(),
            winner: r[3].to_string(),
            rating_delta: r[4].parse().ok()?,
            group: r[5].to_string(),
        })
    })
}

pub fn rating_logs_to_csv(logs: &[RatingLogEntry]) -> Result<String, TransferError> {
    let mut w = Writer::from_writer(Vec::new());
    w.write_record(LOG_HEADER)?;
    for e in logs {
        w.write_record([
            e.id.map(|id| id.to_string()).unwrap_or_default(),
            e.player_id.to_string(),
            e.name.clone(),
            e.date.format(LOG_DATE_FORMAT).to_string(),
            fmt_rating(e.rating),
            e.group.clone(),
        ])?;
    }
    finish(w)
}

/// `id,playerId,name,date,rating,group` with `yyyy-mm-dd` dates. The id may be empty.
pub fn rating_logs_from_csv(data: &str) -> Vec<RatingLogEntry> {
    read_rows(data, "rating log", |r| {
        if r.len() < 6 || r[5].is_empty() {
            return None;
        }
        let id = if r[0].is_empty() {
            None
        } else {
            Some(r[0].parse().ok()?)
        };
        Some(RatingLogEntry {
            id,
            player_id: Uuid::parse_str(&r[1]).ok()?,
            name: r[2].to_string(),
            date: NaiveDate::parse_from_str(&r[3], LOG_DATE_FORMAT).ok()?,
            rating: r[4].parse().ok()?,
            group: r[5].to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_keep_their_commas() {
        let data = "date,teamA,teamB,winner,ratingDelta,group\n\
                    \"01/02/2024 19:30\",\"Ana, Bia\",\"Caio, Davi\",\"Team A\",16.00,\"Tuesday\"\n";
        let rows = history_from_csv(data);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].team_a, "Ana, Bia");
        assert_eq!(rows[0].team_b, "Caio, Davi");
        assert_eq!(rows[0].rating_delta, 16.0);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let data = "id,name,rating,matchesPlayed,victories,group,gender\n\
                    ,Ana,1250.5,3,2,General,F\n\
                    not-a-uuid,Bia,1200,0,0,General,F\n\
                    ,Caio,abc,0,0,General,M\n\
                    ,Davi,1180,1,0,General\n";
        let players = players_from_csv(data);
        let names: Vec<_> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Davi"]);
        assert_eq!(players[0].gender, Some(Gender::Female));
        assert_eq!(players[1].gender, None);
    }

    #[test]
    fn exported_players_import_back() {
        let p = Player::new("Smith, John", "General")
            .with_rating(1234.567)
            .with_gender(Gender::Male);
        let csv = players_to_csv(std::slice::from_ref(&p)).unwrap();
        assert!(csv.contains("\"Smith, John\""));
        assert!(csv.contains("1234.57"));
        let back = players_from_csv(&csv);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].id, p.id);
        assert_eq!(back[0].name, "Smith, John");
        assert_eq!(back[0].gender, Some(Gender::Male));
    }
}
