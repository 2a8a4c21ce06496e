use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::{DigestItem, DigestRun};

/// Most recent digest run time, if any digest was ever recorded.
pub fn last_run_at(conn: &Connection) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    let raw: Option<String> =
        conn.query_row("SELECT MAX(run_at) FROM digests", [], |row| row.get(0))?;
    raw.as_deref().map(parse_timestamp).transpose()
}

/// Insert one digest row plus one item per emitted paper in a single transaction.
/// `rank_order` is the 1-based position in `ordered_ids`.
pub fn insert_digest(
    conn: &Connection,
    run_at: &DateTime<Utc>,
    output_path: &str,
    model_used: &str,
    window_days: u32,
    top_k: u32,
    ordered_ids: &[String],
) -> Result<i64, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO digests (run_at, output_path, model_used, window_days, top_k)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![format_timestamp(run_at), output_path, model_used, window_days, top_k],
    )?;
    let digest_id = tx.last_insert_rowid();

    for (index, external_id) in ordered_ids.iter().enumerate() {
        tx.execute(
            "INSERT INTO digest_items (digest_id, external_id, rank_order)
             VALUES (?1, ?2, ?3)",
            params![digest_id, external_id, (index + 1) as u32],
        )?;
    }

    tx.commit()?;
    Ok(digest_id)
}

pub fn list_digests(conn: &Connection) -> Result<Vec<DigestRun>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT digest_id, run_at, output_path, model_used, window_days, top_k
         FROM digests ORDER BY digest_id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, u32>(4)?,
            row.get::<_, u32>(5)?,
        ))
    })?;

    let mut runs = Vec::new();
    for row in rows {
        let (digest_id, run_at, output_path, model_used, window_days, top_k) = row?;
        runs.push(DigestRun {
            digest_id,
            run_at: parse_timestamp(&run_at)?,
            output_path,
            model_used,
            window_days,
            top_k,
        });
    }
    Ok(runs)
}

pub fn digest_items(conn: &Connection, digest_id: i64) -> Result<Vec<DigestItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT digest_id, external_id, rank_order FROM digest_items
         WHERE digest_id = ?1 ORDER BY rank_order ASC",
    )?;
    let rows = stmt.query_map(params![digest_id], |row| {
        Ok(DigestItem {
            digest_id: row.get(0)?,
            external_id: row.get(1)?,
            rank_order: row.get(2)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::TimeZone;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_digest_means_no_last_run() {
        let conn = open_memory_database().unwrap();
        assert!(last_run_at(&conn).unwrap().is_none());
    }

    #[test]
    fn insert_digest_records_items_in_rank_order() {
        let conn = open_memory_database().unwrap();
        let run_at = Utc.with_ymd_and_hms(2026, 2, 5, 8, 0, 0).unwrap();

        let digest_id =
            insert_digest(&conn, &run_at, "out/0205_papers.md", "glm-4.7", 7, 10, &ids(&["b", "a", "c"]))
                .unwrap();

        let items = digest_items(&conn, digest_id).unwrap();
        let order: Vec<(&str, u32)> =
            items.iter().map(|i| (i.external_id.as_str(), i.rank_order)).collect();
        assert_eq!(order, vec![("b", 1), ("a", 2), ("c", 3)]);

        let runs = list_digests(&conn).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_at, run_at);
        assert_eq!(runs[0].model_used, "glm-4.7");
        assert_eq!(runs[0].window_days, 7);
        assert_eq!(runs[0].top_k, 10);
    }

    #[test]
    fn last_run_is_the_latest_digest() {
        let conn = open_memory_database().unwrap();
        let early = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 2, 3, 8, 0, 0).unwrap();

        insert_digest(&conn, &late, "b.md", "m", 7, 10, &ids(&["x"])).unwrap();
        insert_digest(&conn, &early, "a.md", "m", 7, 10, &ids(&["y"])).unwrap();

        assert_eq!(last_run_at(&conn).unwrap(), Some(late));
    }

    #[test]
    fn duplicate_item_rolls_back_whole_digest() {
        let conn = open_memory_database().unwrap();
        let run_at = Utc.with_ymd_and_hms(2026, 2, 5, 8, 0, 0).unwrap();

        let result = insert_digest(&conn, &run_at, "a.md", "m", 7, 10, &ids(&["x", "x"]));

        assert!(matches!(result, Err(DatabaseError::Sqlite(_))));
        assert!(list_digests(&conn).unwrap().is_empty());
        assert!(last_run_at(&conn).unwrap().is_none());
    }
}
