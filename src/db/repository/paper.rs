use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension};

use super::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::PaperRecord;

/// Insert a paper, or refresh every column except `external_id` and
/// `first_seen_at` when it is already known.
pub fn upsert_paper(conn: &Connection, paper: &PaperRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO papers (external_id, source, title_raw, title_norm, abstract_raw,
         authors_json, affiliations_json, published_at, updated_at, link, pdf_url,
         code_urls_json, categories_json, first_seen_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(external_id) DO UPDATE SET
            source = excluded.source,
            title_raw = excluded.title_raw,
            title_norm = excluded.title_norm,
            abstract_raw = excluded.abstract_raw,
            authors_json = excluded.authors_json,
            affiliations_json = excluded.affiliations_json,
            published_at = excluded.published_at,
            updated_at = excluded.updated_at,
            link = excluded.link,
            pdf_url = excluded.pdf_url,
            code_urls_json = excluded.code_urls_json,
            categories_json = excluded.categories_json",
        params![
            paper.external_id,
            paper.source.as_str(),
            paper.title_raw,
            paper.title_norm,
            paper.abstract_raw,
            paper.authors_json,
            paper.affiliations_json,
            format_timestamp(&paper.published_at),
            format_timestamp(&paper.updated_at),
            paper.link,
            paper.pdf_url,
            paper.code_urls_json,
            paper.categories_json,
            format_timestamp(&paper.first_seen_at),
        ],
    )?;
    Ok(())
}

/// All stored external ids and all stored normalized titles.
pub fn fetch_seen_keys(
    conn: &Connection,
) -> Result<(HashSet<String>, HashSet<String>), DatabaseError> {
    let mut stmt = conn.prepare("SELECT external_id, title_norm FROM papers")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut external_ids = HashSet::new();
    let mut title_keys = HashSet::new();
    for row in rows {
        let (external_id, title_norm) = row?;
        external_ids.insert(external_id);
        title_keys.insert(title_norm);
    }
    Ok((external_ids, title_keys))
}

pub fn get_paper(conn: &Connection, external_id: &str) -> Result<Option<PaperRecord>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT external_id, source, title_raw, title_norm, abstract_raw, authors_json,
                    affiliations_json, published_at, updated_at, link, pdf_url,
                    code_urls_json, categories_json, first_seen_at
             FROM papers WHERE external_id = ?1",
            params![external_id],
            |row| {
                Ok(PaperRow {
                    external_id: row.get(0)?,
                    source: row.get(1)?,
                    title_raw: row.get(2)?,
                    title_norm: row.get(3)?,
                    abstract_raw: row.get(4)?,
                    authors_json: row.get(5)?,
                    affiliations_json: row.get(6)?,
                    published_at: row.get(7)?,
                    updated_at: row.get(8)?,
                    link: row.get(9)?,
                    pdf_url: row.get(10)?,
                    code_urls_json: row.get(11)?,
                    categories_json: row.get(12)?,
                    first_seen_at: row.get(13)?,
                })
            },
        )
        .optional()?;

    row.map(PaperRow::into_record).transpose()
}

pub fn paper_count(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
    Ok(count)
}

struct PaperRow {
    external_id: String,
    source: String,
    title_raw: String,
    title_norm: String,
    abstract_raw: String,
    authors_json: String,
    affiliations_json: String,
    published_at: String,
    updated_at: String,
    link: String,
    pdf_url: String,
    code_urls_json: String,
    categories_json: String,
    first_seen_at: String,
}

impl PaperRow {
    fn into_record(self) -> Result<PaperRecord, DatabaseError> {
        Ok(PaperRecord {
            external_id: self.external_id,
            source: self.source.parse()?,
            title_raw: self.title_raw,
            title_norm: self.title_norm,
            abstract_raw: self.abstract_raw,
            authors_json: self.authors_json,
            affiliations_json: self.affiliations_json,
            published_at: parse_timestamp(&self.published_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            link: self.link,
            pdf_url: self.pdf_url,
            code_urls_json: self.code_urls_json,
            categories_json: self.categories_json,
            first_seen_at: parse_timestamp(&self.first_seen_at)?,
        })
    }
}
