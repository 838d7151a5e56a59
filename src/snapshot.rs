//! Timestamp-named SQLite snapshots of a run's datasets.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use rusqlite::{params, Connection};
use tracing::info;

use crate::error::Result;
use crate::model::{PlaceRow, Review, ReviewRow};
use crate::pipeline::Dataset;

const FILE_PREFIX: &str = "cafes_";
const FILE_EXT: &str = "sqlite";

/// Places and reviews read back from a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub places: Vec<PlaceRow>,
    pub reviews: Vec<ReviewRow>,
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS places (
            place_id          TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            rating            REAL NOT NULL,
            total_ratings     INTEGER NOT NULL,
            price_level       INTEGER NOT NULL,
            types             TEXT NOT NULL,
            business_status   TEXT,
            neighborhood      TEXT NOT NULL,
            region            TEXT NOT NULL,
            ratings_pct_tier  INTEGER NOT NULL CHECK(ratings_pct_tier BETWEEN 1 AND 4),
            rating_mean       REAL,
            rating_std        REAL,
            review_count      INTEGER NOT NULL,
            text_length_mean  REAL,
            word_count_mean   REAL
        );
        CREATE INDEX IF NOT EXISTS idx_places_region ON places(region);

        CREATE TABLE IF NOT EXISTS reviews (
            id                        INTEGER PRIMARY KEY,
            place_id                  TEXT NOT NULL REFERENCES places(place_id),
            place_name                TEXT NOT NULL,
            author_id                 TEXT,
            rating                    INTEGER,
            text                      TEXT,
            text_clean                TEXT NOT NULL,
            text_length               INTEGER NOT NULL,
            word_count                INTEGER NOT NULL,
            review_date               TEXT,
            year                      INTEGER,
            month                     INTEGER,
            day_of_week               INTEGER,
            relative_time_description TEXT,
            neighborhood              TEXT NOT NULL,
            region                    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_reviews_place ON reviews(place_id);

        CREATE TABLE IF NOT EXISTS summary (
            metric TEXT PRIMARY KEY,
            value  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS failed_places (
            place_id TEXT PRIMARY KEY
        );
        ",
    )?;
    Ok(())
}

/// Write `dataset` to `<dir>/cafes_<YYYYMMDD_HHMMSS>.sqlite`.
pub fn write_snapshot(dir: &Path, dataset: &Dataset) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{FILE_PREFIX}{stamp}.{FILE_EXT}"));
    write_snapshot_to(&path, dataset)?;
    info!(path = %path.display(), "snapshot written");
    Ok(path)
}

/// Replace the contents of the snapshot at `path`.
pub fn write_snapshot_to(path: &Path, dataset: &Dataset) -> Result<()> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    init_schema(&conn)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "DELETE FROM reviews; DELETE FROM places; DELETE FROM summary; DELETE FROM failed_places;",
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO places (place_id, name, rating, total_ratings, price_level, types,
                business_status, neighborhood, region, ratings_pct_tier, rating_mean, rating_std,
                review_count, text_length_mean, word_count_mean)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )?;
        for p in &dataset.places {
            stmt.execute(params![
                p.place_id,
                p.name,
                p.rating,
                p.total_ratings,
                p.price_level,
                serde_json::to_string(&p.types)?,
                p.business_status,
                p.neighborhood,
                p.region,
                p.ratings_pct_tier,
                p.rating_mean,
                p.rating_std,
                p.review_count as i64,
                p.text_length_mean,
                p.word_count_mean,
            ])?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO reviews (place_id, place_name, author_id, rating, text, text_clean,
                text_length, word_count, review_date, year, month, day_of_week,
                relative_time_description, neighborhood, region)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )?;
        for row in &dataset.reviews {
            let r = &row.review;
            stmt.execute(params![
                r.place_id,
                r.place_name,
                r.author_id,
                r.rating,
                r.text,
                r.text_clean,
                r.text_length as i64,
                r.word_count as i64,
                r.review_date,
                r.year,
                r.month,
                r.day_of_week,
                r.relative_time_description,
                row.neighborhood,
                row.region,
            ])?;
        }

        let mut stmt = tx.prepare("INSERT INTO summary (metric, value) VALUES (?1, ?2)")?;
        let s = &dataset.summary;
        stmt.execute(params!["total_places", s.total_places.to_string()])?;
        stmt.execute(params!["total_reviews", s.total_reviews.to_string()])?;
        stmt.execute(params![
            "avg_reviews_per_place",
            format!("{:.4}", s.avg_reviews_per_place)
        ])?;
        stmt.execute(params!["missing_reviews", s.missing_reviews.to_string()])?;
        stmt.execute(params![
            "duplicates_removed",
            dataset.duplicates_removed.to_string()
        ])?;
        for (region, n) in &s.places_by_region {
            stmt.execute(params![format!("region:{region}"), n.to_string()])?;
        }
        for (neighborhood, n) in &s.places_by_neighborhood {
            stmt.execute(params![format!("neighborhood:{neighborhood}"), n.to_string()])?;
        }

        let mut stmt = tx.prepare("INSERT OR IGNORE INTO failed_places (place_id) VALUES (?1)")?;
        for id in &dataset.failed_places {
            stmt.execute(params![id])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Newest snapshot in `dir`. Names sort chronologically.
pub fn latest_snapshot(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_snapshot = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(FILE_PREFIX) && n.ends_with(&format!(".{FILE_EXT}")))
            .unwrap_or(false);
        if is_snapshot {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates.pop())
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let conn = Connection::open(path)?;

    let mut stmt = conn.prepare(
        "SELECT place_id, name, rating, total_ratings, price_level, types, business_status,
                neighborhood, region, ratings_pct_tier, rating_mean, rating_std, review_count,
                text_length_mean, word_count_mean
         FROM places ORDER BY rowid",
    )?;
    let raw_places = stmt
        .query_map([], |row| {
            Ok((
                PlaceRow {
                    place_id: row.get(0)?,
                    name: row.get(1)?,
                    rating: row.get(2)?,
                    total_ratings: row.get(3)?,
                    price_level: row.get(4)?,
                    types: BTreeSet::new(),
                    business_status: row.get(6)?,
                    neighborhood: row.get(7)?,
                    region: row.get(8)?,
                    ratings_pct_tier: row.get(9)?,
                    rating_mean: row.get(10)?,
                    rating_std: row.get(11)?,
                    review_count: row.get::<_, i64>(12)? as usize,
                    text_length_mean: row.get(13)?,
                    word_count_mean: row.get(14)?,
                },
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let places = raw_places
        .into_iter()
        .map(|(mut place, types)| -> Result<PlaceRow> {
            place.types = serde_json::from_str(&types)?;
            Ok(place)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT place_id, place_name, author_id, rating, text, text_clean, text_length,
                word_count, review_date, year, month, day_of_week, relative_time_description,
                neighborhood, region
         FROM reviews ORDER BY id",
    )?;
    let reviews = stmt
        .query_map([], |row| {
            Ok(ReviewRow {
                review: Review {
                    place_id: row.get(0)?,
                    place_name: row.get(1)?,
                    author_id: row.get(2)?,
                    rating: row.get(3)?,
                    text: row.get(4)?,
                    text_clean: row.get(5)?,
                    text_length: row.get::<_, i64>(6)? as usize,
                    word_count: row.get::<_, i64>(7)? as usize,
                    review_date: row.get(8)?,
                    year: row.get(9)?,
                    month: row.get(10)?,
                    day_of_week: row.get(11)?,
                    relative_time_description: row.get(12)?,
                },
                neighborhood: row.get(13)?,
                region: row.get(14)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    info!(
        path = %path.display(),
        places = places.len(),
        reviews = reviews.len(),
        "snapshot loaded"
    );
    Ok(Snapshot { places, reviews })
}
