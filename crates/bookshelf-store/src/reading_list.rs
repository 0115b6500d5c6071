//! Per-user reading lists: status, ratings and statistics.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{ffi, params, ToSql};
use tracing::debug;

use crate::sqlite::{constraint_code, db_err, SqliteStore};
use crate::types::{ReadingListEntry, ReadingStatus, UserStats};
use bookshelf_core::{now_millis, Error, Result};

impl ToSql for ReadingStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ReadingStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

impl SqliteStore {
    /// Put a book on a user's list. `Duplicate` if it is already there.
    ///
    /// Any `user_id` is accepted; the first entry creates the user's list.
    pub fn add_to_reading_list(
        &self,
        user_id: i64,
        book_id: i64,
        status: ReadingStatus,
    ) -> Result<()> {
        let now = now_millis();
        let conn = self.lock();
        conn.prepare_cached(
            "INSERT INTO reading_list (user_id, book_id, status, added_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .map_err(db_err)?
        .execute(params![user_id, book_id, status, now])
        .map_err(|e| match constraint_code(&e) {
            Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY) | Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                Error::Duplicate(format!(
                    "book {} is already on the reading list of user {}",
                    book_id, user_id
                ))
            }
            Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                Error::NotFound(format!("book {}", book_id))
            }
            _ => db_err(e),
        })?;
        debug!(user_id, book_id, %status, "added to reading list");
        Ok(())
    }

    /// Change the status of an entry. Returns false when there is no entry.
    pub fn set_status(&self, user_id: i64, book_id: i64, status: ReadingStatus) -> Result<bool> {
        let conn = self.lock();
        let count = conn
            .execute(
                "UPDATE reading_list SET status = ?1, updated_at = ?2 \
                 WHERE user_id = ?3 AND book_id = ?4",
                params![status, now_millis(), user_id, book_id],
            )
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Rate a book on the user's list from 1 to 5.
    pub fn rate_book(&self, user_id: i64, book_id: i64, rating: i64) -> Result<()> {
        if !(1..=5).contains(&rating) {
            return Err(Error::Validation(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }
        let conn = self.lock();
        let count = conn
            .execute(
                "UPDATE reading_list SET rating = ?1, updated_at = ?2 \
                 WHERE user_id = ?3 AND book_id = ?4",
                params![rating, now_millis(), user_id, book_id],
            )
            .map_err(db_err)?;
        if count == 0 {
            return Err(Error::NotFound(format!(
                "book {} is not on the reading list of user {}",
                book_id, user_id
            )));
        }
        Ok(())
    }

    /// Take a book off the user's list. Returns whether an entry was removed.
    pub fn remove_from_reading_list(&self, user_id: i64, book_id: i64) -> Result<bool> {
        let conn = self.lock();
        let count = conn
            .execute(
                "DELETE FROM reading_list WHERE user_id = ?1 AND book_id = ?2",
                params![user_id, book_id],
            )
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Remove every entry for a user. Returns the number removed.
    pub fn clear_reading_list(&self, user_id: i64) -> Result<usize> {
        let conn = self.lock();
        conn.execute(
            "DELETE FROM reading_list WHERE user_id = ?1",
            params![user_id],
        )
        .map_err(db_err)
    }

    pub fn has_book(&self, user_id: i64, book_id: i64) -> Result<bool> {
        let conn = self.lock();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM reading_list WHERE user_id = ?1 AND book_id = ?2)",
            params![user_id, book_id],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    /// A user's list ordered by title, optionally restricted to one status.
    pub fn reading_list(
        &self,
        user_id: i64,
        status: Option<ReadingStatus>,
    ) -> Result<Vec<ReadingListEntry>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT r.user_id, r.book_id, b.title, b.author, b.genre, r.status, r.rating, \
                 r.added_at, r.updated_at \
                 FROM reading_list r JOIN books b ON b.id = r.book_id \
                 WHERE r.user_id = ?1 AND (?2 IS NULL OR r.status = ?2) \
                 ORDER BY b.title, b.id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![user_id, status], |row| {
                Ok(ReadingListEntry {
                    user_id: row.get(0)?,
                    book_id: row.get(1)?,
                    title: row.get(2)?,
                    author: row.get(3)?,
                    genre: row.get(4)?,
                    status: row.get(5)?,
                    rating: row.get(6)?,
                    added_at: row.get(7)?,
                    updated_at: row.get(8)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Counts per status and the average of given ratings.
    pub fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT status, COUNT(*), COUNT(rating), COALESCE(SUM(rating), 0) \
                 FROM reading_list WHERE user_id = ?1 GROUP BY status",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, ReadingStatus>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(db_err)?;

        let mut stats = UserStats::default();
        let mut rating_sum = 0;
        for row in rows {
            let (status, count, rated, sum) = row.map_err(db_err)?;
            stats.total += count;
            stats.rated += rated;
            rating_sum += sum;
            match status {
                ReadingStatus::Planned => stats.planned += count,
                ReadingStatus::Reading => stats.reading += count,
                ReadingStatus::Completed => stats.completed += count,
                ReadingStatus::Dropped => stats.dropped += count,
            }
        }
        if stats.rated > 0 {
            let mean = rating_sum as f64 / stats.rated as f64;
            stats.average_rating = (mean * 100.0).round() / 100.0;
        }
        Ok(stats)
    }
}
