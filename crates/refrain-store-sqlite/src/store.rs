//! [`SqliteStore`] — the SQLite implementation of [`ItemStore`].

use std::path::Path;

use refrain_core::{
  item::{Item, ItemId, NewItemRecord, Partition},
  store::{CasOutcome, CreateOutcome, ItemStore},
};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{
    ITEM_COLUMNS, RawItem, encode_dt, encode_partition, encode_rating,
    encode_review_state,
  },
  schema::SCHEMA,
};

/// Outcome of the create closure before domain decoding.
enum RawCreate {
  Inserted(RawItem),
  Duplicate(ItemId),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Refrain item store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// funnel through one connection thread, which is what makes the
/// check-and-insert and compare-and-swap paths atomic.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn =
      tokio_rusqlite::Connection::open(path.as_ref().to_path_buf()).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ItemStore impl ──────────────────────────────────────────────────────────

impl ItemStore for SqliteStore {
  type Error = Error;

  async fn create(
    &self,
    input: NewItemRecord,
    dedup: bool,
  ) -> Result<CreateOutcome> {
    let partition_str = encode_partition(input.partition);
    let text = input.text;
    let due_str = encode_dt(input.due_at);
    let created_str = encode_dt(input.created_at);

    // One `call` runs to completion on the single connection thread, so
    // the existence check and the insert cannot interleave with a
    // concurrent create of the same text.
    let raw = self
      .conn
      .call(move |conn| {
        if dedup {
          let existing: Option<i64> = conn
            .query_row(
              "SELECT item_id FROM items WHERE partition = ?1 AND text = ?2",
              rusqlite::params![partition_str, text],
              |r| r.get(0),
            )
            .optional()?;
          if let Some(id) = existing {
            return Ok(RawCreate::Duplicate(id));
          }
        }

        conn.execute(
          "INSERT INTO items (
             partition, text, review_state, repetitions, lapses,
             last_rating, due_at, created_at, updated_at, revision
           ) VALUES (?1, ?2, 'new', 0, 0, NULL, ?3, ?4, ?4, 0)",
          rusqlite::params![partition_str, text, due_str, created_str],
        )?;

        let id = conn.last_insert_rowid();
        let raw = conn.query_row(
          &format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1"),
          rusqlite::params![id],
          RawItem::from_row,
        )?;
        Ok(RawCreate::Inserted(raw))
      })
      .await?;

    match raw {
      RawCreate::Inserted(raw) => Ok(CreateOutcome::Created(raw.into_item()?)),
      RawCreate::Duplicate(id) => Ok(CreateOutcome::DuplicateText(id)),
    }
  }

  async fn get(&self, id: ItemId) -> Result<Option<Item>> {
    let raw: Option<RawItem> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1"),
              rusqlite::params![id],
              RawItem::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawItem::into_item).transpose()
  }

  async fn next_due(
    &self,
    partition: Partition,
    now: chrono::DateTime<chrono::Utc>,
  ) -> Result<Option<Item>> {
    let partition_str = encode_partition(partition);
    let now_str = encode_dt(now);

    let raw: Option<RawItem> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ITEM_COLUMNS} FROM items
                 WHERE partition = ?1 AND due_at <= ?2
                 ORDER BY due_at ASC, item_id ASC
                 LIMIT 1"
              ),
              rusqlite::params![partition_str, now_str],
              RawItem::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawItem::into_item).transpose()
  }

  async fn due_before(
    &self,
    partition: Partition,
    now: chrono::DateTime<chrono::Utc>,
    limit: usize,
  ) -> Result<Vec<Item>> {
    let partition_str = encode_partition(partition);
    let now_str = encode_dt(now);
    let limit = limit as i64;

    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ITEM_COLUMNS} FROM items
           WHERE partition = ?1 AND due_at <= ?2
           ORDER BY due_at ASC, item_id ASC
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![partition_str, now_str, limit],
            RawItem::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn update_if_unchanged(
    &self,
    item: Item,
    expected_revision: u64,
  ) -> Result<CasOutcome> {
    let id = item.item_id;
    let state_str = encode_review_state(item.review_state);
    let repetitions = item.repetitions as i64;
    let lapses = item.lapses as i64;
    let rating_str = item.last_rating.map(encode_rating);
    let due_str = encode_dt(item.due_at);
    let updated_str = encode_dt(item.updated_at);
    let revision = item.revision as i64;
    let expected = expected_revision as i64;

    let (changed, exists) = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE items SET
             review_state = ?1, repetitions = ?2, lapses = ?3,
             last_rating = ?4, due_at = ?5, updated_at = ?6, revision = ?7
           WHERE item_id = ?8 AND revision = ?9",
          rusqlite::params![
            state_str,
            repetitions,
            lapses,
            rating_str,
            due_str,
            updated_str,
            revision,
            id,
            expected,
          ],
        )?;
        if changed > 0 {
          return Ok((true, true));
        }
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM items WHERE item_id = ?1",
            rusqlite::params![id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok((false, exists))
      })
      .await?;

    Ok(if changed {
      CasOutcome::Applied
    } else if exists {
      CasOutcome::RevisionMismatch
    } else {
      CasOutcome::Missing
    })
  }

  async fn recent(
    &self,
    partition: Partition,
    limit: usize,
    offset: usize,
  ) -> Result<Vec<Item>> {
    let partition_str = encode_partition(partition);
    let limit = limit as i64;
    let offset = offset as i64;

    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ITEM_COLUMNS} FROM items
           WHERE partition = ?1
           ORDER BY item_id DESC
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![partition_str, limit, offset],
            RawItem::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }
}
