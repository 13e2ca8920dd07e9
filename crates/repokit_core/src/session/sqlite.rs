//! SQLite-backed unit-of-work session.
//!
//! # Invariants
//! - A transaction is opened lazily by the first write (insert, merge,
//!   delete, bulk statement) and closed only by `commit`/`rollback`/drop.
//! - A failed flush or commit rolls the transaction back and clears pending
//!   writes before the error is returned.
//! - `RefCell` borrows never span a store call.

use super::{Attached, Session};
use crate::model::entity::{Attrs, EntityMeta};
use crate::query::filter::Filter;
use crate::query::statement::{self, Assignment, SelectOptions, Statement};
use crate::repo::error::{RepoError, RepoResult};
use log::{debug, error, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::cell::RefCell;
use std::time::Instant;

enum PendingWrite {
    Insert {
        handle: Attached,
        meta: &'static EntityMeta,
        record: Attrs,
    },
    Delete {
        meta: &'static EntityMeta,
        key: Filter,
    },
}

#[derive(Default)]
struct SessionState {
    next_handle: u64,
    pending: Vec<PendingWrite>,
}

/// Session over a borrowed SQLite connection.
pub struct SqliteSession<'conn> {
    conn: &'conn Connection,
    state: RefCell<SessionState>,
}

impl<'conn> SqliteSession<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            state: RefCell::new(SessionState::default()),
        }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Number of queued writes not yet sent to the store.
    pub fn pending_len(&self) -> usize {
        self.state.borrow().pending.len()
    }

    fn begin_if_needed(&self) -> RepoResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
            debug!("event=session_begin module=session status=ok");
        }
        Ok(())
    }

    fn take_pending(&self, handles: Option<&[Attached]>) -> Vec<PendingWrite> {
        let mut state = self.state.borrow_mut();
        let Some(handles) = handles else {
            return std::mem::take(&mut state.pending);
        };

        let mut selected = Vec::with_capacity(handles.len());
        for wanted in handles {
            let position = state.pending.iter().position(|write| {
                matches!(write, PendingWrite::Insert { handle, .. } if handle == wanted)
            });
            match position {
                Some(position) => selected.push(state.pending.remove(position)),
                None => warn!(
                    "event=session_flush module=session status=skip reason=unknown_handle handle={}",
                    wanted.0
                ),
            }
        }
        selected
    }

    /// Removes queued deletes, leaving pending inserts for their owners.
    fn take_deletes(&self) -> Vec<PendingWrite> {
        let mut state = self.state.borrow_mut();
        let (deletes, inserts): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
            .into_iter()
            .partition(|write| matches!(write, PendingWrite::Delete { .. }));
        state.pending = inserts;
        deletes
    }

    fn send(&self, writes: Vec<PendingWrite>) -> RepoResult<Vec<Attrs>> {
        if writes.is_empty() {
            return Ok(Vec::new());
        }

        let started_at = Instant::now();
        let write_count = writes.len();
        let result = self
            .begin_if_needed()
            .and_then(|()| self.run_writes(writes));

        match result {
            Ok(inserted) => {
                debug!(
                    "event=session_flush module=session status=ok writes={} inserted={} duration_ms={}",
                    write_count,
                    inserted.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(inserted)
            }
            Err(err) => {
                self.abort("flush", &err);
                Err(err)
            }
        }
    }

    fn run_writes(&self, writes: Vec<PendingWrite>) -> RepoResult<Vec<Attrs>> {
        let mut inserted = Vec::new();
        for write in writes {
            match write {
                PendingWrite::Insert { meta, record, .. } => {
                    let stmt = statement::insert(meta, &record)?;
                    let mut rows = read_records(self.conn, &stmt)?;
                    if rows.len() != 1 {
                        return Err(RepoError::InvalidData(format!(
                            "insert into `{}` returned {} rows",
                            meta.table,
                            rows.len()
                        )));
                    }
                    inserted.push(rows.remove(0));
                }
                PendingWrite::Delete { meta, key } => {
                    let stmt = statement::delete(meta, &key)?;
                    self.conn
                        .execute(&stmt.sql, params_from_iter(stmt.params.iter()))?;
                }
            }
        }
        Ok(inserted)
    }

    fn write_returning(&self, stmt: &Statement) -> RepoResult<Attrs> {
        self.begin_if_needed()?;
        read_records(self.conn, stmt)?
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::InvalidData("write returned no row".to_string()))
    }

    fn abort(&self, operation: &str, err: &RepoError) {
        error!(
            "event=session_{operation} module=session status=error action=rollback error={err}"
        );
        if let Err(rollback_err) = self.rollback() {
            error!(
                "event=session_rollback module=session status=error error={rollback_err}"
            );
        }
    }
}

impl Session for SqliteSession<'_> {
    fn execute_query(&self, statement: &Statement) -> RepoResult<Vec<Attrs>> {
        Ok(read_records(self.conn, statement)?)
    }

    fn scalar(&self, statement: &Statement) -> RepoResult<Option<Value>> {
        let mut stmt = self.conn.prepare(&statement.sql)?;
        let mut rows = stmt.query(params_from_iter(statement.params.iter()))?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get::<_, Value>(0)?)),
            None => Ok(None),
        }
    }

    fn execute_statement(&self, statement: &Statement) -> RepoResult<usize> {
        self.begin_if_needed()?;
        let changed = self
            .conn
            .execute(&statement.sql, params_from_iter(statement.params.iter()))?;
        Ok(changed)
    }

    fn attach_new(&self, meta: &'static EntityMeta, record: Attrs) -> Attached {
        let mut state = self.state.borrow_mut();
        let handle = Attached(state.next_handle);
        state.next_handle += 1;
        state.pending.push(PendingWrite::Insert {
            handle,
            meta,
            record,
        });
        handle
    }

    fn merge(&self, meta: &'static EntityMeta, record: Attrs) -> RepoResult<Attrs> {
        // queued deletes may target this key; attached inserts stay with their handles
        self.send(self.take_deletes())?;

        let key = statement::key_filter(meta, &record)?;
        let lookup = statement::select(meta, &key, &SelectOptions::limit(1))?;
        let Some(stored) = read_records(self.conn, &lookup)?.into_iter().next() else {
            let insert = statement::insert(meta, &record)?;
            return self.write_returning(&insert).map_err(|err| {
                self.abort("merge", &err);
                err
            });
        };

        let changes: Vec<(String, Assignment)> = meta
            .fields
            .iter()
            .filter(|field| !field.primary_key)
            .filter_map(|field| {
                let value = record.get(field.name)?;
                if field.store_assigned && *value == Value::Null {
                    return None;
                }
                if stored.get(field.name) == Some(value) {
                    return None;
                }
                Some((field.name.to_string(), Assignment::Value(value.clone())))
            })
            .collect();

        if changes.is_empty() {
            debug!(
                "event=session_merge module=session status=ok table={} changed=0",
                meta.table
            );
            return Ok(stored);
        }

        let update = statement::update_by_key(meta, &key, &changes)?;
        let merged = self.write_returning(&update).map_err(|err| {
            self.abort("merge", &err);
            err
        })?;
        debug!(
            "event=session_merge module=session status=ok table={} changed={}",
            meta.table,
            changes.len()
        );
        Ok(merged)
    }

    fn flush(&self, handles: Option<&[Attached]>) -> RepoResult<Vec<Attrs>> {
        let writes = self.take_pending(handles);
        self.send(writes)
    }

    fn delete(&self, meta: &'static EntityMeta, record: &Attrs) -> RepoResult<()> {
        let key = statement::key_filter(meta, record)?;
        self.state
            .borrow_mut()
            .pending
            .push(PendingWrite::Delete { meta, key });
        Ok(())
    }

    fn commit(&self) -> RepoResult<()> {
        self.flush(None)?;
        if self.conn.is_autocommit() {
            return Ok(());
        }

        if let Err(err) = self.conn.execute_batch("COMMIT") {
            let err = RepoError::from(err);
            self.abort("commit", &err);
            return Err(err);
        }
        debug!("event=session_commit module=session status=ok");
        Ok(())
    }

    fn rollback(&self) -> RepoResult<()> {
        let discarded = std::mem::take(&mut self.state.borrow_mut().pending).len();
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        debug!("event=session_rollback module=session status=ok discarded={discarded}");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

impl Drop for SqliteSession<'_> {
    fn drop(&mut self) {
        if self.in_transaction() || self.pending_len() > 0 {
            warn!("event=session_drop module=session status=rollback reason=uncommitted");
            if let Err(err) = self.rollback() {
                error!("event=session_drop module=session status=error error={err}");
            }
        }
    }
}

fn read_records(conn: &Connection, statement: &Statement) -> rusqlite::Result<Vec<Attrs>> {
    let mut stmt = conn.prepare(&statement.sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut rows = stmt.query(params_from_iter(statement.params.iter()))?;
    let mut records = Vec::new();

    while let Some(row) = rows.next()? {
        let mut record = Attrs::new();
        for (index, column) in columns.iter().enumerate() {
            record.insert(column.clone(), row.get::<_, Value>(index)?);
        }
        records.push(record);
    }

    Ok(records)
}
