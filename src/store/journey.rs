//! Journey stage state machine
//!
//! Invariant: at most one journey_stages row per contact has `exited_at`
//! unset. Entering a new stage closes the prior open row, appends a
//! transition, and inserts the new open row inside one transaction. A
//! racing writer that slips past the read trips the partial unique index
//! and surfaces as `Conflict` for the caller to retry.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::model::{now_millis, JourneyStage, JourneyTransition, Stage};

use super::{parse_json_column, EngineStore};

impl EngineStore {
    /// The contact's open stage row, if any.
    pub fn current_stage(
        &self,
        business_id: &str,
        contact_id: &str,
    ) -> Result<Option<JourneyStage>> {
        current_stage_in(self.conn(), business_id, contact_id)
    }

    /// Enter a stage. Idempotent: entering the contact's current stage
    /// writes nothing and returns the existing row id.
    pub fn track_stage(
        &mut self,
        business_id: &str,
        contact_id: &str,
        stage: Stage,
        triggered_by: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<String> {
        let metadata = metadata.map(serde_json::to_string).transpose()?;
        let tx = self.conn_mut().transaction()?;

        let current = current_stage_in(&tx, business_id, contact_id)?;
        if let Some(ref cur) = current {
            if cur.stage == stage {
                return Ok(cur.id.clone());
            }
        }

        let now = now_millis();

        // Close the prior open row first, within the same transaction.
        if let Some(ref cur) = current {
            tx.execute(
                "UPDATE journey_stages SET exited_at = ? WHERE id = ?",
                params![now, cur.id],
            )?;
        }

        let from_stage = current.as_ref().map(|c| c.stage);
        tx.execute(
            "INSERT INTO journey_transitions
             (id, business_id, contact_id, from_stage, to_stage, transitioned_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                Uuid::new_v4().to_string(),
                business_id,
                contact_id,
                from_stage.map(|s| s.as_str()).unwrap_or("none"),
                stage,
                now,
            ],
        )?;

        let stage_id = Uuid::new_v4().to_string();
        let inserted = tx.execute(
            "INSERT INTO journey_stages
             (id, business_id, contact_id, stage, entered_at, exited_at, touchpoints, triggered_by, metadata)
             VALUES (?, ?, ?, ?, ?, NULL, '[]', ?, ?)",
            params![stage_id, business_id, contact_id, stage, now, triggered_by, metadata],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                // Another writer opened a row between our read and insert.
                return Err(EngineError::Conflict {
                    contact_id: contact_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit()?;

        tracing::debug!(business_id, contact_id, stage = %stage, "stage entered");
        Ok(stage_id)
    }

    /// Externally-facing stage move; same semantics as [`track_stage`].
    ///
    /// [`track_stage`]: EngineStore::track_stage
    pub fn move_contact_to_stage(
        &mut self,
        business_id: &str,
        contact_id: &str,
        stage: Stage,
        triggered_by: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<String> {
        self.track_stage(business_id, contact_id, stage, triggered_by, metadata)
    }

    /// Full transition log for a contact, ascending by time.
    pub fn journey_history(
        &self,
        business_id: &str,
        contact_id: &str,
    ) -> Result<Vec<JourneyTransition>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, business_id, contact_id, from_stage, to_stage, transitioned_at
             FROM journey_transitions
             WHERE business_id = ? AND contact_id = ?
             ORDER BY transitioned_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![business_id, contact_id], map_transition)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    // ============================================
    // REPORTING QUERIES (read-only)
    // ============================================

    /// Transitions with `transitioned_at >= cutoff`, ascending by time.
    pub fn transitions_since(
        &self,
        business_id: &str,
        cutoff: i64,
    ) -> Result<Vec<JourneyTransition>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, business_id, contact_id, from_stage, to_stage, transitioned_at
             FROM journey_transitions
             WHERE business_id = ? AND transitioned_at >= ?
             ORDER BY transitioned_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![business_id, cutoff], map_transition)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Distinct contacts entering each stage since `cutoff`.
    pub fn stage_entry_counts_since(
        &self,
        business_id: &str,
        cutoff: i64,
    ) -> Result<BTreeMap<Stage, i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT stage, COUNT(DISTINCT contact_id) FROM journey_stages
             WHERE business_id = ? AND entered_at >= ?
             GROUP BY stage",
        )?;

        let rows = stmt.query_map(params![business_id, cutoff], |row| {
            Ok((row.get::<_, Stage>(0)?, row.get::<_, i64>(1)?))
        })?;

        rows.collect::<std::result::Result<BTreeMap<_, _>, _>>()
            .map_err(Into::into)
    }

    /// Contacts currently occupying each stage (open rows only).
    pub fn open_stage_counts(&self, business_id: &str) -> Result<BTreeMap<Stage, i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT stage, COUNT(*) FROM journey_stages
             WHERE business_id = ? AND exited_at IS NULL
             GROUP BY stage",
        )?;

        let rows = stmt.query_map(params![business_id], |row| {
            Ok((row.get::<_, Stage>(0)?, row.get::<_, i64>(1)?))
        })?;

        rows.collect::<std::result::Result<BTreeMap<_, _>, _>>()
            .map_err(Into::into)
    }
}

fn current_stage_in(
    conn: &Connection,
    business_id: &str,
    contact_id: &str,
) -> Result<Option<JourneyStage>> {
    let row = conn
        .query_row(
            "SELECT id, business_id, contact_id, stage, entered_at, exited_at,
                    touchpoints, triggered_by, metadata
             FROM journey_stages
             WHERE business_id = ? AND contact_id = ? AND exited_at IS NULL",
            params![business_id, contact_id],
            map_stage,
        )
        .optional()?;
    Ok(row)
}

fn map_stage(row: &rusqlite::Row) -> rusqlite::Result<JourneyStage> {
    let touchpoints: String = row.get(6)?;
    let touchpoints = serde_json::from_str(&touchpoints).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(JourneyStage {
        id: row.get(0)?,
        business_id: row.get(1)?,
        contact_id: row.get(2)?,
        stage: row.get(3)?,
        entered_at: row.get(4)?,
        exited_at: row.get(5)?,
        touchpoints,
        triggered_by: row.get(7)?,
        metadata: parse_json_column(row.get(8)?),
    })
}

fn map_transition(row: &rusqlite::Row) -> rusqlite::Result<JourneyTransition> {
    let from_raw: String = row.get(3)?;
    let from_stage = if from_raw == "none" {
        None
    } else {
        Some(from_raw.parse::<Stage>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?)
    };

    Ok(JourneyTransition {
        id: row.get(0)?,
        business_id: row.get(1)?,
        contact_id: row.get(2)?,
        from_stage,
        to_stage: row.get(4)?,
        transitioned_at: row.get(5)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
