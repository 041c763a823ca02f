//! Engine storage with SQLite
//!
//! A single `EngineStore` owns the connection and exposes typed query
//! methods scoped by `business_id`. Writes that read-then-write contact
//! state (conversion recording, stage transitions) run inside a rusqlite
//! transaction through `&mut self`, so concurrent mutation through one
//! handle is serialized by construction; the partial unique index on open
//! stage rows backstops the invariant across handles.

mod journey;
mod schema;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::attribution::calculate_attributions;
use crate::error::{EngineError, Result};
use crate::model::{now_millis, Channel, Conversion, Stage, Touchpoint};

pub use schema::SCHEMA;

pub struct EngineStore {
    conn: Connection,
}

impl EngineStore {
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store; used by tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // ============================================
    // TOUCHPOINTS
    // ============================================

    /// Append a touchpoint stamped with the current time.
    pub fn record_touchpoint(
        &mut self,
        business_id: &str,
        contact_id: &str,
        channel: Channel,
        campaign_id: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let metadata = metadata.map(serde_json::to_string).transpose()?;

        self.conn.execute(
            "INSERT INTO touchpoints (id, business_id, contact_id, channel, campaign_id, metadata, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![id, business_id, contact_id, channel, campaign_id, metadata, now_millis()],
        )?;

        tracing::debug!(business_id, contact_id, channel = %channel, "touchpoint recorded");
        Ok(id)
    }

    /// All touchpoints for a contact, ascending by timestamp with ties
    /// broken by insertion order.
    pub fn touchpoints_for_contact(
        &self,
        business_id: &str,
        contact_id: &str,
    ) -> Result<Vec<Touchpoint>> {
        load_touchpoints(&self.conn, business_id, contact_id)
    }

    /// Distinct contact ids with their most recent touchpoint timestamp.
    /// Drives the auto-advancement batch.
    pub fn engagement_by_contact(&self, business_id: &str) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT contact_id, MAX(timestamp) FROM touchpoints
             WHERE business_id = ?
             GROUP BY contact_id
             ORDER BY contact_id",
        )?;

        let rows = stmt.query_map(params![business_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Number of distinct channels touched since `cutoff`.
    pub fn distinct_channels_since(&self, business_id: &str, cutoff: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(DISTINCT channel) FROM touchpoints
             WHERE business_id = ? AND timestamp >= ?",
            params![business_id, cutoff],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ============================================
    // CONVERSIONS
    // ============================================

    /// Record a realized-revenue event and freeze its attribution split.
    ///
    /// The touchpoint read and conversion insert share one transaction, so
    /// the frozen split reflects exactly the touchpoints that existed at
    /// write time; touchpoints recorded later never change it.
    pub fn record_conversion(
        &mut self,
        business_id: &str,
        contact_id: &str,
        amount: f64,
        conversion_type: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<String> {
        if amount.is_nan() || amount < 0.0 {
            return Err(EngineError::InvalidRevenue(amount));
        }
        let metadata = metadata.map(serde_json::to_string).transpose()?;

        let tx = self.conn.transaction()?;

        let touchpoints = load_touchpoints(&tx, business_id, contact_id)?;
        if touchpoints.is_empty() {
            return Err(EngineError::NoTouchpoints {
                contact_id: contact_id.to_string(),
            });
        }

        let attributions = calculate_attributions(&touchpoints, amount);
        let source = touchpoints[touchpoints.len() - 1].channel;
        let id = Uuid::new_v4().to_string();
        let now = now_millis();

        tx.execute(
            "INSERT INTO conversions
             (id, business_id, contact_id, amount, conversion_type, currency, source,
              attributions, metadata, converted_at, timestamp)
             VALUES (?, ?, ?, ?, ?, 'USD', ?, ?, ?, ?, ?)",
            params![
                id,
                business_id,
                contact_id,
                amount,
                conversion_type,
                source,
                serde_json::to_string(&attributions)?,
                metadata,
                now,
                now,
            ],
        )?;

        tx.commit()?;

        tracing::debug!(business_id, contact_id, amount, "conversion recorded");
        Ok(id)
    }

    pub fn get_conversion(&self, business_id: &str, id: &str) -> Result<Option<Conversion>> {
        let row = self.conn.query_row(
            &format!(
                "{} WHERE business_id = ? AND id = ?",
                CONVERSION_SELECT
            ),
            params![business_id, id],
            map_conversion,
        );

        match row {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Conversions with `converted_at >= cutoff`, ascending by time.
    pub fn conversions_since(&self, business_id: &str, cutoff: i64) -> Result<Vec<Conversion>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE business_id = ? AND converted_at >= ?
             ORDER BY converted_at ASC, rowid ASC",
            CONVERSION_SELECT
        ))?;

        let rows = stmt.query_map(params![business_id, cutoff], map_conversion)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

fn load_touchpoints(
    conn: &Connection,
    business_id: &str,
    contact_id: &str,
) -> Result<Vec<Touchpoint>> {
    let mut stmt = conn.prepare(
        "SELECT id, business_id, contact_id, channel, campaign_id, metadata, timestamp
         FROM touchpoints
         WHERE business_id = ? AND contact_id = ?
         ORDER BY timestamp ASC, rowid ASC",
    )?;

    let rows = stmt.query_map(params![business_id, contact_id], |row| {
        Ok(Touchpoint {
            id: row.get(0)?,
            business_id: row.get(1)?,
            contact_id: row.get(2)?,
            channel: row.get(3)?,
            campaign_id: row.get(4)?,
            metadata: parse_json_column(row.get(5)?),
            timestamp: row.get(6)?,
        })
    })?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Into::into)
}

const CONVERSION_SELECT: &str = "SELECT id, business_id, contact_id, amount, conversion_type, \
     currency, source, attributions, metadata, converted_at, timestamp FROM conversions";

fn map_conversion(row: &rusqlite::Row) -> rusqlite::Result<Conversion> {
    let attributions: String = row.get(7)?;
    let attributions = serde_json::from_str(&attributions).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Conversion {
        id: row.get(0)?,
        business_id: row.get(1)?,
        contact_id: row.get(2)?,
        amount: row.get(3)?,
        conversion_type: row.get(4)?,
        currency: row.get(5)?,
        source: row.get(6)?,
        attributions,
        metadata: parse_json_column(row.get(8)?),
        converted_at: row.get(9)?,
        timestamp: row.get(10)?,
    })
}

/// Opaque metadata column: stored as written, unparseable text dropped.
pub(crate) fn parse_json_column(raw: Option<String>) -> Option<serde_json::Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

// ============================================
// SQL CONVERSIONS FOR ENUMS
// ============================================

impl ToSql for Channel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Channel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Channel::from_str(s).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Stage {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Stage {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Stage::from_str(s).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributionModel;

    fn store() -> EngineStore {
        EngineStore::open_in_memory().unwrap()
    }

    #[test]
    fn open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/waymark.db");
        let _store = EngineStore::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn touchpoints_come_back_in_insertion_order() {
        let mut store = store();
        for ch in [Channel::Email, Channel::Social, Channel::Paid] {
            store.record_touchpoint("b1", "c1", ch, None, None).unwrap();
        }

        let tps = store.touchpoints_for_contact("b1", "c1").unwrap();
        let channels: Vec<Channel> = tps.iter().map(|t| t.channel).collect();
        assert_eq!(channels, vec![Channel::Email, Channel::Social, Channel::Paid]);
    }

    #[test]
    fn touchpoints_are_tenant_scoped() {
        let mut store = store();
        store
            .record_touchpoint("b1", "c1", Channel::Email, None, None)
            .unwrap();
        store
            .record_touchpoint("b2", "c1", Channel::Paid, None, None)
            .unwrap();

        assert_eq!(store.touchpoints_for_contact("b1", "c1").unwrap().len(), 1);
        assert_eq!(store.touchpoints_for_contact("b2", "c1").unwrap().len(), 1);
    }

    #[test]
    fn conversion_without_history_is_rejected() {
        let mut store = store();
        let err = store
            .record_conversion("b1", "ghost", 50.0, "purchase", None)
            .unwrap_err();
        assert!(matches!(err, EngineError::NoTouchpoints { .. }));
    }

    #[test]
    fn negative_or_nan_revenue_is_rejected_before_write() {
        let mut store = store();
        store
            .record_touchpoint("b1", "c1", Channel::Email, None, None)
            .unwrap();

        for bad in [-1.0, f64::NAN] {
            let err = store
                .record_conversion("b1", "c1", bad, "purchase", None)
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidRevenue(_)));
        }
        assert!(store.conversions_since("b1", 0).unwrap().is_empty());
    }

    #[test]
    fn attribution_is_frozen_at_conversion_time() {
        let mut store = store();
        store
            .record_touchpoint("b1", "c1", Channel::Email, None, None)
            .unwrap();
        let id = store
            .record_conversion("b1", "c1", 200.0, "purchase", None)
            .unwrap();

        // A touchpoint recorded after conversion must not change the split.
        store
            .record_touchpoint("b1", "c1", Channel::Paid, None, None)
            .unwrap();

        let conv = store.get_conversion("b1", &id).unwrap().unwrap();
        let linear = &conv.attributions[&AttributionModel::Linear];
        assert_eq!(linear.len(), 1);
        assert!((linear[&Channel::Email] - 200.0).abs() < 1e-9);
        assert_eq!(conv.source, Channel::Email);
    }

    #[test]
    fn conversion_round_trips_all_five_models() {
        let mut store = store();
        for ch in [Channel::Email, Channel::Social, Channel::Paid] {
            store.record_touchpoint("b1", "c1", ch, None, None).unwrap();
        }
        let id = store
            .record_conversion("b1", "c1", 300.0, "purchase", None)
            .unwrap();

        let conv = store.get_conversion("b1", &id).unwrap().unwrap();
        assert_eq!(conv.attributions.len(), 5);
        for credits in conv.attributions.values() {
            let total: f64 = credits.values().sum();
            assert!((total - 300.0).abs() < 1e-9);
        }
        // position_based splits 120/60/120 across three touches
        let position = &conv.attributions[&AttributionModel::PositionBased];
        assert!((position[&Channel::Social] - 60.0).abs() < 1e-9);
    }

    #[test]
    fn metadata_bag_is_stored_opaquely() {
        let mut store = store();
        let meta = serde_json::json!({"utm_source": "newsletter", "depth": 3});
        store
            .record_touchpoint("b1", "c1", Channel::Email, Some("camp-1"), Some(&meta))
            .unwrap();

        let tps = store.touchpoints_for_contact("b1", "c1").unwrap();
        assert_eq!(tps[0].campaign_id.as_deref(), Some("camp-1"));
        assert_eq!(tps[0].metadata, Some(meta));
    }

    #[test]
    fn engagement_reports_latest_touch_per_contact() {
        let mut store = store();
        store
            .record_touchpoint("b1", "c1", Channel::Email, None, None)
            .unwrap();
        store
            .record_touchpoint("b1", "c2", Channel::Paid, None, None)
            .unwrap();
        store
            .record_touchpoint("b1", "c1", Channel::Social, None, None)
            .unwrap();

        let engagement = store.engagement_by_contact("b1").unwrap();
        assert_eq!(engagement.len(), 2);
        let c1 = engagement.iter().find(|(c, _)| c == "c1").unwrap();
        let tps = store.touchpoints_for_contact("b1", "c1").unwrap();
        assert_eq!(c1.1, tps[1].timestamp);
    }
}
