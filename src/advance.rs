//! Auto-advancement batch heuristic
//!
//! Promotes recently-engaged contacts one stage forward: contacts with no
//! current stage enter awareness; awareness and consideration advance one
//! step. Only the current stage and a single trailing engagement window
//! are consulted; stages are never skipped. Failures are per-contact and
//! never abort the rest of the batch.

use serde::Serialize;

use crate::error::Result;
use crate::model::{now_millis, Stage, DAY_MS};
use crate::store::EngineStore;

/// Default trailing engagement window, in days.
pub const DEFAULT_ENGAGEMENT_WINDOW_DAYS: i64 = 7;

/// Outcome of one batch run. `failed` contacts are logged and excluded
/// from `advanced`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AdvanceOutcome {
    pub advanced: usize,
    pub failed: usize,
}

/// Run the heuristic for one business. Safe to re-run: a contact advanced
/// this run is no longer eligible under the same condition until it is
/// re-engaged or drops back to an eligible stage.
pub fn run_auto_advancement(
    store: &mut EngineStore,
    business_id: &str,
    window_days: i64,
) -> Result<AdvanceOutcome> {
    let cutoff = now_millis() - window_days * DAY_MS;
    let engagement = store.engagement_by_contact(business_id)?;

    let mut outcome = AdvanceOutcome {
        advanced: 0,
        failed: 0,
    };

    for (contact_id, last_engaged_at) in engagement {
        if last_engaged_at < cutoff {
            continue;
        }

        match advance_contact(store, business_id, &contact_id) {
            Ok(true) => outcome.advanced += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    business_id,
                    contact_id = %contact_id,
                    error = %e,
                    "auto-advancement failed for contact"
                );
                outcome.failed += 1;
            }
        }
    }

    tracing::info!(
        business_id,
        advanced = outcome.advanced,
        failed = outcome.failed,
        "auto-advancement batch complete"
    );
    Ok(outcome)
}

/// Advance a single eligible contact one step. Returns false when the
/// contact's current stage is past the eligible range.
fn advance_contact(store: &mut EngineStore, business_id: &str, contact_id: &str) -> Result<bool> {
    let next = match store.current_stage(business_id, contact_id)? {
        None => Stage::Awareness,
        Some(current) => match current.stage {
            Stage::Awareness => Stage::Consideration,
            Stage::Consideration => Stage::Decision,
            _ => return Ok(false),
        },
    };

    store.track_stage(
        business_id,
        contact_id,
        next,
        Some("auto_advancement"),
        None,
    )?;
    Ok(true)
}
