//! Journey stage commands

use anyhow::Result;

use crate::advance::run_auto_advancement;
use crate::model::Stage;
use crate::store::EngineStore;

use super::format_ms;

pub fn stage(
    store: &mut EngineStore,
    business_id: &str,
    contact_id: &str,
    stage: &str,
    triggered_by: Option<&str>,
) -> Result<()> {
    let stage: Stage = stage.parse()?;
    let id = store.move_contact_to_stage(business_id, contact_id, stage, triggered_by, None)?;
    println!("Contact {} is now in '{}' ({})", contact_id, stage, id);
    Ok(())
}

pub fn history(store: &EngineStore, business_id: &str, contact_id: &str) -> Result<()> {
    let transitions = store.journey_history(business_id, contact_id)?;

    if transitions.is_empty() {
        println!("No journey history for contact '{}'.", contact_id);
        return Ok(());
    }

    if let Some(current) = store.current_stage(business_id, contact_id)? {
        println!(
            "Current stage: {} (since {})\n",
            current.stage,
            format_ms(current.entered_at)
        );
    }

    println!("{:<18} {:<15} {}", "Timestamp", "From", "To");
    println!("{}", "-".repeat(50));
    for t in transitions {
        println!(
            "{:<18} {:<15} {}",
            format_ms(t.transitioned_at),
            t.from_stage.map(|s| s.as_str()).unwrap_or("none"),
            t.to_stage,
        );
    }
    Ok(())
}

pub fn advance(store: &mut EngineStore, business_id: &str, window_days: i64) -> Result<()> {
    let outcome = run_auto_advancement(store, business_id, window_days)?;
    println!(
        "Auto-advancement complete: {} advanced, {} failed",
        outcome.advanced, outcome.failed
    );
    Ok(())
}
