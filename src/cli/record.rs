//! Touchpoint and conversion recording commands

use anyhow::Result;

use crate::model::Channel;
use crate::store::EngineStore;

pub fn touch(
    store: &mut EngineStore,
    business_id: &str,
    contact_id: &str,
    channel: &str,
    campaign_id: Option<&str>,
) -> Result<()> {
    let channel: Channel = channel.parse()?;
    let id = store.record_touchpoint(business_id, contact_id, channel, campaign_id, None)?;
    println!("Touchpoint recorded: {} ({} via {})", id, contact_id, channel);
    Ok(())
}

pub fn convert(
    store: &mut EngineStore,
    business_id: &str,
    contact_id: &str,
    amount: f64,
    conversion_type: &str,
) -> Result<()> {
    let id = store.record_conversion(business_id, contact_id, amount, conversion_type, None)?;
    println!(
        "Conversion recorded: {} (${:.2} from {})",
        id, amount, contact_id
    );
    Ok(())
}
