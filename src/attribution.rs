//! Multi-touch attribution calculator
//!
//! Pure functions over an ascending-time-ordered touchpoint sequence; no
//! I/O. The conversion recorder calls this once at write time and freezes
//! the result, so the formulas here define what ends up persisted.
//!
//! Five models are computed per conversion:
//! - first_touch: all revenue to the earliest touchpoint's channel
//! - last_touch: all revenue to the latest touchpoint's channel
//! - linear: equal share per touchpoint, accumulated per channel
//! - time_decay: exponential weights halving per step back in time
//! - position_based: 40/20/40 U-shape across first/middle/last

use std::collections::BTreeMap;

use crate::model::{AttributionModel, Channel, Touchpoint};

/// channel -> credited revenue for one model.
pub type ChannelCredits = BTreeMap<Channel, f64>;

/// model -> channel -> credited revenue. This is the shape frozen onto a
/// conversion row.
pub type AttributionSet = BTreeMap<AttributionModel, ChannelCredits>;

/// Split `revenue` across channels under all five models.
///
/// `touchpoints` must be non-empty and sorted ascending by timestamp.
/// The caller (the conversion recorder) guarantees both; an empty slice is
/// a precondition violation, not a runtime branch.
pub fn calculate_attributions(touchpoints: &[Touchpoint], revenue: f64) -> AttributionSet {
    debug_assert!(!touchpoints.is_empty(), "attribution requires touchpoints");

    let mut set = AttributionSet::new();
    set.insert(
        AttributionModel::FirstTouch,
        first_touch(touchpoints, revenue),
    );
    set.insert(AttributionModel::LastTouch, last_touch(touchpoints, revenue));
    set.insert(AttributionModel::Linear, linear(touchpoints, revenue));
    set.insert(AttributionModel::TimeDecay, time_decay(touchpoints, revenue));
    set.insert(
        AttributionModel::PositionBased,
        position_based(touchpoints, revenue),
    );
    set
}

fn credit(credits: &mut ChannelCredits, channel: Channel, amount: f64) {
    *credits.entry(channel).or_insert(0.0) += amount;
}

/// 100% to the earliest touchpoint's channel.
fn first_touch(touchpoints: &[Touchpoint], revenue: f64) -> ChannelCredits {
    let mut credits = ChannelCredits::new();
    credit(&mut credits, touchpoints[0].channel, revenue);
    credits
}

/// 100% to the latest touchpoint's channel.
fn last_touch(touchpoints: &[Touchpoint], revenue: f64) -> ChannelCredits {
    let mut credits = ChannelCredits::new();
    credit(
        &mut credits,
        touchpoints[touchpoints.len() - 1].channel,
        revenue,
    );
    credits
}

/// Equal share per touchpoint; a channel appearing twice accumulates twice.
fn linear(touchpoints: &[Touchpoint], revenue: f64) -> ChannelCredits {
    let share = revenue / touchpoints.len() as f64;
    let mut credits = ChannelCredits::new();
    for tp in touchpoints {
        credit(&mut credits, tp.channel, share);
    }
    credits
}

/// Exponential weighting with decay base 0.5: the touchpoint at index `i`
/// (0-based, n touchpoints) has weight `0.5^(n-1-i)`, so the most recent
/// touchpoint weighs 1 and each earlier one half the next.
fn time_decay(touchpoints: &[Touchpoint], revenue: f64) -> ChannelCredits {
    let n = touchpoints.len();
    let weights: Vec<f64> = (0..n).map(|i| 0.5f64.powi((n - 1 - i) as i32)).collect();
    let total: f64 = weights.iter().sum();

    let mut credits = ChannelCredits::new();
    for (tp, weight) in touchpoints.iter().zip(&weights) {
        credit(&mut credits, tp.channel, revenue * weight / total);
    }
    credits
}

/// Edge-weighted U-shape: 40% first, 40% last, 20% split evenly across the
/// middle. Degenerates to 100% for one touchpoint and 50/50 for two.
fn position_based(touchpoints: &[Touchpoint], revenue: f64) -> ChannelCredits {
    let n = touchpoints.len();
    let mut credits = ChannelCredits::new();

    match n {
        1 => credit(&mut credits, touchpoints[0].channel, revenue),
        2 => {
            credit(&mut credits, touchpoints[0].channel, revenue * 0.5);
            credit(&mut credits, touchpoints[1].channel, revenue * 0.5);
        }
        _ => {
            let middle_share = revenue * 0.2 / (n - 2) as f64;
            credit(&mut credits, touchpoints[0].channel, revenue * 0.4);
            for tp in &touchpoints[1..n - 1] {
                credit(&mut credits, tp.channel, middle_share);
            }
            credit(&mut credits, touchpoints[n - 1].channel, revenue * 0.4);
        }
    }
    credits
}
