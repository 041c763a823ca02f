//! Reporting layer
//!
//! Read-only projections over the stores: attribution breakdowns, channel
//! ROI, model comparison, journey path mining, trends, a naive revenue
//! forecaster, funnel/drop-off analysis, and rule-based optimization
//! suggestions. Nothing here mutates state; every operation is windowed by
//! a caller-supplied day count converted to a cutoff timestamp.
//!
//! Monetary values are rounded to two decimals at this boundary; internal
//! accumulation stays full-precision.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::model::{now_millis, AttributionModel, Channel, Stage, DAY_MS};
use crate::store::EngineStore;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_JOURNEY_LIMIT: usize = 10;
pub const DEFAULT_FORECAST_DAYS: i64 = 30;

/// Lookback for the forecaster's historical daily revenue.
const FORECAST_LOOKBACK_DAYS: i64 = 90;
/// Minimum distinct days of revenue before a forecast is attempted.
const FORECAST_MIN_DATA_POINTS: usize = 7;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn cutoff_for(days: i64) -> i64 {
    now_millis() - days * DAY_MS
}

fn day_bucket(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "invalid".to_string())
}

// ============================================
// ATTRIBUTION REPORT
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct ChannelBreakdown {
    pub channel: Channel,
    pub revenue: f64,
    /// Share of total credited revenue, percent.
    pub percentage: f64,
    /// Conversions crediting this channel under the chosen model.
    pub conversions: i64,
    pub avg_revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributionReport {
    pub model: AttributionModel,
    pub window_days: i64,
    pub total_revenue: f64,
    pub conversion_count: usize,
    pub channels: Vec<ChannelBreakdown>,
}

/// Per-channel credited revenue under one model, descending by revenue.
pub fn attribution_report(
    store: &EngineStore,
    business_id: &str,
    model: AttributionModel,
    days: i64,
) -> Result<AttributionReport> {
    let conversions = store.conversions_since(business_id, cutoff_for(days))?;

    let mut revenue: BTreeMap<Channel, f64> = BTreeMap::new();
    let mut counts: BTreeMap<Channel, i64> = BTreeMap::new();
    for conversion in &conversions {
        if let Some(credits) = conversion.attributions.get(&model) {
            for (channel, amount) in credits {
                *revenue.entry(*channel).or_insert(0.0) += amount;
                *counts.entry(*channel).or_insert(0) += 1;
            }
        }
    }

    let total: f64 = revenue.values().sum();
    let mut channels: Vec<ChannelBreakdown> = revenue
        .iter()
        .map(|(channel, rev)| {
            let conversions = counts[channel];
            ChannelBreakdown {
                channel: *channel,
                revenue: round2(*rev),
                percentage: if total > 0.0 {
                    round2(rev / total * 100.0)
                } else {
                    0.0
                },
                conversions,
                avg_revenue: round2(rev / conversions as f64),
            }
        })
        .collect();
    channels.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.channel.cmp(&b.channel))
    });

    Ok(AttributionReport {
        model,
        window_days: days,
        total_revenue: round2(total),
        conversion_count: conversions.len(),
        channels,
    })
}

// ============================================
// CHANNEL ROI
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct ChannelRoi {
    pub channel: Channel,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub roi_pct: f64,
    pub conversions: i64,
    pub cost_per_acquisition: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelRoiReport {
    pub window_days: i64,
    pub channels: Vec<ChannelRoi>,
}

/// ROI per channel with the linear model as the revenue baseline and the
/// fixed per-channel unit-cost table. Zero-cost channels report ROI 0
/// rather than an infinite ratio.
pub fn channel_roi(store: &EngineStore, business_id: &str, days: i64) -> Result<ChannelRoiReport> {
    let report = attribution_report(store, business_id, AttributionModel::Linear, days)?;

    let mut channels: Vec<ChannelRoi> = report
        .channels
        .iter()
        .map(|b| {
            let cost = b.conversions as f64 * b.channel.unit_cost();
            let profit = b.revenue - cost;
            ChannelRoi {
                channel: b.channel,
                revenue: b.revenue,
                cost: round2(cost),
                profit: round2(profit),
                roi_pct: if cost > 0.0 {
                    round2(profit / cost * 100.0)
                } else {
                    0.0
                },
                conversions: b.conversions,
                cost_per_acquisition: if b.conversions > 0 {
                    round2(cost / b.conversions as f64)
                } else {
                    0.0
                },
            }
        })
        .collect();
    channels.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.channel.cmp(&b.channel))
    });

    Ok(ChannelRoiReport {
        window_days: days,
        channels,
    })
}

// ============================================
// MULTI-TOUCH COMPARISON
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct ModelComparison {
    pub window_days: i64,
    pub conversion_count: usize,
    /// model -> channel -> credited revenue, for visualizing divergence.
    pub models: BTreeMap<AttributionModel, BTreeMap<Channel, f64>>,
}

pub fn multi_touch_comparison(
    store: &EngineStore,
    business_id: &str,
    days: i64,
) -> Result<ModelComparison> {
    let conversions = store.conversions_since(business_id, cutoff_for(days))?;

    let mut models: BTreeMap<AttributionModel, BTreeMap<Channel, f64>> = BTreeMap::new();
    for conversion in &conversions {
        for (model, credits) in &conversion.attributions {
            let totals = models.entry(*model).or_default();
            for (channel, amount) in credits {
                *totals.entry(*channel).or_insert(0.0) += amount;
            }
        }
    }
    for totals in models.values_mut() {
        for amount in totals.values_mut() {
            *amount = round2(*amount);
        }
    }

    Ok(ModelComparison {
        window_days: days,
        conversion_count: conversions.len(),
        models,
    })
}

// ============================================
// CUSTOMER JOURNEY PATHS
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct JourneyPath {
    /// Ordered channel path, e.g. `email → social → paid`.
    pub path: String,
    pub count: usize,
    pub total_revenue: f64,
    pub avg_revenue: f64,
    pub avg_duration_days: f64,
}

/// Top converting paths: the ordered channel sequence of each conversion's
/// prior touchpoints, grouped and ranked by occurrence.
pub fn customer_journeys(
    store: &EngineStore,
    business_id: &str,
    days: i64,
    limit: usize,
) -> Result<Vec<JourneyPath>> {
    let conversions = store.conversions_since(business_id, cutoff_for(days))?;

    struct PathAccum {
        count: usize,
        revenue: f64,
        duration_ms: i64,
    }

    let mut touchpoint_cache: HashMap<String, Vec<crate::model::Touchpoint>> = HashMap::new();
    let mut paths: BTreeMap<String, PathAccum> = BTreeMap::new();

    for conversion in &conversions {
        if !touchpoint_cache.contains_key(&conversion.contact_id) {
            let tps = store.touchpoints_for_contact(business_id, &conversion.contact_id)?;
            touchpoint_cache.insert(conversion.contact_id.clone(), tps);
        }
        let touchpoints = &touchpoint_cache[&conversion.contact_id];

        let prior: Vec<&crate::model::Touchpoint> = touchpoints
            .iter()
            .filter(|tp| tp.timestamp <= conversion.converted_at)
            .collect();
        if prior.is_empty() {
            continue;
        }

        let path = prior
            .iter()
            .map(|tp| tp.channel.as_str())
            .collect::<Vec<_>>()
            .join(" → ");
        let duration_ms = conversion.converted_at - prior[0].timestamp;

        let accum = paths.entry(path).or_insert(PathAccum {
            count: 0,
            revenue: 0.0,
            duration_ms: 0,
        });
        accum.count += 1;
        accum.revenue += conversion.amount;
        accum.duration_ms += duration_ms;
    }

    let mut ranked: Vec<JourneyPath> = paths
        .into_iter()
        .map(|(path, accum)| JourneyPath {
            path,
            count: accum.count,
            total_revenue: round2(accum.revenue),
            avg_revenue: round2(accum.revenue / accum.count as f64),
            avg_duration_days: round2(
                accum.duration_ms as f64 / accum.count as f64 / DAY_MS as f64,
            ),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(
                b.total_revenue
                    .partial_cmp(&a.total_revenue)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.path.cmp(&b.path))
    });
    ranked.truncate(limit);

    Ok(ranked)
}

// ============================================
// CHANNEL TRENDS
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub channel: Channel,
    pub revenue: f64,
    pub conversions: i64,
}

/// Per-day, per-channel linear-model revenue and conversion counts,
/// ascending by date. Suitable for time-series charting.
pub fn channel_trends(
    store: &EngineStore,
    business_id: &str,
    days: i64,
) -> Result<Vec<TrendPoint>> {
    let conversions = store.conversions_since(business_id, cutoff_for(days))?;

    let mut buckets: BTreeMap<(String, Channel), (f64, i64)> = BTreeMap::new();
    for conversion in &conversions {
        let date = day_bucket(conversion.converted_at);
        if let Some(credits) = conversion.attributions.get(&AttributionModel::Linear) {
            for (channel, amount) in credits {
                let entry = buckets.entry((date.clone(), *channel)).or_insert((0.0, 0));
                entry.0 += amount;
                entry.1 += 1;
            }
        }
    }

    Ok(buckets
        .into_iter()
        .map(|((date, channel), (revenue, conversions))| TrendPoint {
            date,
            channel,
            revenue: round2(revenue),
            conversions,
        })
        .collect())
}

// ============================================
// REVENUE FORECAST
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    /// Fewer than seven days of history; the forecast array is empty.
    InsufficientData,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
            Trend::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastPoint {
    pub date: String,
    pub projected: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueForecast {
    pub trend: Trend,
    pub daily_average: f64,
    pub trailing_average: f64,
    /// 0-95, scaled by data volume.
    pub confidence: u32,
    pub forecast: Vec<ForecastPoint>,
}

/// Naive heuristic forecast from up to 90 days of daily revenue. With
/// fewer than seven days of data this returns an `insufficient_data`
/// result rather than an error, so callers can render an empty state.
pub fn revenue_forecast(
    store: &EngineStore,
    business_id: &str,
    forecast_days: i64,
) -> Result<RevenueForecast> {
    let conversions = store.conversions_since(business_id, cutoff_for(FORECAST_LOOKBACK_DAYS))?;

    let mut daily: BTreeMap<String, f64> = BTreeMap::new();
    for conversion in &conversions {
        *daily.entry(day_bucket(conversion.converted_at)).or_insert(0.0) += conversion.amount;
    }

    if daily.len() < FORECAST_MIN_DATA_POINTS {
        return Ok(RevenueForecast {
            trend: Trend::InsufficientData,
            daily_average: 0.0,
            trailing_average: 0.0,
            confidence: 0,
            forecast: vec![],
        });
    }

    let values: Vec<f64> = daily.values().copied().collect();
    let overall = values.iter().sum::<f64>() / values.len() as f64;
    let trailing_window = &values[values.len() - FORECAST_MIN_DATA_POINTS..];
    let trailing = trailing_window.iter().sum::<f64>() / trailing_window.len() as f64;

    let trend = if trailing > overall * 1.05 {
        Trend::Increasing
    } else if trailing < overall * 0.95 {
        Trend::Decreasing
    } else {
        Trend::Stable
    };
    let multiplier = match trend {
        Trend::Increasing => 1.02,
        Trend::Decreasing => 0.98,
        _ => 1.0,
    };

    let today = Utc::now();
    let mut forecast = Vec::with_capacity(forecast_days.max(0) as usize);
    let mut projected = trailing;
    for day in 1..=forecast_days.max(0) {
        projected *= multiplier;
        forecast.push(ForecastPoint {
            date: (today + Duration::days(day)).format("%Y-%m-%d").to_string(),
            projected: round2(projected),
            lower: round2(projected * 0.8),
            upper: round2(projected * 1.2),
        });
    }

    Ok(RevenueForecast {
        trend,
        daily_average: round2(overall),
        trailing_average: round2(trailing),
        confidence: (2 * daily.len() as u32).min(95),
        forecast,
    })
}

// ============================================
// CONVERSION FUNNEL
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct FunnelStage {
    pub stage: Stage,
    /// Distinct contacts entering this stage within the window.
    pub count: i64,
    /// Previous stage's count minus this one (0 for the first stage).
    pub dropoff: i64,
    /// Percent of the previous stage's contacts (100 for the first stage).
    pub conversion_rate: f64,
}

pub fn conversion_funnel(
    store: &EngineStore,
    business_id: &str,
    days: i64,
) -> Result<Vec<FunnelStage>> {
    let counts = store.stage_entry_counts_since(business_id, cutoff_for(days))?;

    let mut funnel = Vec::with_capacity(Stage::ALL.len());
    let mut previous: Option<i64> = None;
    for stage in Stage::ALL {
        let count = counts.get(&stage).copied().unwrap_or(0);
        let (dropoff, conversion_rate) = match previous {
            None => (0, 100.0),
            Some(prev) => (
                prev - count,
                if prev > 0 {
                    round2(count as f64 / prev as f64 * 100.0)
                } else {
                    0.0
                },
            ),
        };
        funnel.push(FunnelStage {
            stage,
            count,
            dropoff,
            conversion_rate,
        });
        previous = Some(count);
    }

    Ok(funnel)
}

// ============================================
// DROP-OFF / BOTTLENECK DETECTION
// ============================================

/// A bottleneck needs at least this many attempts before it is flagged.
const BOTTLENECK_MIN_ATTEMPTS: i64 = 5;
/// Forward-conversion rate below which a transition pair is flagged.
const BOTTLENECK_RATE_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Serialize)]
pub struct TransitionStat {
    /// `{from}_to_{to}` grouping key; `from` may be `none`.
    pub transition: String,
    pub total: i64,
    pub successful: i64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DropoffAnalysis {
    pub window_days: i64,
    pub transitions: Vec<TransitionStat>,
    /// Pairs with rate below 50% over at least 5 attempts, worst first.
    pub bottlenecks: Vec<TransitionStat>,
}

/// Groups in-window transitions by `{from}_to_{to}`; a transition counts
/// as successful when it moves forward in the canonical stage order
/// (`none` ranks lowest).
pub fn dropoff_analysis(
    store: &EngineStore,
    business_id: &str,
    days: i64,
) -> Result<DropoffAnalysis> {
    let transitions = store.transitions_since(business_id, cutoff_for(days))?;

    let mut groups: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for t in &transitions {
        let from = t.from_stage.map(|s| s.as_str()).unwrap_or("none");
        let key = format!("{}_to_{}", from, t.to_stage.as_str());
        let forward = Stage::rank(Some(t.to_stage)) > Stage::rank(t.from_stage);

        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += 1;
        if forward {
            entry.1 += 1;
        }
    }

    let stats: Vec<TransitionStat> = groups
        .into_iter()
        .map(|(transition, (total, successful))| TransitionStat {
            transition,
            total,
            successful,
            conversion_rate: round2(successful as f64 / total as f64 * 100.0),
        })
        .collect();

    let mut bottlenecks: Vec<TransitionStat> = stats
        .iter()
        .filter(|s| {
            s.conversion_rate < BOTTLENECK_RATE_THRESHOLD && s.total >= BOTTLENECK_MIN_ATTEMPTS
        })
        .cloned()
        .collect();
    bottlenecks.sort_by(|a, b| {
        a.conversion_rate
            .partial_cmp(&b.conversion_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.transition.cmp(&b.transition))
    });

    Ok(DropoffAnalysis {
        window_days: days,
        transitions: stats,
        bottlenecks,
    })
}

// ============================================
// OPTIMIZATION SUGGESTIONS
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Warning,
    Praise,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub area: &'static str,
    pub message: String,
}

/// Rule-based heuristics over current stage occupancy and recent channel
/// diversity. Rules are independent and emitted in a fixed order; ratio
/// rules only fire when their denominator is non-zero.
pub fn optimization_suggestions(
    store: &EngineStore,
    business_id: &str,
) -> Result<Vec<Suggestion>> {
    let counts = store.open_stage_counts(business_id)?;
    let count = |stage: Stage| counts.get(&stage).copied().unwrap_or(0) as f64;

    let awareness = count(Stage::Awareness);
    let consideration = count(Stage::Consideration);
    let decision = count(Stage::Decision);
    let retention = count(Stage::Retention);
    let advocacy = count(Stage::Advocacy);

    let mut suggestions = Vec::new();

    if awareness > 0.0 && consideration / awareness < 0.3 {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Warning,
            area: "consideration",
            message: format!(
                "Only {:.0}% of awareness-stage contacts reach consideration; strengthen early nurture content",
                consideration / awareness * 100.0
            ),
        });
    }

    if consideration > 0.0 && decision / consideration < 0.4 {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Warning,
            area: "decision",
            message: format!(
                "Only {:.0}% of consideration-stage contacts reach decision; review offers and follow-up cadence",
                decision / consideration * 100.0
            ),
        });
    }

    if decision > 0.0 && retention / decision < 0.6 {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Warning,
            area: "retention",
            message: format!(
                "Only {:.0}% of decision-stage contacts are retained; invest in onboarding and post-sale engagement",
                retention / decision * 100.0
            ),
        });
    }

    if retention > 0.0 && advocacy / retention > 0.2 {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Praise,
            area: "advocacy",
            message: format!(
                "{:.0}% of retained contacts became advocates; consider a referral program to capitalize",
                advocacy / retention * 100.0
            ),
        });
    }

    let channels = store.distinct_channels_since(business_id, cutoff_for(30))?;
    if channels < 3 {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Warning,
            area: "channel_mix",
            message: format!(
                "Only {} distinct channel(s) active in the last 30 days; broaden the mix to reduce acquisition risk",
                channels
            ),
        });
    }

    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn store() -> EngineStore {
        EngineStore::open_in_memory().unwrap()
    }

    fn seed_conversion(store: &mut EngineStore, contact: &str, channels: &[Channel], amount: f64) {
        for ch in channels {
            store
                .record_touchpoint("b1", contact, *ch, None, None)
                .unwrap();
        }
        store
            .record_conversion("b1", contact, amount, "purchase", None)
            .unwrap();
    }

    fn backdate_conversions(store: &EngineStore, contact: &str, ms_ago: i64) {
        store
            .conn()
            .execute(
                "UPDATE conversions SET converted_at = ? WHERE contact_id = ?",
                params![now_millis() - ms_ago, contact],
            )
            .unwrap();
    }

    #[test]
    fn attribution_report_sums_and_sorts() {
        let mut store = store();
        seed_conversion(
            &mut store,
            "c1",
            &[Channel::Email, Channel::Social, Channel::Paid],
            300.0,
        );

        let report =
            attribution_report(&store, "b1", AttributionModel::Linear, DEFAULT_WINDOW_DAYS)
                .unwrap();
        assert_eq!(report.conversion_count, 1);
        assert_eq!(report.total_revenue, 300.0);
        assert_eq!(report.channels.len(), 3);
        for breakdown in &report.channels {
            assert_eq!(breakdown.revenue, 100.0);
            assert_eq!(breakdown.percentage, 33.33);
            assert_eq!(breakdown.conversions, 1);
        }
    }

    #[test]
    fn attribution_report_orders_by_revenue_descending() {
        let mut store = store();
        seed_conversion(&mut store, "c1", &[Channel::Paid], 500.0);
        seed_conversion(&mut store, "c2", &[Channel::Email], 100.0);

        let report =
            attribution_report(&store, "b1", AttributionModel::Linear, DEFAULT_WINDOW_DAYS)
                .unwrap();
        assert_eq!(report.channels[0].channel, Channel::Paid);
        assert_eq!(report.channels[1].channel, Channel::Email);
        assert_eq!(report.channels[0].percentage, 83.33);
    }

    #[test]
    fn empty_window_produces_empty_report() {
        let store = store();
        let report =
            attribution_report(&store, "b1", AttributionModel::Linear, DEFAULT_WINDOW_DAYS)
                .unwrap();
        assert_eq!(report.conversion_count, 0);
        assert_eq!(report.total_revenue, 0.0);
        assert!(report.channels.is_empty());
    }

    #[test]
    fn roi_applies_the_fixed_cost_table() {
        let mut store = store();
        seed_conversion(&mut store, "c1", &[Channel::Paid], 100.0);
        seed_conversion(&mut store, "c2", &[Channel::Organic], 100.0);

        let report = channel_roi(&store, "b1", DEFAULT_WINDOW_DAYS).unwrap();
        let paid = report
            .channels
            .iter()
            .find(|c| c.channel == Channel::Paid)
            .unwrap();
        assert_eq!(paid.cost, 2.0);
        assert_eq!(paid.profit, 98.0);
        assert_eq!(paid.roi_pct, 4900.0);
        assert_eq!(paid.cost_per_acquisition, 2.0);

        // Zero-cost channel reports ROI 0, not infinity.
        let organic = report
            .channels
            .iter()
            .find(|c| c.channel == Channel::Organic)
            .unwrap();
        assert_eq!(organic.cost, 0.0);
        assert_eq!(organic.roi_pct, 0.0);
    }

    #[test]
    fn comparison_covers_all_five_models() {
        let mut store = store();
        seed_conversion(
            &mut store,
            "c1",
            &[Channel::Email, Channel::Social, Channel::Paid],
            300.0,
        );

        let comparison = multi_touch_comparison(&store, "b1", DEFAULT_WINDOW_DAYS).unwrap();
        assert_eq!(comparison.models.len(), 5);
        assert_eq!(
            comparison.models[&AttributionModel::FirstTouch][&Channel::Email],
            300.0
        );
        assert_eq!(
            comparison.models[&AttributionModel::PositionBased][&Channel::Social],
            60.0
        );
    }

    #[test]
    fn journeys_group_identical_paths() {
        let mut store = store();
        seed_conversion(
            &mut store,
            "c1",
            &[Channel::Email, Channel::Social, Channel::Paid],
            100.0,
        );
        seed_conversion(
            &mut store,
            "c2",
            &[Channel::Email, Channel::Social, Channel::Paid],
            200.0,
        );
        seed_conversion(&mut store, "c3", &[Channel::Direct], 50.0);

        let paths =
            customer_journeys(&store, "b1", DEFAULT_WINDOW_DAYS, DEFAULT_JOURNEY_LIMIT).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].path, "email → social → paid");
        assert_eq!(paths[0].count, 2);
        assert_eq!(paths[0].total_revenue, 300.0);
        assert_eq!(paths[0].avg_revenue, 150.0);
        assert_eq!(paths[1].path, "direct");
    }

    #[test]
    fn journeys_respect_the_limit() {
        let mut store = store();
        let singles = [
            Channel::Email,
            Channel::Social,
            Channel::Paid,
            Channel::Referral,
        ];
        for (i, ch) in singles.iter().enumerate() {
            seed_conversion(&mut store, &format!("c{}", i), &[*ch], 10.0);
        }

        let paths = customer_journeys(&store, "b1", DEFAULT_WINDOW_DAYS, 2).unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn trends_bucket_by_day_and_channel() {
        let mut store = store();
        seed_conversion(&mut store, "c1", &[Channel::Email, Channel::Paid], 100.0);

        let trends = channel_trends(&store, "b1", DEFAULT_WINDOW_DAYS).unwrap();
        assert_eq!(trends.len(), 2);
        let today = day_bucket(now_millis());
        for point in &trends {
            assert_eq!(point.date, today);
            assert_eq!(point.revenue, 50.0);
            assert_eq!(point.conversions, 1);
        }
    }

    #[test]
    fn forecast_floor_returns_insufficient_data() {
        let mut store = store();
        // Three days of history is below the seven-day floor.
        for day in 0..3 {
            let contact = format!("c{}", day);
            seed_conversion(&mut store, &contact, &[Channel::Email], 100.0);
            backdate_conversions(&store, &contact, day * DAY_MS);
        }

        let forecast = revenue_forecast(&store, "b1", DEFAULT_FORECAST_DAYS).unwrap();
        assert_eq!(forecast.trend, Trend::InsufficientData);
        assert!(forecast.forecast.is_empty());
        assert_eq!(forecast.confidence, 0);
    }

    #[test]
    fn stable_history_forecasts_flat_revenue() {
        let mut store = store();
        for day in 0..10 {
            let contact = format!("c{}", day);
            seed_conversion(&mut store, &contact, &[Channel::Email], 100.0);
            backdate_conversions(&store, &contact, day * DAY_MS);
        }

        let forecast = revenue_forecast(&store, "b1", 5).unwrap();
        assert_eq!(forecast.trend, Trend::Stable);
        assert_eq!(forecast.daily_average, 100.0);
        assert_eq!(forecast.trailing_average, 100.0);
        assert_eq!(forecast.confidence, 20);
        assert_eq!(forecast.forecast.len(), 5);
        for point in &forecast.forecast {
            assert_eq!(point.projected, 100.0);
            assert_eq!(point.lower, 80.0);
            assert_eq!(point.upper, 120.0);
        }
    }

    #[test]
    fn rising_history_forecasts_compounding_growth() {
        let mut store = store();
        // Old days at 100/day, recent seven days at 300/day.
        for day in 0..14 {
            let contact = format!("c{}", day);
            let amount = if day < 7 { 300.0 } else { 100.0 };
            seed_conversion(&mut store, &contact, &[Channel::Email], amount);
            backdate_conversions(&store, &contact, day * DAY_MS);
        }

        let forecast = revenue_forecast(&store, "b1", 2).unwrap();
        assert_eq!(forecast.trend, Trend::Increasing);
        assert_eq!(forecast.trailing_average, 300.0);
        assert_eq!(forecast.forecast[0].projected, 306.0);
        assert_eq!(forecast.forecast[1].projected, round2(300.0 * 1.02 * 1.02));
    }

    #[test]
    fn funnel_scenario_100_40_10() {
        let mut store = store();
        for i in 0..100 {
            let contact = format!("c{}", i);
            store
                .track_stage("b1", &contact, Stage::Awareness, None, None)
                .unwrap();
            if i < 40 {
                store
                    .track_stage("b1", &contact, Stage::Consideration, None, None)
                    .unwrap();
            }
            if i < 10 {
                store
                    .track_stage("b1", &contact, Stage::Decision, None, None)
                    .unwrap();
            }
        }

        let funnel = conversion_funnel(&store, "b1", DEFAULT_WINDOW_DAYS).unwrap();
        let counts: Vec<i64> = funnel.iter().map(|s| s.count).collect();
        let rates: Vec<f64> = funnel.iter().map(|s| s.conversion_rate).collect();
        let dropoffs: Vec<i64> = funnel.iter().map(|s| s.dropoff).collect();

        assert_eq!(&counts[..3], &[100, 40, 10]);
        assert_eq!(&rates[..3], &[100.0, 40.0, 25.0]);
        assert_eq!(&dropoffs[..3], &[0, 60, 30]);
    }

    #[test]
    fn bottleneck_flags_repeated_backward_moves() {
        let mut store = store();
        // Five contacts regress decision -> awareness; three advance.
        for i in 0..5 {
            let contact = format!("r{}", i);
            store
                .track_stage("b1", &contact, Stage::Decision, None, None)
                .unwrap();
            store
                .track_stage("b1", &contact, Stage::Awareness, None, None)
                .unwrap();
        }
        for i in 0..3 {
            let contact = format!("f{}", i);
            store
                .track_stage("b1", &contact, Stage::Awareness, None, None)
                .unwrap();
            store
                .track_stage("b1", &contact, Stage::Consideration, None, None)
                .unwrap();
        }

        let analysis = dropoff_analysis(&store, "b1", DEFAULT_WINDOW_DAYS).unwrap();
        assert_eq!(analysis.bottlenecks.len(), 1);
        let bottleneck = &analysis.bottlenecks[0];
        assert_eq!(bottleneck.transition, "decision_to_awareness");
        assert_eq!(bottleneck.total, 5);
        assert_eq!(bottleneck.conversion_rate, 0.0);

        // First entries (none -> decision, none -> awareness) are forward
        // moves and never flagged.
        let first_entries = analysis
            .transitions
            .iter()
            .find(|s| s.transition == "none_to_decision")
            .unwrap();
        assert_eq!(first_entries.conversion_rate, 100.0);
    }

    #[test]
    fn bottleneck_needs_five_attempts() {
        let mut store = store();
        for i in 0..4 {
            let contact = format!("r{}", i);
            store
                .track_stage("b1", &contact, Stage::Decision, None, None)
                .unwrap();
            store
                .track_stage("b1", &contact, Stage::Awareness, None, None)
                .unwrap();
        }

        let analysis = dropoff_analysis(&store, "b1", DEFAULT_WINDOW_DAYS).unwrap();
        assert!(analysis.bottlenecks.is_empty());
    }

    #[test]
    fn suggestions_fire_in_rule_order() {
        let mut store = store();
        // 10 awareness, 2 consideration: ratio 0.2 trips the first rule.
        for i in 0..10 {
            store
                .track_stage("b1", &format!("a{}", i), Stage::Awareness, None, None)
                .unwrap();
        }
        for i in 0..2 {
            store
                .track_stage("b1", &format!("k{}", i), Stage::Consideration, None, None)
                .unwrap();
        }
        // Single channel in the window trips diversity.
        store
            .record_touchpoint("b1", "a0", Channel::Email, None, None)
            .unwrap();

        let suggestions = optimization_suggestions(&store, "b1").unwrap();
        assert_eq!(suggestions[0].area, "consideration");
        assert_eq!(suggestions[0].kind, SuggestionKind::Warning);
        assert_eq!(
            suggestions.last().unwrap().area,
            "channel_mix"
        );
    }

    #[test]
    fn advocacy_ratio_earns_praise() {
        let mut store = store();
        for i in 0..4 {
            store
                .track_stage("b1", &format!("r{}", i), Stage::Retention, None, None)
                .unwrap();
        }
        for i in 0..2 {
            store
                .track_stage("b1", &format!("v{}", i), Stage::Advocacy, None, None)
                .unwrap();
        }
        for ch in [Channel::Email, Channel::Social, Channel::Paid] {
            store.record_touchpoint("b1", "r0", ch, None, None).unwrap();
        }

        let suggestions = optimization_suggestions(&store, "b1").unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].kind, SuggestionKind::Praise);
        assert_eq!(suggestions[0].area, "advocacy");
    }
}
