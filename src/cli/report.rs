//! Reporting commands
//!
//! Each command renders an aligned text table, or the serialized report
//! with `--json` for machine consumers.

use anyhow::Result;
use serde::Serialize;

use crate::model::AttributionModel;
use crate::report;
use crate::store::EngineStore;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn attribution(
    store: &EngineStore,
    business_id: &str,
    model: &str,
    days: i64,
    json: bool,
) -> Result<()> {
    let model: AttributionModel = model.parse()?;
    let report = report::attribution_report(store, business_id, model, days)?;

    if json {
        return print_json(&report);
    }

    println!(
        "Attribution ({}, last {} days): ${:.2} across {} conversions",
        report.model, report.window_days, report.total_revenue, report.conversion_count
    );
    if report.channels.is_empty() {
        println!("No conversions in window.");
        return Ok(());
    }

    println!(
        "\n{:<10} {:>12} {:>8} {:>12} {:>12}",
        "Channel", "Revenue", "Share", "Conversions", "Avg"
    );
    println!("{}", "-".repeat(58));
    for ch in &report.channels {
        println!(
            "{:<10} {:>12.2} {:>7.2}% {:>12} {:>12.2}",
            ch.channel, ch.revenue, ch.percentage, ch.conversions, ch.avg_revenue
        );
    }
    Ok(())
}

pub fn roi(store: &EngineStore, business_id: &str, days: i64, json: bool) -> Result<()> {
    let report = report::channel_roi(store, business_id, days)?;

    if json {
        return print_json(&report);
    }

    if report.channels.is_empty() {
        println!("No conversions in window.");
        return Ok(());
    }

    println!(
        "{:<10} {:>12} {:>10} {:>12} {:>10} {:>8}",
        "Channel", "Revenue", "Cost", "Profit", "ROI", "CPA"
    );
    println!("{}", "-".repeat(68));
    for ch in &report.channels {
        println!(
            "{:<10} {:>12.2} {:>10.2} {:>12.2} {:>9.1}% {:>8.2}",
            ch.channel, ch.revenue, ch.cost, ch.profit, ch.roi_pct, ch.cost_per_acquisition
        );
    }
    Ok(())
}

pub fn compare(store: &EngineStore, business_id: &str, days: i64, json: bool) -> Result<()> {
    let comparison = report::multi_touch_comparison(store, business_id, days)?;

    if json {
        return print_json(&comparison);
    }

    if comparison.models.is_empty() {
        println!("No conversions in window.");
        return Ok(());
    }

    for (model, channels) in &comparison.models {
        println!("{}:", model);
        for (channel, revenue) in channels {
            println!("  {:<10} {:>12.2}", channel, revenue);
        }
    }
    Ok(())
}

pub fn journeys(
    store: &EngineStore,
    business_id: &str,
    days: i64,
    limit: usize,
    json: bool,
) -> Result<()> {
    let paths = report::customer_journeys(store, business_id, days, limit)?;

    if json {
        return print_json(&paths);
    }

    if paths.is_empty() {
        println!("No converting journeys in window.");
        return Ok(());
    }

    println!(
        "{:<6} {:>12} {:>10} {:>10}  {}",
        "Count", "Revenue", "Avg", "Days", "Path"
    );
    println!("{}", "-".repeat(70));
    for p in &paths {
        println!(
            "{:<6} {:>12.2} {:>10.2} {:>10.2}  {}",
            p.count, p.total_revenue, p.avg_revenue, p.avg_duration_days, p.path
        );
    }
    Ok(())
}

pub fn trends(store: &EngineStore, business_id: &str, days: i64, json: bool) -> Result<()> {
    let points = report::channel_trends(store, business_id, days)?;

    if json {
        return print_json(&points);
    }

    if points.is_empty() {
        println!("No conversions in window.");
        return Ok(());
    }

    println!(
        "{:<12} {:<10} {:>12} {:>12}",
        "Date", "Channel", "Revenue", "Conversions"
    );
    println!("{}", "-".repeat(50));
    for p in &points {
        println!(
            "{:<12} {:<10} {:>12.2} {:>12}",
            p.date, p.channel, p.revenue, p.conversions
        );
    }
    Ok(())
}

pub fn forecast(
    store: &EngineStore,
    business_id: &str,
    forecast_days: i64,
    json: bool,
) -> Result<()> {
    let forecast = report::revenue_forecast(store, business_id, forecast_days)?;

    if json {
        return print_json(&forecast);
    }

    if forecast.trend == report::Trend::InsufficientData {
        println!("Not enough history to forecast (need 7+ days of revenue).");
        return Ok(());
    }

    println!(
        "Trend: {} | daily avg ${:.2} | trailing avg ${:.2} | confidence {}%",
        forecast.trend.as_str(),
        forecast.daily_average,
        forecast.trailing_average,
        forecast.confidence
    );
    println!(
        "\n{:<12} {:>12} {:>12} {:>12}",
        "Date", "Projected", "Lower", "Upper"
    );
    println!("{}", "-".repeat(52));
    for p in &forecast.forecast {
        println!(
            "{:<12} {:>12.2} {:>12.2} {:>12.2}",
            p.date, p.projected, p.lower, p.upper
        );
    }
    Ok(())
}

pub fn funnel(store: &EngineStore, business_id: &str, days: i64, json: bool) -> Result<()> {
    let funnel = report::conversion_funnel(store, business_id, days)?;

    if json {
        return print_json(&funnel);
    }

    println!(
        "{:<15} {:>8} {:>10} {:>8}",
        "Stage", "Count", "Dropoff", "Rate"
    );
    println!("{}", "-".repeat(45));
    for stage in &funnel {
        println!(
            "{:<15} {:>8} {:>10} {:>7.1}%",
            stage.stage, stage.count, stage.dropoff, stage.conversion_rate
        );
    }
    Ok(())
}

pub fn dropoff(store: &EngineStore, business_id: &str, days: i64, json: bool) -> Result<()> {
    let analysis = report::dropoff_analysis(store, business_id, days)?;

    if json {
        return print_json(&analysis);
    }

    if analysis.transitions.is_empty() {
        println!("No transitions in window.");
        return Ok(());
    }

    println!(
        "{:<35} {:>8} {:>10} {:>8}",
        "Transition", "Total", "Forward", "Rate"
    );
    println!("{}", "-".repeat(65));
    for t in &analysis.transitions {
        println!(
            "{:<35} {:>8} {:>10} {:>7.1}%",
            t.transition, t.total, t.successful, t.conversion_rate
        );
    }

    if analysis.bottlenecks.is_empty() {
        println!("\nNo bottlenecks detected.");
    } else {
        println!("\nBottlenecks (worst first):");
        for b in &analysis.bottlenecks {
            println!(
                "  {}: {:.1}% over {} attempts",
                b.transition, b.conversion_rate, b.total
            );
        }
    }
    Ok(())
}

pub fn suggest(store: &EngineStore, business_id: &str, json: bool) -> Result<()> {
    let suggestions = report::optimization_suggestions(store, business_id)?;

    if json {
        return print_json(&suggestions);
    }

    if suggestions.is_empty() {
        println!("No suggestions. Funnel ratios look healthy.");
        return Ok(());
    }

    for s in &suggestions {
        let marker = match s.kind {
            report::SuggestionKind::Warning => "!",
            report::SuggestionKind::Praise => "+",
        };
        println!("[{}] {:<14} {}", marker, s.area, s.message);
    }
    Ok(())
}
