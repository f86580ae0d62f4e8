// Live CPU / RAM / disk readout with threshold alerts

use anyhow::Result;
use colored::Colorize;
use std::time::Duration;

use crate::core::system_monitor::{evaluate_alerts, AlertSeverity, MetricSample, MetricsHistory, MetricsSampler, MonitorRuntime};
use crate::core::Panel;
use crate::ui::{format_percent, format_size, format_timestamp, usage_bar};

const BAR_WIDTH: usize = 20;
const POLL: Duration = Duration::from_millis(200);

pub async fn execute(panel: &Panel, matches: &clap::ArgMatches) -> Result<()> {
    let settings = panel.settings();
    let interval = matches
        .get_one::<u64>("interval")
        .map(|ms| Duration::from_millis(*ms))
        .unwrap_or_else(|| settings.monitoring.interval());
    let count = matches.get_one::<usize>("count").copied();
    let cancel = super::cancel_on_ctrlc("monitoring")?;

    let subscription = panel.subscribe();
    let runtime = MonitorRuntime::spawn(
        MetricsSampler::system(settings.monitoring.disk_scope),
        panel.hub(),
        interval,
    );

    println!("{}", "Monitoring system load (Ctrl+C to stop)".cyan().bold());
    println!();

    let mut history = MetricsHistory::new();
    let mut printed = 0usize;

    while !cancel.is_cancelled() && count.map_or(true, |n| printed < n) {
        let Ok(next) = tokio::time::timeout(POLL, subscription.recv()).await else {
            continue;
        };
        let Some(sample) = next else {
            break;
        };

        print_sample(&sample);
        for alert in evaluate_alerts(&sample, &settings.alerts) {
            match alert.severity {
                AlertSeverity::Critical => log::error!("{}", alert.message),
                AlertSeverity::Warning => log::warn!("{}", alert.message),
            }
        }
        history.push(&sample);
        printed += 1;
    }

    let failures = runtime.failure_count();
    let dropped = subscription.dropped_count();
    runtime.shutdown().await;

    println!();
    if let (Some(avg), Some(peak)) = (history.average_cpu(), history.peak_cpu()) {
        println!(
            "{} {} samples, CPU avg {:.1}% / peak {:.1}%",
            "Summary:".white().bold(),
            history.len(),
            avg,
            peak
        );
    }
    if failures > 0 || dropped > 0 {
        println!(
            "{}",
            format!("{} read failure(s), {} sample(s) dropped", failures, dropped).dimmed()
        );
    }
    Ok(())
}

fn print_sample(sample: &MetricSample) {
    println!(
        "{}  CPU {} {}  RAM {} {} of {}  Disk {} {} of {}",
        format_timestamp(&sample.timestamp).dimmed(),
        usage_bar(sample.cpu_percent, BAR_WIDTH),
        format_percent(sample.cpu_percent),
        usage_bar(sample.ram_percent(), BAR_WIDTH),
        format_size(sample.ram_used_bytes),
        format_size(sample.ram_total_bytes),
        usage_bar(sample.disk_percent(), BAR_WIDTH),
        format_size(sample.disk_used_bytes),
        format_size(sample.disk_total_bytes),
    );
}
