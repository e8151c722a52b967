use genbench_core::{BenchmarkRun, ConcurrencyLevelStats};

const RULE_WIDTH: usize = 60;

fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

pub fn level_report(stats: &ConcurrencyLevelStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", rule('=')));
    out.push_str(&format!("RESULTS: {} Concurrent Sessions\n", stats.concurrency_level));
    out.push_str(&format!("{}\n", rule('=')));
    out.push_str(&format!("Total Requests:       {}\n", stats.total_requests));
    out.push_str(&format!("Successful:           {}\n", stats.successful_requests));
    out.push_str(&format!("Failed:               {}\n", stats.failed_requests));
    out.push_str(&format!("Total Time:           {:.2}s\n", stats.total_time_seconds));
    out.push_str("Latency Statistics:\n");
    out.push_str(&format!("  Average:            {:.3}s\n", stats.avg_latency));
    out.push_str(&format!("  Median:             {:.3}s\n", stats.median_latency));
    out.push_str(&format!("  P95:                {:.3}s\n", stats.p95_latency));
    out.push_str(&format!("  P99:                {:.3}s\n", stats.p99_latency));
    out.push_str(&format!("  Min:                {:.3}s\n", stats.min_latency));
    out.push_str(&format!("  Max:                {:.3}s\n", stats.max_latency));
    out.push_str("Throughput:\n");
    out.push_str(&format!("  Avg tokens/sec:     {:.2}\n", stats.avg_tokens_per_second));
    out.push_str(&format!("  Overall throughput: {:.2} tokens/sec\n", stats.overall_throughput));
    out.push_str(&format!("  Total tokens:       {}\n", stats.total_tokens_generated));
    if !stats.errors.is_empty() {
        out.push_str("Errors:\n");
        for (err, count) in &stats.errors {
            out.push_str(&format!("  {} x {}\n", count, err));
        }
    }
    out.push_str(&rule('='));
    out
}

pub fn summary_row(stats: &ConcurrencyLevelStats) -> String {
    format!(
        "{:<12} {:<15.3} {:<20.2} {:.1}%",
        stats.concurrency_level,
        stats.avg_latency,
        stats.overall_throughput,
        stats.success_rate()
    )
}

pub fn summary_table(run: &BenchmarkRun) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", rule('=')));
    out.push_str("SUMMARY COMPARISON\n");
    out.push_str(&format!("{}\n", rule('=')));
    out.push_str(&format!(
        "{:<12} {:<15} {:<20} {}\n",
        "Concurrent", "Avg Latency", "Throughput", "Success Rate"
    ));
    out.push_str(&format!("{}\n", rule('-')));
    for stats in &run.levels {
        out.push_str(&summary_row(stats));
        out.push('\n');
    }
    if run.interrupted {
        out.push_str("(sweep interrupted before all levels ran)\n");
    }
    out.push_str(&rule('='));
    out
}
