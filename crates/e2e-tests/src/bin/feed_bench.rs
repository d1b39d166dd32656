use std::collections::BTreeMap;
use std::time::Instant;

use clap::Parser;
use serde::Serialize;

use e2e_tests::{collect_pages, random_population, seed_notes, TestHarness};

#[derive(Parser, Debug)]
#[command(name = "feed_bench", about = "hotfeed recompute and pagination benchmark")]
struct Args {
    /// Notes in the synthetic population
    #[arg(long, default_value_t = 2_000)]
    notes: u64,
    #[arg(long, default_value_t = 5)]
    iterations: usize,
    /// Page size used for the full feed walk
    #[arg(long, default_value_t = 30)]
    page_size: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Serialize)]
struct StepMetrics {
    p50_ms: f64,
    p90_ms: f64,
    max_ms: f64,
    samples: usize,
}

#[derive(Debug, Serialize)]
struct BenchmarkOutput {
    notes: u64,
    page_size: usize,
    iterations: usize,
    steps: BTreeMap<String, StepMetrics>,
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    if args.page_size == 0 {
        return Err("--page-size must be at least 1".to_string());
    }

    let harness = TestHarness::new();
    seed_notes(&harness.storage, &random_population(args.notes, args.seed));
    let recomputer = harness.recomputer();
    let reader = harness.reader(args.page_size);

    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for _ in 0..args.iterations {
        let start = Instant::now();
        let report = recomputer.run().map_err(|e| e.to_string())?;
        push_sample(&mut samples, "recompute", start);
        if report.failed > 0 {
            return Err(format!("{} score writes failed", report.failed));
        }

        let start = Instant::now();
        let pages = collect_pages(&reader, args.page_size);
        push_sample(&mut samples, "feed_walk", start);
        let served: usize = pages.iter().map(|p| p.notes.len()).sum();
        if served as u64 != args.notes {
            return Err(format!("feed walk served {} of {} notes", served, args.notes));
        }
    }

    let output = BenchmarkOutput {
        notes: args.notes,
        page_size: args.page_size,
        iterations: args.iterations,
        steps: samples
            .into_iter()
            .map(|(step, durations)| (step, build_metrics(durations)))
            .collect(),
    };

    println!("{}", render_table(&output));
    let json = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    println!("\n{}", json);
    Ok(())
}

fn push_sample(samples: &mut BTreeMap<String, Vec<f64>>, step: &str, start: Instant) {
    samples
        .entry(step.to_string())
        .or_default()
        .push(start.elapsed().as_secs_f64() * 1000.0);
}

fn build_metrics(mut durations: Vec<f64>) -> StepMetrics {
    durations.sort_by(f64::total_cmp);
    StepMetrics {
        p50_ms: percentile(&durations, 50.0),
        p90_ms: percentile(&durations, 90.0),
        max_ms: durations.last().copied().unwrap_or(0.0),
        samples: durations.len(),
    }
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let rank = (percentile / 100.0) * (values.len() as f64 - 1.0);
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        values[low]
    } else {
        let weight = rank - low as f64;
        values[low] + (values[high] - values[low]) * weight
    }
}

fn render_table(output: &BenchmarkOutput) -> String {
    let mut lines = vec![
        format!(
            "Benchmark Results (notes={}, page_size={}, iterations={})",
            output.notes, output.page_size, output.iterations
        ),
        "step\tp50_ms\tp90_ms\tmax_ms".to_string(),
    ];
    for (step, metrics) in &output.steps {
        lines.push(format!(
            "{}\t{:.2}\t{:.2}\t{:.2}",
            step, metrics.p50_ms, metrics.p90_ms, metrics.max_ms
        ));
    }
    lines.join("\n")
}
