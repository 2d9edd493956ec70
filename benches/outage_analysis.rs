//! 故障分析基准测试
//!
//! 测试状态机与分析器在大量结果下的吞吐

use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use site_vitals::health::ProbeResult;
use site_vitals::pipeline::{Analyser, EndpointStat};
use std::hint::black_box;

fn results_for(urls: &[String], rounds: usize) -> Vec<ProbeResult> {
    let now = Utc::now();
    (0..rounds)
        .flat_map(|round| {
            urls.iter().enumerate().map(move |(i, url)| {
                // 每个URL按不同节奏在故障与恢复之间切换
                if (round + i) % 5 < 3 {
                    ProbeResult::transport_failure(url.clone(), "Request timeout", 5000, now, i)
                } else {
                    ProbeResult::response(url.clone(), 200, 40 + (round % 100) as u64, now, i)
                }
            })
        })
        .collect()
}

fn outage_analysis_benchmark(c: &mut Criterion) {
    c.bench_function("endpoint_stat_apply", |b| {
        let results = results_for(&["https://example.com/".to_string()], 1000);
        b.iter(|| {
            let mut stat = EndpointStat::new("https://example.com/");
            let mut transitions = 0;
            for result in &results {
                if stat.apply(black_box(result)).is_some() {
                    transitions += 1;
                }
            }
            black_box(transitions)
        });
    });

    let mut group = c.benchmark_group("analyser");
    for url_count in [10usize, 100, 500] {
        let urls: Vec<String> = (0..url_count)
            .map(|i| format!("https://site-{i}.example.com/"))
            .collect();
        let results = results_for(&urls, 20);

        group.bench_with_input(
            BenchmarkId::from_parameter(url_count),
            &results,
            |b, results| {
                b.iter(|| {
                    let mut analyser = Analyser::new(urls.iter().cloned());
                    let events = results
                        .iter()
                        .filter_map(|result| analyser.analyse(result))
                        .count();
                    black_box(events)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, outage_analysis_benchmark);
criterion_main!(benches);
