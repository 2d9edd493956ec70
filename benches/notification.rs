//! 通知处理基准测试
//!
//! 测试事件模板渲染和序列化的性能

use criterion::{criterion_group, criterion_main, Criterion};
use site_vitals::notification::event::{Event, EventKind};
use site_vitals::notification::template::{
    html_payload, HandlebarsTemplate, MessageTemplate, TemplateContext,
};
use site_vitals::pipeline::EndpointStat;
use std::hint::black_box;

fn sample_event() -> Event {
    let mut stat = EndpointStat::new("https://api.example.com/health");
    stat.consecutive_fails = 3;
    stat.total_fails = 42;
    stat.max_latency_ms = 870;
    stat.outage_start = Some(chrono::Utc::now());
    stat.outage_latest = stat.outage_start;
    Event::new(EventKind::PossibleOutage, stat)
}

/// 通知处理基准测试
fn notification_benchmark(c: &mut Criterion) {
    let event = sample_event();

    c.bench_function("template_context", |b| {
        b.iter(|| black_box(TemplateContext::from_event(black_box(&event)).unwrap()));
    });

    c.bench_function("discord_default_template", |b| {
        let template = HandlebarsTemplate::discord_default().unwrap();
        let context = TemplateContext::from_event(&event).unwrap();
        b.iter(|| black_box(template.render(&context).unwrap()));
    });

    c.bench_function("custom_template_with_conditionals", |b| {
        let template = HandlebarsTemplate::new(
            r#"**{{message}}**
URL: {{url}}
{{#if outage_start}}故障开始: {{outage_start}}{{/if}}
连续失败: {{consecutive_fails}} / 累计失败: {{total_fails}}
最大响应时间: {{max_latency_ms}}ms"#,
        )
        .unwrap();
        let context = TemplateContext::from_event(&event).unwrap();
        b.iter(|| black_box(template.render(&context).unwrap()));
    });

    c.bench_function("email_html_payload", |b| {
        let context = TemplateContext::from_event(&event).unwrap();
        b.iter(|| black_box(html_payload(&context)));
    });

    c.bench_function("event_json_line", |b| {
        b.iter(|| black_box(serde_json::to_vec(black_box(&event)).unwrap()));
    });
}

criterion_group!(benches, notification_benchmark);
criterion_main!(benches);
