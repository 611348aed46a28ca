//! Match-throughput benchmark: how many `Matcher::matches` calls per
//! second against a mid-sized synthetic rule set, covering the bloom-hit,
//! bloom-miss, host-anchored, and exception-overridden paths.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use abp_core::{FilterIndex, FilterOption, Matcher, RequestContext};

fn build_index() -> FilterIndex<'static> {
    let mut text = String::new();
    for i in 0..2000 {
        text.push_str(&format!("/ads/campaign-{i}/*\n"));
        text.push_str(&format!("||tracker-{i}.example^\n"));
    }
    text.push_str("@@||tracker-1.example/allow^\n");
    text.push_str("ads$domain=news.example|~sub.news.example\n");
    text.push_str("news.example##.promo\n");

    let mut index = FilterIndex::new();
    index.parse(&text);
    index
}

fn bench_matches(c: &mut Criterion) {
    let index = build_index();
    let matcher = Matcher::new(&index);

    let requests = [
        ("https://cdn.example/ads/campaign-42/hero.png", Some("news.example")),
        ("https://tracker-7.example/pixel.gif", Some("news.example")),
        ("https://static.example/app.js", Some("news.example")),
        ("https://tracker-1.example/allow/ok.js", Some("news.example")),
    ];

    c.bench_function("matches_mixed_corpus", |b| {
        b.iter(|| {
            for (url, site_domain) in requests {
                let ctx = RequestContext {
                    url,
                    site_domain,
                    request_option: FilterOption::empty(),
                };
                black_box(matcher.matches(&ctx));
            }
        })
    });
}

criterion_group!(benches, bench_matches);
criterion_main!(benches);
