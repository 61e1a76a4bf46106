// benches/parse_table.rs
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pfi_scrape::scrape::{detect_year, parse_table};
use pfi_scrape::specs::TableSpec;

const NAMES: &[&str] = &[
    "Norway", "Denmark", "Sweden", "Netherlands", "Finland", "Estonia", "Portugal", "Ireland",
    "Switzerland", "Germany", "Luxembourg", "Latvia", "France", "Canada", "Spain", "Belgium",
    "United States", "Brazil", "Japan", "India", "Türkiye", "Côte d'Ivoire", "DR Congo", "China",
];

/// A synthetic ranking page shaped like the published one.
fn sample_html() -> String {
    let mut doc = s("<html><body><h2>2024 World Press Freedom Index</h2><table><thead><tr>");
    for h in ["Country", "Rank", "Political", "Economic", "Score", "Evolution", "Rank evolution"] {
        doc.push_str(&format!("<th>{h}</th>"));
    }
    doc.push_str("</tr></thead><tbody>");
    for (i, name) in NAMES.iter().enumerate() {
        let score = 92.0 - i as f64 * 2.5;
        doc.push_str(&format!(
            "<tr class=\"row\"><td><a href=\"#\">{name}</a></td><td>{}</td><td>{:.2}</td><td>{:.2}</td>\
             <td>{:.2}</td><td>{:+.2}</td><td>{:+}</td></tr>",
            i + 1, score - 1.0, score + 1.0, score, (i % 5) as f64 - 2.0, (i % 7) as i32 - 3,
        ));
    }
    doc.push_str("</tbody></table></body></html>");
    doc
}

fn sample_pipes() -> String {
    NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| format!("| {name} | {} | 80,1 | 79,9 | 80,0 | +0,5 | -1 |\n", i + 1))
        .collect()
}

fn s(v: &str) -> String { v.to_string() }

fn bench_parse(c: &mut Criterion) {
    let spec = TableSpec::default();
    let html = sample_html();
    let pipes = sample_pipes();

    c.bench_function("parse_table_html", |b| {
        b.iter(|| {
            let rows = parse_table(black_box(&html), 2024, &spec).map(|r| r.len()).unwrap_or(0);
            black_box(rows)
        })
    });

    c.bench_function("parse_table_pipes", |b| {
        b.iter(|| {
            let rows = parse_table(black_box(&pipes), 2024, &spec).map(|r| r.len()).unwrap_or(0);
            black_box(rows)
        })
    });

    c.bench_function("detect_year", |b| b.iter(|| black_box(detect_year(black_box(&html)))));
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
