// src/scrape/table.rs
// Ranking table → records. Pure: no IO, no clock except in detect_year's upper bound.

use std::collections::HashSet;

use chrono::{Datelike, Utc};

use crate::config::consts::FIRST_INDEX_YEAR;
use crate::core::{html, numbers, sanitize::normalize_ws};
use crate::data::{NEW_ENTRY_RANK_DELTA, Record};
use crate::error::ParseError;
use crate::specs::TableSpec;

const NEW_MARKERS: &[&str] = &["new", "nouveau", "nuevo", "n/a", "-", "–", "—", ""];

enum Row {
    Data(Record),
    /// No key and no numbers: headers, spacers, captions.
    Decoration,
    Rejected(&'static str),
}

/// Parse one fetched ranking table.
///
/// Rows are `<tr>` blocks when the text has any, otherwise `|`-separated lines.
/// Decorative rows are skipped quietly, broken data rows with a warning; the
/// parse only fails when nothing usable is left. Output is sorted by rank, then key.
pub fn parse_table(raw: &str, year: u32, spec: &TableSpec) -> Result<Vec<Record>, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let rows = split_rows(raw);
    let mut seen: HashSet<String> = HashSet::with_capacity(rows.len());
    let mut out: Vec<Record> = Vec::with_capacity(rows.len());
    let mut rejected = 0usize;

    for (i, cells) in rows.iter().enumerate() {
        match read_row(cells, year, spec) {
            Row::Data(rec) => {
                if !seen.insert(rec.key.clone()) {
                    logw!("Table: row #{i} repeats key {}; keeping the first", rec.key);
                    rejected += 1;
                    continue;
                }
                out.push(rec);
            }
            Row::Decoration => logd!("Table: row #{i} skipped (decoration)"),
            Row::Rejected(why) => {
                logw!("Table: row #{i} rejected ({why}): {:?}", cells);
                rejected += 1;
            }
        }
    }

    if out.is_empty() {
        return Err(ParseError::NoRecords { rows: rows.len() });
    }

    out.sort_by(|a, b| a.rank_position.cmp(&b.rank_position).then_with(|| a.key.cmp(&b.key)));
    logd!("Table: {} records, {} rejected, {} rows scanned", out.len(), rejected, rows.len());
    Ok(out)
}

/// Cell texts per row.
pub fn split_rows(raw: &str) -> Vec<Vec<String>> {
    if html::to_lower(raw).contains("<tr") {
        let rows: Vec<Vec<String>> = html::row_blocks(raw)
            .into_iter()
            .map(|tr| html::cell_blocks(tr).into_iter().map(html::cell_text).collect())
            .collect();
        if !rows.is_empty() { return rows; }
    }

    raw.lines()
        .filter(|line| line.contains('|'))
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix('|').unwrap_or(line);
            let line = line.strip_suffix('|').unwrap_or(line);
            line.split('|').map(normalize_ws).collect()
        })
        .collect()
}

fn read_row(cells: &[String], year: u32, spec: &TableSpec) -> Row {
    let cols = &spec.columns;
    let name = at(cells, cols.name);
    let key = spec.resolver.resolve(name);
    let has_numbers = cells
        .iter()
        .enumerate()
        .any(|(i, c)| i != cols.name && numbers::looks_numeric(c));

    let Some(key) = key else {
        return if has_numbers { Row::Rejected("unknown country name") } else { Row::Decoration };
    };
    if cells.len() < cols.width() {
        return Row::Rejected("too few cells");
    }

    let Some(rank_position) = numbers::parse_rank(at(cells, cols.rank)) else { return Row::Rejected("rank") };
    let Some(abuse_score) = numbers::parse_decimal(at(cells, cols.abuse)) else { return Row::Rejected("abuse score") };
    let Some(situation_score) = numbers::parse_decimal(at(cells, cols.situation)) else { return Row::Rejected("situation score") };
    let Some(global_score) = numbers::parse_decimal(at(cells, cols.global)) else { return Row::Rejected("global score") };
    let Some(annual_delta) = numbers::parse_decimal(at(cells, cols.annual_delta)) else { return Row::Rejected("annual delta") };
    let Some(annual_delta_rank_position) = read_delta_rank(at(cells, cols.annual_delta_rank)) else {
        return Row::Rejected("annual delta rank");
    };

    let rec = Record {
        key,
        year,
        rank_position,
        abuse_score,
        situation_score,
        global_score,
        annual_delta,
        annual_delta_rank_position,
    };
    if !rec.is_valid() { return Row::Rejected("invalid values"); }
    Row::Data(rec)
}

fn at(cells: &[String], i: usize) -> &str {
    cells.get(i).map(String::as_str).unwrap_or("")
}

fn read_delta_rank(cell: &str) -> Option<i32> {
    let t = cell.trim();
    if NEW_MARKERS.iter().any(|m| t.eq_ignore_ascii_case(m)) {
        return Some(NEW_ENTRY_RANK_DELTA);
    }
    numbers::parse_signed(t).filter(|&v| v != NEW_ENTRY_RANK_DELTA)
}

/// Edition year printed in the page: the first standalone four-digit number
/// between the first index edition and next year.
pub fn detect_year(raw: &str) -> Option<u32> {
    let max = u32::try_from(Utc::now().year()).unwrap_or(u32::MAX).saturating_add(1);
    let bytes = raw.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() { i += 1; continue; }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() { i += 1; }
        if i - start != 4 { continue; }
        // inside a decimal such as 12.2024 or 2024.5 it is not a year
        let prev = start.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(i).copied();
        if matches!(prev, Some(b'.' | b',')) || (matches!(next, Some(b'.' | b',')) && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            continue;
        }
        if let Ok(year) = raw[start..i].parse::<u32>() {
            if (FIRST_INDEX_YEAR..=max).contains(&year) {
                return Some(year);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec() -> TableSpec {
        TableSpec::default()
    }

    #[test]
    fn pipe_row_from_the_reference_example() {
        let recs = parse_table("France | 12 | 78.5 | 81.2 | 79.8 | +2.1 | -3", 2024, &spec()).unwrap();
        assert_eq!(
            recs,
            vec![Record {
                key: s!("FR"),
                year: 2024,
                rank_position: 12,
                abuse_score: 78.5,
                situation_score: 81.2,
                global_score: 79.8,
                annual_delta: 2.1,
                annual_delta_rank_position: -3,
            }]
        );
    }

    #[test]
    fn html_rows_with_header_and_locale_numbers() {
        let doc = r#"
            <html><head><title>Classement 2024</title></head><body>
            <table class="ranking">
              <thead><tr><th>Country</th><th>Rank</th><th>Abuse</th><th>Situation</th><th>Global</th><th>Diff</th><th>Diff rank</th></tr></thead>
              <tbody>
                <tr class="row"><td><a href="/country/norway">Norway</a></td><td>1</td><td>95,2</td><td>92,1</td><td>91,89</td><td>+0,6</td><td>0</td></tr>
                <tr class="row"><td>United&nbsp;States</td><td>55</td><td>66,6</td><td>60,1</td><td>66,59</td><td>&minus;5,12</td><td>&minus;10</td></tr>
                <tr class="spacer"><td colspan="7">&nbsp;</td></tr>
              </tbody>
            </table></body></html>"#;
        let recs = parse_table(doc, 2024, &spec()).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].key, "NO");
        assert_eq!(recs[0].global_score, 91.89);
        assert_eq!(recs[1].key, "US");
        assert_eq!(recs[1].annual_delta, -5.12);
        assert_eq!(recs[1].annual_delta_rank_position, -10);
    }

    #[test]
    fn n_good_rows_give_n_records_and_bad_rows_are_skipped() {
        let text = "\
| Country | Rank | Abuse | Situation | Global | Delta | Delta rank |
|---|---|---|---|---|---|---|
| Germany | 10 | 80 | 82 | 83,84 | -1,2 | +11 |
| Atlantis | 11 | 80 | 82 | 83 | 0 | 0 |
| Spain | x | 80 | 82 | 83 | 0 | 0 |
| Brazil | 82 | 60 | 58 | 58,59 | +6,2 | new |
| Germany | 99 | 1 | 1 | 1 | 0 | 0 |
";
        let recs = parse_table(text, 2024, &spec()).unwrap();
        let keys: Vec<&str> = recs.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["DE", "BR"]);
        assert!(recs[1].is_new_entry());
    }

    #[test]
    fn garbage_and_empty_fail() {
        assert_eq!(parse_table("   ", 2024, &spec()), Err(ParseError::Empty));
        assert!(matches!(
            parse_table("<html><body><p>Maintenance</p></body></html>", 2024, &spec()),
            Err(ParseError::NoRecords { .. })
        ));
        assert!(matches!(parse_table("Country | Rank\nfoo | bar", 2024, &spec()), Err(ParseError::NoRecords { rows: 2 })));
    }

    #[test]
    fn parsing_is_deterministic_and_sorted() {
        let text = "Chile | 52 | 1 | 2 | 3 | 0 | 0\nFrance | 12 | 1 | 2 | 3 | 0 | 0\nChina | 172 | 1 | 2 | 3 | 0 | 0\n";
        let a = parse_table(text, 2024, &spec()).unwrap();
        let b = parse_table(text, 2024, &spec()).unwrap();
        assert_eq!(a, b);
        let ranks: Vec<u32> = a.iter().map(|r| r.rank_position).collect();
        assert_eq!(ranks, vec![12, 52, 172]);
    }

    #[test]
    fn custom_layout_and_aliases() {
        use crate::specs::ColumnLayout;
        use std::collections::BTreeMap;

        let columns = ColumnLayout { rank: 0, name: 1, ..ColumnLayout::default() };
        let mut aliases = BTreeMap::new();
        aliases.insert(s!("OECS"), s!("XO"));
        let spec = TableSpec::new(columns, &aliases);
        let recs = parse_table("3 | OECS | 1 | 2 | 3 | 0 | 0", 2023, &spec).unwrap();
        assert_eq!(recs[0].key, "XO");
        assert_eq!(recs[0].rank_position, 3);
        assert_eq!(recs[0].year, 2023);
    }

    #[test]
    fn year_detection() {
        assert_eq!(detect_year("<title>World Press Freedom Index 2024</title>"), Some(2024));
        assert_eq!(detect_year("score 2024.5 then 2023"), Some(2023));
        assert_eq!(detect_year("founded 1985, code 12345"), None);
    }
}
