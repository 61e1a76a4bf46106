// src/csv.rs
use std::io::{self, Write};

use crate::data::Record;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Delim {
    #[default]
    Csv,
    Tsv,
}

impl Delim {
    pub fn sep(self) -> char {
        match self {
            Delim::Csv => ',',
            Delim::Tsv => '\t',
        }
    }
}

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV/TSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first { write!(w, "{}", sep)?; } else { first = false; }
        if needs_quotes(cell, sep) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Records in the given order, one row each.
pub fn write_records<W: Write>(mut w: W, records: &[Record], include_headers: bool, delim: Delim) -> io::Result<()> {
    let sep = delim.sep();
    if include_headers {
        write_row(&mut w, &Record::headers(), sep)?;
    }
    for r in records {
        write_row(&mut w, &r.to_row(), sep)?;
    }
    Ok(())
}

pub fn records_to_string(records: &[Record], include_headers: bool, delim: Delim) -> String {
    let mut buf: Vec<u8> = Vec::new();
    // writing into a Vec cannot fail
    let _ = write_records(&mut buf, records, include_headers, delim);

    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NEW_ENTRY_RANK_DELTA;

    fn rec(key: &str, delta_rank: i32) -> Record {
        Record {
            key: s!(key),
            year: 2024,
            rank_position: 3,
            abuse_score: 80.0,
            situation_score: 81.5,
            global_score: 80.75,
            annual_delta: -1.25,
            annual_delta_rank_position: delta_rank,
        }
    }

    #[test]
    fn quotes_only_when_needed() {
        let mut out = Vec::new();
        write_row(&mut out, &[s!("a,b"), s!("say \"hi\""), s!("plain")], ',').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"a,b\",\"say \"\"hi\"\"\",plain\n");
    }

    #[test]
    fn record_export() {
        let text = records_to_string(&[rec("SE", 2), rec("XK", NEW_ENTRY_RANK_DELTA)], true, Delim::Tsv);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Key\tYear\tRank\tAbuse\tSituation\tGlobal\tDelta\tDelta rank");
        assert_eq!(lines[1], "SE\t2024\t3\t80\t81.5\t80.75\t-1.25\t2");
        assert_eq!(lines[2], "XK\t2024\t3\t80\t81.5\t80.75\t-1.25\tnew");
    }
}
