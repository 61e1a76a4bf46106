// src/core/html.rs
pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii() {
                c.to_ascii_lowercase()
            } else {
                c
            }
        })
        .collect()
}

/// Next `o`..`c` block at or after `from`, matched case-insensitively.
/// `lc` is `to_lower(s)`; ASCII-only lowering keeps byte offsets identical,
/// so positions found in `lc` index straight into `s`.
pub fn next_tag_block_ci(s: &str, lc: &str, o: &str, c: &str, from: usize) -> Option<(usize, usize)> {
    let ol = to_lower(o);
    let cl = to_lower(c);
    let mut at = from;
    loop {
        let start = lc.get(at..)?.find(&ol)? + at;
        // "<tr" must not match "<track", "<th" must not match "<thead"
        let boundary = s[start + o.len()..].chars().next();
        if !matches!(boundary, Some('>' | '/' | ' ' | '\t' | '\r' | '\n')) {
            at = start + o.len();
            continue;
        }
        let open_end = s[start..].find('>')? + start + 1;
        let end_rel = lc[open_end..].find(&cl)?;
        let end = open_end + end_rel + c.len();
        return Some((start, end));
    }
}

/// All `<tr>` blocks of a document, in order.
pub fn row_blocks(doc: &str) -> Vec<&str> {
    let lc = to_lower(doc);
    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Some((s, e)) = next_tag_block_ci(doc, &lc, "<tr", "</tr>", pos) {
        out.push(&doc[s..e]);
        pos = e;
    }
    out
}

/// `<td>` and `<th>` blocks of one row, in document order.
pub fn cell_blocks(tr: &str) -> Vec<&str> {
    let lc = to_lower(tr);
    let mut out = Vec::new();
    let mut pos = 0usize;
    loop {
        let td = next_tag_block_ci(tr, &lc, "<td", "</td>", pos);
        let th = next_tag_block_ci(tr, &lc, "<th", "</th>", pos);
        let next = match (td, th) {
            (Some(a), Some(b)) => if a.0 <= b.0 { a } else { b },
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => break,
        };
        out.push(&tr[next.0..next.1]);
        pos = next.1;
    }
    out
}

pub fn inner_after_open_tag(block: &str) -> String {
    if let Some(oe) = block.find('>') {
        if let Some(cs) = block.rfind('<') {
            if cs > oe {
                return block[oe + 1..cs].to_string();
            }
        }
    }
    s!()
}

/// Visible text of one cell block: inner markup, entities decoded, tags stripped.
pub fn cell_text(block: &str) -> String {
    let inner = inner_after_open_tag(block);
    // Tags first: entities like &lt; must not turn into tags.
    let mut raw = String::with_capacity(inner.len());
    let mut in_tag = false;
    for ch in inner.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => { if in_tag { raw.push(' '); } in_tag = false; }
            _ if !in_tag => raw.push(ch),
            _ => {}
        }
    }
    super::sanitize::normalize_ws(&super::sanitize::normalize_entities(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_skip_lookalike_tags() {
        let doc = r#"<table><thead><tr><th>A</th></tr></thead>
            <TR class="x"><td>1</td></TR><track src="a"></track><tr><td>2</td></tr></table>"#;
        let rows = row_blocks(doc);
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("<TR"));
    }

    #[test]
    fn cells_keep_document_order() {
        let tr = r#"<tr><th scope="row">France</th><td>12</td><td><b>78,5</b></td></tr>"#;
        let cells: Vec<String> = cell_blocks(tr).into_iter().map(cell_text).collect();
        assert_eq!(cells, vec!["France", "12", "78,5"]);
    }

    #[test]
    fn cell_text_decodes_entities_after_stripping() {
        assert_eq!(cell_text("<td><a href=\"/fr\">C&ocirc;te&nbsp;d&#39;Ivoire</a></td>"), "Côte d'Ivoire");
        assert_eq!(cell_text("<td>a &lt;b&gt;</td>"), "a <b>");
    }
}
