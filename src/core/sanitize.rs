// src/core/sanitize.rs

/// Decode the entities that show up in ranking tables: a handful of named
/// ones plus decimal/hex numeric references. Unknown entities are kept verbatim.
pub fn normalize_entities(s: &str) -> String {
    if !s.contains('&') { return s.to_string(); }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi > 1 && semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => { out.push(ch); rest = &tail[semi + 1..]; }
            None => { out.push('&'); rest = &tail[1..]; }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    let ch = match name {
        "amp" => '&', "lt" => '<', "gt" => '>', "quot" => '"', "apos" => '\'',
        "nbsp" => '\u{a0}', "thinsp" => '\u{2009}', "minus" => '\u{2212}',
        "ndash" => '–', "mdash" => '—', "rsquo" => '’', "lsquo" => '‘',
        "aacute" => 'á', "agrave" => 'à', "acirc" => 'â', "atilde" => 'ã', "auml" => 'ä', "aring" => 'å',
        "eacute" => 'é', "egrave" => 'è', "ecirc" => 'ê', "euml" => 'ë', "Eacute" => 'É',
        "iacute" => 'í', "icirc" => 'î', "iuml" => 'ï',
        "oacute" => 'ó', "ocirc" => 'ô', "otilde" => 'õ', "ouml" => 'ö', "oslash" => 'ø',
        "uacute" => 'ú', "ucirc" => 'û', "uuml" => 'ü',
        "ccedil" => 'ç', "ntilde" => 'ñ', "szlig" => 'ß',
        _ => return None,
    };
    Some(ch)
}

/// Collapse any run of whitespace (including NBSP) to one ASCII space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Matching form of a display name: lowercase, common diacritics folded,
/// apostrophes unified, dots and footnote markers dropped.
/// "Côte d’Ivoire*" and "cote d'ivoire" fold to the same string.
pub fn fold_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars().flat_map(char::to_lowercase) {
        let folded = match ch {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c', 'ñ' => 'n', 'ý' | 'ÿ' => 'y',
            '’' | '‘' | '`' | '´' => '\'',
            '-' | '–' | '—' => ' ',
            '.' | '*' | '(' | ')' => continue,
            c => c,
        };
        out.push(folded);
    }
    normalize_ws(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entities_named_and_numeric() {
        assert_eq!(normalize_entities("a&amp;b&#233;&#xE9;&nbsp;"), "a&béé\u{a0}");
        assert_eq!(normalize_entities("AT&T &bogus; & x"), "AT&T &bogus; & x");
    }

    #[test]
    fn fold_matches_variants() {
        assert_eq!(fold_name("Côte d’Ivoire*"), fold_name("cote d'ivoire"));
        assert_eq!(fold_name("Guinea-Bissau"), "guinea bissau");
        assert_eq!(fold_name("  U.S.A. "), "usa");
    }

    #[test]
    fn ws_collapses_nbsp() {
        assert_eq!(normalize_ws(" a\u{a0}\u{a0}b \n"), "a b");
    }
}
