// src/specs/countries.rs
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::sanitize::fold_name;

/// Display name → stable key.
pub trait NameResolver: Send + Sync {
    fn resolve(&self, display_name: &str) -> Option<String>;
}

/// Built-in ISO 3166 alpha-2 table with the spellings the index uses,
/// plus any configured aliases.
pub struct CountryTable {
    by_name: HashMap<String, String>,
    codes: HashSet<String>,
}

impl CountryTable {
    pub fn builtin() -> Self {
        Self::with_aliases(&BTreeMap::new())
    }

    pub fn with_aliases(aliases: &BTreeMap<String, String>) -> Self {
        let mut by_name = HashMap::with_capacity(COUNTRIES.len() + aliases.len());
        let mut codes = HashSet::with_capacity(COUNTRIES.len());
        for (code, names) in COUNTRIES {
            codes.insert(code.to_string());
            for name in *names {
                by_name.insert(fold_name(name), code.to_string());
            }
        }
        for (name, code) in aliases {
            let code = code.trim().to_ascii_uppercase();
            if code.is_empty() { continue; }
            codes.insert(code.clone());
            by_name.insert(fold_name(name), code);
        }
        Self { by_name, codes }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for CountryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NameResolver for CountryTable {
    fn resolve(&self, display_name: &str) -> Option<String> {
        let trimmed = display_name.trim();
        if trimmed.is_empty() { return None; }

        // A bare code ("US") resolves to itself.
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            let code = trimmed.to_ascii_uppercase();
            if self.codes.contains(&code) { return Some(code); }
        }
        self.by_name.get(&fold_name(trimmed)).cloned()
    }
}

impl NameResolver for HashMap<String, String> {
    fn resolve(&self, display_name: &str) -> Option<String> {
        self.get(display_name.trim()).cloned()
    }
}

const COUNTRIES: &[(&str, &[&str])] = &[
    ("AF", &["Afghanistan"]),
    ("AL", &["Albania"]),
    ("DZ", &["Algeria"]),
    ("AD", &["Andorra"]),
    ("AO", &["Angola"]),
    ("AR", &["Argentina"]),
    ("AM", &["Armenia"]),
    ("AU", &["Australia"]),
    ("AT", &["Austria"]),
    ("AZ", &["Azerbaijan"]),
    ("BS", &["Bahamas", "The Bahamas"]),
    ("BH", &["Bahrain"]),
    ("BD", &["Bangladesh"]),
    ("BY", &["Belarus"]),
    ("BE", &["Belgium"]),
    ("BZ", &["Belize"]),
    ("BJ", &["Benin"]),
    ("BT", &["Bhutan"]),
    ("BO", &["Bolivia"]),
    ("BA", &["Bosnia and Herzegovina", "Bosnia-Herzegovina"]),
    ("BW", &["Botswana"]),
    ("BR", &["Brazil"]),
    ("BN", &["Brunei", "Brunei Darussalam"]),
    ("BG", &["Bulgaria"]),
    ("BF", &["Burkina Faso"]),
    ("BI", &["Burundi"]),
    ("KH", &["Cambodia"]),
    ("CM", &["Cameroon"]),
    ("CA", &["Canada"]),
    ("CV", &["Cape Verde", "Cabo Verde"]),
    ("CF", &["Central African Republic"]),
    ("TD", &["Chad"]),
    ("CL", &["Chile"]),
    ("CN", &["China"]),
    ("CO", &["Colombia"]),
    ("KM", &["Comoros"]),
    ("CG", &["Congo-Brazzaville", "Republic of the Congo", "Congo"]),
    ("CD", &["DR Congo", "Democratic Republic of Congo", "Democratic Republic of the Congo", "Congo-Kinshasa"]),
    ("CR", &["Costa Rica"]),
    ("CI", &["Côte d'Ivoire", "Ivory Coast"]),
    ("HR", &["Croatia"]),
    ("CU", &["Cuba"]),
    ("CY", &["Cyprus"]),
    ("CZ", &["Czech Republic", "Czechia"]),
    ("DK", &["Denmark"]),
    ("DJ", &["Djibouti"]),
    ("DO", &["Dominican Republic"]),
    ("EC", &["Ecuador"]),
    ("EG", &["Egypt"]),
    ("SV", &["El Salvador"]),
    ("GQ", &["Equatorial Guinea"]),
    ("ER", &["Eritrea"]),
    ("EE", &["Estonia"]),
    ("SZ", &["Eswatini", "Swaziland"]),
    ("ET", &["Ethiopia"]),
    ("FJ", &["Fiji"]),
    ("FI", &["Finland"]),
    ("FR", &["France"]),
    ("GA", &["Gabon"]),
    ("GM", &["Gambia", "The Gambia"]),
    ("GE", &["Georgia"]),
    ("DE", &["Germany"]),
    ("GH", &["Ghana"]),
    ("GR", &["Greece"]),
    ("GT", &["Guatemala"]),
    ("GN", &["Guinea"]),
    ("GW", &["Guinea-Bissau"]),
    ("GY", &["Guyana"]),
    ("HT", &["Haiti"]),
    ("HN", &["Honduras"]),
    ("HK", &["Hong Kong"]),
    ("HU", &["Hungary"]),
    ("IS", &["Iceland"]),
    ("IN", &["India"]),
    ("ID", &["Indonesia"]),
    ("IR", &["Iran"]),
    ("IQ", &["Iraq"]),
    ("IE", &["Ireland"]),
    ("IL", &["Israel"]),
    ("IT", &["Italy"]),
    ("JM", &["Jamaica"]),
    ("JP", &["Japan"]),
    ("JO", &["Jordan"]),
    ("KZ", &["Kazakhstan"]),
    ("KE", &["Kenya"]),
    ("XK", &["Kosovo"]),
    ("KW", &["Kuwait"]),
    ("KG", &["Kyrgyzstan"]),
    ("LA", &["Laos"]),
    ("LV", &["Latvia"]),
    ("LB", &["Lebanon"]),
    ("LS", &["Lesotho"]),
    ("LR", &["Liberia"]),
    ("LY", &["Libya"]),
    ("LI", &["Liechtenstein"]),
    ("LT", &["Lithuania"]),
    ("LU", &["Luxembourg"]),
    ("MG", &["Madagascar"]),
    ("MW", &["Malawi"]),
    ("MY", &["Malaysia"]),
    ("MV", &["Maldives"]),
    ("ML", &["Mali"]),
    ("MT", &["Malta"]),
    ("MR", &["Mauritania"]),
    ("MU", &["Mauritius"]),
    ("MX", &["Mexico"]),
    ("MD", &["Moldova"]),
    ("MN", &["Mongolia"]),
    ("ME", &["Montenegro"]),
    ("MA", &["Morocco", "Morocco / Western Sahara"]),
    ("MZ", &["Mozambique"]),
    ("MM", &["Myanmar", "Burma"]),
    ("NA", &["Namibia"]),
    ("NP", &["Nepal"]),
    ("NL", &["Netherlands"]),
    ("NZ", &["New Zealand"]),
    ("NI", &["Nicaragua"]),
    ("NE", &["Niger"]),
    ("NG", &["Nigeria"]),
    ("KP", &["North Korea"]),
    ("MK", &["North Macedonia", "Macedonia"]),
    ("NO", &["Norway"]),
    ("OM", &["Oman"]),
    ("PK", &["Pakistan"]),
    ("PS", &["Palestine"]),
    ("PA", &["Panama"]),
    ("PG", &["Papua New Guinea"]),
    ("PY", &["Paraguay"]),
    ("PE", &["Peru"]),
    ("PH", &["Philippines"]),
    ("PL", &["Poland"]),
    ("PT", &["Portugal"]),
    ("QA", &["Qatar"]),
    ("RO", &["Romania"]),
    ("RU", &["Russia", "Russian Federation"]),
    ("RW", &["Rwanda"]),
    ("WS", &["Samoa"]),
    ("SA", &["Saudi Arabia"]),
    ("SN", &["Senegal"]),
    ("RS", &["Serbia"]),
    ("SC", &["Seychelles"]),
    ("SL", &["Sierra Leone"]),
    ("SG", &["Singapore"]),
    ("SK", &["Slovakia"]),
    ("SI", &["Slovenia"]),
    ("SO", &["Somalia"]),
    ("ZA", &["South Africa"]),
    ("KR", &["South Korea"]),
    ("SS", &["South Sudan"]),
    ("ES", &["Spain"]),
    ("LK", &["Sri Lanka"]),
    ("SD", &["Sudan"]),
    ("SR", &["Suriname"]),
    ("SE", &["Sweden"]),
    ("CH", &["Switzerland"]),
    ("SY", &["Syria"]),
    ("TW", &["Taiwan"]),
    ("TJ", &["Tajikistan"]),
    ("TZ", &["Tanzania"]),
    ("TH", &["Thailand"]),
    ("TL", &["Timor-Leste", "East Timor"]),
    ("TG", &["Togo"]),
    ("TO", &["Tonga"]),
    ("TT", &["Trinidad and Tobago"]),
    ("TN", &["Tunisia"]),
    ("TR", &["Turkey", "Türkiye"]),
    ("TM", &["Turkmenistan"]),
    ("UG", &["Uganda"]),
    ("UA", &["Ukraine"]),
    ("AE", &["United Arab Emirates", "UAE"]),
    ("GB", &["United Kingdom", "UK", "Great Britain"]),
    ("US", &["United States", "United States of America", "USA", "U.S."]),
    ("UY", &["Uruguay"]),
    ("UZ", &["Uzbekistan"]),
    ("VE", &["Venezuela"]),
    ("VN", &["Vietnam", "Viet Nam"]),
    ("YE", &["Yemen"]),
    ("ZM", &["Zambia"]),
    ("ZW", &["Zimbabwe"]),
];
