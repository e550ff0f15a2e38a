//! Canonical casing for scraped names and addresses, and phone-number checks.
//!
//! Tokens are split on single spaces, so runs of spaces survive as empty tokens
//! and come back out unchanged.

use imenik_common::MOBILE_PREFIX;

/// Croatian prepositions and conjunctions kept lowercase inside street names.
const STREET_CONNECTORS: &[&str] = &[
    "i", "u", "na", "kod", "do", "od", "za", "iz", "s", "sa", "k", "ka",
];

/// Directional words kept lowercase inside street names.
const STREET_DIRECTIONS: &[&str] = &[
    "sjever", "jug", "istok", "zapad", "sjeverni", "južni", "istočni", "zapadni",
];

/// Uppercase the first character, lowercase the rest.
fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn normalize_name(raw: &str) -> String {
    raw.split(' ').map(capitalize).collect::<Vec<_>>().join(" ")
}

/// Same rule as [`normalize_name`]; the postal code must already be stripped.
pub fn normalize_city(raw: &str) -> String {
    normalize_name(raw)
}

pub fn normalize_street(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let tokens: Vec<&str> = raw.split(' ').collect();
    let mut out = Vec::with_capacity(tokens.len());

    for (i, token) in tokens.iter().enumerate() {
        let after_hyphen = i > 0 && tokens[i - 1].ends_with('-');
        if i == 0 || after_hyphen {
            out.push(capitalize(token));
            continue;
        }

        let lower = token.to_lowercase();
        if STREET_CONNECTORS.contains(&lower.as_str()) || STREET_DIRECTIONS.contains(&lower.as_str())
        {
            out.push(lower);
        } else {
            out.push(capitalize(token));
        }
    }

    out.join(" ")
}

/// Strip every whitespace character. The stored number keeps its formatting.
pub fn clean_phone_number(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn is_mobile_number(raw: &str) -> bool {
    clean_phone_number(raw).starts_with(MOBILE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_title_cased_per_token() {
        assert_eq!(normalize_name("IVAN horvat"), "Ivan Horvat");
        assert_eq!(normalize_name("ana-marija KOVAČ"), "Ana-marija Kovač");
    }

    #[test]
    fn name_keeps_empty_segments_from_double_spaces() {
        assert_eq!(normalize_name("ivan  horvat"), "Ivan  Horvat");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn name_handles_non_ascii_initials() {
        assert_eq!(normalize_name("ŠIMUN ćosić"), "Šimun Ćosić");
        assert_eq!(normalize_name("đuro"), "Đuro");
    }

    #[test]
    fn city_uses_name_rule() {
        for raw in ["zagreb", "SLAVONSKI BROD", "  split", "velika gorica ", ""] {
            assert_eq!(normalize_city(raw), normalize_name(raw));
        }
    }

    #[test]
    fn street_empty_stays_empty() {
        assert_eq!(normalize_street(""), "");
    }

    #[test]
    fn street_lowercases_connectors_mid_string() {
        assert_eq!(normalize_street("ulica i Grada"), "Ulica i Grada");
        assert_eq!(normalize_street("TRG NA STIJENI"), "Trg na Stijeni");
        assert_eq!(normalize_street("put KOD mosta"), "Put kod Mosta");
    }

    #[test]
    fn street_first_token_is_capitalized_even_when_connector() {
        assert_eq!(normalize_street("na vrhu"), "Na Vrhu");
    }

    #[test]
    fn street_lowercases_directions() {
        assert_eq!(normalize_street("Obala JUŽNI Dio"), "Obala južni Dio");
        assert_eq!(normalize_street("ulica sjever 5"), "Ulica sjever 5");
    }

    #[test]
    fn street_capitalizes_after_hyphen_token() {
        assert_eq!(normalize_street("kneza- i ulica"), "Kneza- I Ulica");
    }

    #[test]
    fn phone_whitespace_is_removed() {
        assert_eq!(clean_phone_number("091 234 5678"), "0912345678");
        assert_eq!(clean_phone_number(" 098\t123\n456 "), "098123456");
    }

    #[test]
    fn mobile_prefix_check_uses_cleaned_number() {
        assert!(is_mobile_number("09 1 234"));
        assert!(is_mobile_number("0912345678"));
        assert!(!is_mobile_number("0123456"));
        assert!(!is_mobile_number("01 234 5678"));
        assert!(!is_mobile_number(""));
    }
}
