//! State/UT name canonicalization.
//!
//! Source exports carry the state as free text: official spellings, old
//! names, abbreviations, corrupted values with fragments of a neighbouring
//! cell glued on, and occasionally a city typed into the state column. Every
//! label is reduced to one of [`CANONICAL_STATES`] or [`UNKNOWN`].
//!
//! Resolution order, first match wins:
//! 1. blank input is [`UNKNOWN`]
//! 2. exact hit in [`STATE_ALIASES`] (after lower-casing and whitespace folding)
//! 3. exact hit in [`CITY_TO_STATE`]
//! 4. all-digit text is [`UNKNOWN`]
//! 5. substring match either way against the alias keys, in table order
//! 6. otherwise the trimmed input in title case
//!
//! Step 6 yields names outside the canonical set; use [`is_canonical`] to
//! detect them.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

pub const UNKNOWN: &str = "Unknown";

/// Official names of the 28 states and 8 union territories.
pub const CANONICAL_STATES: [&str; 36] = [
    "Andaman & Nicobar Islands",
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chandigarh",
    "Chhattisgarh",
    "Dadra & Nagar Haveli and Daman & Diu",
    "Delhi",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jammu & Kashmir",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Ladakh",
    "Lakshadweep",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Puducherry",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
];

/// Known lower-cased variants, in lookup order. The order is significant:
/// the substring fallback returns the first entry that matches.
pub const STATE_ALIASES: &[(&str, &str)] = &[
    ("andaman & nicobar islands", "Andaman & Nicobar Islands"),
    ("andaman and nicobar islands", "Andaman & Nicobar Islands"),
    ("andaman and nicobar", "Andaman & Nicobar Islands"),
    ("a&n islands", "Andaman & Nicobar Islands"),
    ("andhra pradesh", "Andhra Pradesh"),
    ("andrapradesh", "Andhra Pradesh"),
    ("ap", "Andhra Pradesh"),
    ("arunachal pradesh", "Arunachal Pradesh"),
    ("arunachalpradesh", "Arunachal Pradesh"),
    ("assam", "Assam"),
    ("bihar", "Bihar"),
    ("biharisgarh", "Bihar"),
    ("chandigarh", "Chandigarh"),
    ("chandigarhrh", "Chandigarh"),
    ("chhattisgarh", "Chhattisgarh"),
    ("chattisgarh", "Chhattisgarh"),
    ("chhatisgarh", "Chhattisgarh"),
    ("chhatisgarhar haveli", "Chhattisgarh"),
    ("chhattisgarhgar haveli", "Chhattisgarh"),
    ("dadra & nagar haveli and daman & diu", "Dadra & Nagar Haveli and Daman & Diu"),
    ("dadra & nagar haveli", "Dadra & Nagar Haveli and Daman & Diu"),
    ("dadra and nagar haveli", "Dadra & Nagar Haveli and Daman & Diu"),
    ("dadra and nagar haveli and daman and diu", "Dadra & Nagar Haveli and Daman & Diu"),
    ("the dadra and nagar haveli and daman and diu", "Dadra & Nagar Haveli and Daman & Diu"),
    ("daman & diu", "Dadra & Nagar Haveli and Daman & Diu"),
    ("daman and diu", "Dadra & Nagar Haveli and Daman & Diu"),
    ("dadra & nagar havelili and daman and diu", "Dadra & Nagar Haveli and Daman & Diu"),
    ("delhi", "Delhi"),
    ("new delhi", "Delhi"),
    ("delhina", "Delhi"),
    ("goa", "Goa"),
    ("goaachal pradesh", "Goa"),
    ("gujarat", "Gujarat"),
    ("gujarat kashmir", "Gujarat"),
    ("haryana", "Haryana"),
    ("haryanand kashmir", "Haryana"),
    ("himachal pradesh", "Himachal Pradesh"),
    ("himachalpradesh", "Himachal Pradesh"),
    ("hp", "Himachal Pradesh"),
    ("jammu & kashmir", "Jammu & Kashmir"),
    ("jammu and kashmir", "Jammu & Kashmir"),
    ("j&k", "Jammu & Kashmir"),
    ("jharkhand", "Jharkhand"),
    ("jharkhandep", "Jharkhand"),
    ("karnataka", "Karnataka"),
    ("karnatakaadesh", "Karnataka"),
    ("kerala", "Kerala"),
    ("keralashtra", "Kerala"),
    ("ladakh", "Ladakh"),
    ("ladakhr", "Ladakh"),
    ("lakshadweep", "Lakshadweep"),
    ("madhya pradesh", "Madhya Pradesh"),
    ("madhyapradesh", "Madhya Pradesh"),
    ("mp", "Madhya Pradesh"),
    ("maharashtra", "Maharashtra"),
    ("manipur", "Manipur"),
    ("meghalaya", "Meghalaya"),
    ("mizoram", "Mizoram"),
    ("mizoramerry", "Mizoram"),
    ("nagaland", "Nagaland"),
    ("nagalandry", "Nagaland"),
    ("odisha", "Odisha"),
    ("orissa", "Odisha"),
    ("orissanadu", "Odisha"),
    ("odishahan", "Odisha"),
    ("puducherry", "Puducherry"),
    ("pondicherry", "Puducherry"),
    ("punjab", "Punjab"),
    ("punjaba", "Punjab"),
    ("rajasthan", "Rajasthan"),
    ("rajasthnal", "Rajasthan"),
    ("sikkim", "Sikkim"),
    ("sikkimengal", "Sikkim"),
    ("tamil nadu", "Tamil Nadu"),
    ("tamilnadu", "Tamil Nadu"),
    ("tn", "Tamil Nadu"),
    ("telangana", "Telangana"),
    ("telanganagal", "Telangana"),
    ("tripura", "Tripura"),
    ("tripurangal", "Tripura"),
    ("uttar pradesh", "Uttar Pradesh"),
    ("uttarpradesh", "Uttar Pradesh"),
    ("up", "Uttar Pradesh"),
    ("uttarakhand", "Uttarakhand"),
    ("uttaranchal", "Uttarakhand"),
    ("west bengal", "West Bengal"),
    ("westbengal", "West Bengal"),
    ("west bangal", "West Bengal"),
    ("west bengli", "West Bengal"),
    ("west bengalesh", "West Bengal"),
];

/// Cities and localities that turn up in the state column.
pub const CITY_TO_STATE: &[(&str, &str)] = &[
    ("balanagar", "Telangana"),
    ("balanagarhali", "Telangana"),
    ("darbhanga", "Bihar"),
    ("jaipur", "Rajasthan"),
    ("jaipuraka", "Rajasthan"),
    ("madanapalle", "Andhra Pradesh"),
    ("nagpur", "Maharashtra"),
    ("puttenahalli", "Karnataka"),
    ("puttenahallih", "Karnataka"),
    ("raja annamalai puram", "Tamil Nadu"),
];

static ALIAS_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| STATE_ALIASES.iter().copied().collect());

static CITY_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| CITY_TO_STATE.iter().copied().collect());

static CANONICAL_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| CANONICAL_STATES.iter().copied().collect());

/// Resolve a free-text state label. `None` stands for a missing cell.
pub fn clean_state(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return UNKNOWN.to_string();
    };
    let key = normalize(raw);
    if key.is_empty() {
        return UNKNOWN.to_string();
    }

    if let Some(name) = ALIAS_INDEX.get(key.as_str()) {
        return (*name).to_string();
    }
    if let Some(name) = CITY_INDEX.get(key.as_str()) {
        return (*name).to_string();
    }
    if key.chars().all(|c| c.is_ascii_digit()) {
        return UNKNOWN.to_string();
    }
    if let Some(name) = fuzzy_match(&key) {
        return name.to_string();
    }

    title_case(raw.trim())
}

/// True when `name` is one of the enumerated states/UTs.
pub fn is_canonical(name: &str) -> bool {
    CANONICAL_SET.contains(name)
}

fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn fuzzy_match(key: &str) -> Option<&'static str> {
    STATE_ALIASES
        .iter()
        .find(|(alias, _)| key.contains(alias) || alias.contains(key))
        .map(|(_, name)| *name)
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(s: &str) -> String {
        clean_state(Some(s))
    }

    #[test]
    fn known_variants_resolve() {
        assert_eq!(clean("ORISSA"), "Odisha");
        assert_eq!(clean("j&k"), "Jammu & Kashmir");
        assert_eq!(clean("  West   Bengal "), "West Bengal");
        assert_eq!(clean("Pondicherry"), "Puducherry");
        assert_eq!(clean("Uttaranchal"), "Uttarakhand");
        assert_eq!(clean("Daman and Diu"), "Dadra & Nagar Haveli and Daman & Diu");
    }

    #[test]
    fn every_alias_and_city_maps_to_its_table_value() {
        for (alias, name) in STATE_ALIASES.iter().chain(CITY_TO_STATE) {
            assert_eq!(clean(alias), *name, "alias {alias:?}");
            assert_eq!(clean(&alias.to_uppercase()), *name, "alias {alias:?}");
            assert!(is_canonical(name), "{name:?} is not canonical");
        }
    }

    #[test]
    fn canonical_names_are_fixed_points() {
        for name in CANONICAL_STATES {
            assert_eq!(clean(name), name);
            assert_eq!(clean(&clean(name)), name);
        }
    }

    #[test]
    fn missing_blank_and_numeric_are_unknown() {
        assert_eq!(clean_state(None), UNKNOWN);
        assert_eq!(clean("   "), UNKNOWN);
        assert_eq!(clean("12345"), UNKNOWN);
        assert_eq!(clean(" 100000 "), UNKNOWN);
    }

    #[test]
    fn cities_resolve_to_their_state() {
        assert_eq!(clean("Nagpur"), "Maharashtra");
        assert_eq!(clean("Raja Annamalai Puram"), "Tamil Nadu");
    }

    #[test]
    fn substring_fallback_either_direction() {
        // input contains an alias
        assert_eq!(clean("Odisha State"), "Odisha");
        // alias contains the input
        assert_eq!(clean("Jammu"), "Jammu & Kashmir");
    }

    #[test]
    fn substring_fallback_takes_first_table_entry() {
        // "ap" precedes "mp" in the alias list, so Andhra Pradesh wins.
        assert_eq!(clean("xmpap"), "Andhra Pradesh");
        assert_eq!(clean("xmp"), "Madhya Pradesh");
    }

    #[test]
    fn unmatched_text_falls_back_to_title_case() {
        let out = clean("  atlantis ");
        assert_eq!(out, "Atlantis");
        assert!(!is_canonical(&out));
        assert_eq!(clean("new  ATLANTIS"), "New  Atlantis");
    }
}
