use crate::yahoo::FundamentalsSnapshot;
use indexmap::IndexMap;

/// The field selection offered by default, as formatted labels.
pub const DEFAULT_FIELD_LABELS: [&str; 9] = [
    "Current Price",
    "Market Cap",
    "Sector",
    "Dividend Rate",
    "Dividend Yield",
    "Payout Ratio",
    "Volume",
    "Currency",
    "Price To Book",
];

const FALLBACK_FIELD_KEYS: [&str; 9] = [
    "currentPrice",
    "marketCap",
    "sector",
    "dividendRate",
    "dividendYield",
    "payoutRatio",
    "volume",
    "currency",
    "priceToBook",
];

/// Format a camelCase provider key as a human-readable label:
/// a space goes in front of every upper-case character after the first,
/// then the whole string is title-cased.
///
/// All-upper-case identifiers fan out to one-letter words ("UUID" becomes
/// "U U I D"). That mirrors the provider schema's naming convention being
/// applied blindly and is kept as documented behavior.
pub fn format_field_label(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 8);
    for ch in name.chars() {
        if ch.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(ch);
    }
    title_case(spaced.trim())
}

// Capitalizes every letter that follows a non-letter and lower-cases the
// rest, so digit boundaries start a new word ("52 Week" not "52 week").
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_is_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            out.push(ch);
            prev_is_alpha = false;
        }
    }
    out
}

/// Recover the provider key behind a formatted label by scanning the
/// snapshot's keys in their stored order and returning the first whose
/// formatted form matches exactly. `None` on a miss; formatting is
/// many-to-one in pathological cases, so first match wins.
pub fn reverse_field_key<'a>(
    label: &str,
    snapshot: &'a FundamentalsSnapshot,
) -> Option<&'a str> {
    snapshot
        .fields
        .keys()
        .find(|key| format_field_label(key) == label)
        .map(|key| key.as_str())
}

/// Bidirectional label/key mapping built once from the reference symbol's
/// snapshot. Collisions resolve to the first key seen, matching the scan
/// order of [`reverse_field_key`].
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    label_to_key: IndexMap<String, String>,
    key_to_label: IndexMap<String, String>,
}

impl FieldCatalog {
    pub fn from_snapshot(snapshot: &FundamentalsSnapshot) -> Self {
        let mut label_to_key = IndexMap::new();
        let mut key_to_label = IndexMap::new();
        for key in snapshot.fields.keys() {
            let label = format_field_label(key);
            label_to_key
                .entry(label.clone())
                .or_insert_with(|| key.clone());
            key_to_label.insert(key.clone(), label);
        }
        Self {
            label_to_key,
            key_to_label,
        }
    }

    /// Catalog covering only the default selection, for when the reference
    /// snapshot cannot be fetched at startup.
    pub fn fallback() -> Self {
        let mut label_to_key = IndexMap::new();
        let mut key_to_label = IndexMap::new();
        for (label, key) in DEFAULT_FIELD_LABELS.iter().zip(FALLBACK_FIELD_KEYS) {
            label_to_key.insert(label.to_string(), key.to_string());
            key_to_label.insert(key.to_string(), label.to_string());
        }
        Self {
            label_to_key,
            key_to_label,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.label_to_key.keys().map(|label| label.as_str())
    }

    pub fn key_for(&self, label: &str) -> Option<&str> {
        self.label_to_key.get(label).map(|key| key.as_str())
    }

    pub fn label_for(&self, key: &str) -> Option<&str> {
        self.key_to_label.get(key).map(|label| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.label_to_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.label_to_key.is_empty()
    }
}
