use anyhow::{Result, bail};
use std::collections::HashMap;

use casefile_game::SeededPicker;

/// Fallback seed when the command line names none.
pub const DEFAULT_SEED: u64 = 1337;

/// Detailed seed metadata used for logic and playability analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
    /// Phrase the seed was derived from, when it was not a plain number.
    pub phrase: Option<String>,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u64) -> Self {
        Self { seed, phrase: None }
    }

    /// Hash a free-form phrase into a seed the same way the engine seeds
    /// feedback text.
    #[must_use]
    pub fn from_phrase(phrase: &str) -> Self {
        Self {
            seed: SeededPicker::from_seed_str(phrase).seed(),
            phrase: Some(phrase.to_string()),
        }
    }

    /// Human-facing label: the phrase if there is one, else the number.
    #[must_use]
    pub fn label(&self) -> String {
        self.phrase
            .clone()
            .unwrap_or_else(|| self.seed.to_string())
    }
}

/// Resolve a list of CLI seed arguments into canonical seed metadata.
///
/// Supports literal integers (negative values use their magnitude), `0x`
/// hex literals and free-form phrases prefixed with `phrase:`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending: Vec<SeedInfo> = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            pending.push(SeedInfo::from_numeric(value));
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            pending.push(SeedInfo::from_numeric(value.unsigned_abs()));
            continue;
        }

        if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            && let Ok(value) = u64::from_str_radix(hex, 16)
        {
            pending.push(SeedInfo::from_numeric(value));
            continue;
        }

        if let Some(phrase) = token.strip_prefix("phrase:")
            && !phrase.trim().is_empty()
        {
            pending.push(SeedInfo::from_phrase(phrase.trim()));
            continue;
        }

        bail!("Unrecognized seed token: {token}");
    }

    let mut deduped: Vec<SeedInfo> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();

    for info in pending {
        if let Some(&existing) = index.get(&info.seed) {
            if let Some(entry) = deduped.get_mut(existing)
                && entry.phrase.is_none()
                && info.phrase.is_some()
            {
                *entry = info;
            }
        } else {
            index.insert(info.seed, deduped.len());
            deduped.push(info);
        }
    }

    if deduped.is_empty() {
        deduped.push(SeedInfo::from_numeric(DEFAULT_SEED));
    }

    Ok(deduped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn resolves_numeric_hex_and_phrases() {
        let inputs = tokens(&["42", "-7", "0x10", "phrase:quiet harbor"]);
        let seeds = resolve_seed_inputs(&inputs).unwrap();
        assert!(seeds.iter().any(|s| s.seed == 42 && s.phrase.is_none()));
        assert!(seeds.iter().any(|s| s.seed == 7));
        assert!(seeds.iter().any(|s| s.seed == 16));
        let phrase = seeds.iter().find(|s| s.phrase.is_some()).unwrap();
        assert_eq!(phrase.label(), "quiet harbor");
        assert_eq!(phrase.seed, SeedInfo::from_phrase("quiet harbor").seed);
    }

    #[test]
    fn duplicates_collapse_in_first_seen_order() {
        let seeds = resolve_seed_inputs(&tokens(&["5", "9", "5", "-9"])).unwrap();
        let values: Vec<u64> = seeds.iter().map(|s| s.seed).collect();
        assert_eq!(values, vec![5, 9]);
    }

    #[test]
    fn empty_input_falls_back_to_default() {
        let seeds = resolve_seed_inputs(&tokens(&["", ""])).unwrap();
        assert_eq!(seeds, vec![SeedInfo::from_numeric(DEFAULT_SEED)]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(resolve_seed_inputs(&tokens(&["banana"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["phrase:   "])).is_err());
    }
}
