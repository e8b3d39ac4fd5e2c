use super::core_derivation::FolderCores;
use super::tokenizer::TokenSequence;
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeMap;
use std::fmt;

/// Whether a decoration token shows up across units of the folder or in just one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationScope {
    Recurring,
    Local,
}

impl fmt::Display for DecorationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecorationScope::Recurring => f.write_str("recurring"),
            DecorationScope::Local => f.write_str("local"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub token: String,
    pub scope: DecorationScope,
}

/// Decorations of each member stem of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDecorations {
    pub core_tokens: TokenSequence,
    pub per_stem: BTreeMap<String, Vec<Decoration>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDecorations {
    pub folder: String,
    pub units: Vec<UnitDecorations>,
    /// (token, number of units whose decorations contain it), most frequent first.
    pub token_unit_counts: Vec<(String, usize)>,
}

impl FolderDecorations {
    pub fn scope_of(&self, token: &str) -> Option<DecorationScope> {
        self.token_unit_counts
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, count)| scope_for_count(*count))
    }

    pub fn recurring_tokens(&self) -> Vec<&str> {
        self.token_unit_counts
            .iter()
            .filter(|(_, count)| *count >= 2)
            .map(|(t, _)| t.as_str())
            .collect()
    }
}

fn scope_for_count(unit_count: usize) -> DecorationScope {
    if unit_count >= 2 {
        DecorationScope::Recurring
    } else {
        DecorationScope::Local
    }
}

/// Split every member stem into core + decorations and tag each decoration token as
/// recurring (in two or more units of the folder) or local.
pub fn extract_decorations(cores: &FolderCores) -> FolderDecorations {
    let mut raw: Vec<(TokenSequence, BTreeMap<String, TokenSequence>)> = Vec::new();
    let mut unit_counts: AHashMap<String, usize> = AHashMap::new();

    for candidate in &cores.candidates {
        let mut per_stem: BTreeMap<String, TokenSequence> = BTreeMap::new();
        let mut unit_tokens: AHashSet<String> = AHashSet::new();
        for stem in &candidate.primary_stems {
            if let Some(stem_core) = cores.stem_core(stem) {
                let decorations = stem_core.decorations();
                unit_tokens.extend(decorations.iter().cloned());
                per_stem.insert(stem.clone(), decorations);
            }
        }
        for token in unit_tokens {
            *unit_counts.entry(token).or_default() += 1;
        }
        raw.push((candidate.core_tokens.clone(), per_stem));
    }

    let units = raw
        .into_iter()
        .map(|(core_tokens, per_stem)| UnitDecorations {
            core_tokens,
            per_stem: per_stem
                .into_iter()
                .map(|(stem, tokens)| {
                    let tagged = tokens
                        .into_iter()
                        .map(|token| {
                            let count = unit_counts.get(&token).copied().unwrap_or(0);
                            Decoration {
                                token,
                                scope: scope_for_count(count),
                            }
                        })
                        .collect();
                    (stem, tagged)
                })
                .collect(),
        })
        .collect();

    let mut token_unit_counts: Vec<(String, usize)> = unit_counts.into_iter().collect();
    token_unit_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    FolderDecorations {
        folder: cores.folder.clone(),
        units,
        token_unit_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::core_derivation::derive_cores;
    use crate::config::EngineSettings;

    fn stems(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recurring_vs_local() {
        let cores = derive_cores(
            "/in",
            &stems(&[
                "first_title_uploader",
                "first_title_extra",
                "second_film_uploader",
                "second_film_misc",
            ]),
            &EngineSettings::default(),
        );
        let decorations = extract_decorations(&cores);
        assert_eq!(decorations.units.len(), 2);
        assert_eq!(decorations.scope_of("uploader"), Some(DecorationScope::Recurring));
        assert_eq!(decorations.scope_of("extra"), Some(DecorationScope::Local));
        assert_eq!(decorations.scope_of("nonexistent"), None);
        assert_eq!(decorations.recurring_tokens(), vec!["uploader"]);
    }

    #[test]
    fn test_tokens_repeated_inside_one_unit_stay_local() {
        let cores = derive_cores(
            "/in",
            &stems(&["great_movie_hdrip_proper", "great_movie_webrip_hdrip"]),
            &EngineSettings::default(),
        );
        let decorations = extract_decorations(&cores);
        assert_eq!(decorations.units.len(), 1);
        assert_eq!(decorations.scope_of("hdrip"), Some(DecorationScope::Local));
        let unit = &decorations.units[0];
        let tokens: Vec<&str> = unit.per_stem["great_movie_hdrip_proper"]
            .iter()
            .map(|d| d.token.as_str())
            .collect();
        assert_eq!(tokens, vec!["hdrip", "proper"]);
    }

    #[test]
    fn test_leading_trimmed_tokens_are_decorations() {
        let cores = derive_cores(
            "/in",
            &stems(&["er4q_moviename1_720p-01012025-0115"]),
            &EngineSettings::default(),
        );
        let decorations = extract_decorations(&cores);
        let tokens: Vec<&str> = decorations.units[0].per_stem["er4q_moviename1_720p-01012025-0115"]
            .iter()
            .map(|d| d.token.as_str())
            .collect();
        assert_eq!(tokens, vec!["er4q", "720p", "01012025", "0115"]);
    }

    #[test]
    fn test_counts_sorted_by_frequency_then_token() {
        let cores = derive_cores(
            "/in",
            &stems(&["alpha_one_x_z", "alpha_one_q", "beta_two_x_z", "beta_two_r"]),
            &EngineSettings::default(),
        );
        let decorations = extract_decorations(&cores);
        let order: Vec<&str> = decorations
            .token_unit_counts
            .iter()
            .map(|(t, _)| t.as_str())
            .collect();
        assert_eq!(order, vec!["x", "z", "q", "r"]);
    }
}
