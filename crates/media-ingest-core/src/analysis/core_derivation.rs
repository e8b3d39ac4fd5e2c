use super::tokenizer::{self, TokenSequence};
use crate::config::EngineSettings;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A group of primary stems in one folder that share a core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUnitCandidate {
    pub folder: String,
    pub core_tokens: TokenSequence,
    pub primary_stems: BTreeSet<String>,
}

/// Core assignment for one primary stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemCore {
    pub stem: String,
    /// Folded tokens of the whole stem.
    pub tokens: TokenSequence,
    pub core_start: usize,
    pub core_len: usize,
}

impl StemCore {
    pub fn core(&self) -> &[String] {
        &self.tokens[self.core_start..self.core_start + self.core_len]
    }

    /// Tokens outside the core run, in stem order.
    pub fn decorations(&self) -> TokenSequence {
        self.tokens[..self.core_start]
            .iter()
            .chain(&self.tokens[self.core_start + self.core_len..])
            .cloned()
            .collect()
    }

    fn next_token(&self) -> Option<&String> {
        self.tokens.get(self.core_start + self.core_len)
    }
}

/// Result of core derivation for a folder.
#[derive(Debug, Clone, Default)]
pub struct FolderCores {
    pub folder: String,
    /// Ordered by core tokens.
    pub candidates: Vec<MediaUnitCandidate>,
    /// Ordered by stem.
    pub stems: Vec<StemCore>,
}

impl FolderCores {
    pub fn stem_core(&self, stem: &str) -> Option<&StemCore> {
        self.stems
            .binary_search_by(|s| s.stem.as_str().cmp(stem))
            .ok()
            .map(|idx| &self.stems[idx])
    }

    pub fn core_for_stem(&self, stem: &str) -> Option<&[String]> {
        self.stem_core(stem).map(StemCore::core)
    }

    pub fn candidate_for_core(&self, core: &[String]) -> Option<&MediaUnitCandidate> {
        self.candidates.iter().find(|c| c.core_tokens == core)
    }
}

/// Derive the cores of a folder from its PRIMARY stems.
///
/// 1. Fold each stem and (optionally) trim structural decorations from its edges.
/// 2. Measure the longest common token prefix with the most similar other stem.
/// 3. A prefix of at least `min_core_tokens` becomes the core; a shorter one never merges
///    stems, so the stem keeps its whole significant run as its own core.
/// 4. Stems with equal cores form one candidate.
/// 5. A core that is a strict prefix of another is lengthened by the next token its
///    members agree on, until no lengthening applies.
pub fn derive_cores(folder: &str, stems: &[String], settings: &EngineSettings) -> FolderCores {
    let distinct: BTreeSet<&String> = stems.iter().collect();

    // core_start/core_len start out as the significant run
    let mut analyses: Vec<StemCore> = Vec::with_capacity(distinct.len());
    for stem in distinct {
        let tokens = tokenizer::fold(&tokenizer::tokenize(stem));
        if tokens.is_empty() {
            continue;
        }
        let (start, end) = if settings.trim_structural_decorations {
            tokenizer::significant_bounds(&tokens)
        } else {
            (0, tokens.len())
        };
        analyses.push(StemCore {
            stem: stem.clone(),
            tokens,
            core_start: start,
            core_len: end - start,
        });
    }

    let significant: Vec<TokenSequence> = analyses.iter().map(|a| a.core().to_vec()).collect();

    for (i, analysis) in analyses.iter_mut().enumerate() {
        let best = significant
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, other)| tokenizer::common_prefix_len(&significant[i], other))
            .max()
            .unwrap_or(0);
        if best >= settings.min_core_tokens {
            analysis.core_len = best;
        }
    }

    disambiguate_prefixes(&mut analyses);

    let mut grouped: BTreeMap<TokenSequence, BTreeSet<String>> = BTreeMap::new();
    for analysis in &analyses {
        grouped
            .entry(analysis.core().to_vec())
            .or_default()
            .insert(analysis.stem.clone());
    }

    let candidates: Vec<MediaUnitCandidate> = grouped
        .into_iter()
        .map(|(core_tokens, primary_stems)| MediaUnitCandidate {
            folder: folder.to_string(),
            core_tokens,
            primary_stems,
        })
        .collect();

    debug!(
        "Folder '{}': {} primary stems -> {} cores",
        folder,
        analyses.len(),
        candidates.len()
    );

    FolderCores {
        folder: folder.to_string(),
        candidates,
        stems: analyses,
    }
}

fn disambiguate_prefixes(analyses: &mut [StemCore]) {
    // Each round lengthens at least one core by one token, so the token count bounds it.
    let max_rounds: usize = analyses.iter().map(|a| a.tokens.len()).sum::<usize>() + 1;

    for _ in 0..max_rounds {
        let mut groups: BTreeMap<TokenSequence, Vec<usize>> = BTreeMap::new();
        for (idx, analysis) in analyses.iter().enumerate() {
            groups.entry(analysis.core().to_vec()).or_default().push(idx);
        }

        let mut to_lengthen: Vec<usize> = Vec::new();
        for (core, members) in &groups {
            let shadowed = groups
                .keys()
                .any(|other| other.len() > core.len() && other.starts_with(core));
            if !shadowed {
                continue;
            }
            let next: BTreeSet<Option<&String>> =
                members.iter().map(|&i| analyses[i].next_token()).collect();
            match next.into_iter().collect::<Vec<_>>().as_slice() {
                [Some(_)] => to_lengthen.extend(members),
                _ => debug!(
                    "Core {:?} stays a prefix of a longer core; members do not agree on a next token",
                    core
                ),
            }
        }

        if to_lengthen.is_empty() {
            return;
        }
        for idx in to_lengthen {
            analyses[idx].core_len += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stems(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn cores(result: &FolderCores) -> Vec<Vec<String>> {
        result
            .candidates
            .iter()
            .map(|c| c.core_tokens.clone())
            .collect()
    }

    #[test]
    fn test_isolated_stem_keeps_significant_run() {
        let result = derive_cores(
            "/in",
            &stems(&["er4q_moviename1_720p-01012025-0115"]),
            &EngineSettings::default(),
        );
        assert_eq!(cores(&result), vec![toks(&["moviename1"])]);
        let stem = result
            .stem_core("er4q_moviename1_720p-01012025-0115")
            .unwrap();
        assert_eq!(stem.decorations(), toks(&["er4q", "720p", "01012025", "0115"]));
    }

    #[test]
    fn test_isolated_stem_without_trimming_is_whole_stem() {
        let settings = EngineSettings {
            trim_structural_decorations: false,
            ..EngineSettings::default()
        };
        let result = derive_cores("/in", &stems(&["Show_720p"]), &settings);
        assert_eq!(cores(&result), vec![toks(&["show", "720p"])]);
    }

    #[test]
    fn test_shared_prefix_above_threshold_merges() {
        let result = derive_cores(
            "/in",
            &stems(&["great_movie_720p", "great_movie_1080p_remux"]),
            &EngineSettings::default(),
        );
        assert_eq!(cores(&result), vec![toks(&["great", "movie"])]);
        assert_eq!(result.candidates[0].primary_stems.len(), 2);
    }

    #[test]
    fn test_single_shared_word_does_not_merge() {
        let result = derive_cores(
            "/in",
            &stems(&["a_brown_fox_jumped_20250101", "a_white_fox_jumped_20250102"]),
            &EngineSettings::default(),
        );
        assert_eq!(
            cores(&result),
            vec![
                toks(&["a", "brown", "fox", "jumped"]),
                toks(&["a", "white", "fox", "jumped"]),
            ]
        );
    }

    #[test]
    fn test_threshold_is_configurable() {
        let settings = EngineSettings {
            min_core_tokens: 1,
            ..EngineSettings::default()
        };
        let result = derive_cores(
            "/in",
            &stems(&["a_brown_fox_jumped_20250101", "a_white_fox_jumped_20250102"]),
            &settings,
        );
        assert_eq!(cores(&result), vec![toks(&["a"])]);
    }

    #[test]
    fn test_identical_significant_runs_share_core() {
        let result = derive_cores(
            "/in",
            &stems(&["er4q_moviename1_720p-01012025-0115", "moviename1"]),
            &EngineSettings::default(),
        );
        assert_eq!(cores(&result), vec![toks(&["moviename1"])]);
        assert_eq!(result.candidates[0].primary_stems.len(), 2);
    }

    #[test]
    fn test_prefix_core_is_lengthened_with_next_token() {
        let result = derive_cores(
            "/in",
            &stems(&["holiday_720p", "holiday_beach"]),
            &EngineSettings::default(),
        );
        assert_eq!(
            cores(&result),
            vec![toks(&["holiday", "720p"]), toks(&["holiday", "beach"])]
        );
    }

    #[test]
    fn test_prefix_core_without_next_token_stays() {
        let result = derive_cores(
            "/in",
            &stems(&["holiday", "holiday_beach"]),
            &EngineSettings::default(),
        );
        assert_eq!(
            cores(&result),
            vec![toks(&["holiday"]), toks(&["holiday", "beach"])]
        );
    }

    #[test]
    fn test_determinism_independent_of_input_order() {
        let a = stems(&["show_s01e01_x264", "show_s01e02", "other_title_2020", "other_title_2021"]);
        let mut b = a.clone();
        b.reverse();
        let first = derive_cores("/in", &a, &EngineSettings::default());
        let second = derive_cores("/in", &b, &EngineSettings::default());
        assert_eq!(first.candidates, second.candidates);
        assert_eq!(first.stems, second.stems);
    }

    #[test]
    fn test_cores_are_case_folded() {
        let result = derive_cores(
            "/in",
            &stems(&["Great_Movie_A", "great_movie_b"]),
            &EngineSettings::default(),
        );
        assert_eq!(cores(&result), vec![toks(&["great", "movie"])]);
    }

    #[test]
    fn test_empty_stems_are_skipped() {
        let result = derive_cores("/in", &stems(&["--", ""]), &EngineSettings::default());
        assert!(result.candidates.is_empty());
        assert!(result.core_for_stem("--").is_none());
    }
}
