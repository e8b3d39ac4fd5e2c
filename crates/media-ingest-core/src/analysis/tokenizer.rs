/// Characters that split a filename stem into tokens.
pub const SEPARATORS: [char; 8] = ['_', '-', '.', ' ', '[', ']', '(', ')'];

/// Trailing dot-delimited sidecar tags that are not part of the base name.
const SIDECAR_TAGS: [&str; 4] = ["forced", "sdh", "cc", "default"];

/// ISO 639-1 and 639-2 codes seen on subtitle and metadata sidecars.
const LANGUAGE_TAGS: [&str; 88] = [
    "ar", "ara", "bg", "bul", "cs", "ces", "cze", "da", "dan", "de", "deu", "ger", "el", "ell",
    "gre", "en", "eng", "es", "spa", "et", "est", "fa", "fas", "per", "fi", "fin", "fr", "fra",
    "fre", "he", "heb", "hi", "hin", "hr", "hrv", "hu", "hun", "id", "ind", "it", "ita", "ja",
    "jpn", "ko", "kor", "lt", "lit", "lv", "lav", "ms", "msa", "may", "nl", "nld", "dut", "no",
    "nor", "pl", "pol", "pt", "por", "ro", "ron", "rum", "ru", "rus", "sk", "slk", "slo", "sl",
    "slv", "sr", "srp", "sv", "swe", "th", "tha", "tr", "tur", "uk", "ukr", "vi", "vie", "zh",
    "zho", "chi", "und", "mul",
];

pub type TokenSequence = Vec<String>;

/// Split a stem on the separator set, dropping empties. Case is preserved.
pub fn tokenize(stem: &str) -> TokenSequence {
    stem.split(|c: char| SEPARATORS.contains(&c))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comparison form of a token sequence.
pub fn fold(tokens: &[String]) -> TokenSequence {
    tokens.iter().map(|t| t.to_lowercase()).collect()
}

/// Split a file name into `(stem, extension)`. The extension is lowercased and has no dot.
/// Dotfiles (`.hidden`) and names without a dot have an empty extension.
pub fn split_file_name(file_name: &str) -> (&str, String) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => (
            &file_name[..idx],
            file_name[idx + 1..].to_ascii_lowercase(),
        ),
        _ => (file_name, String::new()),
    }
}

/// Structural noise: digit runs (dates, times, counters) and short codes of at most four
/// ASCII alphanumerics mixing letters and digits (`720p`, `4k`, `er4q`).
pub fn is_structural_decoration(token: &str) -> bool {
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    let has_alpha = token.chars().any(|c| c.is_ascii_alphabetic());
    if has_digit && !has_alpha {
        return true;
    }
    has_digit && has_alpha && token.len() <= 4
}

/// Bounds `[start, end)` of the run left after trimming structural decorations from
/// both edges. When every token is structural the whole sequence is kept.
pub fn significant_bounds(tokens: &[String]) -> (usize, usize) {
    let start = tokens
        .iter()
        .position(|t| !is_structural_decoration(t));
    match start {
        Some(start) => {
            let end = tokens
                .iter()
                .rposition(|t| !is_structural_decoration(t))
                .map(|i| i + 1)
                .unwrap_or(tokens.len());
            (start, end)
        }
        None => (0, tokens.len()),
    }
}

/// Folded tokens of an asset stem with trailing language/tag suffixes removed, so
/// `movie.en` and `movie.eng.forced` both match on `movie`.
pub fn asset_base_tokens(stem: &str) -> TokenSequence {
    let mut base = stem;
    while let Some(idx) = base.rfind('.') {
        let suffix = &base[idx + 1..];
        if idx > 0 && is_tag_suffix(suffix) {
            base = &base[..idx];
        } else {
            break;
        }
    }
    fold(&tokenize(base))
}

fn is_tag_suffix(suffix: &str) -> bool {
    let lower = suffix.to_ascii_lowercase();
    LANGUAGE_TAGS.contains(&lower.as_str()) || SIDECAR_TAGS.contains(&lower.as_str())
}

/// True when `prefix` is a non-empty leading run of `tokens`.
pub fn starts_with_run(tokens: &[String], prefix: &[String]) -> bool {
    !prefix.is_empty() && tokens.starts_with(prefix)
}

/// True when `needle` occurs as a contiguous run inside `haystack`.
pub fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Number of leading tokens `a` and `b` share.
pub fn common_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tokenize_all_separators() {
        assert_eq!(
            tokenize("er4q_moviename1_720p-01012025-0115"),
            toks(&["er4q", "moviename1", "720p", "01012025", "0115"])
        );
        assert_eq!(
            tokenize("[Group] Show (2020).part 1"),
            toks(&["Group", "Show", "2020", "part", "1"])
        );
    }

    #[test]
    fn test_tokenize_drops_empty_and_preserves_case() {
        assert_eq!(tokenize("__A--b..C__"), toks(&["A", "b", "C"]));
        assert_eq!(tokenize("single"), toks(&["single"]));
        assert!(tokenize("").is_empty());
        assert!(tokenize("-_. []()").is_empty());
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(split_file_name("movie.en.SRT"), ("movie.en", "srt".to_string()));
        assert_eq!(split_file_name("noext"), ("noext", String::new()));
        assert_eq!(split_file_name(".hidden"), (".hidden", String::new()));
    }

    #[test]
    fn test_structural_decoration() {
        for token in ["01012025", "0115", "720p", "4k", "er4q", "x264"] {
            assert!(is_structural_decoration(token), "{token}");
        }
        for token in ["moviename1", "a", "fox", "sdfw", "s01e02", "caf\u{e9}"] {
            assert!(!is_structural_decoration(token), "{token}");
        }
    }

    #[test]
    fn test_significant_bounds() {
        let tokens = fold(&tokenize("er4q_moviename1_720p-01012025-0115"));
        assert_eq!(significant_bounds(&tokens), (1, 2));

        let all_noise = toks(&["2025", "0101"]);
        assert_eq!(significant_bounds(&all_noise), (0, 2));
    }

    #[test]
    fn test_asset_base_tokens_strips_language_suffixes() {
        assert_eq!(asset_base_tokens("movie.en"), toks(&["movie"]));
        assert_eq!(asset_base_tokens("Movie.eng.forced"), toks(&["movie"]));
        assert_eq!(
            asset_base_tokens("sdfw_moviename1-01012025-0116"),
            toks(&["sdfw", "moviename1", "01012025", "0116"])
        );
        // a lone dot-free name is never stripped
        assert_eq!(asset_base_tokens("en"), toks(&["en"]));
    }

    #[test]
    fn test_asset_base_tokens_keeps_dotted_title_words() {
        assert_eq!(asset_base_tokens("The.Fox"), toks(&["the", "fox"]));
        assert_eq!(asset_base_tokens("The.Fox.en"), toks(&["the", "fox"]));
        assert_eq!(asset_base_tokens("Big.Red.Dog.en"), toks(&["big", "red", "dog"]));
        assert_eq!(asset_base_tokens("Big.Red.Dog.ENG.sdh"), toks(&["big", "red", "dog"]));
    }

    #[test]
    fn test_starts_with_run() {
        let stem = toks(&["a", "brown", "fox", "jumped"]);
        assert!(starts_with_run(&stem, &toks(&["a", "brown"])));
        assert!(starts_with_run(&stem, &stem));
        assert!(!starts_with_run(&stem, &toks(&["fox"])));
        assert!(!starts_with_run(&stem, &[]));
    }

    #[test]
    fn test_contains_run_and_prefix() {
        let hay = toks(&["sdfw", "moviename1", "01012025"]);
        assert!(contains_run(&hay, &toks(&["moviename1"])));
        assert!(contains_run(&hay, &toks(&["sdfw", "moviename1"])));
        assert!(!contains_run(&hay, &toks(&["moviename1", "0116"])));
        assert!(!contains_run(&hay, &[]));
        assert_eq!(common_prefix_len(&toks(&["a", "b", "c"]), &toks(&["a", "b", "d"])), 2);
    }
}
