use crate::storage::models::MediaUnit;

/// Outcome of comparing an incoming fingerprint against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintMatch<'a> {
    /// Nothing to compare, or no unit carries this fingerprint. Fall back to name heuristics.
    Fallback,
    /// Same content at the same path: repetition noise.
    SamePath(&'a MediaUnit),
    /// Same content, new location.
    Moved(&'a MediaUnit),
    /// Several units claim the same content.
    MultipleUnits(usize),
}

/// Look the fingerprint up across all units. Content identity is not folder scoped.
pub fn match_fingerprint<'a, I>(fingerprint: Option<&str>, path: &str, units: I) -> FingerprintMatch<'a>
where
    I: IntoIterator<Item = &'a MediaUnit>,
{
    let fingerprint = match fingerprint {
        Some(fp) if !fp.is_empty() => fp,
        _ => return FingerprintMatch::Fallback,
    };

    let matches: Vec<&MediaUnit> = units
        .into_iter()
        .filter(|unit| unit.fingerprint.as_deref() == Some(fingerprint))
        .collect();

    match matches.as_slice() {
        [] => FingerprintMatch::Fallback,
        [unit] if unit.current_path == path => FingerprintMatch::SamePath(unit),
        [unit] => FingerprintMatch::Moved(unit),
        many => FingerprintMatch::MultipleUnits(many.len()),
    }
}
