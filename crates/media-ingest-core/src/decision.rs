use std::fmt;

/// Every outcome the classifier can reach for one ingest record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classification {
    PrimaryNewUnit,
    PrimaryUpdate,
    PrimaryAlternate,
    PrimaryAmbiguous,
    PrimaryPathUpdate,
    AssetAttach,
    AssetAmbiguous,
    AssetOrphan,
    Noise,
    Ignored,
}

impl Classification {
    pub const ALL: [Classification; 10] = [
        Classification::PrimaryNewUnit,
        Classification::PrimaryUpdate,
        Classification::PrimaryAlternate,
        Classification::PrimaryAmbiguous,
        Classification::PrimaryPathUpdate,
        Classification::AssetAttach,
        Classification::AssetAmbiguous,
        Classification::AssetOrphan,
        Classification::Noise,
        Classification::Ignored,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::PrimaryNewUnit => "primary:new_unit",
            Classification::PrimaryUpdate => "primary:update",
            Classification::PrimaryAlternate => "primary:alternate",
            Classification::PrimaryAmbiguous => "primary:ambiguous",
            Classification::PrimaryPathUpdate => "primary:path_update",
            Classification::AssetAttach => "asset:attach",
            Classification::AssetAmbiguous => "asset:ambiguous",
            Classification::AssetOrphan => "asset:orphan",
            Classification::Noise => "noise",
            Classification::Ignored => "ignored",
        }
    }

    /// Definite verdicts settle the record; the rest wait for more data.
    pub fn is_definite(self) -> bool {
        !matches!(
            self,
            Classification::PrimaryAmbiguous
                | Classification::AssetAmbiguous
                | Classification::AssetOrphan
        )
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-checkable justification attached to every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReasonCode {
    NoUnitWithCore,
    CoreMatchSameExtension,
    CoreMatchNewExtension,
    MultipleUnitsShareCore,
    SingleCoreMatch,
    MultipleCoreMatches,
    NoPrimaryCoreMatch,
    FingerprintSamePath,
    FingerprintNewPath,
    FingerprintMultipleUnits,
    FingerprintCoreConflict,
    UnsupportedExtension,
    MalformedStem,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::NoUnitWithCore => "no_unit_with_core",
            ReasonCode::CoreMatchSameExtension => "core_match_same_extension",
            ReasonCode::CoreMatchNewExtension => "core_match_new_extension",
            ReasonCode::MultipleUnitsShareCore => "multiple_units_share_core",
            ReasonCode::SingleCoreMatch => "single_core_match",
            ReasonCode::MultipleCoreMatches => "multiple_core_matches",
            ReasonCode::NoPrimaryCoreMatch => "no_primary_core_match",
            ReasonCode::FingerprintSamePath => "fingerprint_same_path",
            ReasonCode::FingerprintNewPath => "fingerprint_new_path",
            ReasonCode::FingerprintMultipleUnits => "fingerprint_multiple_units",
            ReasonCode::FingerprintCoreConflict => "fingerprint_core_conflict",
            ReasonCode::UnsupportedExtension => "unsupported_extension",
            ReasonCode::MalformedStem => "malformed_stem",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only decision trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub ingest_id: i64,
    pub classification: Classification,
    pub reason_code: ReasonCode,
    pub subject_path: String,
    pub target_unit_id: Option<i64>,
}

impl Decision {
    pub fn new(
        ingest_id: i64,
        classification: Classification,
        reason_code: ReasonCode,
        subject_path: impl Into<String>,
    ) -> Self {
        Self {
            ingest_id,
            classification,
            reason_code,
            subject_path: subject_path.into(),
            target_unit_id: None,
        }
    }

    pub fn with_target(mut self, unit_id: i64) -> Self {
        self.target_unit_id = Some(unit_id);
        self
    }
}

/// `DECISION <classification> path=<path> [target=<unit-id>] reason=<reason_code>`
impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DECISION {} path={}", self.classification, self.subject_path)?;
        if let Some(target) = self.target_unit_id {
            write!(f, " target={}", target)?;
        }
        write!(f, " reason={}", self.reason_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_line_with_target() {
        let decision = Decision::new(
            7,
            Classification::AssetAttach,
            ReasonCode::SingleCoreMatch,
            "/inbox/movie/moviename1.nfo",
        )
        .with_target(3);
        assert_eq!(
            decision.to_string(),
            "DECISION asset:attach path=/inbox/movie/moviename1.nfo target=3 reason=single_core_match"
        );
    }

    #[test]
    fn test_decision_line_without_target() {
        let decision = Decision::new(
            1,
            Classification::AssetOrphan,
            ReasonCode::NoPrimaryCoreMatch,
            "/inbox/poster.jpg",
        );
        assert_eq!(
            decision.to_string(),
            "DECISION asset:orphan path=/inbox/poster.jpg reason=no_primary_core_match"
        );
    }

    #[test]
    fn test_classification_labels_are_unique() {
        let mut labels: Vec<&str> = Classification::ALL.iter().map(|c| c.as_str()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), Classification::ALL.len());
    }
}
