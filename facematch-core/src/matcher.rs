use std::fmt;

use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::{InputError, MatchError};

/// Distances closer than this are treated as a tie, and the earlier reference wins.
pub const TIE_EPSILON: f32 = f32::EPSILON;

/// Distance assumed to carry no resemblance at all, used for the confidence display.
pub const MAX_MEANINGFUL_DISTANCE: f32 = 1.0;

/// A known identity and the embedding it is recognized by
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub identity: String,
    pub embedding: Embedding,
    /// Opaque pointer to where the reference came from (e.g. an image URL)
    pub source_ref: String,
}

impl Reference {
    pub fn new(
        identity: impl Into<String>,
        embedding: Embedding,
        source_ref: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            embedding,
            source_ref: source_ref.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Identity {
    Known(String),
    Unknown,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Known(name) => f.write_str(name),
            Identity::Unknown => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub identity: Identity,
    /// Smallest distance found; `f32::INFINITY` when there were no references.
    pub distance: f32,
}

impl MatchResult {
    pub fn is_known(&self) -> bool {
        matches!(self.identity, Identity::Known(_))
    }

    pub fn confidence(&self) -> f32 {
        confidence(self.distance)
    }
}

/// Distance at or above which a query is classified as unknown
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Threshold(f32);

impl Threshold {
    /// Default used when nothing is configured
    pub const DEFAULT: Threshold = Threshold(0.5);

    pub fn new(value: f32) -> Result<Self, InputError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(InputError::InvalidThreshold(value))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Threshold {
    type Error = InputError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for f32 {
    fn from(t: Threshold) -> f32 {
        t.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Classify `query` as the nearest reference, or `Unknown` when nothing is
/// strictly closer than `threshold`.
///
/// References are scanned in order; on equal distance (within
/// [`TIE_EPSILON`]) the earlier one is kept. A reference whose dimension
/// differs from the query fails the whole call with
/// [`MatchError::DimensionMismatch`].
///
/// The tie rule runs before the threshold check. An earlier reference lying
/// exactly on the threshold therefore wins over a later one closer by less
/// than [`TIE_EPSILON`], and the result is `Unknown` at the earlier distance.
pub fn find_match(
    query: &Embedding,
    references: &[Reference],
    threshold: Threshold,
) -> Result<MatchResult, MatchError> {
    let expected = query.dim();
    let mut best_distance = f32::INFINITY;
    let mut best: Option<&Reference> = None;

    for (index, reference) in references.iter().enumerate() {
        let found = reference.embedding.dim();
        if found != expected {
            return Err(MatchError::DimensionMismatch {
                index,
                expected,
                found,
            });
        }

        let distance = query.euclidean_distance(&reference.embedding);
        if distance < best_distance && best_distance - distance > TIE_EPSILON {
            best_distance = distance;
            best = Some(reference);
        }
    }

    let identity = match best {
        Some(r) if best_distance < threshold.get() => Identity::Known(r.identity.clone()),
        _ => Identity::Unknown,
    };

    Ok(MatchResult {
        identity,
        distance: best_distance,
    })
}

/// Display confidence in percent: `(1 - distance) * 100`, clamped to `[0, 100]`.
pub fn confidence(distance: f32) -> f32 {
    let pct = (MAX_MEANINGFUL_DISTANCE - distance).max(0.0) / MAX_MEANINGFUL_DISTANCE * 100.0;
    pct.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(v: &[f32]) -> Embedding {
        Embedding::new(v.to_vec()).unwrap()
    }

    fn t(v: f32) -> Threshold {
        Threshold::new(v).unwrap()
    }

    #[test]
    fn test_threshold_validation() {
        assert!(Threshold::new(0.5).is_ok());
        assert_eq!(Threshold::new(0.0), Err(InputError::InvalidThreshold(0.0)));
        assert!(Threshold::new(-1.0).is_err());
        assert!(Threshold::new(f32::NAN).is_err());
        assert!(Threshold::new(f32::INFINITY).is_err());
    }

    #[test]
    fn test_empty_references_unknown() {
        let result = find_match(&emb(&[0.0, 0.0]), &[], t(0.5)).unwrap();
        assert_eq!(result.identity, Identity::Unknown);
        assert!(result.distance >= 0.5);
        assert!(result.distance.is_infinite());
    }

    #[test]
    fn test_nearest_wins_regardless_of_position() {
        let refs = vec![
            Reference::new("far", emb(&[0.4, 0.0]), "a.png"),
            Reference::new("near", emb(&[0.1, 0.0]), "b.png"),
            Reference::new("mid", emb(&[0.2, 0.0]), "c.png"),
        ];
        let result = find_match(&emb(&[0.0, 0.0]), &refs, t(0.5)).unwrap();
        assert_eq!(result.identity, Identity::Known("near".into()));
        assert!((result.distance - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_near_tie_keeps_first() {
        let a = 0.1f32;
        // one ulp closer than `a`, well inside TIE_EPSILON
        let b = f32::from_bits(a.to_bits() - 1);
        let refs = vec![
            Reference::new("A", emb(&[a, 0.0]), ""),
            Reference::new("B", emb(&[b, 0.0]), ""),
        ];
        let result = find_match(&emb(&[0.0, 0.0]), &refs, t(0.5)).unwrap();
        assert_eq!(result.identity, Identity::Known("A".into()));
        assert_eq!(result.distance, a);
    }

    #[test]
    fn test_tie_resolved_before_threshold() {
        let on = 0.5f32;
        let below = f32::from_bits(on.to_bits() - 1);
        let refs = vec![
            Reference::new("A", emb(&[on, 0.0]), ""),
            Reference::new("B", emb(&[below, 0.0]), ""),
        ];
        let result = find_match(&emb(&[0.0, 0.0]), &refs, t(0.5)).unwrap();
        assert_eq!(result.identity, Identity::Unknown);
        assert_eq!(result.distance, on);

        // in the other order the closer one comes first and matches
        let refs = vec![refs[1].clone(), refs[0].clone()];
        let result = find_match(&emb(&[0.0, 0.0]), &refs, t(0.5)).unwrap();
        assert_eq!(result.identity, Identity::Known("B".into()));
        assert_eq!(result.distance, below);
    }

    #[test]
    fn test_mismatch_reports_index() {
        let refs = vec![
            Reference::new("A", emb(&[0.0, 0.0]), ""),
            Reference::new("B", emb(&[0.0, 0.0, 0.0]), ""),
        ];
        let err = find_match(&emb(&[0.0, 0.0]), &refs, t(0.5)).unwrap_err();
        assert_eq!(
            err,
            MatchError::DimensionMismatch {
                index: 1,
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_confidence() {
        assert_eq!(confidence(0.0), 100.0);
        assert!((confidence(0.25) - 75.0).abs() < 1e-4);
        assert_eq!(confidence(1.0), 0.0);
        assert_eq!(confidence(3.0), 0.0);
        assert_eq!(confidence(f32::INFINITY), 0.0);
        // negative distances never occur, but the display stays in range
        assert_eq!(confidence(-0.5), 100.0);
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(Identity::Known("Rahim".into()).to_string(), "Rahim");
        assert_eq!(Identity::Unknown.to_string(), "Unknown");
    }
}
