//! Distance matching of a live embedding against the enrolled gallery.

use crate::enrollment::EnrolledFace;
use crate::shared::embedding::Embedding;

/// How a qualifying enrolled face is selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Grant on the first enrolled face whose distance is strictly under
    /// the threshold, in enumeration order. Not necessarily the closest
    /// match; a face earlier in the gallery wins over a closer later one.
    #[default]
    FirstUnderThreshold,
    /// Scan the whole gallery and grant the minimum-distance face, if it
    /// is strictly under the threshold.
    Closest,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MatchDecision {
    Granted { label: String },
    Denied,
}

/// Compare `probe` against every enrolled face.
///
/// An empty gallery is always `Denied`. The threshold comparison is
/// strict (`distance < threshold`).
pub fn match_gallery(
    probe: &Embedding,
    gallery: &[EnrolledFace],
    threshold: f32,
    policy: MatchPolicy,
) -> MatchDecision {
    match policy {
        MatchPolicy::FirstUnderThreshold => {
            for face in gallery {
                let distance = probe.euclidean_distance(&face.embedding);
                log::debug!("comparing to {} | distance: {distance:.4}", face.label);
                if distance < threshold {
                    return MatchDecision::Granted {
                        label: face.label.clone(),
                    };
                }
            }
            MatchDecision::Denied
        }
        MatchPolicy::Closest => {
            let mut best: Option<(f32, &EnrolledFace)> = None;
            for face in gallery {
                let distance = probe.euclidean_distance(&face.embedding);
                log::debug!("comparing to {} | distance: {distance:.4}", face.label);
                if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                    best = Some((distance, face));
                }
            }
            match best {
                Some((distance, face)) if distance < threshold => MatchDecision::Granted {
                    label: face.label.clone(),
                },
                _ => MatchDecision::Denied,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn face(label: &str, values: &[f32]) -> EnrolledFace {
        EnrolledFace {
            label: label.to_string(),
            embedding: Embedding::new(values.to_vec()),
        }
    }

    #[test]
    fn test_granted_for_single_close_face() {
        let gallery = vec![face("alice.jpg", &[1.0, 1.0, 1.0])];
        let probe = Embedding::new(vec![1.5, 1.0, 1.0]);
        let decision = match_gallery(&probe, &gallery, 10.0, MatchPolicy::FirstUnderThreshold);
        assert_eq!(
            decision,
            MatchDecision::Granted {
                label: "alice.jpg".into()
            }
        );
    }

    #[test]
    fn test_denied_when_all_distances_at_or_over_threshold() {
        let gallery = vec![face("alice.jpg", &[0.0, 0.0]), face("bob.jpg", &[100.0, 0.0])];
        // Distance to alice is exactly the threshold; strict comparison denies.
        let probe = Embedding::new(vec![10.0, 0.0]);
        let decision = match_gallery(&probe, &gallery, 10.0, MatchPolicy::FirstUnderThreshold);
        assert_eq!(decision, MatchDecision::Denied);
    }

    #[rstest]
    #[case(MatchPolicy::FirstUnderThreshold)]
    #[case(MatchPolicy::Closest)]
    fn test_empty_gallery_is_denied(#[case] policy: MatchPolicy) {
        let probe = Embedding::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(match_gallery(&probe, &[], 10.0, policy), MatchDecision::Denied);
    }

    #[test]
    fn test_first_under_threshold_wins_over_closer_later_face() {
        // Both qualify; the second is strictly closer, yet the first is
        // returned. Pins the enumeration-order policy.
        let gallery = vec![face("first.jpg", &[5.0, 0.0]), face("second.jpg", &[1.0, 0.0])];
        let probe = Embedding::new(vec![0.0, 0.0]);
        let decision = match_gallery(&probe, &gallery, 10.0, MatchPolicy::FirstUnderThreshold);
        assert_eq!(
            decision,
            MatchDecision::Granted {
                label: "first.jpg".into()
            }
        );
    }

    #[test]
    fn test_closest_policy_picks_minimum_distance() {
        let gallery = vec![face("first.jpg", &[5.0, 0.0]), face("second.jpg", &[1.0, 0.0])];
        let probe = Embedding::new(vec![0.0, 0.0]);
        let decision = match_gallery(&probe, &gallery, 10.0, MatchPolicy::Closest);
        assert_eq!(
            decision,
            MatchDecision::Granted {
                label: "second.jpg".into()
            }
        );
    }

    #[test]
    fn test_closest_policy_denies_when_minimum_not_under_threshold() {
        let gallery = vec![face("a.jpg", &[50.0, 0.0]), face("b.jpg", &[20.0, 0.0])];
        let probe = Embedding::new(vec![0.0, 0.0]);
        let decision = match_gallery(&probe, &gallery, 10.0, MatchPolicy::Closest);
        assert_eq!(decision, MatchDecision::Denied);
    }

    #[test]
    fn test_identical_embedding_is_granted() {
        let gallery = vec![face("alice.jpg", &[3.0, -1.0, 2.0])];
        let probe = Embedding::new(vec![3.0, -1.0, 2.0]);
        let decision = match_gallery(&probe, &gallery, 10.0, MatchPolicy::FirstUnderThreshold);
        assert!(matches!(decision, MatchDecision::Granted { .. }));
    }
}
