use crate::mapper::Detection;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Unknown,
    Good,
    Bad,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Unknown => "unknown",
            OverallStatus::Good => "good",
            OverallStatus::Bad => "bad",
        }
    }
}

/// One bad detection makes the whole frame bad.
pub fn reduce(detections: &[Detection]) -> OverallStatus {
    if detections.is_empty() {
        OverallStatus::Unknown
    } else if detections.iter().all(|d| d.is_good_posture) {
        OverallStatus::Good
    } else {
        OverallStatus::Bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(is_good_posture: bool) -> Detection {
        Detection {
            bbox: [0.0, 0.0, 1.0, 1.0],
            confidence: 0.9,
            class_id: is_good_posture as u32,
            class_name: String::new(),
            is_good_posture,
        }
    }

    #[test]
    fn empty_is_unknown() {
        assert_eq!(reduce(&[]), OverallStatus::Unknown);
    }

    #[test]
    fn all_good_is_good() {
        for n in 1..=10 {
            let detections = vec![detection(true); n];
            assert_eq!(reduce(&detections), OverallStatus::Good, "n = {n}");
        }
    }

    #[test]
    fn any_bad_dominates() {
        for n in 1..=10 {
            for bad_at in 0..n {
                let mut detections = vec![detection(true); n];
                detections[bad_at] = detection(false);
                assert_eq!(reduce(&detections), OverallStatus::Bad, "n = {n}, bad at {bad_at}");
            }
        }
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OverallStatus::Bad).unwrap(), "\"bad\"");
        assert_eq!(OverallStatus::Unknown.as_str(), "unknown");
    }
}
