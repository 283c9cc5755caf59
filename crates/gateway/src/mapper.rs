use inference::{RawDetection, ScaleFactors};
use serde::{Deserialize, Serialize};

/// Taxonomy position of the "good posture" class.
pub const GOOD_POSTURE_CLASS_ID: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// `[x1, y1, x2, y2]` in original-frame pixels
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: u32,
    pub class_name: String,
    pub is_good_posture: bool,
}

pub fn class_name(classes: &[String], class_id: u32) -> String {
    classes
        .get(class_id as usize)
        .cloned()
        .unwrap_or_else(|| format!("Class {}", class_id))
}

/// Rescale detections from the resized frame back to the submitted frame and label them.
pub fn map_to_original(
    raw: &[RawDetection],
    scale: ScaleFactors,
    classes: &[String],
) -> Vec<Detection> {
    raw.iter()
        .map(|d| Detection {
            bbox: [
                d.x1 * scale.scale_x,
                d.y1 * scale.scale_y,
                d.x2 * scale.scale_x,
                d.y2 * scale.scale_y,
            ],
            confidence: d.confidence,
            class_id: d.class_id,
            class_name: class_name(classes, d.class_id),
            is_good_posture: d.class_id == GOOD_POSTURE_CLASS_ID,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["Bad Sitting Posture".into(), "Good Sitting Posture".into()]
    }

    fn raw(x1: f32, y1: f32, x2: f32, y2: f32, class_id: u32) -> RawDetection {
        RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.8,
            class_id,
        }
    }

    #[test]
    fn scales_each_axis_independently() {
        let scale = ScaleFactors {
            scale_x: 1920.0 / 416.0,
            scale_y: 1080.0 / 234.0,
        };
        let mapped = map_to_original(&[raw(10.0, 10.0, 50.0, 50.0, 1)], scale, &classes());

        assert_eq!(
            mapped[0].bbox,
            [
                10.0 * scale.scale_x,
                10.0 * scale.scale_y,
                50.0 * scale.scale_x,
                50.0 * scale.scale_y
            ]
        );
    }

    #[test]
    fn mapping_is_linear_per_axis() {
        let scale = ScaleFactors {
            scale_x: 2.5,
            scale_y: 4.0,
        };
        for &(x, y) in &[(0.0f32, 0.0f32), (1.0, 3.0), (100.0, 7.5), (415.0, 233.0)] {
            let mapped = map_to_original(&[raw(x, y, x + 1.0, y + 1.0, 0)], scale, &classes());
            let [x1, y1, x2, y2] = mapped[0].bbox;
            assert_eq!((x1, y1), (x * 2.5, y * 4.0));
            assert_eq!((x2, y2), ((x + 1.0) * 2.5, (y + 1.0) * 4.0));
        }
    }

    #[test]
    fn identity_scale_leaves_boxes_untouched() {
        let d = raw(1.5, 2.5, 30.0, 40.0, 0);
        let mapped = map_to_original(&[d], ScaleFactors::IDENTITY, &classes());
        assert_eq!(mapped[0].bbox, [1.5, 2.5, 30.0, 40.0]);
        assert_eq!(mapped[0].confidence, 0.8);
    }

    #[test]
    fn labels_from_taxonomy() {
        let mapped = map_to_original(
            &[raw(0.0, 0.0, 1.0, 1.0, 0), raw(0.0, 0.0, 1.0, 1.0, 1)],
            ScaleFactors::IDENTITY,
            &classes(),
        );

        assert_eq!(mapped[0].class_name, "Bad Sitting Posture");
        assert!(!mapped[0].is_good_posture);
        assert_eq!(mapped[1].class_name, "Good Sitting Posture");
        assert!(mapped[1].is_good_posture);
    }

    #[test]
    fn unknown_class_gets_fallback_label() {
        let mapped = map_to_original(&[raw(0.0, 0.0, 1.0, 1.0, 5)], ScaleFactors::IDENTITY, &classes());

        assert_eq!(mapped[0].class_name, "Class 5");
        assert!(!mapped[0].is_good_posture);
    }

    #[test]
    fn good_posture_follows_position_not_name() {
        let renamed = vec!["upright".to_string(), "slouching".to_string()];
        let mapped = map_to_original(&[raw(0.0, 0.0, 1.0, 1.0, 1)], ScaleFactors::IDENTITY, &renamed);

        assert_eq!(mapped[0].class_name, "slouching");
        assert!(mapped[0].is_good_posture);
    }

    #[test]
    fn preserves_order() {
        let input: Vec<_> = (0..4).map(|i| raw(i as f32, 0.0, 10.0, 10.0, 0)).collect();
        let mapped = map_to_original(&input, ScaleFactors::IDENTITY, &classes());
        let xs: Vec<f32> = mapped.iter().map(|d| d.bbox[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
    }
}
