use super::pre::LetterboxParams;
use ndarray::ArrayViewD;

/// A detection in the coordinate space of the frame passed to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

pub struct PostProcessor {
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            iou_threshold,
            max_detections,
        }
    }

    /// Parse YOLO detection head output into frame-space detections.
    ///
    /// Accepts `[1, 4 + nc, anchors]` (the Ultralytics export layout) and the
    /// transposed `[1, anchors, 4 + nc]`. Each anchor carries a cxcywh box in
    /// model input pixels followed by one score per class.
    ///
    /// The layout is inferred from the shape and assumes anchors outnumber
    /// features, which holds for any real export (thousands of anchors).
    #[tracing::instrument(skip(self, output, letterbox))]
    pub fn parse_detections(
        &self,
        output: &ArrayViewD<f32>,
        confidence_threshold: f32,
        letterbox: &LetterboxParams,
    ) -> anyhow::Result<Vec<RawDetection>> {
        let shape = output.shape();
        anyhow::ensure!(
            shape.len() == 3 && shape[0] == 1,
            "expected [1, features, anchors] output, got {:?}",
            shape
        );

        let channels_first = shape[1] <= shape[2] || shape[2] < 5;
        let (features, anchors) = if channels_first {
            (shape[1], shape[2])
        } else {
            (shape[2], shape[1])
        };
        anyhow::ensure!(
            features >= 5,
            "output has {} features, need 4 box coordinates and at least one class",
            features
        );

        let at = |anchor: usize, feature: usize| {
            if channels_first {
                output[[0, feature, anchor]]
            } else {
                output[[0, anchor, feature]]
            }
        };

        let mut candidates = Vec::new();

        for a in 0..anchors {
            let (class_idx, score) = (4..features)
                .map(|f| (f - 4, at(a, f)))
                .fold((0usize, f32::NEG_INFINITY), |best, cur| {
                    if cur.1 > best.1 { cur } else { best }
                });

            if !score.is_finite() || score < confidence_threshold {
                continue;
            }

            let (cx, cy, w, h) = (at(a, 0), at(a, 1), at(a, 2), at(a, 3));
            if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
                continue;
            }
            if w <= 0.0 || h <= 0.0 {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(cx, cy, w, h);
            candidates.push(RawDetection {
                x1,
                y1,
                x2,
                y2,
                confidence: score,
                class_id: class_idx as u32,
            });
        }

        let candidates_before_nms = candidates.len();
        let mut kept = non_max_suppression(candidates, self.iou_threshold);
        kept.truncate(self.max_detections);

        tracing::trace!(
            anchors,
            candidates_before_nms,
            kept = kept.len(),
            "Parsed detections"
        );

        Ok(kept
            .into_iter()
            .map(|d| unletterbox(d, letterbox))
            .collect())
    }
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}

/// Undo the letterbox and clamp to the source frame.
fn unletterbox(d: RawDetection, lb: &LetterboxParams) -> RawDetection {
    let max_x = lb.frame_width as f32;
    let max_y = lb.frame_height as f32;
    RawDetection {
        x1: ((d.x1 - lb.offset_x) / lb.scale).clamp(0.0, max_x),
        y1: ((d.y1 - lb.offset_y) / lb.scale).clamp(0.0, max_y),
        x2: ((d.x2 - lb.offset_x) / lb.scale).clamp(0.0, max_x),
        y2: ((d.y2 - lb.offset_y) / lb.scale).clamp(0.0, max_y),
        ..d
    }
}

fn area(d: &RawDetection) -> f32 {
    (d.x2 - d.x1).max(0.0) * (d.y2 - d.y1).max(0.0)
}

fn iou(a: &RawDetection, b: &RawDetection) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    let union = area(a) + area(b) - inter;
    if union > f32::EPSILON { inter / union } else { 0.0 }
}

/// Class-aware greedy NMS. Output is sorted by descending confidence.
fn non_max_suppression(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::with_capacity(detections.len().min(64));
    for det in detections {
        let overlaps = kept
            .iter()
            .any(|k| k.class_id == det.class_id && iou(k, &det) > iou_threshold);
        if !overlaps {
            kept.push(det);
        }
    }
    kept
}
