use inference::processing::{post::PostProcessor, pre::PreProcessor};
use inference::{ColorFormat, Frame, resize_frame};
use ndarray::{Array, IxDyn};

/// `[1, 6, anchors]` output with one box per `(cx, cy, w, h, class, score)`.
fn yolo_output(boxes: &[(f32, f32, f32, f32, usize, f32)], anchors: usize) -> Array<f32, IxDyn> {
    let mut output = Array::zeros(IxDyn(&[1, 6, anchors]));
    for (a, &(cx, cy, w, h, class, score)) in boxes.iter().enumerate() {
        output[[0, 0, a]] = cx;
        output[[0, 1, a]] = cy;
        output[[0, 2, a]] = w;
        output[[0, 3, a]] = h;
        output[[0, 4 + class, a]] = score;
    }
    output
}

#[test]
fn model_space_box_maps_back_to_original_frame() {
    let original = Frame::new(vec![77u8; 1920 * 1080 * 3], 1920, 1080, ColorFormat::Bgr).unwrap();

    let (resized, scale) = resize_frame(original, 416).unwrap();
    assert_eq!((resized.width(), resized.height()), (416, 234));

    let (input, letterbox) = PreProcessor::new(416).preprocess(&resized).unwrap();
    assert_eq!(input.shape(), &[1, 3, 416, 416]);
    assert_eq!(letterbox.offset_y, 91.0);

    // Box centred at (30, 121) in model input; 91px letterbox band above the frame
    let output = yolo_output(&[(30.0, 121.0, 40.0, 40.0, 1, 0.9)], 32);
    let detections = PostProcessor::new(0.7, 300)
        .parse_detections(&output.view(), 0.5, &letterbox)
        .unwrap();

    assert_eq!(detections.len(), 1);
    let d = detections[0];
    assert_eq!((d.x1, d.y1, d.x2, d.y2), (10.0, 10.0, 50.0, 50.0));

    let x1 = d.x1 * scale.scale_x;
    let y2 = d.y2 * scale.scale_y;
    assert!((x1 - 46.153_846).abs() < 1e-3);
    assert!((y2 - 230.769_23).abs() < 1e-3);
}

#[test]
fn small_frames_skip_resize_but_still_letterbox() {
    let frame = Frame::blank(320, 240);

    let (resized, scale) = resize_frame(frame.clone(), 416).unwrap();
    assert_eq!(resized, frame);
    assert_eq!((scale.scale_x, scale.scale_y), (1.0, 1.0));

    let (_, letterbox) = PreProcessor::new(416).preprocess(&resized).unwrap();
    assert!((letterbox.scale - 1.3).abs() < 1e-6);
    assert_eq!(letterbox.offset_x, 0.0);
    assert_eq!(letterbox.offset_y, 52.0);
}

#[test]
fn overlapping_candidates_collapse_to_best() {
    let (_, letterbox) = PreProcessor::new(416).preprocess(&Frame::blank(416, 416)).unwrap();
    let output = yolo_output(
        &[
            (200.0, 200.0, 100.0, 100.0, 0, 0.6),
            (202.0, 201.0, 100.0, 100.0, 0, 0.9),
            (204.0, 199.0, 98.0, 100.0, 0, 0.7),
        ],
        16,
    );

    let detections = PostProcessor::new(0.7, 300)
        .parse_detections(&output.view(), 0.5, &letterbox)
        .unwrap();

    assert_eq!(detections.len(), 1);
    assert!((detections[0].confidence - 0.9).abs() < 1e-6);
}
