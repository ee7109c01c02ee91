//! Layout inference and confidence resolution over whole tensors.

use framescan::decode::{OutputDecoder, OutputTensor, TensorGeometry, TensorLayout};
use framescan::{Candidate, Letterbox};

/// Builds a box-first buffer from per-box feature rows.
///
/// Zero-size filler boxes keep the box axis longer than the feature axis;
/// the decoder discards them.
fn box_first(rows: &[Vec<f32>]) -> OutputTensor {
    let features = rows[0].len();
    let mut rows = rows.to_vec();
    while rows.len() <= features {
        rows.push(vec![0.0; features]);
    }
    let data = rows.iter().flatten().copied().collect();
    OutputTensor::new([1, rows.len(), features], data).unwrap()
}

/// Builds the channel-first transpose of the same rows.
fn channel_first(rows: &[Vec<f32>]) -> OutputTensor {
    let features = rows[0].len();
    let mut data = Vec::with_capacity(rows.len() * features);
    for f in 0..features {
        for row in rows {
            data.push(row[f]);
        }
    }
    OutputTensor::new([1, features, rows.len()], data).unwrap()
}

/// Rows with 4 geometry values and `classes` class scores, more boxes than features.
fn yolo_rows(boxes: usize, classes: usize) -> Vec<Vec<f32>> {
    (0..boxes)
        .map(|i| {
            let mut row = vec![
                40.0 + 30.0 * (i % 15) as f32,
                50.0 + 25.0 * (i / 15) as f32,
                20.0 + i as f32,
                18.0 + (i % 7) as f32,
            ];
            for c in 0..classes {
                let score = if c == i % classes { 0.3 + 0.005 * i as f32 } else { 0.01 };
                row.push(score);
            }
            row
        })
        .collect()
}

fn decode(tensor: &OutputTensor, min_conf: f32) -> Vec<Candidate> {
    OutputDecoder::new(min_conf).decode(tensor, &Letterbox::compute(640, 640, 640))
}

#[test]
fn yolov8_shape_is_channel_first() {
    let geometry = TensorGeometry::infer([1, 84, 8400]);
    assert_eq!(geometry.layout, TensorLayout::ChannelFirst);
    assert!(geometry.is_decodable());
}

#[test]
fn transposed_layouts_decode_identically() {
    let rows = yolo_rows(120, 80);
    let a = decode(&channel_first(&rows), 0.25);
    let b = decode(&box_first(&rows), 0.25);
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn objectness_column_keeps_geometry_and_confidence() {
    // The layouts agree only while objectness stays below each box's best
    // class score: the class-score reading then wins with the same
    // confidence and class ids shift by the extra column. A higher
    // objectness (e.g. 0.9) would be read as class 0 instead.
    let rows = yolo_rows(100, 80);
    let with_objectness: Vec<Vec<f32>> = rows
        .iter()
        .map(|row| {
            let mut out = row[..4].to_vec();
            out.push(0.2);
            out.extend_from_slice(&row[4..]);
            out
        })
        .collect();

    let plain = decode(&channel_first(&rows), 0.25);
    let objectness = decode(&box_first(&with_objectness), 0.25);
    assert_eq!(plain.len(), objectness.len());
    for row in &with_objectness {
        let best_class = row[5..].iter().copied().fold(f32::MIN, f32::max);
        assert!(row[4] < best_class);
    }
    for (a, b) in plain.iter().zip(&objectness) {
        assert_eq!(a.bounds, b.bounds);
        assert!((a.confidence - b.confidence).abs() < 1e-6);
        assert_eq!(a.class_id + 1, b.class_id);
    }
}

#[test]
fn confident_objectness_reads_as_first_class() {
    // Normalized objectness above every class score wins the class-score
    // reading at slot 4, so the box is labelled class 0.
    let rows = vec![vec![100.0, 100.0, 10.0, 10.0, 0.9, 0.2, 0.6]];
    let out = decode(&box_first(&rows), 0.1);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].class_id, 0);
    assert!((out[0].confidence - 0.9).abs() < 1e-6);
}

#[test]
fn five_features_yield_nothing() {
    let tensor = OutputTensor::new([1, 5, 10], vec![0.9; 50]).unwrap();
    assert!(decode(&tensor, 0.0).is_empty());
}

#[test]
fn non_positive_sizes_are_discarded() {
    let rows = vec![
        vec![100.0, 100.0, 0.0, 10.0, 0.9, 0.1],
        vec![100.0, 100.0, 10.0, -1.0, 0.9, 0.1],
        vec![100.0, 100.0, 10.0, 10.0, 0.9, 0.1],
    ];
    let out = decode(&box_first(&rows), 0.1);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].bounds.width, 10);
}

#[test]
fn confidences_are_clamped_before_threshold() {
    let rows = vec![
        vec![100.0, 100.0, 10.0, 10.0, 7.5, 0.1],
        vec![200.0, 200.0, 10.0, 10.0, 0.2, 0.1],
    ];
    let out = decode(&box_first(&rows), 0.5);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].confidence, 1.0);
}

#[test]
fn label_count_limits_objectness_classes() {
    // Objectness reading would pick slot 6 (class 1) with 2.0 * 3.0; with a
    // single known label that class is invalid and the plain reading wins.
    let rows = vec![vec![100.0, 100.0, 10.0, 10.0, 2.0, 1.5, 3.0]];
    let tensor = box_first(&rows);
    let lb = Letterbox::compute(640, 640, 640);

    let open = OutputDecoder::new(0.1).decode(&tensor, &lb);
    assert_eq!(open[0].class_id, 1);

    let labelled = OutputDecoder::new(0.1).with_class_count(1).decode(&tensor, &lb);
    assert_eq!(labelled[0].class_id, 2);
}

#[test]
fn boxes_collapsing_below_one_pixel_are_dropped() {
    // Entirely inside the left padding of a 1000x500 frame's letterbox.
    let lb = Letterbox::compute(500, 1000, 640);
    let rows = vec![vec![50.0, 300.0, 20.0, 20.0, 0.9, 0.1]];
    let out = OutputDecoder::new(0.1).decode(&box_first(&rows), &lb);
    assert!(out.is_empty());
}
