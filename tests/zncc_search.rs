//! Coarse-to-fine ZNCC search on synthetic images.

use framescan::search::{find_best, ZnccConfig};
use framescan::ImageView;

/// Blocky pseudo-random texture that survives 2x2 downsampling.
fn textured(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let (bx, by) = ((x / 4) as u32, (y / 4) as u32);
            let h = bx.wrapping_mul(73_856_093) ^ by.wrapping_mul(19_349_663);
            data.push((h % 251) as u8);
        }
    }
    data
}

fn crop(data: &[u8], stride: usize, x0: usize, y0: usize, w: usize, h: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(w * h);
    for y in y0..y0 + h {
        out.extend_from_slice(&data[y * stride + x0..y * stride + x0 + w]);
    }
    out
}

#[test]
fn pyramid_search_recovers_patch_location() {
    let (w, h) = (160, 120);
    let image = textured(w, h);
    let tpl = crop(&image, w, 48, 32, 32, 24);

    let best = find_best(
        ImageView::from_slice(&image, w, h).unwrap(),
        ImageView::from_slice(&tpl, 32, 24).unwrap(),
        &ZnccConfig::default(),
        0.8,
    )
    .unwrap()
    .expect("patch should be found");

    assert_eq!((best.x, best.y), (48, 32));
    assert!(best.score > 0.99);
}

#[test]
fn threshold_filters_weak_matches() {
    let (w, h) = (96, 64);
    let image = textured(w, h);
    let mut tpl = crop(&image, w, 8, 8, 16, 16);
    // Invert the patch: the best correlation is now strongly negative.
    for value in &mut tpl {
        *value = 255 - *value;
    }
    let found = find_best(
        ImageView::from_slice(&image, w, h).unwrap(),
        ImageView::from_slice(&tpl, 16, 16).unwrap(),
        &ZnccConfig::default(),
        0.9,
    )
    .unwrap();
    assert!(found.is_none());
}

#[test]
fn flat_template_is_an_error() {
    let image = textured(32, 32);
    let tpl = vec![7u8; 64];
    let result = find_best(
        ImageView::from_slice(&image, 32, 32).unwrap(),
        ImageView::from_slice(&tpl, 8, 8).unwrap(),
        &ZnccConfig::default(),
        0.0,
    );
    assert!(result.is_err());
}

#[cfg(feature = "image-io")]
#[test]
fn image_search_reads_template_files() {
    use framescan::{Frame, ImageSearch, Rect, ZnccImageSearch};

    let (w, h) = (160, 120);
    let gray = textured(w, h);
    let rgb: Vec<u8> = gray.iter().flat_map(|&v| [v, v, v]).collect();
    let frame = Frame::from_rgb(rgb, w, h).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("marker.png");
    let tpl = crop(&gray, w, 64, 40, 32, 24);
    image::GrayImage::from_raw(32, 24, tpl).unwrap().save(&path).unwrap();

    let found = ZnccImageSearch::default()
        .find(&path, &frame, 0.8)
        .unwrap()
        .expect("template should match");
    assert_eq!(found.bounds, Rect::new(64, 40, 32, 24));
    assert_eq!(found.captured_at, frame.captured_at());

    let missing = ZnccImageSearch::default().find(&dir.path().join("none.png"), &frame, 0.8);
    assert!(missing.is_err());
}
