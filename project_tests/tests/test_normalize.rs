use bms_common::imaging::{self, NormalizeError, NormalizeOptions, orientation};
use image::GenericImageView;
use project_tests::{decode, payload_bytes, png_data_url, transparent_png_data_url};
use serde_json::json;

fn small() -> NormalizeOptions {
    NormalizeOptions::new(100, 100, 80)
}

#[test]
fn non_data_urls_come_back_unchanged() {
    assert_eq!(imaging::normalize("not-a-data-url", &small()), "not-a-data-url");
    assert_eq!(imaging::normalize("", &small()), "");

    let bad_base64 = "data:image/png;base64,@@@not base64@@@";
    assert_eq!(imaging::normalize(bad_base64, &small()), bad_base64);

    let corrupt = "data:image/png;base64,aGVsbG8gd29ybGQ=";
    assert_eq!(imaging::normalize(corrupt, &small()), corrupt);

    assert_eq!(imaging::normalize_value(&json!(42), &small()), json!(42));
    assert_eq!(imaging::normalize_value(&json!(null), &small()), json!(null));
}

#[test]
fn rejections_are_distinguished_from_pipeline_failures() {
    let err = imaging::try_normalize("not-a-data-url", &small()).unwrap_err();
    assert!(matches!(err, NormalizeError::NotDataUrl));
    assert!(err.is_rejection());

    let err = imaging::try_normalize("data:image/png;base64,aGVsbG8=", &small()).unwrap_err();
    assert!(matches!(err, NormalizeError::Decode(_)));
    assert!(err.is_rejection());
}

#[test]
fn wide_image_is_fitted_into_the_box() {
    let out = imaging::normalize(&png_data_url(2000, 1000), &small());
    assert!(out.starts_with("data:image/jpeg;base64,"));
    assert_eq!(decode(&out).dimensions(), (100, 50));
}

#[test]
fn small_image_is_not_upscaled() {
    let out = imaging::normalize(&png_data_url(40, 30), &small());
    assert_eq!(decode(&out).dimensions(), (40, 30));
}

#[test]
fn output_is_a_fixed_point() {
    let once = imaging::normalize(&png_data_url(640, 480), &small());
    let twice = imaging::normalize(&once, &small());
    assert!(twice.starts_with("data:image/jpeg;base64,"));
    assert_eq!(decode(&once).dimensions(), decode(&twice).dimensions());
}

#[test]
fn transparency_is_flattened_onto_white() {
    let out = imaging::normalize(&transparent_png_data_url(20, 20), &small());
    let pixel = decode(&out).to_rgb8().get_pixel(10, 10).0;
    assert!(pixel.iter().all(|&c| c > 240), "expected white, got {:?}", pixel);
}

#[test]
fn output_carries_no_orientation_tag() {
    let out = imaging::normalize(&png_data_url(300, 200), &small());
    assert_eq!(orientation::exif_orientation_tag(&payload_bytes(&out)), None);
}

#[test]
fn sources_above_the_pixel_cap_are_left_alone() {
    let input = png_data_url(400, 300);
    let capped = small().with_max_pixels(100_000);

    let err = imaging::try_normalize(&input, &capped).unwrap_err();
    assert!(matches!(err, NormalizeError::Decode(_)));
    assert_eq!(imaging::normalize(&input, &capped), input);

    assert!(imaging::normalize(&input, &small()).starts_with("data:image/jpeg;base64,"));
}
