use super::*;
use crate::foundation::error::MosaicError;

#[test]
fn source_image_validates_byte_length() {
    assert!(SourceImage::new(2, 2, Channels::Rgb, vec![0u8; 12]).is_ok());
    assert!(SourceImage::new(2, 2, Channels::Rgba, vec![0u8; 16]).is_ok());
    assert!(matches!(
        SourceImage::new(2, 2, Channels::Rgb, vec![0u8; 11]),
        Err(MosaicError::Validation(_))
    ));
    assert!(matches!(
        SourceImage::new(0, 2, Channels::Rgb, vec![]),
        Err(MosaicError::Validation(_))
    ));
}

#[test]
fn source_image_from_image_crate_buffers() {
    let rgb = image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
    let img = SourceImage::from_rgb_image(&rgb).unwrap();
    assert_eq!(img.width(), 3);
    assert_eq!(img.height(), 2);
    assert_eq!(img.channels(), Channels::Rgb);
    assert_eq!(img.data().len(), 18);

    let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 4]));
    let img = SourceImage::from_rgba_image(&rgba).unwrap();
    assert_eq!(img.channels(), Channels::Rgba);
    assert_eq!(img.data().len(), 16);
}

#[test]
fn placement_validates_ranges() {
    assert!(Placement::new(0.0, 0.0, 1.0, 1.0).validate().is_ok());
    assert!(
        Placement::new(0.0, 0.0, 0.0, 1.0)
            .validate()
            .is_err()
    );
    assert!(
        Placement::new(0.0, 0.0, 1.0, 1.0)
            .with_alpha(1.5)
            .validate()
            .is_err()
    );
    assert!(
        Placement::new(0.0, 0.0, 1.0, 1.0)
            .with_alpha(-0.1)
            .validate()
            .is_err()
    );
    assert!(
        Placement::new(0.0, 0.0, 1.0, 1.0)
            .with_brightness(0.0)
            .validate()
            .is_err()
    );
    assert!(
        Placement::new(f64::NAN, 0.0, 1.0, 1.0)
            .validate()
            .is_err()
    );
}

#[test]
fn placement_builders_set_fields() {
    let p = Placement::new(1.5, 2.5, 3.0, 4.0)
        .with_alpha(0.25)
        .with_z_index(7)
        .with_brightness(0.5);
    assert_eq!(p.alpha, 0.25);
    assert_eq!(p.z_index, 7);
    assert_eq!(p.brightness, 0.5);
}

#[test]
fn placement_json_round_trips() {
    let p = Placement::new(1.5, -2.25, 640.0, 360.0)
        .with_alpha(0.8)
        .with_z_index(12);
    let json = serde_json::to_string(&p).unwrap();
    let back: Placement = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
}

#[test]
fn clips_share_source_allocations() {
    let img = SourceImage::new(1, 1, Channels::Rgb, vec![1, 2, 3]).unwrap();
    let a = Clip::new(img.clone(), Placement::new(0.0, 0.0, 1.0, 1.0));
    let b = Clip::new(img, Placement::new(5.0, 5.0, 1.0, 1.0));
    assert!(std::sync::Arc::ptr_eq(a.source.data(), b.source.data()));
}
