use super::*;

#[test]
fn round_trip_error_is_within_half_step() {
    for digits in 0..=6 {
        let precision = Precision::new(digits).unwrap();
        let half_step = 0.5 / precision.multiplier() as f64;
        for value in [
            0.0, 1.0, -1.0, 0.5, 1.25, -7.333, 123.456789, -987.654321, 0.0001,
        ] {
            let decoded = precision.decode(precision.encode(value).unwrap());
            assert!(
                (decoded - value).abs() <= half_step,
                "digits={digits} value={value} decoded={decoded}"
            );
        }
    }
}

#[test]
fn encode_rounds_to_nearest() {
    let precision = Precision::new(2).unwrap();
    assert_eq!(precision.encode(1.234).unwrap(), 123);
    assert_eq!(precision.encode(1.235).unwrap(), 124);
    assert_eq!(precision.encode(-1.235).unwrap(), -124);
}

#[test]
fn encode_rejects_overflowing_values() {
    let precision = Precision::new(3).unwrap();
    assert!(matches!(
        precision.encode(1e9),
        Err(MosaicError::PrecisionOverflow(_))
    ));
    assert!(matches!(
        precision.encode(-1e9),
        Err(MosaicError::PrecisionOverflow(_))
    ));
    // Near the boundary but representable.
    assert!(precision.encode(2_000_000.0).is_ok());
}

#[test]
fn encode_rejects_non_finite_values() {
    let precision = Precision::new(3).unwrap();
    assert!(matches!(
        precision.encode(f64::NAN),
        Err(MosaicError::PrecisionOverflow(_))
    ));
    assert!(matches!(
        precision.encode(f64::INFINITY),
        Err(MosaicError::PrecisionOverflow(_))
    ));
}

#[test]
fn digits_are_bounded() {
    assert!(Precision::new(9).is_ok());
    assert!(matches!(
        Precision::new(10),
        Err(MosaicError::Validation(_))
    ));
}

#[test]
fn multiplier_is_power_of_ten() {
    assert_eq!(Precision::new(0).unwrap().multiplier(), 1);
    assert_eq!(Precision::new(3).unwrap().multiplier(), 1_000);
    assert_eq!(Precision::new(9).unwrap().multiplier(), 1_000_000_000);
    assert_eq!(Precision::default().digits(), 3);
}
