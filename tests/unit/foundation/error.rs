use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        MosaicError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        MosaicError::precision_overflow("x")
            .to_string()
            .contains("fixed-point overflow:")
    );
    assert!(
        MosaicError::kernel_compile("x")
            .to_string()
            .contains("kernel compile error:")
    );
    assert!(
        MosaicError::device_unavailable("x")
            .to_string()
            .contains("device unavailable:")
    );
    assert!(
        MosaicError::device_readback("x")
            .to_string()
            .contains("device readback error:")
    );
    assert!(
        MosaicError::EmptyClipSet
            .to_string()
            .contains("empty clip set")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = MosaicError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
