use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        VistaError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(VistaError::load("x").to_string().contains("load error:"));
    assert!(VistaError::decode("x").to_string().contains("decode error:"));
    assert_eq!(VistaError::Cancelled.to_string(), "load cancelled");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = VistaError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
