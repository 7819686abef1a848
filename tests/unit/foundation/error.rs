use super::*;

#[test]
fn constructor_helpers_build_matching_variants() {
    assert!(matches!(
        ReelforgeError::validation("x"),
        ReelforgeError::Validation(_)
    ));
    assert!(matches!(
        ReelforgeError::asset_collection("x"),
        ReelforgeError::AssetCollection(_)
    ));
    assert!(matches!(
        ReelforgeError::composition("x"),
        ReelforgeError::Composition(_)
    ));
    assert!(matches!(
        ReelforgeError::publish("x"),
        ReelforgeError::Publish(_)
    ));
}

#[test]
fn messages_carry_their_category() {
    let e = ReelforgeError::composition("no usable footage clips");
    assert_eq!(e.to_string(), "composition failed: no usable footage clips");

    let e = ReelforgeError::publish("quota exceeded");
    assert!(e.to_string().starts_with("publish failed"));
}

#[test]
fn anyhow_errors_wrap_transparently() {
    let inner = anyhow::anyhow!("disk on fire");
    let e: ReelforgeError = inner.into();
    assert_eq!(e.to_string(), "disk on fire");
}
