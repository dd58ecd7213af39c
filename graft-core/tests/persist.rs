use graft_core::{load, save, BiParams, GraftError, Serializable, UniParams};
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[test]
fn json_round_trip() -> Result<(), GraftError> {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut params = BiParams::default();
    params.init(3, 2, 4, true, &mut rng);
    let json = params.to_json();
    let mut restored = BiParams::default();
    restored.from_json(&json)?;
    assert_eq!(restored, params);
    assert_eq!(restored.out_dim(), 3);
    Ok(())
}

#[test]
fn malformed_json() {
    let mut params = UniParams::default();
    assert!(matches!(
        params.from_json("{\"w\": 1"),
        Err(GraftError::ParseError(_))
    ));
    assert_eq!(params, UniParams::default());
}

#[test]
fn file_round_trip() -> Result<(), GraftError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("uni.json");
    let mut rng = SmallRng::seed_from_u64(11);
    let mut params = UniParams::default();
    params.init(5, 3, false, &mut rng);
    save(&path, &params)?;
    let mut restored = UniParams::default();
    load(&path, &mut restored)?;
    assert_eq!(restored, params);
    assert!(matches!(
        load(dir.path().join("missing.json"), &mut restored),
        Err(GraftError::IOError(_))
    ));
    Ok(())
}
