use graft_core::{BiParams, Config, Device, DevicePool, GraftError, TransferableComponents, UniParams};
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[test]
fn round_trip() -> Result<(), GraftError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = SmallRng::seed_from_u64(1);
    let mut params = BiParams::default();
    params.init(2, 3, 4, true, &mut rng);
    let original = params.clone();

    let mut pool = DevicePool::new(1024);
    let slot = pool.allocate(&mut params)?;
    assert_eq!(slot.len(), 3);
    assert_eq!(pool.buffer_count(), 3);
    assert_eq!(pool.free_bytes(), 1024 - (6 + 8 + 2) * 4);
    assert_eq!(pool.buffer(slot, 0), Some(&[0f32; 6][..]));

    pool.copy_to_device(slot, &mut params)?;
    assert_eq!(pool.buffer(slot, 1), Some(&original.w2.val.data[..]));
    assert_eq!(pool.buffer(slot, 3), None);

    // Device side update is visible only after copy back
    if let Some(b) = pool.buffer_mut(slot, 2) {
        b.fill(1.0);
    }
    assert_eq!(params.b, original.b);
    pool.copy_from_device(slot, &mut params)?;
    assert_eq!(params.b.val.data, [1f32, 1.]);
    assert_eq!(params.w1, original.w1);
    Ok(())
}

#[test]
fn out_of_memory() {
    let mut rng = SmallRng::seed_from_u64(1);
    let mut params = UniParams::default();
    params.init(8, 8, true, &mut rng);
    let mut pool = DevicePool::new(64);
    assert!(matches!(
        pool.allocate(&mut params),
        Err(GraftError::DeviceError(_))
    ));
    assert_eq!(pool.buffer_count(), 0);
}

#[test]
fn shape_changed_after_allocation() -> Result<(), GraftError> {
    let mut rng = SmallRng::seed_from_u64(1);
    let mut params = UniParams::default();
    params.init(2, 2, true, &mut rng);
    let mut pool = DevicePool::new(1024);
    let slot = pool.allocate(&mut params)?;
    params.init(3, 2, true, &mut rng);
    assert!(pool.copy_to_device(slot, &mut params).is_err());
    params.init(2, 2, false, &mut rng);
    assert_eq!(params.transferable_ptrs().len(), 1);
    assert!(pool.copy_to_device(slot, &mut params).is_err());
    Ok(())
}

#[test]
fn pool_from_config() -> Result<(), GraftError> {
    assert!(DevicePool::from_config(&Config::default()).is_none());
    let config = Config::from_json("{\"device\": \"dummy\"}")?;
    assert_eq!(config.device, Device::Dummy);
    assert!(DevicePool::from_config(&config).is_some());
    Ok(())
}
