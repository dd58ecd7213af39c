//! Mirroring of parameters into device memory.
//!
//! Parameter sets that can live on a device implement [TransferableComponents]
//! and expose it through [`ParameterSet::as_transferable`](crate::ParameterSet::as_transferable).
//! Each component lists every [Transferable] matrix it owns. A matrix that is not
//! listed is never copied and goes stale on the device.

use crate::config::{Config, Device};
use crate::error::GraftError;
use crate::param::Matrix;

/// Single matrix that can be copied between host and device
pub trait Transferable {
    /// Host copy of the matrix
    fn host(&self) -> &Matrix;
    /// Host copy of the matrix, mutably
    fn host_mut(&mut self) -> &mut Matrix;
}

/// Group of [Transferable] matrices
pub trait TransferableComponents {
    /// Name used in diagnostics
    fn name(&self) -> &'static str;
    /// Every matrix of self that must be synchronized with device
    fn transferable_ptrs(&mut self) -> Vec<&mut dyn Transferable>;
}

/// Handle to buffers allocated for one [TransferableComponents]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSlot {
    first: usize,
    len: usize,
}

impl DeviceSlot {
    /// Number of buffers in slot
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Does slot hold no buffers?
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug)]
struct DeviceBuffer {
    rows: usize,
    cols: usize,
    data: Box<[f32]>,
}

/// Dummy device memory pool.
/// Buffers live in host memory, but are only reachable through copies,
/// so missing transfers are observable just like on real hardware.
#[derive(Debug)]
pub struct DevicePool {
    free_bytes: usize,
    buffers: Vec<DeviceBuffer>,
    debug: bool,
}

impl DevicePool {
    /// New pool with given capacity in bytes
    #[must_use]
    pub const fn new(free_bytes: usize) -> DevicePool {
        DevicePool {
            free_bytes,
            buffers: Vec::new(),
            debug: false,
        }
    }

    /// Pool for configured device, None if device is CPU
    #[must_use]
    pub fn from_config(config: &Config) -> Option<DevicePool> {
        match config.device {
            Device::CPU => None,
            Device::Dummy => {
                if config.debug_transfer() {
                    log::debug!("Using dummy device");
                }
                let mut pool = DevicePool::new(1024 * 1024 * 1024);
                pool.debug = config.debug_transfer();
                Some(pool)
            }
        }
    }

    /// Remaining capacity in bytes
    #[must_use]
    pub const fn free_bytes(&self) -> usize {
        self.free_bytes
    }

    /// Number of allocated buffers
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Allocate one buffer per transferable matrix of components.
    /// Buffers are zeroed, use [`DevicePool::copy_to_device`] to upload values.
    ///
    /// # Errors
    ///
    /// Errors if pool does not have enough free memory.
    pub fn allocate(
        &mut self,
        components: &mut dyn TransferableComponents,
    ) -> Result<DeviceSlot, GraftError> {
        let name = components.name();
        let ptrs = components.transferable_ptrs();
        let bytes: usize = ptrs
            .iter()
            .map(|t| t.host().data.len() * core::mem::size_of::<f32>())
            .sum();
        if bytes > self.free_bytes {
            return Err(GraftError::device_error(
                format!(
                    "Failed to allocate {bytes} B for {name}, only {} B free",
                    self.free_bytes
                )
                .into(),
            ));
        }
        self.free_bytes -= bytes;
        let first = self.buffers.len();
        for t in &ptrs {
            let m = t.host();
            self.buffers.push(DeviceBuffer {
                rows: m.rows,
                cols: m.cols,
                data: vec![0.0; m.data.len()].into_boxed_slice(),
            });
        }
        if self.debug {
            log::debug!("Allocated {} buffers ({bytes} B) for {name}", ptrs.len());
        }
        Ok(DeviceSlot {
            first,
            len: ptrs.len(),
        })
    }

    /// Copy every transferable matrix of components into its device buffer
    ///
    /// # Errors
    ///
    /// Errors if components changed shape since allocation.
    pub fn copy_to_device(
        &mut self,
        slot: DeviceSlot,
        components: &mut dyn TransferableComponents,
    ) -> Result<(), GraftError> {
        let name = components.name();
        let ptrs = components.transferable_ptrs();
        let buffers = self.slot_buffers(slot, name, ptrs.len())?;
        for (i, (t, buffer)) in ptrs.iter().zip(buffers.iter_mut()).enumerate() {
            let m = t.host();
            check_shape(name, i, m, buffer)?;
            buffer.data.copy_from_slice(&m.data);
        }
        if self.debug {
            log::debug!("Copied {name} to device");
        }
        Ok(())
    }

    /// Copy device buffers back into host matrices of components
    ///
    /// # Errors
    ///
    /// Errors if components changed shape since allocation.
    pub fn copy_from_device(
        &mut self,
        slot: DeviceSlot,
        components: &mut dyn TransferableComponents,
    ) -> Result<(), GraftError> {
        let name = components.name();
        let mut ptrs = components.transferable_ptrs();
        let buffers = self.slot_buffers(slot, name, ptrs.len())?;
        for (i, (t, buffer)) in ptrs.iter_mut().zip(buffers.iter()).enumerate() {
            let m = t.host_mut();
            check_shape(name, i, m, buffer)?;
            m.data.copy_from_slice(&buffer.data);
        }
        if self.debug {
            log::debug!("Copied {name} from device");
        }
        Ok(())
    }

    /// Device copy of i-th buffer in slot
    #[must_use]
    pub fn buffer(&self, slot: DeviceSlot, i: usize) -> Option<&[f32]> {
        if i >= slot.len {
            return None;
        }
        self.buffers.get(slot.first + i).map(|b| &*b.data)
    }

    /// Mutable device copy of i-th buffer in slot, stands in for kernels writing to device memory
    pub fn buffer_mut(&mut self, slot: DeviceSlot, i: usize) -> Option<&mut [f32]> {
        if i >= slot.len {
            return None;
        }
        self.buffers.get_mut(slot.first + i).map(|b| &mut *b.data)
    }

    fn slot_buffers(
        &mut self,
        slot: DeviceSlot,
        name: &str,
        len: usize,
    ) -> Result<&mut [DeviceBuffer], GraftError> {
        if len != slot.len {
            return Err(GraftError::device_error(
                format!(
                    "{name} lists {len} transferables, but {} buffers were allocated",
                    slot.len
                )
                .into(),
            ));
        }
        self.buffers
            .get_mut(slot.first..slot.first + slot.len)
            .ok_or_else(|| GraftError::device_error(format!("Slot of {name} is not allocated in this pool").into()))
    }
}

fn check_shape(name: &str, i: usize, m: &Matrix, buffer: &DeviceBuffer) -> Result<(), GraftError> {
    if m.rows != buffer.rows || m.cols != buffer.cols || m.data.len() != buffer.data.len() {
        return Err(GraftError::device_error(
            format!(
                "Transferable {i} of {name} has shape {}x{}, device buffer is {}x{}",
                m.rows, m.cols, buffer.rows, buffer.cols
            )
            .into(),
        ));
    }
    Ok(())
}
