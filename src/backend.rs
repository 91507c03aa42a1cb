//! Execution-domain (device) model.
//!
//! This module defines where tensors reside and which domain the kernels
//! execute on, and provides functions to set and get the default device for
//! newly constructed tensors.
//!
//! # Supported Devices
//!
//! - `Cpu` — the only domain with kernels; everything runs here (default).
//! - `Wgpu` — reserved tag for GPU residents; no kernels are provided.
//! - `Cuda` — reserved tag for CUDA residents; no kernels are provided.
//!
//! The non-CPU variants exist so callers can model tensors living outside
//! the supported execution domain: the dispatch layer rejects any such
//! input with a `DeviceMismatch` error before doing work.
//!
//! The default device is stored globally using an `AtomicU8`, enabling fast
//! switching at runtime without locking.

use crate::error::{Result, SpmmError};
use briny::traits::{InteriorImmutable, RawConvert, StableLayout, Unaligned};
use core::convert::TryFrom;
use core::sync::atomic::{AtomicU8, Ordering};

/// Enumeration of execution domains a tensor can report residing on.
///
/// Only `Cpu` is backed by kernels; the other variants are residency tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Device {
    /// Host memory, operated on by the CPU kernels (default).
    #[default]
    Cpu = 0,
    /// GPU residency via `wgpu` (tag only).
    Wgpu,
    /// GPU residency via CUDA (tag only).
    Cuda,
}

unsafe impl StableLayout for Device {}
unsafe impl RawConvert for Device {}
unsafe impl Unaligned for Device {}
unsafe impl InteriorImmutable for Device {}

impl TryFrom<u8> for Device {
    type Error = ();

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Cpu),
            1 => Ok(Self::Wgpu),
            2 => Ok(Self::Cuda),
            _ => Err(()),
        }
    }
}

impl Device {
    /// Fails with [`SpmmError::DeviceMismatch`] unless `self` is the CPU
    /// domain. `tensor` names the offending input in the error.
    pub(crate) fn ensure_cpu(self, tensor: &'static str) -> Result<()> {
        if self == Self::Cpu {
            Ok(())
        } else {
            Err(SpmmError::DeviceMismatch {
                tensor,
                found: self,
            })
        }
    }
}

/// Internal global state for the default device of new tensors.
///
/// Relaxed ordering would likely suffice since the default changes rarely
/// and never mid-call, but acquire/release keeps reads well-defined across
/// threads.
#[cfg(target_has_atomic = "8")]
static GLOBAL_DEFAULT_DEVICE: AtomicU8 = AtomicU8::new(Device::Cpu as u8);

/// A mutable non-atomic unsynchronized device state.
///
/// It is assumed that this will not be accessed concurrently on targets
/// without 8-bit atomics.
#[cfg(not(target_has_atomic = "8"))]
static mut UNSAFE_GLOBAL_DEVICE: u8 = Device::Cpu as u8;

/// Sets the device newly constructed tensors are tagged with.
///
/// # Example
///
/// ```
/// use csrmm::backend::{set_default_device, Device};
/// set_default_device(Device::Cpu);
/// ```
pub fn set_default_device(d: Device) {
    #[cfg(not(target_has_atomic = "8"))]
    unsafe {
        UNSAFE_GLOBAL_DEVICE = d as u8;
    }
    #[cfg(target_has_atomic = "8")]
    GLOBAL_DEFAULT_DEVICE.store(d as u8, Ordering::Release);
}

/// Returns the device newly constructed tensors are tagged with.
///
/// If the stored value is invalid, defaults to [`Device::Cpu`].
pub fn default_device() -> Device {
    #[cfg(not(target_has_atomic = "8"))]
    {
        Device::try_from(unsafe { UNSAFE_GLOBAL_DEVICE }).unwrap_or_default()
    }
    #[cfg(target_has_atomic = "8")]
    Device::try_from(GLOBAL_DEFAULT_DEVICE.load(Ordering::Acquire)).unwrap_or_default()
}
