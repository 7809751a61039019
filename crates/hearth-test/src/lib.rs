//! Test support for hearth.
//!
//! Provides a recording fake backend for exercising the device layer
//! without a GPU, and a headless harness for smoke tests on real hardware.

pub mod fake;
pub mod harness;

#[cfg(test)]
mod scenarios;

pub use fake::{
    Event, FailPoint, FakeBackend, FakeDevice, FakeEntrypoint, FakeGpuConfig, FakeInstance,
    FakePhysicalDevice, FakeSwapchain, ImageDescription, Ledger, ObjectKind,
};
pub use harness::{HeadlessRenderer, OffscreenTargets};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("GPU error: {0}")]
    Gpu(#[from] hearth_gpu::GpuError),
    #[error("Logical device has no queues")]
    NoQueue,
}

pub type Result<T> = std::result::Result<T, TestError>;
