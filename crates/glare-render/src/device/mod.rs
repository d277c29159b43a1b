//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders for rendering
//! - the [`GpuDevice`] seam used by resources to create GPU objects, with a
//!   wgpu implementation ([`Gpu`]) and a hardware-free one ([`HeadlessDevice`])

mod backend;
mod frame;
mod gpu;
mod headless;
mod init;
mod surface;

pub use backend::{
    GpuBuffer, GpuDevice, GpuImage, GpuPipeline, GpuSampler, GpuShaderModule, GpuView,
    HeadlessImage, PipelineDesc,
};
pub use frame::{GpuFrame, SurfaceErrorAction};
pub use gpu::{Gpu, StandardLayouts};
pub use headless::{HeadlessDevice, HeadlessStats};
pub use init::GpuInit;
pub use surface::ClientWindow;
