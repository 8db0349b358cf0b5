//! Headless graphics device creation.

use log::{info, warn};

/// Requests a device and queue without a surface.
///
/// Returns `None` when no adapter or device is available, which is normal on
/// machines without a GPU driver.
pub fn request_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        flags: wgpu::InstanceFlags::empty(),
        backend_options: wgpu::BackendOptions::from_env_or_default(),
    });

    pollster::block_on(async move {
        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Ok(adapter) => adapter,
            Err(err) => {
                warn!("No graphics adapter: {}", err);
                return None;
            }
        };
        info!("Using adapter {}", adapter.get_info().name);

        match adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("terrain store device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
        {
            Ok(device) => Some(device),
            Err(err) => {
                warn!("Failed to create graphics device: {}", err);
                None
            }
        }
    })
}
