//! GPU matrix multiplication through `wgpu` compute shaders.
//!
//! The device, shader and pipeline are created once on first use. If any of
//! that fails (no adapter, shader rejected) the kernel reports `None` and
//! dispatch falls back to the CPU.

use briny::prelude::*;
use thiserror::Error;
use wgpu::util::DeviceExt;

const MATMUL: &str = include_str!("shaders/matmul.wgsl");

/// Failures while preparing or running a GPU kernel.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("adapter request failed: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("shader `{0}` failed validation")]
    Shader(&'static str),
    #[error("buffer mapping failed")]
    Map,
    #[error("matrix dimension {0} does not fit in u32")]
    TooLarge(usize),
}

/// Device and queue shared by every kernel.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Requests the default adapter and a device with default limits.
    ///
    /// # Errors
    /// Fails when no adapter or device is available.
    pub fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))?;
        Ok(Self { device, queue })
    }
}

/// WGSL source that passes basic sanity checks before compilation.
pub struct WgslSource<'a>(pub &'a str);

impl Validate for WgslSource<'_> {
    fn validate(&self) -> Result<(), ValidationError> {
        let src = self.0;
        if src.len() > 65536 || !src.contains("fn main") {
            return Err(ValidationError);
        }
        if src.contains("#include") || src.contains("import") {
            return Err(ValidationError);
        }
        Ok(())
    }
}

struct MatmulKernel {
    context: GpuContext,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl MatmulKernel {
    fn new() -> Result<Self, GpuError> {
        let context = GpuContext::new()?;
        WgslSource(MATMUL).validate().map_err(|_| GpuError::Shader("matmul"))?;
        let device = &context.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("matmul"),
            source: wgpu::ShaderSource::Wgsl(MATMUL.into()),
        });

        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("matmul_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage(1, true),
                storage(2, true),
                storage(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("matmul_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("matmul_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            cache: None,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        Ok(Self { context, layout, pipeline })
    }

    fn run(&self, a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<Vec<f32>, GpuError> {
        let device = &self.context.device;
        let dim = |d: usize| u32::try_from(d).map_err(|_| GpuError::TooLarge(d));
        let dims = [dim(m)?, dim(k)?, dim(n)?, 0u32];
        let out_bytes = (m * n * size_of::<f32>()) as u64;

        let dims_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dims"),
            contents: &to_bytes(dims.iter().map(|d| d.to_le_bytes())),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let a_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("A"),
            contents: &to_bytes(a.iter().map(|x| x.to_le_bytes())),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let b_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("B"),
            contents: &to_bytes(b.iter().map(|x| x.to_le_bytes())),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let c_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("C"),
            size: out_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("matmul_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: dims_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: a_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: b_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: c_buffer.as_entire_binding() },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("matmul_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("matmul_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(dims[2].div_ceil(16), dims[0].div_ceil(16), 1);
        }

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size: out_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        encoder.copy_buffer_to_buffer(&c_buffer, 0, &staging, 0, out_bytes);
        self.context.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::PollType::Wait).map_err(|_| GpuError::Map)?;
        receiver.recv().map_err(|_| GpuError::Map)?.map_err(|_| GpuError::Map)?;

        let out = {
            let mapped = slice.get_mapped_range();
            mapped
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        };
        staging.unmap();
        Ok(out)
    }
}

fn to_bytes<const N: usize>(words: impl Iterator<Item = [u8; N]>) -> Vec<u8> {
    words.flatten().collect()
}

lazy_static::lazy_static! {
    static ref MATMUL_KERNEL: Option<MatmulKernel> = match MatmulKernel::new() {
        Ok(kernel) => Some(kernel),
        Err(err) => {
            tracing::warn!(%err, "wgpu unavailable, matmul stays on the cpu");
            None
        }
    };
}

/// Runs `A × B` on the GPU, or `None` if the GPU path is unavailable.
pub fn wgpu_matmul(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Option<Vec<f32>> {
    if m == 0 || n == 0 || k == 0 {
        return None;
    }
    let kernel = MATMUL_KERNEL.as_ref()?;
    match kernel.run(a, b, m, k, n) {
        Ok(out) => Some(out),
        Err(err) => {
            tracing::warn!(%err, "wgpu matmul failed, falling back to cpu");
            None
        }
    }
}
