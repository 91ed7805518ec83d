use wgpu::util::DeviceExt;

use crate::composition::pack::PackedClips;
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::render::{CompositeBackend, FrameRgb, KernelVariant, RenderSettings};

const WORKGROUP_SIZE: u32 = 64;

/// Constants the kernels need per render configuration, bound as a uniform
/// block instead of being substituted into the kernel source.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    canvas_w: u32,
    canvas_h: u32,
    clip_count: u32,
    prop_stride: u32,
    precision_multiplier: i32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

/// Accelerated device context.
///
/// Dispatches one invocation per clip. Unlike the CPU context, canvas and
/// depth words are read and written without synchronization, so overlapping
/// clips can lose updates to each other; non-overlapping clips touch disjoint
/// pixels and are exact. Compiled pipelines are cached across renders.
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    full: Option<wgpu::ComputePipeline>,
    lite: Option<wgpu::ComputePipeline>,
}

impl GpuBackend {
    /// Acquire an adapter and device.
    ///
    /// Errors with [`MosaicError::DeviceUnavailable`] when no adapter exists;
    /// [`crate::render::create_backend`] recovers by substituting the CPU
    /// context.
    pub fn new() -> MosaicResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| {
            MosaicError::device_unavailable(format!("wgpu request_adapter failed: {e:?}"))
        })?;

        tracing::debug!(adapter = %adapter.get_info().name, "acquired compositing device");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| {
            MosaicError::device_unavailable(format!("wgpu request_device failed: {e:?}"))
        })?;

        Ok(Self {
            device,
            queue,
            full: None,
            lite: None,
        })
    }

    fn ensure_pipeline(&mut self, variant: KernelVariant) -> MosaicResult<wgpu::ComputePipeline> {
        let cached = match variant {
            KernelVariant::Full => &self.full,
            KernelVariant::Lite => &self.lite,
        };
        if let Some(pipeline) = cached {
            return Ok(pipeline.clone());
        }

        let (label, source, entry) = match variant {
            KernelVariant::Full => (
                "clipmosaic_composite_full",
                include_str!("shaders/composite_full.wgsl"),
                "composite_full",
            ),
            KernelVariant::Lite => (
                "clipmosaic_composite_lite",
                include_str!("shaders/composite_lite.wgsl"),
                "composite_lite",
            ),
        };

        // A failed kernel build is fatal to the render, not a fallback.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: None,
                module: &module,
                entry_point: Some(entry),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(MosaicError::kernel_compile(format!("{label}: {err}")));
        }

        match variant {
            KernelVariant::Full => self.full = Some(pipeline.clone()),
            KernelVariant::Lite => self.lite = Some(pipeline.clone()),
        }
        Ok(pipeline)
    }
}

impl CompositeBackend for GpuBackend {
    fn composite(
        &mut self,
        packed: &PackedClips,
        settings: &RenderSettings,
        base: Option<&FrameRgb>,
    ) -> MosaicResult<FrameRgb> {
        settings.validate()?;
        let pixel_count = settings.width as usize * settings.height as usize;

        let canvas_words: Vec<u32> = match base {
            None => vec![0u32; pixel_count],
            Some(base) => {
                if base.width != settings.width || base.height != settings.height {
                    return Err(MosaicError::validation(format!(
                        "base image is {}x{}, canvas is {}x{}",
                        base.width, base.height, settings.width, settings.height
                    )));
                }
                base.data
                    .chunks_exact(3)
                    .map(|px| (u32::from(px[0]) << 16) | (u32::from(px[1]) << 8) | u32::from(px[2]))
                    .collect()
            }
        };

        let pipeline = self.ensure_pipeline(settings.variant)?;

        // Storage words are 4-byte aligned; pad the byte buffer out.
        let mut pixel_bytes = packed.pixels.clone();
        pixel_bytes.resize(pixel_bytes.len().div_ceil(4) * 4, 0);

        let params = Params {
            canvas_w: settings.width,
            canvas_h: settings.height,
            clip_count: packed.clip_count as u32,
            prop_stride: crate::composition::pack::PROP_STRIDE as u32,
            precision_multiplier: packed.precision.multiplier() as i32,
            _pad0: 0,
            _pad1: 0,
            _pad2: 0,
        };

        let params_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("clipmosaic_params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let pixels_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("clipmosaic_pixels"),
                contents: &pixel_bytes,
                usage: wgpu::BufferUsages::STORAGE,
            });
        let props_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("clipmosaic_props"),
                contents: bytemuck::cast_slice(&packed.props),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let canvas_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("clipmosaic_canvas"),
                contents: bytemuck::cast_slice(&canvas_words),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            });

        let layout = pipeline.get_bind_group_layout(0);
        let bind_group = match settings.variant {
            KernelVariant::Full => {
                // Zero-initialized: z = 0 everywhere means nothing painted yet.
                let zbuf = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("clipmosaic_zbuf"),
                    size: (pixel_count * 2 * std::mem::size_of::<i32>()) as u64,
                    usage: wgpu::BufferUsages::STORAGE,
                    mapped_at_creation: false,
                });
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("clipmosaic_bind_full"),
                    layout: &layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: params_buf.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: pixels_buf.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: props_buf.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: zbuf.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 4,
                            resource: canvas_buf.as_entire_binding(),
                        },
                    ],
                })
            }
            KernelVariant::Lite => self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("clipmosaic_bind_lite"),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: pixels_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: props_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: canvas_buf.as_entire_binding(),
                    },
                ],
            }),
        };

        let canvas_bytes = (pixel_count * std::mem::size_of::<u32>()) as u64;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("clipmosaic_readback"),
            size: canvas_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clipmosaic_composite_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("clipmosaic_composite_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups((packed.clip_count as u32).div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&canvas_buf, 0, &staging, 0, canvas_bytes);
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| MosaicError::device_readback(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| MosaicError::device_readback("readback channel closed"))?
            .map_err(|e| MosaicError::device_readback(format!("readback map failed: {e:?}")))?;

        let mapped = buffer_slice.get_mapped_range();
        let words: &[u32] = bytemuck::cast_slice(&mapped);
        let mut data = Vec::with_capacity(pixel_count * 3);
        for word in words {
            data.push((word >> 16) as u8);
            data.push((word >> 8) as u8);
            data.push(*word as u8);
        }
        drop(mapped);
        staging.unmap();

        Ok(FrameRgb {
            width: settings.width,
            height: settings.height,
            data,
        })
    }
}
