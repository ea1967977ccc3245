//! GPU-based particle life simulation manager

use crate::{workgroup_count, BufferSizes, PingPong, ShaderConstants};
use life_physics::BodySeed;
use thiserror::Error;
use wgpu::util::DeviceExt;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("seed has {positions} positions but {types} type ids")]
    SeedMismatch { positions: usize, types: usize },
    #[error("workgroup size {requested} exceeds the device limit of {limit}")]
    WorkgroupTooLarge { requested: u32, limit: u32 },
    #[error("{count} workgroups exceed the device dispatch limit of {limit}")]
    TooManyWorkgroups { count: u32, limit: u32 },
    #[error("{buffer} buffer needs {size} bytes, the device allows {limit}")]
    BufferTooLarge {
        buffer: &'static str,
        size: u64,
        limit: u64,
    },
    #[error("compute shader rejected: {0}")]
    Shader(String),
}

/// GPU-based particle life simulation
///
/// Positions are double-buffered: each step reads one position buffer and
/// writes the other, then the roles swap.
pub struct LifeSimulation {
    device: wgpu::Device,

    // Buffers
    positions: [wgpu::Buffer; 2],
    _velocities: wgpu::Buffer,
    types: wgpu::Buffer,
    _type_attractions: wgpu::Buffer,

    pipeline_layout: wgpu::PipelineLayout,
    pipeline: wgpu::ComputePipeline,

    // bind_groups[i] reads positions[i] and writes positions[i ^ 1]
    bind_groups: [wgpu::BindGroup; 2],
    ping_pong: PingPong,

    body_count: u32,
    type_count: u32,
    workgroup_size: u32,
}

impl LifeSimulation {
    pub fn new(
        device: &wgpu::Device,
        seed: &BodySeed,
        workgroup_size: u32,
    ) -> Result<Self, SimulationError> {
        log::info!(
            "Initializing LifeSimulation ({} bodies, {} types)...",
            seed.body_count(),
            seed.type_count()
        );

        if seed.positions.len() != seed.types.len() {
            return Err(SimulationError::SeedMismatch {
                positions: seed.positions.len(),
                types: seed.types.len(),
            });
        }

        let body_count = seed.body_count();
        let type_count = seed.type_count();
        let sizes = BufferSizes::new(body_count, type_count);

        let limits = device.limits();
        check_workgroup_size(&limits, workgroup_size)?;
        check_dispatch(&limits, body_count, workgroup_size)?;
        check_buffer_sizes(&limits, &sizes)?;

        // Positions are also read as per-instance vertex data by the renderer
        let positions_in = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Positions Buffer A"),
            contents: bytemuck::cast_slice(&seed.positions),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX,
        });

        let positions_out = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Positions Buffer B"),
            size: sizes.positions,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });

        // Zero-initialized
        let velocities = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Velocities Buffer"),
            size: sizes.velocities,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let types = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Types Buffer"),
            contents: bytemuck::cast_slice(&seed.types),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let type_attractions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Type Attractions Buffer"),
            contents: bytemuck::cast_slice(seed.attractions.values()),
            usage: wgpu::BufferUsages::STORAGE,
        });

        log::info!("Buffers created");

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Life Compute Bind Group Layout"),
            entries: &[
                // Positions in
                storage_layout_entry(0, true),
                // Positions out
                storage_layout_entry(1, false),
                // Velocities
                storage_layout_entry(2, false),
                // Types
                storage_layout_entry(3, true),
                // Type attractions
                storage_layout_entry(4, true),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Life Compute Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let constants = ShaderConstants {
            workgroup_size,
            body_count,
            type_count,
        };
        let pipeline = create_compute_pipeline(device, &pipeline_layout, &constants)?;

        log::info!("Compute pipeline created");

        let bind_groups = [
            create_bind_group(
                device,
                &bind_group_layout,
                &positions_in,
                &positions_out,
                &velocities,
                &types,
                &type_attractions,
            ),
            create_bind_group(
                device,
                &bind_group_layout,
                &positions_out,
                &positions_in,
                &velocities,
                &types,
                &type_attractions,
            ),
        ];

        log::info!("Bind groups created");

        Ok(Self {
            device: device.clone(),
            positions: [positions_in, positions_out],
            _velocities: velocities,
            types,
            _type_attractions: type_attractions,
            pipeline_layout,
            pipeline,
            bind_groups,
            ping_pong: PingPong::default(),
            body_count,
            type_count,
            workgroup_size,
        })
    }

    /// Record one simulation step into `encoder` and swap the position buffers.
    ///
    /// After this call `current_positions()` is the buffer the step writes.
    pub fn encode_step(&mut self, encoder: &mut wgpu::CommandEncoder) {
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Life Compute Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &self.bind_groups[self.ping_pong.read()], &[]);
            compute_pass.dispatch_workgroups(
                workgroup_count(self.body_count, self.workgroup_size),
                1,
                1,
            );
        }

        self.ping_pong.swap();
    }

    /// Recompile the compute pipeline for a new workgroup size.
    ///
    /// Bodies and bind groups are kept. On failure the previous pipeline stays active.
    pub fn rebuild_pipeline(&mut self, workgroup_size: u32) -> Result<(), SimulationError> {
        let limits = self.device.limits();
        check_workgroup_size(&limits, workgroup_size)?;
        check_dispatch(&limits, self.body_count, workgroup_size)?;

        let constants = ShaderConstants {
            workgroup_size,
            body_count: self.body_count,
            type_count: self.type_count,
        };
        self.pipeline = create_compute_pipeline(&self.device, &self.pipeline_layout, &constants)?;
        self.workgroup_size = workgroup_size;

        log::info!("Compute pipeline rebuilt (workgroup size {})", workgroup_size);
        Ok(())
    }

    /// Buffer holding the latest positions (also the vertex buffer for drawing)
    pub fn current_positions(&self) -> &wgpu::Buffer {
        &self.positions[self.ping_pong.read()]
    }

    pub fn types_buffer(&self) -> &wgpu::Buffer {
        &self.types
    }

    pub fn body_count(&self) -> u32 {
        self.body_count
    }

    pub fn type_count(&self) -> u32 {
        self.type_count
    }

    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }
}

fn check_workgroup_size(limits: &wgpu::Limits, workgroup_size: u32) -> Result<(), SimulationError> {
    let limit = limits
        .max_compute_workgroup_size_x
        .min(limits.max_compute_invocations_per_workgroup);
    if workgroup_size == 0 || workgroup_size > limit {
        return Err(SimulationError::WorkgroupTooLarge {
            requested: workgroup_size,
            limit,
        });
    }
    Ok(())
}

fn check_dispatch(
    limits: &wgpu::Limits,
    body_count: u32,
    workgroup_size: u32,
) -> Result<(), SimulationError> {
    let count = workgroup_count(body_count, workgroup_size);
    let limit = limits.max_compute_workgroups_per_dimension;
    if count > limit {
        return Err(SimulationError::TooManyWorkgroups { count, limit });
    }
    Ok(())
}

/// Every buffer must fit both a single allocation and a single storage binding
fn check_buffer_sizes(limits: &wgpu::Limits, sizes: &BufferSizes) -> Result<(), SimulationError> {
    let limit = limits
        .max_buffer_size
        .min(limits.max_storage_buffer_binding_size as u64);

    let buffers = [
        ("positions", sizes.positions),
        ("velocities", sizes.velocities),
        ("types", sizes.types),
        ("type attractions", sizes.type_attractions),
    ];
    for (buffer, size) in buffers {
        if size > limit {
            return Err(SimulationError::BufferTooLarge {
                buffer,
                size,
                limit,
            });
        }
    }
    Ok(())
}

fn storage_layout_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_compute_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    constants: &ShaderConstants,
) -> Result<wgpu::ComputePipeline, SimulationError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Life Compute Shader"),
        source: wgpu::ShaderSource::Wgsl(constants.compose().into()),
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Life Compute Pipeline"),
        layout: Some(layout),
        module: &shader,
        entry_point: Some("cs_main"),
        compilation_options: Default::default(),
        cache: None,
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(SimulationError::Shader(error.to_string())),
        None => Ok(pipeline),
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    positions_in: &wgpu::Buffer,
    positions_out: &wgpu::Buffer,
    velocities: &wgpu::Buffer,
    types: &wgpu::Buffer,
    type_attractions: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Life Compute Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: positions_in.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: positions_out.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: velocities.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: types.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: type_attractions.as_entire_binding(),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_limit() {
        let limits = wgpu::Limits::default();
        assert!(check_dispatch(&limits, 65535, 1).is_ok());
        assert!(check_dispatch(&limits, 65536, 64).is_ok());

        match check_dispatch(&limits, 65536, 1) {
            Err(SimulationError::TooManyWorkgroups { count, limit }) => {
                assert_eq!(count, 65536);
                assert_eq!(limit, limits.max_compute_workgroups_per_dimension);
            }
            other => panic!("expected TooManyWorkgroups, got {other:?}"),
        }

        assert!(matches!(
            check_dispatch(&limits, 5_000_000, 64),
            Err(SimulationError::TooManyWorkgroups { .. })
        ));
    }

    #[test]
    fn test_workgroup_size_limit() {
        let limits = wgpu::Limits::default();
        assert!(check_workgroup_size(&limits, 256).is_ok());
        assert!(matches!(
            check_workgroup_size(&limits, 0),
            Err(SimulationError::WorkgroupTooLarge { requested: 0, .. })
        ));
        assert!(matches!(
            check_workgroup_size(&limits, 512),
            Err(SimulationError::WorkgroupTooLarge { requested: 512, .. })
        ));
    }

    #[test]
    fn test_buffer_size_limits() {
        let limits = wgpu::Limits::default();
        let binding_limit = limits.max_storage_buffer_binding_size as u64;

        let largest = (binding_limit / 16) as u32;
        assert!(check_buffer_sizes(&limits, &BufferSizes::new(largest, 256)).is_ok());

        match check_buffer_sizes(&limits, &BufferSizes::new(largest + 1, 8)) {
            Err(SimulationError::BufferTooLarge { buffer, size, limit }) => {
                assert_eq!(buffer, "positions");
                assert_eq!(size, (largest as u64 + 1) * 16);
                assert!(limit <= binding_limit);
            }
            other => panic!("expected BufferTooLarge, got {other:?}"),
        }

        let tight = wgpu::Limits {
            max_storage_buffer_binding_size: 1024,
            ..wgpu::Limits::default()
        };
        assert!(matches!(
            check_buffer_sizes(&tight, &BufferSizes::new(16, 32)),
            Err(SimulationError::BufferTooLarge {
                buffer: "type attractions",
                ..
            })
        ));
    }
}
