//! Built-in demo scene: a handful of shaded cubes.

use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::camera::BoundingVolume;
use crate::error::ViewerError;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::renderer::{SceneGraph, SceneTargetInfo};

/// Vertex layout of `raster/scene.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Outward face normal.
    pub normal: [f32; 3],
    /// Linear RGB color.
    pub color: [f32; 3],
}

impl SceneVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// An axis-aligned cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cube {
    /// Center in world space.
    pub center: Vec3,
    /// Half the edge length.
    pub half_extent: f32,
    /// Linear RGB color.
    pub color: [f32; 3],
}

impl Cube {
    /// Bounds of the cube.
    #[must_use]
    pub fn bounds(&self) -> BoundingVolume {
        let half = Vec3::splat(self.half_extent);
        BoundingVolume::new(self.center - half, self.center + half)
    }

    /// Two counter-clockwise triangles per face, 36 vertices.
    #[must_use]
    pub fn vertices(&self) -> Vec<SceneVertex> {
        // (normal, u, v) with u x v = normal
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];
        const CORNERS: [(f32, f32); 6] = [
            (-1.0, -1.0),
            (1.0, -1.0),
            (1.0, 1.0),
            (-1.0, -1.0),
            (1.0, 1.0),
            (-1.0, 1.0),
        ];

        let mut vertices = Vec::with_capacity(36);
        for (normal, u, v) in FACES {
            for (su, sv) in CORNERS {
                let position =
                    self.center + (normal + u * su + v * sv) * self.half_extent;
                vertices.push(SceneVertex {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    color: self.color,
                });
            }
        }
        vertices
    }
}

/// GPU state created by [`SceneGraph::prepare`].
struct DemoGpu {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
}

/// A static set of cubes.
pub struct DemoScene {
    cubes: Vec<Cube>,
    gpu: Option<DemoGpu>,
}

impl DemoScene {
    /// Scene of the given cubes.
    #[must_use]
    pub fn new(cubes: Vec<Cube>) -> Self {
        Self { cubes, gpu: None }
    }

    /// A 3x3 grid of cubes of alternating size, with one bright cube in
    /// the middle to show off bloom.
    #[must_use]
    pub fn sample() -> Self {
        let mut cubes = Vec::with_capacity(9);
        for x in -1..=1 {
            for z in -1..=1 {
                let center = x == 0 && z == 0;
                let even = (x + z) % 2 == 0;
                cubes.push(Cube {
                    center: Vec3::new(x as f32 * 3.0, 0.0, z as f32 * 3.0),
                    half_extent: if even { 1.0 } else { 0.6 },
                    color: if center {
                        [1.0, 0.95, 0.8]
                    } else if even {
                        [0.2, 0.45, 0.8]
                    } else {
                        [0.85, 0.35, 0.25]
                    },
                });
            }
        }
        Self::new(cubes)
    }

    /// The cubes.
    #[must_use]
    pub fn cubes(&self) -> &[Cube] {
        &self.cubes
    }

    /// All cube vertices, in order.
    #[must_use]
    pub fn vertices(&self) -> Vec<SceneVertex> {
        self.cubes.iter().flat_map(Cube::vertices).collect()
    }
}

impl SceneGraph for DemoScene {
    fn bounds(&self) -> Option<BoundingVolume> {
        self.cubes
            .iter()
            .map(Cube::bounds)
            .reduce(|acc, b| acc.union(&b))
    }

    fn prepare(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        info: &SceneTargetInfo<'_>,
    ) -> Result<(), ViewerError> {
        let device = &context.device;
        let shader = composer.compose(
            device,
            "Scene Shader",
            include_str!("../assets/shaders/raster/scene.wgsl"),
            "raster/scene.wgsl",
        )?;
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[info.camera_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[SceneVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: info.color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: info.depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertices = self.vertices();
        let vertex_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Scene Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        log::debug!(
            "demo scene prepared: {} cubes, {} vertices",
            self.cubes.len(),
            vertices.len()
        );
        self.gpu = Some(DemoGpu {
            pipeline,
            vertex_buffer,
            vertex_count: vertices.len() as u32,
        });
        Ok(())
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, camera: &wgpu::BindGroup) {
        let Some(gpu) = &self.gpu else {
            return;
        };
        pass.set_pipeline(&gpu.pipeline);
        pass.set_bind_group(0, camera, &[]);
        pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        pass.draw(0..gpu.vertex_count, 0..1);
    }
}
