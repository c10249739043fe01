//! Reference model backend: Wavefront OBJ meshes drawn with Lambert shading.

use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::bridge::{ModelBackend, ModelDrawer, OutputLayout};
use crate::camera::Camera;
use crate::device::GpuContext;
use crate::error::BridgeError;

/// Interleaved vertex as consumed by `shaders/mesh.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Uniforms for mesh rendering.
/// Note: Layout must match WGSL `MeshUniforms` exactly (96 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Direction towards the light (xyz), w unused.
    pub light_dir: [f32; 4],
    pub base_color: [f32; 4],
}

impl Default for MeshUniforms {
    fn default() -> Self {
        Self {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            light_dir: [0.4, 0.8, 0.6, 0.0],
            base_color: [0.8, 0.8, 0.8, 1.0],
        }
    }
}

/// CPU-side triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Loads and merges every object in an OBJ file.
    ///
    /// Faces are triangulated and vertices single-indexed. Objects without a
    /// full set of normals get area-weighted vertex normals.
    pub fn from_obj(path: &Path) -> Result<Self, BridgeError> {
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )?;

        let mut mesh = MeshData::default();
        for model in models {
            mesh.append(&model.mesh)?;
        }

        if mesh.indices.is_empty() {
            return Err(BridgeError::EmptyModel);
        }
        log::debug!(
            "parsed '{}': {} vertices, {} triangles",
            path.display(),
            mesh.positions.len(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    fn append(&mut self, obj: &tobj::Mesh) -> Result<(), BridgeError> {
        let offset = u32::try_from(self.positions.len())
            .map_err(|_| BridgeError::Parse("too many vertices".to_string()))?;
        let positions: Vec<Vec3> = obj
            .positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .collect();
        let count = positions.len();

        if let Some(bad) = obj.indices.iter().find(|&&i| i as usize >= count) {
            return Err(BridgeError::Parse(format!(
                "index {bad} out of range for {count} vertices"
            )));
        }

        let normals = if obj.normals.len() == obj.positions.len() {
            obj.normals
                .chunks_exact(3)
                .map(|n| Vec3::new(n[0], n[1], n[2]))
                .collect()
        } else {
            compute_normals(&positions, &obj.indices)
        };

        self.positions.extend(positions);
        self.normals.extend(normals);
        self.indices.extend(obj.indices.iter().map(|i| i + offset));
        Ok(())
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds of the vertices, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(min, max), &p| (min.min(p), max.max(p))),
        )
    }

    /// Interleaves positions and normals.
    pub fn vertices(&self) -> Vec<MeshVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .map(|(p, n)| MeshVertex {
                position: p.to_array(),
                normal: n.to_array(),
            })
            .collect()
    }
}

/// Area-weighted vertex normals for a triangle list.
///
/// Vertices not referenced by any non-degenerate triangle get +Y.
pub fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        // Unnormalized cross product weights by area.
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
        .collect()
}

/// Vertex and index buffers of an uploaded mesh.
pub struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl Drop for MeshBuffers {
    fn drop(&mut self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

/// A mesh resident on the device.
///
/// The buffers are shared with the drawer the model is bound to and released
/// when the last holder drops.
pub struct MeshModel {
    buffers: Arc<MeshBuffers>,
    bounds: (Vec3, Vec3),
}

impl MeshModel {
    /// Uploads mesh data.
    pub fn upload(gpu: &GpuContext, mesh: &MeshData) -> Result<Self, BridgeError> {
        let bounds = mesh.bounds().ok_or(BridgeError::EmptyModel)?;
        let index_count = u32::try_from(mesh.indices.len())
            .map_err(|_| BridgeError::Parse("too many indices".to_string()))?;
        if index_count == 0 {
            return Err(BridgeError::EmptyModel);
        }

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&mesh.vertices()),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Ok(Self {
            buffers: Arc::new(MeshBuffers {
                vertex_buffer,
                index_buffer,
                index_count,
            }),
            bounds,
        })
    }

    /// Axis-aligned bounds.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.bounds
    }

    /// Number of indices to draw.
    pub fn index_count(&self) -> u32 {
        self.buffers.index_count
    }
}

/// Loads OBJ files and draws them with [`MeshDrawer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjBackend {
    /// Surface color (RGBA).
    pub base_color: [f32; 4],
}

impl Default for ObjBackend {
    fn default() -> Self {
        Self {
            base_color: MeshUniforms::default().base_color,
        }
    }
}

impl ModelBackend for ObjBackend {
    type Model = MeshModel;
    type Drawer = MeshDrawer;

    fn load_model(&self, gpu: &GpuContext, path: &Path) -> Result<MeshModel, BridgeError> {
        let mesh = MeshData::from_obj(path)?;
        MeshModel::upload(gpu, &mesh)
    }

    fn bind_drawer(
        &self,
        gpu: &GpuContext,
        layout: &OutputLayout,
    ) -> Result<MeshDrawer, BridgeError> {
        Ok(MeshDrawer::new(gpu, layout, self.base_color))
    }
}

/// Draws a single [`MeshModel`] framed by a fitted [`Camera`].
pub struct MeshDrawer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    uniforms: MeshUniforms,
    camera: Camera,
    mesh: Option<Arc<MeshBuffers>>,
}

impl MeshDrawer {
    /// Creates the pipeline for the given output layout.
    pub fn new(gpu: &GpuContext, layout: &OutputLayout, base_color: [f32; 4]) -> Self {
        let device = &gpu.device;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: layout.color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: layout.raster.primitive,
            depth_stencil: Some(wgpu::DepthStencilState {
                format: layout.depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: layout.raster.multisample,
            multiview: None,
            cache: None,
        });

        let uniforms = MeshUniforms {
            base_color,
            ..Default::default()
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
            uniforms,
            camera: Camera::default(),
            mesh: None,
        }
    }

    /// The camera used for the last [`ModelDrawer::set_model`] call.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }
}

impl ModelDrawer for MeshDrawer {
    type Model = MeshModel;

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.camera = Camera::for_viewport(width, height);
    }

    fn set_model(&mut self, gpu: &GpuContext, model: &MeshModel) {
        let (min, max) = model.bounds();
        self.camera.look_at_box(min, max);

        // Light comes from over the camera's shoulder.
        let light = (self.camera.position - self.camera.target).normalize_or(Vec3::Y) + Vec3::Y;
        self.uniforms.view_proj = self.camera.view_projection_matrix().to_cols_array_2d();
        self.uniforms.light_dir = light.normalize_or(Vec3::Y).extend(0.0).to_array();
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniforms]));

        self.mesh = Some(Arc::clone(&model.buffers));
    }

    fn draw(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(mesh) = &self.mesh else {
            log::warn!("mesh drawer has no model bound; skipping draw");
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}

impl Drop for MeshDrawer {
    fn drop(&mut self) {
        self.uniform_buffer.destroy();
    }
}
