//! Bottom level structures per model and the top level structure over all instances.
//!
//! The descriptions are computed on the host from the packed scene, so the addressing can be
//! checked without a device. [`SceneAccelerationStructures::build`] then turns them into
//! device builds.

use ash::vk;
use log::info;

use crate::error::RenderError;
use crate::scene::{Aabb, Scene, Vertex};
use crate::scene_packer::PackedScene;
use crate::vulkan::acceleration_structure::AccelerationStructure;
use crate::vulkan::buffer::Buffer;
use crate::vulkan::command_pool::CommandPool;

const INDEX_SIZE: vk::DeviceSize = std::mem::size_of::<u32>() as vk::DeviceSize;
const AABB_STRIDE: vk::DeviceSize = std::mem::size_of::<Aabb>() as vk::DeviceSize;
/// The instance custom index is a 24 bit field
const MAX_INSTANCES: usize = 1 << 24;

/// The single geometry of one model's bottom level structure. Offsets are in bytes from the
/// start of the shared buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BottomLevelGeometry {
    Triangles {
        vertex_byte_offset: vk::DeviceSize,
        max_vertex: u32,
        index_byte_offset: vk::DeviceSize,
        primitive_count: u32,
    },
    Aabbs {
        aabb_byte_offset: vk::DeviceSize,
    },
}

/// Device addresses of the shared geometry buffers.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeometryAddresses {
    pub vertices: vk::DeviceAddress,
    pub indices: vk::DeviceAddress,
    /// Zero when the scene has no procedural models
    pub aabbs: vk::DeviceAddress,
}

impl BottomLevelGeometry {
    pub fn primitive_count(&self) -> u32 {
        match self {
            BottomLevelGeometry::Triangles {
                primitive_count, ..
            } => *primitive_count,
            BottomLevelGeometry::Aabbs { .. } => 1,
        }
    }

    pub fn build_range(&self) -> vk::AccelerationStructureBuildRangeInfoKHR {
        vk::AccelerationStructureBuildRangeInfoKHR {
            primitive_count: self.primitive_count(),
            primitive_offset: 0,
            first_vertex: 0,
            transform_offset: 0,
        }
    }

    pub fn geometry(&self, addresses: &GeometryAddresses) -> vk::AccelerationStructureGeometryKHR {
        match *self {
            BottomLevelGeometry::Triangles {
                vertex_byte_offset,
                max_vertex,
                index_byte_offset,
                ..
            } => {
                let (vertex_format, position_offset) = Vertex::position_format();
                let triangles = vk::AccelerationStructureGeometryTrianglesDataKHR::builder()
                    .vertex_format(vertex_format)
                    .vertex_data(vk::DeviceOrHostAddressConstKHR {
                        device_address: addresses.vertices + vertex_byte_offset + position_offset,
                    })
                    .vertex_stride(Vertex::STRIDE)
                    .max_vertex(max_vertex)
                    .index_type(vk::IndexType::UINT32)
                    .index_data(vk::DeviceOrHostAddressConstKHR {
                        device_address: addresses.indices + index_byte_offset,
                    })
                    .build();

                vk::AccelerationStructureGeometryKHR::builder()
                    .geometry_type(vk::GeometryTypeKHR::TRIANGLES)
                    .geometry(vk::AccelerationStructureGeometryDataKHR { triangles })
                    .flags(vk::GeometryFlagsKHR::OPAQUE)
                    .build()
            }
            BottomLevelGeometry::Aabbs { aabb_byte_offset } => {
                let aabbs = vk::AccelerationStructureGeometryAabbsDataKHR::builder()
                    .data(vk::DeviceOrHostAddressConstKHR {
                        device_address: addresses.aabbs + aabb_byte_offset,
                    })
                    .stride(AABB_STRIDE)
                    .build();

                vk::AccelerationStructureGeometryKHR::builder()
                    .geometry_type(vk::GeometryTypeKHR::AABBS)
                    .geometry(vk::AccelerationStructureGeometryDataKHR { aabbs })
                    .flags(vk::GeometryFlagsKHR::OPAQUE)
                    .build()
            }
        }
    }
}

/// One geometry per model, in registration order.
pub fn bottom_level_geometries(scene: &Scene, packed: &PackedScene) -> Vec<BottomLevelGeometry> {
    scene
        .models()
        .iter()
        .zip(&packed.model_offsets)
        .zip(&packed.aabb_slots)
        .map(|((model, offset), aabb_slot)| match aabb_slot {
            Some(slot) => BottomLevelGeometry::Aabbs {
                aabb_byte_offset: *slot as vk::DeviceSize * AABB_STRIDE,
            },
            None => BottomLevelGeometry::Triangles {
                vertex_byte_offset: offset.vertex_offset as vk::DeviceSize * Vertex::STRIDE,
                max_vertex: model.vertices().len() as u32 - 1,
                index_byte_offset: offset.index_offset as vk::DeviceSize * INDEX_SIZE,
                primitive_count: model.indices().len() as u32 / 3,
            },
        })
        .collect()
}

/// Top level records in instance order. `bottom_level_addresses` is indexed by model.
pub fn instance_records(
    scene: &Scene,
    bottom_level_addresses: &[Option<vk::DeviceAddress>],
) -> Result<Vec<vk::AccelerationStructureInstanceKHR>, RenderError> {
    check_instance_count(scene.instances().len())?;
    scene
        .instances()
        .iter()
        .enumerate()
        .map(|(index, instance)| {
            let model_index = instance.model.index();
            let device_handle = bottom_level_addresses
                .get(model_index)
                .copied()
                .flatten()
                .ok_or(RenderError::UnboundBottomLevel(model_index as u32))?;
            let hit_group = scene
                .model(instance.model)
                .ok_or(RenderError::UnboundBottomLevel(model_index as u32))?
                .hit_group();

            Ok(vk::AccelerationStructureInstanceKHR {
                transform: instance.transform.into(),
                instance_custom_index_and_mask: vk::Packed24_8::new(index as u32, 0xff),
                instance_shader_binding_table_record_offset_and_flags: vk::Packed24_8::new(
                    hit_group.binding_table_offset(),
                    vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE.as_raw() as u8,
                ),
                acceleration_structure_reference: vk::AccelerationStructureReferenceKHR {
                    device_handle,
                },
            })
        })
        .collect()
}

fn check_instance_count(count: usize) -> Result<(), RenderError> {
    if count > MAX_INSTANCES {
        return Err(RenderError::TooManyInstances {
            count,
            limit: MAX_INSTANCES,
        });
    }
    Ok(())
}

pub struct SceneAccelerationStructures {
    top_level: AccelerationStructure,
    _instance_buffer: Buffer<vk::AccelerationStructureInstanceKHR>,
    _bottom_levels: Vec<AccelerationStructure>,
}

impl SceneAccelerationStructures {
    pub fn build(
        command_pool: &CommandPool,
        scene: &Scene,
        packed: &PackedScene,
        addresses: &GeometryAddresses,
    ) -> Result<Self, RenderError> {
        let bottom_levels: Vec<AccelerationStructure> = bottom_level_geometries(scene, packed)
            .iter()
            .map(|geometry| {
                AccelerationStructure::build(
                    command_pool,
                    vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL,
                    &[geometry.geometry(addresses)],
                    &[geometry.build_range()],
                )
            })
            .collect();
        info!("Built {} bottom level structures", bottom_levels.len());

        let bottom_level_addresses: Vec<Option<vk::DeviceAddress>> = bottom_levels
            .iter()
            .map(|bottom_level| Some(bottom_level.device_address))
            .collect();
        let records = instance_records(scene, &bottom_level_addresses)?;

        let instance_buffer = Buffer::new_device_local(
            command_pool,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            &records,
        );

        let instances = vk::AccelerationStructureGeometryInstancesDataKHR::builder()
            .array_of_pointers(false)
            .data(vk::DeviceOrHostAddressConstKHR {
                device_address: instance_buffer.get_device_address(),
            })
            .build();
        let geometry = vk::AccelerationStructureGeometryKHR::builder()
            .geometry_type(vk::GeometryTypeKHR::INSTANCES)
            .geometry(vk::AccelerationStructureGeometryDataKHR { instances })
            .flags(vk::GeometryFlagsKHR::OPAQUE)
            .build();
        let range = vk::AccelerationStructureBuildRangeInfoKHR {
            primitive_count: records.len() as u32,
            ..Default::default()
        };

        let top_level = AccelerationStructure::build(
            command_pool,
            vk::AccelerationStructureTypeKHR::TOP_LEVEL,
            &[geometry],
            &[range],
        );
        info!("Built top level structure over {} instances", records.len());

        Ok(Self {
            top_level,
            _instance_buffer: instance_buffer,
            _bottom_levels: bottom_levels,
        })
    }

    pub fn top_level(&self) -> vk::AccelerationStructureKHR {
        self.top_level.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::shapes::{box_model, sphere_model};
    use crate::scene::{Material, Model, Texture};
    use crate::scene_packer;
    use crate::transform::AffineTransform;
    use ultraviolet::{Vec2, Vec3};

    fn model_with(vertex_count: usize, index_count: usize) -> Model {
        let vertices = vec![
            Vertex::new(Vec3::zero(), Vec3::unit_z(), Vec3::one(), Vec2::zero());
            vertex_count
        ];
        let indices = (0..index_count as u32).map(|i| i % vertex_count as u32).collect();
        Model::triangles("mesh", vertices, indices)
    }

    fn grey() -> Material {
        Material::Lambertian {
            texture: Texture::flat(0.5, 0.5, 0.5),
        }
    }

    /// Models [A: 4 vertices / 6 indices, B: 8 vertices / 36 indices], instances [B, A, B]
    fn two_models_three_instances() -> Scene {
        let mut scene = Scene::new();
        let a = scene.add_model(model_with(4, 6)).unwrap();
        let b = scene.add_model(model_with(8, 36)).unwrap();
        for model in [b, a, b] {
            scene
                .add_instance(model, AffineTransform::identity(), grey())
                .unwrap();
        }
        scene
    }

    #[test]
    fn instance_count_fits_the_custom_index() {
        assert!(check_instance_count(0).is_ok());
        assert!(check_instance_count(MAX_INSTANCES).is_ok());
        assert!(matches!(
            check_instance_count(MAX_INSTANCES + 1),
            Err(RenderError::TooManyInstances {
                count,
                limit: MAX_INSTANCES
            }) if count == MAX_INSTANCES + 1
        ));
    }

    #[test]
    fn triangle_geometry_starts_at_model_offsets() {
        let scene = two_models_three_instances();
        let packed = scene_packer::pack(&scene);
        let geometries = bottom_level_geometries(&scene, &packed);

        assert_eq!(
            geometries,
            vec![
                BottomLevelGeometry::Triangles {
                    vertex_byte_offset: 0,
                    max_vertex: 3,
                    index_byte_offset: 0,
                    primitive_count: 2,
                },
                BottomLevelGeometry::Triangles {
                    vertex_byte_offset: 4 * 44,
                    max_vertex: 7,
                    index_byte_offset: 6 * 4,
                    primitive_count: 12,
                },
            ]
        );
    }

    #[test]
    fn procedural_geometry_uses_aabb_slots() {
        let mut scene = Scene::new();
        scene.add_model(sphere_model()).unwrap();
        scene.add_model(box_model()).unwrap();
        scene.add_model(sphere_model()).unwrap();
        let packed = scene_packer::pack(&scene);
        let geometries = bottom_level_geometries(&scene, &packed);

        assert_eq!(
            geometries[0],
            BottomLevelGeometry::Aabbs {
                aabb_byte_offset: 0
            }
        );
        assert_eq!(
            geometries[2],
            BottomLevelGeometry::Aabbs {
                aabb_byte_offset: 24
            }
        );
        assert_eq!(geometries[2].primitive_count(), 1);
        assert!(matches!(
            geometries[1],
            BottomLevelGeometry::Triangles {
                vertex_byte_offset: 0,
                primitive_count: 12,
                ..
            }
        ));
    }

    #[test]
    fn geometry_addresses_are_offset_into_shared_buffers() {
        let geometry = BottomLevelGeometry::Triangles {
            vertex_byte_offset: 176,
            max_vertex: 7,
            index_byte_offset: 24,
            primitive_count: 12,
        };
        let addresses = GeometryAddresses {
            vertices: 0x10000,
            indices: 0x20000,
            aabbs: 0,
        };
        let vk_geometry = geometry.geometry(&addresses);
        let triangles = unsafe { vk_geometry.geometry.triangles };

        assert_eq!(vk_geometry.geometry_type, vk::GeometryTypeKHR::TRIANGLES);
        assert_eq!(unsafe { triangles.vertex_data.device_address }, 0x10000 + 176);
        assert_eq!(unsafe { triangles.index_data.device_address }, 0x20000 + 24);
        assert_eq!(triangles.vertex_stride, 44);
        assert_eq!(triangles.max_vertex, 7);
        assert_eq!(geometry.build_range().primitive_count, 12);
    }

    #[test]
    fn instance_records_follow_instance_order() {
        let scene = two_models_three_instances();
        let addresses = [Some(0xA000), Some(0xB000)];
        let records = instance_records(&scene, &addresses).unwrap();

        assert_eq!(records.len(), 3);
        let references: Vec<u64> = records
            .iter()
            .map(|record| unsafe { record.acceleration_structure_reference.device_handle })
            .collect();
        assert_eq!(references, vec![0xB000, 0xA000, 0xB000]);

        for (index, record) in records.iter().enumerate() {
            assert_eq!(record.instance_custom_index_and_mask.low_24(), index as u32);
            assert_eq!(record.instance_custom_index_and_mask.high_8(), 0xff);
            assert_eq!(
                record
                    .instance_shader_binding_table_record_offset_and_flags
                    .high_8(),
                vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE.as_raw() as u8
            );
        }
    }

    #[test]
    fn binding_table_offset_follows_hit_group() {
        let mut scene = Scene::new();
        let cube = scene.add_model(box_model()).unwrap();
        let sphere = scene.add_model(sphere_model()).unwrap();
        let procedural_box = scene
            .add_model(crate::scene::shapes::procedural_box_model())
            .unwrap();
        for model in [sphere, cube, procedural_box] {
            scene
                .add_instance(model, AffineTransform::identity(), grey())
                .unwrap();
        }

        let records = instance_records(&scene, &[Some(1), Some(2), Some(3)]).unwrap();
        let offsets: Vec<u32> = records
            .iter()
            .map(|record| {
                record
                    .instance_shader_binding_table_record_offset_and_flags
                    .low_24()
            })
            .collect();
        assert_eq!(offsets, vec![1, 0, 2]);
    }

    #[test]
    fn instance_transform_is_copied() {
        let mut scene = Scene::new();
        let model = scene.add_model(box_model()).unwrap();
        let transform = AffineTransform::from(ultraviolet::Mat4::from_translation(Vec3::new(
            1.0, 2.0, 3.0,
        )));
        scene.add_instance(model, transform, grey()).unwrap();

        let records = instance_records(&scene, &[Some(1)]).unwrap();
        let matrix = records[0].transform.matrix;
        assert_eq!(matrix[3], 1.0);
        assert_eq!(matrix[7], 2.0);
        assert_eq!(matrix[11], 3.0);
    }

    #[test]
    fn missing_bottom_level_is_fatal() {
        let scene = two_models_three_instances();
        let error = instance_records(&scene, &[Some(0xA000), None]).unwrap_err();
        assert!(matches!(error, RenderError::UnboundBottomLevel(1)));

        let error = instance_records(&scene, &[Some(0xA000)]).unwrap_err();
        assert!(matches!(error, RenderError::UnboundBottomLevel(1)));
    }
}
