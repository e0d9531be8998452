use ash::vk;
use serde::{Deserialize, Serialize};
use ultraviolet::{Mat4, Vec3};

/// Placement of a shape. The rotation is applied as x, then negated y, then z, matching the
/// flipped y axis of the Vulkan clip space.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            rotation: Vec3::zero(),
            scale: Vec3::one(),
        }
    }
}

impl From<Transform> for Mat4 {
    fn from(transform: Transform) -> Self {
        Mat4::from_translation(transform.position)
            * Mat4::from_rotation_x(transform.rotation.x)
            * Mat4::from_rotation_y(-transform.rotation.y)
            * Mat4::from_rotation_z(transform.rotation.z)
            * Mat4::from_nonuniform_scale(transform.scale)
    }
}

/// Row major 3x4 matrix, the layout acceleration structure instances expect.
/// The implicit last row is (0, 0, 0, 1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    pub rows: [[f32; 4]; 3],
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            rows: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
        }
    }

    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.rows[0][3], self.rows[1][3], self.rows[2][3])
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Mat4> for AffineTransform {
    fn from(matrix: Mat4) -> Self {
        let columns: [[f32; 4]; 4] = matrix.cols.map(|column| column.into());
        let mut rows = [[0.0; 4]; 3];
        for (row_index, row) in rows.iter_mut().enumerate() {
            for (column_index, value) in row.iter_mut().enumerate() {
                *value = columns[column_index][row_index];
            }
        }
        Self { rows }
    }
}

impl From<Transform> for AffineTransform {
    fn from(transform: Transform) -> Self {
        Mat4::from(transform).into()
    }
}

impl From<AffineTransform> for vk::TransformMatrixKHR {
    fn from(transform: AffineTransform) -> Self {
        let mut matrix = [0.0; 12];
        for (chunk, row) in matrix.chunks_exact_mut(4).zip(transform.rows.iter()) {
            chunk.copy_from_slice(row);
        }
        vk::TransformMatrixKHR { matrix }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_lands_in_last_column() {
        let transform = AffineTransform::from(Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::zero(),
            Vec3::new(2.0, 3.0, 4.0),
        ));
        assert_eq!(transform.translation(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.rows[0][0], 2.0);
        assert_eq!(transform.rows[1][1], 3.0);
        assert_eq!(transform.rows[2][2], 4.0);
    }

    #[test]
    fn identity_by_default() {
        assert_eq!(
            AffineTransform::from(Transform::default()),
            AffineTransform::identity()
        );
    }

    #[test]
    fn vulkan_matrix_is_row_major() {
        let mut transform = AffineTransform::identity();
        transform.rows[0][3] = 5.0;
        transform.rows[2][3] = -1.0;
        let matrix = vk::TransformMatrixKHR::from(transform).matrix;
        assert_eq!(matrix[3], 5.0);
        assert_eq!(matrix[11], -1.0);
        assert_eq!(matrix[0], 1.0);
        assert_eq!(matrix[5], 1.0);
        assert_eq!(matrix[10], 1.0);
    }

    #[test]
    fn rotation_about_z_turns_x_into_y() {
        let transform = AffineTransform::from(Transform::new(
            Vec3::zero(),
            Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            Vec3::one(),
        ));
        // first column is the image of the x axis
        assert!(transform.rows[0][0].abs() < 1e-6);
        assert!((transform.rows[1][0] - 1.0).abs() < 1e-6);
    }
}
