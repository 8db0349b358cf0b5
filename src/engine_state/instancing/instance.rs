//! Per-instance records as they are laid out in GPU memory.

use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix, Vector3};
use log::warn;

/// Column-major model transform of one block instance.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceModel {
    pub columns: [[f32; 4]; 4],
}

/// Column-major normal transform of one block instance, in view space.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceNormal {
    pub columns: [[f32; 3]; 3],
}

impl InstanceModel {
    /// The identity transform translated to `position`.
    pub fn from_translation(position: Vector3<f32>) -> Self {
        Self {
            columns: Matrix4::from_translation(position).into(),
        }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from(self.columns)
    }

    /// The translation column.
    pub fn translation(&self) -> Vector3<f32> {
        let [x, y, z, _] = self.columns[3];
        Vector3::new(x, y, z)
    }
}

impl InstanceNormal {
    pub fn identity() -> Self {
        Self {
            columns: Matrix3::<f32>::identity().into(),
        }
    }

    /// `transpose(inverse(mat3(view * model)))`.
    ///
    /// Falls back to the identity when the upper 3x3 of `view * model` is singular.
    pub fn from_model_view(view: &Matrix4<f32>, model: &InstanceModel) -> Self {
        let model_view = view * model.matrix();
        let linear = Matrix3::from_cols(
            model_view.x.truncate(),
            model_view.y.truncate(),
            model_view.z.truncate(),
        );
        match linear.invert() {
            Some(inverse) => Self {
                columns: inverse.transpose().into(),
            },
            None => {
                warn!("Singular model-view matrix, using identity normal matrix");
                Self::identity()
            }
        }
    }

    pub fn matrix(&self) -> Matrix3<f32> {
        Matrix3::from(self.columns)
    }
}

impl Default for InstanceNormal {
    fn default() -> Self {
        Self::identity()
    }
}
