//! Plain-data math types.
//!
//! Packed float layouts, binary-compatible with the common math libraries
//! (GLM, Raylib, OpenGL conventions). The core never computes with these;
//! they exist so user code and the builtin transform module have POD types
//! to store in columns and snapshots.

use bytemuck::{Pod, Zeroable};

/// Packed three-component float vector.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vec3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    /// The all-ones vector.
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };

    /// Builds a vector from its components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }
}

/// Packed quaternion, `(x, y, z, w)` with `w` the scalar part.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Quat {
    /// X component of the vector part.
    pub x: f32,
    /// Y component of the vector part.
    pub y: f32,
    /// Z component of the vector part.
    pub z: f32,
    /// Scalar part.
    pub w: f32,
}

impl Quat {
    /// The identity rotation.
    pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };
}

/// Packed 4x4 float matrix, column-major.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    /// The sixteen matrix elements; `m[col * 4 + row]`.
    pub m: [f32; 16],
}

impl Mat4 {
    /// The identity matrix.
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Computes `a * b`.
    pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
        let mut r = Mat4 { m: [0.0; 16] };
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a.m[k * 4 + row] * b.m[col * 4 + k];
                }
                r.m[col * 4 + row] = sum;
            }
        }
        r
    }

    /// Builds a translation matrix.
    pub fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        let mut r = Mat4::IDENTITY;
        r.m[12] = x;
        r.m[13] = y;
        r.m[14] = z;
        r
    }

    /// Composes a transform matrix from position, rotation, and scale.
    pub fn compose(position: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
        let Quat { x, y, z, w } = rotation;
        let x2 = x + x;
        let y2 = y + y;
        let z2 = z + z;
        let xx = x * x2;
        let xy = x * y2;
        let xz = x * z2;
        let yy = y * y2;
        let yz = y * z2;
        let zz = z * z2;
        let wx = w * x2;
        let wy = w * y2;
        let wz = w * z2;

        let mut r = Mat4 { m: [0.0; 16] };
        r.m[0] = (1.0 - (yy + zz)) * scale.x;
        r.m[1] = (xy + wz) * scale.x;
        r.m[2] = (xz - wy) * scale.x;

        r.m[4] = (xy - wz) * scale.y;
        r.m[5] = (1.0 - (xx + zz)) * scale.y;
        r.m[6] = (yz + wx) * scale.y;

        r.m[8] = (xz + wy) * scale.z;
        r.m[9] = (yz - wx) * scale.z;
        r.m[10] = (1.0 - (xx + yy)) * scale.z;

        r.m[12] = position.x;
        r.m[13] = position.y;
        r.m[14] = position.z;
        r.m[15] = 1.0;
        r
    }

    /// The translation column of the matrix.
    pub fn translation_of(&self) -> Vec3 {
        Vec3::new(self.m[12], self.m[13], self.m[14])
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::IDENTITY
    }
}
