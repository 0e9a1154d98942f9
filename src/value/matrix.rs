//! Matrix shader types (`mat2`/`mat3`/`mat4`), column-major, with columns
//! 16-byte aligned in the std430 device layout (spec §3/§6).

use std::ops::Mul;

use crate::ir::{Node, Opcode};
use crate::layout::{ScalarKind, ShaderType};

use super::vector::{Vec2, Vec3, Vec4};
use super::{Expr, ShaderTypeTag};

macro_rules! matrix_tag {
    ($name:ident, $glsl:literal, $dim:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl ShaderTypeTag for $name {
            fn shader_type_name() -> &'static str {
                $glsl
            }
            fn device_type() -> ShaderType {
                ShaderType::Matrix(ScalarKind::Float, $dim, $dim)
            }
        }
    };
}

matrix_tag!(Mat2, "mat2", 2);
matrix_tag!(Mat3, "mat3", 3);
matrix_tag!(Mat4, "mat4", 4);

impl Mul<Expr<Vec2>> for Expr<Mat2> {
    type Output = Expr<Vec2>;
    fn mul(self, rhs: Expr<Vec2>) -> Expr<Vec2> {
        Expr::from_node(Node::operation(Opcode::Mul, self.into_node(), Some(rhs.into_node())))
    }
}

impl Mul<Expr<Vec3>> for Expr<Mat3> {
    type Output = Expr<Vec3>;
    fn mul(self, rhs: Expr<Vec3>) -> Expr<Vec3> {
        Expr::from_node(Node::operation(Opcode::Mul, self.into_node(), Some(rhs.into_node())))
    }
}

impl Mul<Expr<Vec4>> for Expr<Mat4> {
    type Output = Expr<Vec4>;
    fn mul(self, rhs: Expr<Vec4>) -> Expr<Vec4> {
        Expr::from_node(Node::operation(Opcode::Mul, self.into_node(), Some(rhs.into_node())))
    }
}

impl Mul for Expr<Mat4> {
    type Output = Expr<Mat4>;
    fn mul(self, rhs: Expr<Mat4>) -> Expr<Mat4> {
        Expr::from_node(Node::operation(Opcode::Mul, self.into_node(), Some(rhs.into_node())))
    }
}
