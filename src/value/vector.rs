//! Vector shader types (`vec2`/`vec3`/`vec4` and their integer variants)
//! with arbitrary-order, arbitrary-arity swizzling (spec §5 "swizzle round
//! trip" testable property, §9 GLOSSARY "swizzle").

use std::ops::{Add, Div, Mul, Sub};

use crate::error::AuthoringError;
use crate::ir::{Node, Opcode};
use crate::layout::{ScalarKind, ShaderType};

use super::scalar::{F32, I32, U32};
use super::{Expr, ShaderTypeTag};

macro_rules! vector_tag {
    ($name:ident, $glsl:literal, $kind:expr, $len:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl ShaderTypeTag for $name {
            fn shader_type_name() -> &'static str {
                $glsl
            }
            fn device_type() -> ShaderType {
                ShaderType::Vector($kind, $len)
            }
        }

        impl VectorArity for $name {
            const ARITY: u8 = $len;
        }
    };
}

/// The number of components a vector shader type carries — used to
/// validate that a swizzle mask only names components within range.
pub trait VectorArity: ShaderTypeTag {
    const ARITY: u8;
}

vector_tag!(Vec2, "vec2", ScalarKind::Float, 2);
vector_tag!(Vec3, "vec3", ScalarKind::Float, 3);
vector_tag!(Vec4, "vec4", ScalarKind::Float, 4);
vector_tag!(IVec2, "ivec2", ScalarKind::Int, 2);
vector_tag!(IVec3, "ivec3", ScalarKind::Int, 3);
vector_tag!(IVec4, "ivec4", ScalarKind::Int, 4);
vector_tag!(UVec2, "uvec2", ScalarKind::UInt, 2);
vector_tag!(UVec3, "uvec3", ScalarKind::UInt, 3);
vector_tag!(UVec4, "uvec4", ScalarKind::UInt, 4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    X,
    Y,
    Z,
    W,
}

impl Component {
    fn index(self) -> u8 {
        match self {
            Component::X => 0,
            Component::Y => 1,
            Component::Z => 2,
            Component::W => 3,
        }
    }

    fn letter(self) -> char {
        match self {
            Component::X => 'x',
            Component::Y => 'y',
            Component::Z => 'z',
            Component::W => 'w',
        }
    }
}

fn mask_text(mask: &[Component]) -> String {
    mask.iter().map(|c| c.letter()).collect()
}

fn validate_mask(mask: &[Component], arity: u8) -> Result<(), AuthoringError> {
    if mask.is_empty() || mask.len() > 4 || mask.iter().any(|c| c.index() >= arity) {
        return Err(AuthoringError::InvalidSwizzle { mask: mask_text(mask), arity });
    }
    Ok(())
}

impl<T: VectorArity> Expr<T> {
    /// A swizzle of arbitrary order and arity (1-4 components drawn from
    /// `self`'s components, in any order, components repeatable). The
    /// caller picks the result type (`R`) to match the mask's arity —
    /// e.g. `expr.swizzle::<Vec4>(&[W, Z, Y, X])` for a full reversal.
    pub fn swizzle<R: ShaderTypeTag>(self, mask: &[Component]) -> Result<Expr<R>, AuthoringError> {
        validate_mask(mask, T::ARITY)?;
        Ok(Expr::from_node(Node::MemberAccess {
            object: Box::new(self.into_node()),
            member: mask_text(mask),
        }))
    }
}

impl Expr<Vec4> {
    pub fn wzyx(self) -> Expr<Vec4> {
        self.swizzle(&[Component::W, Component::Z, Component::Y, Component::X])
            .expect("wzyx is a valid 4-component mask")
    }

    pub fn x(self) -> Expr<F32> {
        self.swizzle(&[Component::X]).expect("x is always in range")
    }
    pub fn y(self) -> Expr<F32> {
        self.swizzle(&[Component::Y]).expect("y is always in range")
    }
    pub fn z(self) -> Expr<F32> {
        self.swizzle(&[Component::Z]).expect("z is always in range")
    }
    pub fn w(self) -> Expr<F32> {
        self.swizzle(&[Component::W]).expect("w is always in range")
    }

    pub fn new(x: Expr<F32>, y: Expr<F32>, z: Expr<F32>, w: Expr<F32>) -> Expr<Vec4> {
        Expr::from_node(Node::IntrinsicCall {
            name: "vec4".to_string(),
            args: vec![x.into_node(), y.into_node(), z.into_node(), w.into_node()],
        })
    }
}

impl Expr<Vec3> {
    pub fn x(self) -> Expr<F32> {
        self.swizzle(&[Component::X]).expect("x is always in range")
    }
    pub fn y(self) -> Expr<F32> {
        self.swizzle(&[Component::Y]).expect("y is always in range")
    }
    pub fn z(self) -> Expr<F32> {
        self.swizzle(&[Component::Z]).expect("z is always in range")
    }

    pub fn new(x: Expr<F32>, y: Expr<F32>, z: Expr<F32>) -> Expr<Vec3> {
        Expr::from_node(Node::IntrinsicCall {
            name: "vec3".to_string(),
            args: vec![x.into_node(), y.into_node(), z.into_node()],
        })
    }
}

impl Expr<Vec2> {
    pub fn x(self) -> Expr<F32> {
        self.swizzle(&[Component::X]).expect("x is always in range")
    }
    pub fn y(self) -> Expr<F32> {
        self.swizzle(&[Component::Y]).expect("y is always in range")
    }

    pub fn new(x: Expr<F32>, y: Expr<F32>) -> Expr<Vec2> {
        Expr::from_node(Node::IntrinsicCall {
            name: "vec2".to_string(),
            args: vec![x.into_node(), y.into_node()],
        })
    }
}

macro_rules! componentwise_op {
    ($trait_:ident, $method:ident, $opcode:expr, $ty:ty) => {
        impl $trait_ for Expr<$ty> {
            type Output = Expr<$ty>;
            fn $method(self, rhs: Expr<$ty>) -> Expr<$ty> {
                Expr::from_node(Node::operation($opcode, self.into_node(), Some(rhs.into_node())))
            }
        }
    };
}

componentwise_op!(Add, add, Opcode::Add, Vec2);
componentwise_op!(Add, add, Opcode::Add, Vec3);
componentwise_op!(Add, add, Opcode::Add, Vec4);
componentwise_op!(Sub, sub, Opcode::Sub, Vec2);
componentwise_op!(Sub, sub, Opcode::Sub, Vec3);
componentwise_op!(Sub, sub, Opcode::Sub, Vec4);
componentwise_op!(Mul, mul, Opcode::Mul, Vec2);
componentwise_op!(Mul, mul, Opcode::Mul, Vec3);
componentwise_op!(Mul, mul, Opcode::Mul, Vec4);
componentwise_op!(Div, div, Opcode::Div, Vec2);
componentwise_op!(Div, div, Opcode::Div, Vec3);
componentwise_op!(Div, div, Opcode::Div, Vec4);

impl Mul<Expr<F32>> for Expr<Vec3> {
    type Output = Expr<Vec3>;
    fn mul(self, rhs: Expr<F32>) -> Expr<Vec3> {
        Expr::from_node(Node::operation(Opcode::Mul, self.into_node(), Some(rhs.into_node())))
    }
}

impl Mul<Expr<F32>> for Expr<Vec4> {
    type Output = Expr<Vec4>;
    fn mul(self, rhs: Expr<F32>) -> Expr<Vec4> {
        Expr::from_node(Node::operation(Opcode::Mul, self.into_node(), Some(rhs.into_node())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_node;

    #[test]
    fn wzyx_swizzle_lowers_to_member_access() {
        let source = Expr::<Vec4>::from_node(Node::load("in_val"));
        let swizzled = source.wzyx();
        assert_eq!(build_node(swizzled.node()), "in_val.wzyx");
    }

    #[test]
    fn out_of_range_component_is_rejected() {
        let source = Expr::<Vec2>::from_node(Node::load("v"));
        let err = source.swizzle::<Vec3>(&[Component::X, Component::Z, Component::Z]).unwrap_err();
        assert!(matches!(err, AuthoringError::InvalidSwizzle { .. }));
    }
}
