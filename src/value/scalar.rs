//! Scalar shader types: `bool`, `int`, `uint`, `float`.

use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Rem, Sub};

use crate::ir::{Node, Opcode};
use crate::layout::{ScalarKind, ShaderType};

use super::{Expr, ShaderTypeTag};

macro_rules! scalar_tag {
    ($name:ident, $glsl:literal, $kind:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl ShaderTypeTag for $name {
            fn shader_type_name() -> &'static str {
                $glsl
            }
            fn device_type() -> ShaderType {
                ShaderType::Scalar($kind)
            }
        }
    };
}

scalar_tag!(Bool, "bool", ScalarKind::Bool);
scalar_tag!(I32, "int", ScalarKind::Int);
scalar_tag!(U32, "uint", ScalarKind::UInt);
scalar_tag!(F32, "float", ScalarKind::Float);

pub type BoolExpr = Expr<Bool>;
pub type IntExpr = Expr<I32>;
pub type UIntExpr = Expr<U32>;
pub type FloatExpr = Expr<F32>;

fn format_float(value: f32) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

impl Expr<F32> {
    pub fn literal(value: f32) -> Expr<F32> {
        Expr::from_node(Node::RawFragment { text: format_float(value) })
    }
}

impl Expr<I32> {
    pub fn literal(value: i32) -> Expr<I32> {
        Expr::from_node(Node::RawFragment { text: value.to_string() })
    }
}

impl Expr<U32> {
    pub fn literal(value: u32) -> Expr<U32> {
        Expr::from_node(Node::RawFragment { text: format!("{value}u") })
    }
}

impl Expr<Bool> {
    pub fn literal(value: bool) -> Expr<Bool> {
        Expr::from_node(Node::RawFragment { text: value.to_string() })
    }
}

macro_rules! bin_op {
    ($trait_:ident, $method:ident, $opcode:expr, $ty:ty) => {
        impl $trait_ for Expr<$ty> {
            type Output = Expr<$ty>;
            fn $method(self, rhs: Expr<$ty>) -> Expr<$ty> {
                Expr::from_node(Node::operation($opcode, self.into_node(), Some(rhs.into_node())))
            }
        }
    };
}

bin_op!(Add, add, Opcode::Add, I32);
bin_op!(Add, add, Opcode::Add, U32);
bin_op!(Add, add, Opcode::Add, F32);
bin_op!(Sub, sub, Opcode::Sub, I32);
bin_op!(Sub, sub, Opcode::Sub, U32);
bin_op!(Sub, sub, Opcode::Sub, F32);
bin_op!(Mul, mul, Opcode::Mul, I32);
bin_op!(Mul, mul, Opcode::Mul, U32);
bin_op!(Mul, mul, Opcode::Mul, F32);
bin_op!(Div, div, Opcode::Div, I32);
bin_op!(Div, div, Opcode::Div, U32);
bin_op!(Div, div, Opcode::Div, F32);
bin_op!(Rem, rem, Opcode::Mod, I32);
bin_op!(Rem, rem, Opcode::Mod, U32);
bin_op!(BitAnd, bitand, Opcode::BitAnd, I32);
bin_op!(BitAnd, bitand, Opcode::BitAnd, U32);
bin_op!(BitOr, bitor, Opcode::BitOr, I32);
bin_op!(BitOr, bitor, Opcode::BitOr, U32);
bin_op!(BitXor, bitxor, Opcode::BitXor, I32);
bin_op!(BitXor, bitxor, Opcode::BitXor, U32);

impl Neg for Expr<I32> {
    type Output = Expr<I32>;
    fn neg(self) -> Expr<I32> {
        Expr::from_node(Node::operation(Opcode::Neg, self.into_node(), None))
    }
}

impl Neg for Expr<F32> {
    type Output = Expr<F32>;
    fn neg(self) -> Expr<F32> {
        Expr::from_node(Node::operation(Opcode::Neg, self.into_node(), None))
    }
}

impl Not for Expr<Bool> {
    type Output = Expr<Bool>;
    fn not(self) -> Expr<Bool> {
        Expr::from_node(Node::operation(Opcode::Not, self.into_node(), None))
    }
}

macro_rules! cmp_op {
    ($name:ident, $opcode:expr, $ty:ty) => {
        impl Expr<$ty> {
            pub fn $name(self, rhs: Expr<$ty>) -> Expr<Bool> {
                Expr::from_node(Node::operation($opcode, self.into_node(), Some(rhs.into_node())))
            }
        }
    };
}

cmp_op!(eq, Opcode::Eq, I32);
cmp_op!(ne, Opcode::Ne, I32);
cmp_op!(lt, Opcode::Lt, I32);
cmp_op!(le, Opcode::Le, I32);
cmp_op!(gt, Opcode::Gt, I32);
cmp_op!(ge, Opcode::Ge, I32);
cmp_op!(eq, Opcode::Eq, U32);
cmp_op!(lt, Opcode::Lt, U32);
cmp_op!(ge, Opcode::Ge, U32);
cmp_op!(eq, Opcode::Eq, F32);
cmp_op!(lt, Opcode::Lt, F32);
cmp_op!(le, Opcode::Le, F32);
cmp_op!(gt, Opcode::Gt, F32);
cmp_op!(ge, Opcode::Ge, F32);

impl Expr<Bool> {
    pub fn and(self, rhs: Expr<Bool>) -> Expr<Bool> {
        Expr::from_node(Node::operation(Opcode::And, self.into_node(), Some(rhs.into_node())))
    }

    pub fn or(self, rhs: Expr<Bool>) -> Expr<Bool> {
        Expr::from_node(Node::operation(Opcode::Or, self.into_node(), Some(rhs.into_node())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_node;

    #[test]
    fn integer_literal_round_trips_through_lowering() {
        assert_eq!(build_node(Expr::<I32>::literal(7).node()), "7");
    }

    #[test]
    fn subtraction_preserves_operand_order() {
        let expr = Expr::<I32>::literal(5) - Expr::<I32>::literal(2);
        assert_eq!(build_node(expr.node()), "(5 - 2)");
    }
}
