//! std430 device-buffer layout computation (spec §3 "std430 layout rules",
//! §6 struct reflection). Adapted from the std140 layout math in
//! `examples/ennis-artifice/graal-spirv/src/layout.rs`; the key departure is
//! that std430 does not round array/struct base alignment up to the vec4
//! alignment the way std140 does — only the 3-component-vector padding and
//! 16-byte matrix-column alignment rules carry over.

/// The scalar element kind underlying a vector, matrix, or bare scalar
/// shader type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
}

impl ScalarKind {
    fn size(self) -> usize {
        4
    }
}

/// One field of a reflected struct: its declared type and shader-visible
/// name (spec §6 "ordered fields with host offset and shader name" — the
/// host offset is computed separately by [`std430_struct_layout`] and
/// stored alongside this descriptor by `crate::value::structs`).
#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub name: String,
    pub ty: ShaderType,
}

/// A type in shader-reflection terms, used purely for layout math — this is
/// not the IR; `crate::value` types carry one of these alongside their
/// typed Rust representation.
#[derive(Debug, Clone)]
pub enum ShaderType {
    Scalar(ScalarKind),
    Vector(ScalarKind, u8),
    Matrix(ScalarKind, u8, u8),
    Array(Box<ShaderType>, usize),
    Struct(Vec<FieldDesc>),
}

/// Alignment and size of a type, plus (for arrays/structs) the layout
/// needed to compute member offsets.
#[derive(Debug, Clone)]
pub struct Layout {
    pub align: usize,
    pub size: usize,
    pub inner: InnerLayout,
}

#[derive(Debug, Clone)]
pub enum InnerLayout {
    None,
    Array { stride: usize, elem: Box<Layout> },
    Struct { offsets: Vec<usize>, fields: Vec<Layout> },
}

fn round_up(value: usize, multiple: usize) -> usize {
    if multiple == 0 {
        return value;
    }
    let remainder = value % multiple;
    if remainder == 0 {
        value
    } else {
        value + multiple - remainder
    }
}

fn scalar_layout(kind: ScalarKind) -> Layout {
    Layout {
        align: kind.size(),
        size: kind.size(),
        inner: InnerLayout::None,
    }
}

fn vector_layout(kind: ScalarKind, len: u8) -> Layout {
    let n = kind.size();
    match len {
        2 => Layout { align: 2 * n, size: 2 * n, inner: InnerLayout::None },
        // std430 still pads a 3-component vector's *alignment* to that of
        // vec4 (16 bytes for 4-byte components); only its *size* stays 3*n
        // (spec §3: "3-component vectors padded to 16 bytes" refers to the
        // stride between elements, not the scalar payload itself).
        3 => Layout { align: 4 * n, size: 3 * n, inner: InnerLayout::None },
        4 => Layout { align: 4 * n, size: 4 * n, inner: InnerLayout::None },
        other => panic!("unsupported vector arity: {other}"),
    }
}

fn array_layout(elem_ty: &ShaderType, len: usize) -> Layout {
    let elem_layout = std430_layout(elem_ty);
    // std430: array alignment is simply the element's alignment (no vec4
    // rounding, unlike std140's `round_up(elem_layout.align, 16)`).
    let base_align = elem_layout.align;
    let stride = round_up(elem_layout.size, elem_layout.align);
    let array_size = round_up(len * stride, base_align);
    Layout {
        align: base_align,
        size: array_size,
        inner: InnerLayout::Array { stride, elem: Box::new(elem_layout) },
    }
}

/// Each struct's device size rounds up to its own largest-member alignment
/// (not vec4) — the Open Question decision recorded in `DESIGN.md` for
/// nested array-of-structs.
fn struct_layout(fields: &[FieldDesc]) -> Layout {
    let layouts: Vec<Layout> = fields.iter().map(|f| std430_layout(&f.ty)).collect();
    let align = layouts.iter().map(|l| l.align).max().unwrap_or(1);

    let mut offsets = Vec::with_capacity(fields.len());
    let mut offset = 0usize;
    for layout in &layouts {
        offset = round_up(offset, layout.align);
        offsets.push(offset);
        offset += layout.size;
    }
    let size = round_up(offset, align);

    Layout {
        align,
        size,
        inner: InnerLayout::Struct { offsets, fields: layouts },
    }
}

fn matrix_layout(kind: ScalarKind, rows: u8, columns: u8) -> Layout {
    // A matrix is laid out as an array of `columns` column vectors, each
    // column-major and 16-byte aligned (spec §3/§6 "matrix columns 16-byte
    // aligned").
    array_layout(&ShaderType::Vector(kind, rows), columns as usize)
}

/// Computes the std430 layout of `ty`.
pub fn std430_layout(ty: &ShaderType) -> Layout {
    match ty {
        ShaderType::Scalar(kind) => scalar_layout(*kind),
        ShaderType::Vector(kind, len) => vector_layout(*kind, *len),
        ShaderType::Matrix(kind, rows, columns) => matrix_layout(*kind, *rows, *columns),
        ShaderType::Array(elem_ty, len) => array_layout(elem_ty, *len),
        ShaderType::Struct(fields) => struct_layout(fields),
    }
}

/// Per-field `(name, host_offset)` pairs for a struct, computed in
/// declaration order (spec §6 "struct insertion order uniqueness" and
/// "host offset").
pub fn struct_field_offsets(fields: &[FieldDesc]) -> Vec<(String, usize)> {
    let layout = struct_layout(fields);
    let offsets = match layout.inner {
        InnerLayout::Struct { offsets, .. } => offsets,
        _ => unreachable!(),
    };
    fields.iter().zip(offsets).map(|(f, off)| (f.name.clone(), off)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_is_padded_to_16_byte_alignment_but_not_size() {
        let layout = std430_layout(&ShaderType::Vector(ScalarKind::Float, 3));
        assert_eq!(layout.align, 16);
        assert_eq!(layout.size, 12);
    }

    #[test]
    fn particle_struct_offsets_follow_member_order() {
        // struct Particle { vec3 pos; vec3 vel; float life; int ty; }
        let fields = vec![
            FieldDesc { name: "pos".into(), ty: ShaderType::Vector(ScalarKind::Float, 3) },
            FieldDesc { name: "vel".into(), ty: ShaderType::Vector(ScalarKind::Float, 3) },
            FieldDesc { name: "life".into(), ty: ShaderType::Scalar(ScalarKind::Float) },
            FieldDesc { name: "ty".into(), ty: ShaderType::Scalar(ScalarKind::Int) },
        ];
        let offsets = struct_field_offsets(&fields);
        assert_eq!(
            offsets,
            vec![
                ("pos".to_string(), 0),
                ("vel".to_string(), 16),
                ("life".to_string(), 32),
                ("ty".to_string(), 36),
            ]
        );
    }

    #[test]
    fn std430_array_does_not_round_align_to_vec4() {
        let layout = std430_layout(&ShaderType::Array(Box::new(ShaderType::Scalar(ScalarKind::Float)), 4));
        assert_eq!(layout.align, 4);
        assert_eq!(layout.size, 16);
    }
}
