//! Structured error types (spec §7).
//!
//! Every error surfaces at the call that caused it; nothing here is
//! retried internally except where the caller explicitly asks for a retry
//! (dispatch errors). Compile and link errors carry enough structure for a
//! caller to print a framed, column-pointing listing (spec §7, "user-visible
//! presentation") without re-parsing a string.

use thiserror::Error;

/// Which shader stage a [`CompileError`] or [`LinkError`] stage tag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Compute,
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ShaderStage::Compute => "compute",
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// One diagnostic line, in the shape the compile-error "framed listing"
/// presentation (spec §7) numbers and underlines.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Authoring misuse: an API called outside any kernel block, an
/// unsupported resource/uniform type, or a type mismatch between an
/// operator and its operands. Raised immediately; fatal at that call.
#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error("{api} called outside of an active kernel build context")]
    NoActiveContext { api: &'static str },
    #[error("unsupported type `{ty}` for {role}")]
    UnsupportedType { ty: String, role: &'static str },
    #[error("type mismatch: {op} expects operands of the same kind, got `{lhs}` and `{rhs}`")]
    TypeMismatch {
        op: &'static str,
        lhs: String,
        rhs: String,
    },
    #[error("`{dimension}` must be nonzero, got {value}")]
    InvalidDimension { dimension: &'static str, value: u32 },
    #[error("swizzle mask `{mask}` is invalid for a {arity}-component vector")]
    InvalidSwizzle { mask: String, arity: u8 },
}

/// The driver refused to allocate a buffer, texture, or program object.
#[derive(Debug, Error)]
#[error("failed to create {kind}: {message}")]
pub struct ResourceError {
    pub kind: &'static str,
    pub message: String,
}

/// Shader compilation failed.
#[derive(Debug, Error)]
#[error("{stage} shader compilation failed ({} diagnostic(s))", diagnostics.len())]
pub struct CompileError {
    pub stage: ShaderStage,
    pub source_text: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    /// Render the framed, line-numbered listing described in spec §7.
    /// `decorate` toggles the column-pointing caret line; non-TTY
    /// consumers pass `false`.
    pub fn framed(&self, decorate: bool) -> String {
        let lines: Vec<&str> = self.source_text.lines().collect();
        let mut out = String::new();
        for diag in &self.diagnostics {
            out.push_str(&format!(
                "{:?} {}:{}:{}: {}\n",
                diag.severity, diag.file, diag.line, diag.column, diag.message
            ));
            if let Some(src_line) = lines.get(diag.line.saturating_sub(1) as usize) {
                out.push_str(&format!("{:>5} | {}\n", diag.line, src_line));
                if decorate {
                    let pad = " ".repeat(diag.column.saturating_sub(1) as usize);
                    out.push_str(&format!("      | {pad}^\n"));
                }
            }
        }
        out
    }
}

/// Program linking failed.
#[derive(Debug, Error)]
#[error("program link failed: {log}")]
pub struct LinkError {
    pub log: String,
    pub stages: Vec<ShaderStage>,
}

/// The driver reported an error on submission or synchronization. The
/// caller decides whether to retry.
#[derive(Debug, Error)]
#[error("dispatch failed: {message}")]
pub struct DispatchError {
    pub message: String,
}

/// A binding slot or texture region was out of range for the resource.
#[derive(Debug, Error)]
#[error("{what} out of range: {index} (valid range is 0..{bound})")]
pub struct OutOfRangeError {
    pub what: &'static str,
    pub index: u32,
    pub bound: u32,
}

/// The crate-wide error type. Every fallible public entry point returns
/// `Result<T, GpuDslError>`.
#[derive(Debug, Error)]
pub enum GpuDslError {
    #[error(transparent)]
    Authoring(#[from] AuthoringError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    OutOfRange(#[from] OutOfRangeError),
}

pub type Result<T> = std::result::Result<T, GpuDslError>;
