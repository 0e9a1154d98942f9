//! Control-flow capture: `if_`/`.elif`/`.else_`, `for_`, `while_`,
//! `do_while`, `break_`, `continue_`, `return_` (spec §4.5, original_source
//! `include/Flow/{IfFlow,For,While,DoWhileFlow,Return}.h`).
//!
//! Each body closure runs immediately, under a
//! [`crate::context::collector::CollectorContext`] that buffers its
//! emitted statements privately while forwarding every registration to the
//! enclosing context. The collected text becomes the body of the
//! resulting `Node::If`/`Node::For`/etc., pushed onto the parent's
//! statement stream once the construct is complete.

use crate::builder;
use crate::context::collector::CollectorContext;
use crate::context::BuildContext;
use crate::error::AuthoringError;
use crate::ir::{ElifArm, Node};
use crate::value::scalar::{Bool, I32};
use crate::value::{Expr, Var};

/// Rebinds the Builder to `new_ctx` for its lifetime, restoring whatever
/// was bound before on drop — including when the guarded closure panics
/// (spec §9 "retain ... a scoped guard is acceptable").
struct ScopedCapture {
    previous: Option<*mut dyn BuildContext>,
}

impl ScopedCapture {
    /// # Safety
    /// `new_ctx` must remain valid for the guard's entire lifetime.
    unsafe fn begin(new_ctx: *mut dyn BuildContext) -> ScopedCapture {
        ScopedCapture { previous: builder::swap_binding(new_ctx) }
    }
}

impl Drop for ScopedCapture {
    fn drop(&mut self) {
        builder::restore(self.previous.take());
    }
}

/// Runs `body_fn` with a fresh collector bound as the active context,
/// returning its captured statements as a single-element body
/// (`Node::RawFragment`, spliced back verbatim by the lowering in
/// `builder.rs`).
pub(crate) fn capture_block(body_fn: impl FnOnce() -> Result<(), AuthoringError>) -> Result<Vec<Node>, AuthoringError> {
    let parent = builder::active_ptr().ok_or(AuthoringError::NoActiveContext { api: "flow::capture_block" })?;
    // SAFETY: `parent` is the context currently bound in `builder::ACTIVE`,
    // which remains alive for the duration of this function (it is owned
    // by a caller further up the stack, e.g. a kernel's construction
    // closure).
    let mut collector = unsafe { CollectorContext::new(parent) };
    let result = {
        let ptr: *mut dyn BuildContext = &mut collector;
        // SAFETY: `collector` outlives `_guard`, which is dropped (and the
        // previous binding restored) before `collector` itself goes out
        // of scope.
        let _guard = unsafe { ScopedCapture::begin(ptr) };
        body_fn()
    };
    result?;
    Ok(vec![Node::RawFragment { text: collector.into_text() }])
}

/// A chain of `if { } else if { } else { }` arms. Must end with
/// [`IfChain::end`] — dropping one without calling `end` is an authoring
/// bug (spec §9's destructor-driven emission becomes an explicit
/// terminator here, so forgetting it panics loudly instead of silently
/// discarding the chain).
pub struct IfChain {
    condition: Option<Node>,
    body: Vec<Node>,
    elifs: Vec<ElifArm>,
    else_body: Option<Vec<Node>>,
    finished: bool,
}

impl IfChain {
    pub fn elif(mut self, condition: Expr<Bool>, body_fn: impl FnOnce() -> Result<(), AuthoringError>) -> Result<IfChain, AuthoringError> {
        let body = capture_block(body_fn)?;
        self.elifs.push(ElifArm { condition: Box::new(condition.into_node()), body });
        Ok(self)
    }

    pub fn else_(mut self, body_fn: impl FnOnce() -> Result<(), AuthoringError>) -> Result<IfChain, AuthoringError> {
        let body = capture_block(body_fn)?;
        self.else_body = Some(body);
        Ok(self)
    }

    /// Finishes the chain, emitting the accumulated `Node::If` as a
    /// statement in the enclosing context.
    pub fn end(mut self) -> Result<(), AuthoringError> {
        self.finished = true;
        let node = Node::If {
            condition: Box::new(self.condition.take().expect("condition set at construction")),
            body: std::mem::take(&mut self.body),
            elifs: std::mem::take(&mut self.elifs),
            else_body: self.else_body.take(),
        };
        builder::build(&node)
    }
}

impl Drop for IfChain {
    fn drop(&mut self) {
        if !self.finished && !std::thread::panicking() {
            panic!("IfChain dropped without calling .end() — the if/elif/else chain was never emitted");
        }
    }
}

pub fn if_(condition: Expr<Bool>, body_fn: impl FnOnce() -> Result<(), AuthoringError>) -> Result<IfChain, AuthoringError> {
    let body = capture_block(body_fn)?;
    Ok(IfChain {
        condition: Some(condition.into_node()),
        body,
        elifs: Vec::new(),
        else_body: None,
        finished: false,
    })
}

pub fn while_(condition: Expr<Bool>, body_fn: impl FnOnce() -> Result<(), AuthoringError>) -> Result<(), AuthoringError> {
    let body = capture_block(body_fn)?;
    builder::build(&Node::While { condition: Box::new(condition.into_node()), body })
}

pub fn do_while(body_fn: impl FnOnce() -> Result<(), AuthoringError>, condition: Expr<Bool>) -> Result<(), AuthoringError> {
    let body = capture_block(body_fn)?;
    builder::build(&Node::DoWhile { body, condition: Box::new(condition.into_node()) })
}

/// `for (int var_name = start; var_name < end; var_name += step) { body }`.
/// `body_fn` receives a `Var<I32>` bound to the loop's induction variable
/// (declared by the `for` header itself, not by the body).
pub fn for_(
    var_name: impl Into<String>,
    start: Expr<I32>,
    end: Expr<I32>,
    step: Expr<I32>,
    body_fn: impl FnOnce(&Var<I32>) -> Result<(), AuthoringError>,
) -> Result<(), AuthoringError> {
    let var_name = var_name.into();
    let induction = Var::<I32>::from_existing_name(var_name.clone());
    let body = capture_block(|| body_fn(&induction))?;
    builder::build(&Node::For {
        var_name,
        start: Box::new(start.into_node()),
        end: Box::new(end.into_node()),
        step: Box::new(step.into_node()),
        body,
    })
}

pub fn break_() -> Result<(), AuthoringError> {
    builder::build(&Node::Break)
}

pub fn continue_() -> Result<(), AuthoringError> {
    builder::build(&Node::Continue)
}

pub fn return_value<T: crate::value::ShaderTypeTag>(value: Expr<T>) -> Result<(), AuthoringError> {
    builder::build(&Node::Return { value: Some(Box::new(value.into_node())) })
}

pub fn return_void() -> Result<(), AuthoringError> {
    builder::build(&Node::Return { value: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::kernel::{Dimension, KernelBuildContext};

    #[test]
    fn if_chain_without_end_panics_on_drop() {
        let mut ctx = KernelBuildContext::new(Dimension::default_1d());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            builder::with_bound(&mut ctx, || {
                let _chain = if_(Expr::<Bool>::literal(true), || Ok(())).unwrap();
            });
        }));
        assert!(result.is_err());
    }

    #[test]
    fn if_chain_end_emits_into_parent_stream() {
        let mut ctx = KernelBuildContext::new(Dimension::default_1d());
        builder::with_bound(&mut ctx, || {
            if_(Expr::<Bool>::literal(true), || break_()).unwrap().end().unwrap();
        });
        let source = ctx.assemble("");
        assert!(source.contains("if (true) {\n"));
        assert!(source.contains("break;\n"));
    }
}
