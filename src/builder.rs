//! The Builder: a thread-bound active [`BuildContext`] and the lowering
//! rules from [`Node`] to shader text (spec §4, original_source
//! `IR/Builder/Builder.h`).
//!
//! The original is a process-wide singleton (`Builder::Get()`). This crate's
//! concurrency model is single-threaded and host-cooperative (spec §5), so
//! the singleton becomes a `thread_local` cell instead of a `static` —
//! spec §9's suggested redesign when a language lacks a safe process-wide
//! mutable singleton.

use std::cell::RefCell;

use crate::context::BuildContext;
use crate::error::AuthoringError;
use crate::ir::{ElifArm, IncrDirection, Node, Opcode};

thread_local! {
    static ACTIVE: RefCell<Option<*mut dyn BuildContext>> = RefCell::new(None);
}

/// Binds `ctx` as the active build context for the current thread, for the
/// duration of `f`. Any previously bound context is restored afterwards,
/// even if `f` panics — mirrors `Builder::Bind`/`Builder::Unbind` paired
/// around a kernel's construction closure.
pub fn with_bound<R>(ctx: &mut dyn BuildContext, f: impl FnOnce() -> R) -> R {
    // SAFETY: erases `ctx`'s borrow lifetime so it can live in the
    // `'static`-typed thread-local cell; `Restore` guarantees the pointer is
    // cleared again before `with_bound` returns, so it never outlives `ctx`.
    let ptr: *mut dyn BuildContext = unsafe { std::mem::transmute(ctx) };
    let previous = ACTIVE.with(|cell| cell.replace(Some(ptr)));
    struct Restore(Option<*mut dyn BuildContext>);
    impl Drop for Restore {
        fn drop(&mut self) {
            ACTIVE.with(|cell| *cell.borrow_mut() = self.0.take());
        }
    }
    let _restore = Restore(previous);
    f()
}

/// Rebinds the active context to `ctx`, returning whatever was bound
/// before. Used by [`crate::flow::ScopedCapture`] to install a
/// [`crate::context::collector::CollectorContext`] for a captured block and
/// restore the parent afterwards.
///
/// # Safety
/// `ctx` must remain valid until a matching [`restore`] call.
pub unsafe fn swap_binding(ctx: *mut dyn BuildContext) -> Option<*mut dyn BuildContext> {
    ACTIVE.with(|cell| cell.replace(Some(ctx)))
}

/// Restores a binding previously displaced by [`swap_binding`].
pub fn restore(previous: Option<*mut dyn BuildContext>) {
    ACTIVE.with(|cell| *cell.borrow_mut() = previous);
}

/// Runs `f` with mutable access to the active context, or fails with
/// [`AuthoringError::NoActiveContext`] if nothing is bound — every public
/// authoring-surface function (`Var::new`, `if_`, `for_`, ...) calls this
/// rather than touching `ACTIVE` directly.
pub fn with_context<R>(api: &'static str, f: impl FnOnce(&mut dyn BuildContext) -> R) -> Result<R, AuthoringError> {
    ACTIVE.with(|cell| {
        let ptr = cell.borrow().ok_or(AuthoringError::NoActiveContext { api })?;
        // SAFETY: the pointer was installed by `with_bound`/`swap_binding`,
        // both of which guarantee validity for as long as it remains bound.
        let ctx = unsafe { &mut *ptr };
        Ok(f(ctx))
    })
}

/// The raw pointer currently bound, if any — used by
/// [`crate::flow::capture_block`] to construct a
/// [`crate::context::collector::CollectorContext`] whose parent is
/// whatever is presently active, without taking the binding.
pub fn active_ptr() -> Option<*mut dyn BuildContext> {
    ACTIVE.with(|cell| *cell.borrow())
}

/// True if some context is currently bound (used by tests and by
/// `Var`/`Expr` constructors that want to special-case "no active kernel").
pub fn is_bound() -> bool {
    ACTIVE.with(|cell| cell.borrow().is_some())
}

/// Runs every deferred callable body generator registered on the active
/// context until none remain, per spec §4.3 ("iteration continues until
/// the set of generators is stable"), then returns the generated bodies
/// joined in registration order.
///
/// Each step below borrows the active context for exactly one call and
/// releases it before the next — generators invoked here call back into
/// `with_context` themselves (to push/pop their own body text), so this
/// must never hold its own borrow open across a `generator()` call.
pub fn generate_callable_bodies() -> Result<String, AuthoringError> {
    loop {
        let pending = with_context("generate_callable_bodies", |ctx| ctx.take_callable_body_generators())?;
        if pending.is_empty() {
            break;
        }
        for (_id, generator) in pending {
            generator();
        }
    }
    with_context("generate_callable_bodies", |ctx| ctx.get_callable_bodies().join("\n"))
}

/// Lowers `node` to shader text without emitting it as a statement —
/// for use as a subexpression (operand, condition, call argument, index).
pub fn build_node(node: &Node) -> String {
    match node {
        Node::LocalVariable { name, ty } => format!("{ty} {name}"),
        Node::LocalArray { name, elem_ty, len } => format!("{elem_ty} {name}[{len}]"),
        Node::Load { name } => name.clone(),
        Node::Store { target, value } => format!("{} = {}", build_node(target), build_node(value)),
        Node::ArrayAccess { target, index } => format!("{}[{}]", build_node(target), build_node(index)),
        Node::MemberAccess { object, member } => format!("{}.{}", build_node(object), member),
        Node::Operation { op, lhs, rhs } => {
            if op.is_unary() {
                format!("{}({})", op.symbol(), build_node(lhs))
            } else {
                let rhs = rhs.as_ref().expect("binary opcode requires rhs");
                format!("({} {} {})", build_node(lhs), op.symbol(), build_node(rhs))
            }
        }
        Node::IntrinsicCall { name, args } | Node::UserCall { name, args } => {
            let args: Vec<String> = args.iter().map(build_node).collect();
            format!("{name}({})", args.join(", "))
        }
        Node::CompoundAssignment { op, lvalue, value } => {
            format!("{} {}= {}", build_node(lvalue), op.symbol(), build_node(value))
        }
        Node::Increment { direction, target, prefix } => {
            let sym = match direction {
                IncrDirection::Increment => "++",
                IncrDirection::Decrement => "--",
            };
            let target = build_node(target);
            if *prefix {
                format!("{sym}{target}")
            } else {
                format!("{target}{sym}")
            }
        }
        Node::Return { value } => match value {
            Some(v) => format!("return {}", build_node(v)),
            None => "return".to_string(),
        },
        Node::Break => "break".to_string(),
        Node::Continue => "continue".to_string(),
        Node::RawFragment { text } => text.clone(),
        Node::If { .. } | Node::While { .. } | Node::DoWhile { .. } | Node::For { .. } => {
            build_block_node(node)
        }
    }
}

fn build_body(body: &[Node]) -> String {
    let mut out = String::new();
    for stmt in body {
        out.push_str(&statement_text(stmt));
    }
    out
}

/// True for node kinds that are already complete statements once lowered
/// (so need no trailing `;`) — control flow and raw fragments.
fn is_bare_statement(node: &Node) -> bool {
    matches!(
        node,
        Node::If { .. } | Node::While { .. } | Node::DoWhile { .. } | Node::For { .. } | Node::RawFragment { .. }
    )
}

fn statement_text(node: &Node) -> String {
    let text = build_node(node);
    if is_bare_statement(node) {
        format!("{text}\n")
    } else {
        format!("{text};\n")
    }
}

fn build_block_node(node: &Node) -> String {
    match node {
        Node::If { condition, body, elifs, else_body } => {
            let mut out = format!("if ({}) {{\n{}}}", build_node(condition), build_body(body));
            for ElifArm { condition, body } in elifs {
                out.push_str(&format!(" else if ({}) {{\n{}}}", build_node(condition), build_body(body)));
            }
            if let Some(else_body) = else_body {
                out.push_str(&format!(" else {{\n{}}}", build_body(else_body)));
            }
            out
        }
        Node::While { condition, body } => {
            format!("while ({}) {{\n{}}}", build_node(condition), build_body(body))
        }
        Node::DoWhile { body, condition } => {
            format!("do {{\n{}}} while ({});", build_body(body), build_node(condition))
        }
        Node::For { var_name, start, end, step, body } => {
            format!(
                "for (int {var_name} = {}; {var_name} < {}; {var_name} += {}) {{\n{}}}",
                build_node(start),
                build_node(end),
                build_node(step),
                build_body(body)
            )
        }
        _ => unreachable!("build_block_node called on a non-block node"),
    }
}

/// Lowers `node` and pushes it onto the active context's statement stream,
/// terminated the way its kind requires (trailing `;` for simple
/// statements, none for control-flow blocks).
pub fn build(node: &Node) -> Result<(), AuthoringError> {
    let text = statement_text(node);
    with_context("Builder::build", |ctx| ctx.push_translated_code(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Node;

    #[test]
    fn binary_operation_lowers_with_parens() {
        let node = Node::operation(Opcode::Add, Node::load("a"), Some(Node::load("b")));
        assert_eq!(build_node(&node), "(a + b)");
    }

    #[test]
    fn cloned_node_lowers_to_byte_identical_text() {
        let node = Node::If {
            condition: Box::new(Node::operation(Opcode::Lt, Node::load("a"), Some(Node::load("b")))),
            body: vec![Node::Store { target: Box::new(Node::load("c")), value: Box::new(Node::load("d")) }],
            elifs: Vec::new(),
            else_body: None,
        };
        let cloned = node.clone();
        assert_eq!(build_block_node(&node), build_block_node(&cloned));
    }

    #[test]
    fn unary_operation_lowers_prefix() {
        let node = Node::operation(Opcode::Neg, Node::load("a"), None);
        assert_eq!(build_node(&node), "-(a)");
    }

    #[test]
    fn for_loop_lowers_c_style_header() {
        let node = Node::For {
            var_name: "i".into(),
            start: Box::new(Node::load("0")),
            end: Box::new(Node::load("n")),
            step: Box::new(Node::load("1")),
            body: vec![Node::Break],
        };
        let text = build_node(&node);
        assert!(text.starts_with("for (int i = 0; i < n; i += 1) {\n"));
        assert!(text.contains("break;\n"));
    }

    #[test]
    fn no_active_context_is_reported_as_authoring_error() {
        let err = with_context("test::probe", |_| ()).unwrap_err();
        assert!(matches!(err, AuthoringError::NoActiveContext { api: "test::probe" }));
    }
}
