//! User-defined shader functions ("callables"): forward-declared once,
//! their body generated once and invoked many times (spec §4.4, §8
//! "callable single-definition-multi-call correctness";
//! original_source `KernelBuildContext::_callableDeclarations` /
//! `_callableBodyGenerators` / `_callableBodies`).
//!
//! Identity can't use a stable address the way the C++ original does
//! (`const void*` keys) because Rust closures have none — each `Callable`
//! is assigned a monotonic id at construction instead (spec §9's suggested
//! redesign).

use std::cell::Cell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::builder;
use crate::context::CallableGenState;
use crate::error::AuthoringError;
use crate::flow;
use crate::ir::Node;
use crate::value::{Expr, ShaderTypeTag, Var};

thread_local! {
    static NEXT_CALLABLE_ID: Cell<u64> = Cell::new(0);
}

fn next_id() -> u64 {
    NEXT_CALLABLE_ID.with(|cell| {
        let id = cell.get();
        cell.set(id + 1);
        id
    })
}

/// A single-parameter user-defined function. Additional arities follow
/// the same shape (forward decl, deferred generator, `UserCall` on
/// invocation); this crate implements the one-parameter case because it
/// is the one exercised by reduction-style kernels (spec §8 scenario 3).
pub struct Callable1<P: ShaderTypeTag, R: ShaderTypeTag> {
    id: u64,
    name: String,
    param_name: String,
    body: Rc<dyn Fn(Var<P>) -> Result<Expr<R>, AuthoringError>>,
    _marker: PhantomData<(P, R)>,
}

impl<P, R> Clone for Callable1<P, R>
where
    P: ShaderTypeTag,
    R: ShaderTypeTag,
{
    fn clone(&self) -> Self {
        Callable1 {
            id: self.id,
            name: self.name.clone(),
            param_name: self.param_name.clone(),
            body: Rc::clone(&self.body),
            _marker: PhantomData,
        }
    }
}

impl<P: ShaderTypeTag + 'static, R: ShaderTypeTag + 'static> Callable1<P, R> {
    pub fn new(name: impl Into<String>, body: impl Fn(Var<P>) -> Result<Expr<R>, AuthoringError> + 'static) -> Callable1<P, R> {
        Callable1 {
            id: next_id(),
            name: name.into(),
            param_name: "p0".to_string(),
            body: Rc::new(body),
            _marker: PhantomData,
        }
    }

    fn signature(&self) -> String {
        format!("{} {}({} {})", R::shader_type_name(), self.name, P::shader_type_name(), self.param_name)
    }

    /// Registers the forward declaration and, the first time this
    /// callable is called in a given context, queues a generator that
    /// will produce its body once `crate::context::generate_callable_bodies`
    /// drains it (spec §4.3: generation runs once before final assembly).
    fn ensure_registered(&self) -> Result<(), AuthoringError> {
        let state = builder::with_context("Callable1::call", |ctx| ctx.callable_state(self.id))?;

        if !state.declared {
            let proto = self.signature();
            builder::with_context("Callable1::call", |ctx| {
                ctx.add_callable_declaration(proto);
                ctx.set_callable_state(self.id, CallableGenState { declared: true, defined: state.defined });
            })?;
        }

        if !state.defined {
            builder::with_context("Callable1::call", |ctx| {
                ctx.set_callable_state(self.id, CallableGenState { declared: true, defined: true });
            })?;

            let id = self.id;
            let name = self.name.clone();
            let param_name = self.param_name.clone();
            let signature = self.signature();
            let body = Rc::clone(&self.body);

            let generator: Rc<dyn Fn()> = Rc::new(move || {
                let _ = id;
                let _ = builder::with_context("Callable1::generate", |ctx| ctx.push_callable_body());
                let param = Var::<P>::from_existing_name(param_name.clone());
                let outcome = body(param).and_then(flow::return_value);
                let captured = builder::with_context("Callable1::generate", |ctx| ctx.pop_callable_body()).unwrap_or_default();
                if outcome.is_ok() {
                    let text = format!("{signature} {{\n{captured}}}\n");
                    let _ = builder::with_context("Callable1::generate", |ctx| ctx.push_callable_body_text(text));
                }
            });

            builder::with_context("Callable1::call", |ctx| ctx.add_callable_body_generator(id, generator))?;
        }

        Ok(())
    }

    pub fn call(&self, arg: Expr<P>) -> Result<Expr<R>, AuthoringError> {
        self.ensure_registered()?;
        Ok(Expr::from_node(Node::UserCall {
            name: self.name.clone(),
            args: vec![arg.into_node()],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::kernel::{Dimension, KernelBuildContext};
    use crate::value::scalar::F32;

    #[test]
    fn calling_twice_registers_body_generator_once() {
        let mut ctx = KernelBuildContext::new(Dimension::default_1d());
        let generated = builder::with_bound(&mut ctx, || {
            let square = Callable1::<F32, F32>::new("square", |x: Var<F32>| Ok(x.get() * x.get()));
            let a = square.call(Expr::<F32>::literal(2.0)).unwrap();
            let b = square.call(Expr::<F32>::literal(3.0)).unwrap();
            let _ = (a, b);
            builder::generate_callable_bodies().unwrap()
        });
        assert_eq!(generated.matches("float square(float p0)").count(), 1);
    }
}
