//! jq-style filtering of JSON response bodies using the jaq library

use jaq_core::{Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value as JsonValue;

use crate::errors::{ReqoError, Result};

/// Compiled filter expression
pub struct Filter {
    compiled: jaq_core::Filter<jaq_core::Native<Val>>,
}

impl Filter {
    /// Parse and compile `expr`; fails with `FilterSyntax`
    pub fn parse(expr: &str) -> Result<Self> {
        use jaq_core::load::{Arena, File, Loader};

        let syntax_error = |message: String| ReqoError::FilterSyntax {
            expr: expr.to_string(),
            message,
        };

        let arena = Arena::default();
        let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let modules = loader
            .load(&arena, File { path: (), code: expr })
            .map_err(|errs| syntax_error(join_errors(errs)))?;

        let compiled = jaq_core::Compiler::<_, jaq_core::Native<Val>>::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(|errs| syntax_error(join_errors(errs)))?;

        Ok(Filter { compiled })
    }

    /// Run against `input`, collecting every emitted value
    pub fn run(&self, input: &JsonValue) -> Result<Vec<JsonValue>> {
        let inputs = RcIter::new(core::iter::empty());
        let ctx = Ctx::new([], &inputs);

        let mut output = Vec::new();
        for result in self.compiled.run((ctx, Val::from(input.clone()))) {
            match result {
                Ok(val) => output.push(JsonValue::from(val)),
                Err(e) => return Err(ReqoError::FilterExecution(format!("{:?}", e))),
            }
        }
        Ok(output)
    }
}

fn join_errors<E: std::fmt::Debug>(errs: impl IntoIterator<Item = E>) -> String {
    errs.into_iter()
        .map(|e| format!("{:?}", e))
        .collect::<Vec<_>>()
        .join(", ")
}
