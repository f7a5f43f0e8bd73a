//! JavaScript engine adapter using rquickjs
//!
//! Embeds a QuickJS runtime as the script side of the bridge.

use std::cell::RefCell;

use rquickjs::{Context, Ctx, Runtime, Value};

use super::protocol::{ScriptEngine, WireValue};
use crate::config::EngineLimits;
use crate::core::error::{EngineError, EngineResult};

pub struct QuickJsEngine {
    runtime: Runtime,
    context: RefCell<Context>,
}

impl QuickJsEngine {
    pub fn new() -> EngineResult<Self> {
        Self::with_limits(&EngineLimits::default())
    }

    pub fn with_limits(limits: &EngineLimits) -> EngineResult<Self> {
        let runtime = Runtime::new().map_err(runtime_error)?;
        if let Some(bytes) = limits.memory_limit_bytes {
            runtime.set_memory_limit(bytes);
        }
        if let Some(bytes) = limits.max_stack_size_bytes {
            runtime.set_max_stack_size(bytes);
        }
        let context = Context::full(&runtime).map_err(runtime_error)?;
        tracing::debug!(target: "bridge.engine", "QuickJS context created");
        Ok(Self {
            runtime,
            context: RefCell::new(context),
        })
    }

    /// Replaces the context with a fresh one, dropping every global the
    /// scripts defined, the handle table included.
    pub fn reload(&self) -> EngineResult<()> {
        let fresh = Context::full(&self.runtime).map_err(runtime_error)?;
        let mut context = self
            .context
            .try_borrow_mut()
            .map_err(|_| EngineError::Runtime("context is busy".to_string()))?;
        *context = fresh;
        tracing::info!(target: "bridge.engine", "QuickJS context reloaded");
        Ok(())
    }

    fn with_context<R>(&self, f: impl FnOnce(Ctx<'_>) -> EngineResult<R>) -> EngineResult<R> {
        let context = self
            .context
            .try_borrow()
            .map_err(|_| EngineError::Runtime("context is busy".to_string()))?;
        context.with(f)
    }
}

impl ScriptEngine for QuickJsEngine {
    fn evaluate(&self, script: &str) -> EngineResult<WireValue> {
        let wrapped = format!("(function () {{\n{}\n}})()", script);
        self.with_context(|ctx| {
            let value = ctx
                .eval::<Value, _>(wrapped)
                .map_err(|err| script_error(&ctx, err))?;
            to_wire_value(&value)
        })
    }

    fn execute(&self, script: &str) -> EngineResult<()> {
        self.with_context(|ctx| {
            ctx.eval::<Value, _>(script)
                .map(|_| ())
                .map_err(|err| script_error(&ctx, err))
        })
    }
}

fn runtime_error(err: rquickjs::Error) -> EngineError {
    EngineError::Runtime(err.to_string())
}

fn script_error(ctx: &Ctx<'_>, err: rquickjs::Error) -> EngineError {
    if !matches!(err, rquickjs::Error::Exception) {
        return runtime_error(err);
    }
    let thrown = ctx.catch();
    let message = if let Some(exception) = thrown.as_exception() {
        exception.message().unwrap_or_else(|| "exception".to_string())
    } else if let Some(text) = thrown.as_string() {
        text.to_string().unwrap_or_default()
    } else {
        format!("thrown {:?}", thrown.type_of())
    };
    tracing::debug!(target: "bridge.engine", "Script raised: {}", message);
    EngineError::script(message)
}

fn to_wire_value(value: &Value<'_>) -> EngineResult<WireValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(WireValue::Null);
    }
    if let Some(b) = value.as_bool() {
        return Ok(WireValue::Bool(b));
    }
    if let Some(n) = value.as_int() {
        return Ok(WireValue::Number(n as f64));
    }
    if let Some(n) = value.as_float() {
        return Ok(WireValue::Number(n));
    }
    if let Some(s) = value.as_string() {
        return s.to_string().map(WireValue::String).map_err(runtime_error);
    }
    if let Some(array) = value.as_array() {
        let mut items = Vec::with_capacity(array.len());
        for index in 0..array.len() {
            let item: Value = array.get(index).map_err(runtime_error)?;
            items.push(to_wire_value(&item)?);
        }
        return Ok(WireValue::Array(items));
    }
    Err(EngineError::UnsupportedValue {
        type_name: format!("{:?}", value.type_of()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_function_body() {
        let engine = QuickJsEngine::new().unwrap();
        assert_eq!(engine.evaluate("return 1 + 2;"), Ok(WireValue::Number(3.0)));
        assert_eq!(engine.evaluate("return 0.5;"), Ok(WireValue::Number(0.5)));
        assert_eq!(engine.evaluate("var x = 1;"), Ok(WireValue::Null));
        assert_eq!(
            engine.evaluate("return ['a', true, null, undefined, [2]];"),
            Ok(WireValue::Array(vec![
                WireValue::String("a".into()),
                WireValue::Bool(true),
                WireValue::Null,
                WireValue::Null,
                WireValue::Array(vec![WireValue::Number(2.0)]),
            ]))
        );
    }

    #[test]
    fn test_execute_defines_globals() {
        let engine = QuickJsEngine::new().unwrap();
        engine.execute("var greeting = 'hi';").unwrap();
        assert_eq!(
            engine.evaluate("return greeting;"),
            Ok(WireValue::String("hi".into()))
        );
    }

    #[test]
    fn test_exceptions_become_script_errors() {
        let engine = QuickJsEngine::new().unwrap();
        let err = engine.evaluate("return missing.value;").unwrap_err();
        assert!(matches!(err, EngineError::Script { .. }));

        let err = engine.execute("throw new Error('boom');").unwrap_err();
        assert_eq!(err, EngineError::script("boom"));

        let err = engine.execute("throw 'plain';").unwrap_err();
        assert_eq!(err, EngineError::script("plain"));

        // the engine stays usable afterwards
        assert_eq!(engine.evaluate("return true;"), Ok(WireValue::Bool(true)));
    }

    #[test]
    fn test_objects_are_unsupported() {
        let engine = QuickJsEngine::new().unwrap();
        let err = engine.evaluate("return {};").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedValue { .. }));
    }

    #[test]
    fn test_reload_drops_globals() {
        let engine = QuickJsEngine::new().unwrap();
        engine.execute("var kept = 1;").unwrap();
        engine.reload().unwrap();
        assert_eq!(
            engine.evaluate("return typeof kept;"),
            Ok(WireValue::String("undefined".into()))
        );
    }

    #[test]
    fn test_with_limits() {
        let limits = EngineLimits {
            memory_limit_bytes: Some(16 * 1024 * 1024),
            max_stack_size_bytes: Some(512 * 1024),
        };
        let engine = QuickJsEngine::with_limits(&limits).unwrap();
        assert_eq!(engine.evaluate("return 'ok';"), Ok(WireValue::String("ok".into())));
    }
}
