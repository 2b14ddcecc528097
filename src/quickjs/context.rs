//! QuickJS execution context with the `emit` bridge installed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use rquickjs::convert::Coerced;
use rquickjs::function::{Opt, Rest};
use rquickjs::object::Property;
use rquickjs::{CatchResultExt, Context, Ctx, Function, IntoJs, Object, Runtime, Value as JsValue};

use crate::config::EngineConfig;
use crate::logging::{SCRIPT_TARGET, debug, error, trace, warn};
use crate::map::{MapContext, MapError, ViewRow};
use crate::value::Value;

use super::compiler::{compile_function, describe_caught};

/// Global slot holding the compiled map function. Defined read-only and
/// non-configurable so scripts cannot replace or delete it.
const MAP_FUNCTION_SLOT: &str = "__viewMapFunction";

/// How QuickJS reports an execution stopped by the interrupt handler.
const INTERRUPTED: &str = "InternalError: interrupted";

/// Rows emitted during the current call.
type EmitBuffer = Arc<Mutex<Vec<ViewRow>>>;

/// One QuickJS runtime holding a compiled map function.
///
/// Each context has a private heap and emit buffer. The buffer is shared
/// only with the `emit` host function installed in this context's globals,
/// and it is cleared at the start of every call.
pub struct QuickJsContext {
    context: Context,
    runtime: Runtime,
    emitted: EmitBuffer,
    timeout: Option<Duration>,
}

impl QuickJsContext {
    /// Start a runtime, install `emit` and `console`, and compile `source`.
    pub fn new(source: &str, config: &EngineConfig) -> Result<Self, MapError> {
        let runtime = Runtime::new().map_err(|e| MapError::Init(e.to_string()))?;
        if let Some(limit) = config.memory_limit_bytes() {
            runtime.set_memory_limit(limit);
        }
        if let Some(limit) = config.max_stack_size_bytes() {
            runtime.set_max_stack_size(limit);
        }
        let context = Context::full(&runtime).map_err(|e| MapError::Init(e.to_string()))?;

        let this = Self {
            context,
            runtime,
            emitted: Arc::new(Mutex::new(Vec::new())),
            timeout: config.timeout(),
        };
        this.install(source)?;
        trace!(timeout_ms = ?config.timeout_ms, "QuickJS context ready");
        Ok(this)
    }

    fn install(&self, source: &str) -> Result<(), MapError> {
        let emitted = Arc::clone(&self.emitted);
        let deadline = self.arm_interrupt();
        let result = self.context.with(|ctx| {
            install_emit(&ctx, emitted).map_err(|e| MapError::Init(e.to_string()))?;
            install_console(&ctx).map_err(|e| MapError::Init(e.to_string()))?;
            let function = compile_function(&ctx, source)?;
            ctx.globals()
                .prop(MAP_FUNCTION_SLOT, Property::from(function))
                .map_err(|e| MapError::Init(e.to_string()))
        });
        self.disarm_interrupt();

        result.map_err(|e| match e {
            MapError::Compile(ref m) if interrupted(m, deadline) => {
                MapError::Compile(self.timeout_message())
            }
            other => other,
        })
    }

    /// Install the interrupt handler for one bounded execution.
    fn arm_interrupt(&self) -> Option<Instant> {
        let deadline = Instant::now() + self.timeout?;
        self.runtime
            .set_interrupt_handler(Some(Box::new(move || Instant::now() >= deadline)));
        Some(deadline)
    }

    fn disarm_interrupt(&self) {
        if self.timeout.is_some() {
            self.runtime.set_interrupt_handler(None);
        }
    }

    fn timeout_message(&self) -> String {
        let millis = self.timeout.map(|t| t.as_millis()).unwrap_or_default();
        format!("execution exceeded the {millis} ms timeout")
    }

    fn take_emitted(&self) -> Vec<ViewRow> {
        std::mem::take(&mut *self.emitted.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn run(&self, document: &Value) -> Result<(), MapError> {
        self.context.with(|ctx| {
            let function: Function = ctx
                .globals()
                .get(MAP_FUNCTION_SLOT)
                .map_err(|e| MapError::MapFunction(format!("map function unavailable: {e}")))?;
            let argument = document
                .into_js(&ctx)
                .catch(&ctx)
                .map_err(|e| MapError::MapFunction(describe_caught(e)))?;
            function
                .call::<_, JsValue>((argument,))
                .catch(&ctx)
                .map_err(|e| MapError::MapFunction(describe_caught(e)))?;
            Ok(())
        })
    }
}

impl MapContext for QuickJsContext {
    fn map_document(&mut self, document: &Value) -> Result<Vec<ViewRow>, MapError> {
        // Rows left over from an aborted call must not leak into this one.
        self.take_emitted();

        let deadline = self.arm_interrupt();
        let result = self.run(document);
        self.disarm_interrupt();

        let rows = self.take_emitted();
        match result {
            Ok(()) => {
                trace!(rows = rows.len(), "document mapped");
                Ok(rows)
            }
            Err(MapError::MapFunction(ref m)) if interrupted(m, deadline) => {
                warn!(timeout_ms = ?self.timeout, "map function interrupted");
                Err(MapError::MapFunction(self.timeout_message()))
            }
            Err(e) => Err(e),
        }
    }
}

/// Whether a failure came from the interrupt handler firing at `deadline`.
fn interrupted(message: &str, deadline: Option<Instant>) -> bool {
    message == INTERRUPTED && deadline.is_some_and(|d| Instant::now() >= d)
}

/// Install `emit(key, value)`, appending one row per call to `emitted`.
fn install_emit(ctx: &Ctx<'_>, emitted: EmitBuffer) -> rquickjs::Result<()> {
    let emit = Function::new(
        ctx.clone(),
        move |key: Opt<Value>, value: Opt<Value>| {
            let row = ViewRow::new(key.0.unwrap_or_default(), value.0.unwrap_or_default());
            emitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(row);
        },
    )?;
    ctx.globals().set("emit", emit)
}

/// Install `console.log/warn/error`, forwarded to tracing.
#[cfg_attr(not(feature = "logging"), allow(unused_variables))]
fn install_console(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    let console = Object::new(ctx.clone())?;

    console.set(
        "log",
        Function::new(ctx.clone(), |args: Rest<Coerced<String>>| {
            let text = join_args(args);
            debug!(target: SCRIPT_TARGET, text = %text, "console.log");
        })?,
    )?;
    console.set(
        "warn",
        Function::new(ctx.clone(), |args: Rest<Coerced<String>>| {
            let text = join_args(args);
            warn!(target: SCRIPT_TARGET, text = %text, "console.warn");
        })?,
    )?;
    console.set(
        "error",
        Function::new(ctx.clone(), |args: Rest<Coerced<String>>| {
            let text = join_args(args);
            error!(target: SCRIPT_TARGET, text = %text, "console.error");
        })?,
    )?;

    ctx.globals().set("console", console)
}

fn join_args(args: Rest<Coerced<String>>) -> String {
    args.0
        .into_iter()
        .map(|Coerced(s)| s)
        .collect::<Vec<_>>()
        .join(" ")
}
