//! One sandboxed invocation of a generated pricing function.
//!
//! Each call builds a fresh, raw script engine: no state, registered
//! function or compiled unit survives from one invocation to the next. The
//! engine only carries the function packages granted by the configured
//! capability set, has module loading and `eval` switched off, swallows
//! `print`/`debug`, and enforces operation, depth, size and wall-clock
//! ceilings.
//!
//! There is no clock, file, network, process or environment package to grant.

use std::{
    panic::{self, AssertUnwindSafe},
    time::Instant,
};

use rhai::{
    module_resolvers::DummyModuleResolver,
    packages::{
        BasicArrayPackage, BasicMapPackage, BasicMathPackage, CorePackage, LogicPackage,
        MoreStringPackage, Package,
    },
    Dynamic, Engine, EvalAltResult, ParseError, Position, Scope, AST, FLOAT, INT,
};
use serde_json::Value;
use tracing::debug;

use quoteforge_contracts::{
    capability::SandboxCapability,
    execution::{ExecutionFault, FaultCause},
    quote::QuoteResult,
};
use quoteforge_core::config::RunnerConfig;

use crate::{contract::check_quote_result, literal::to_script_literal};

/// Name of the function every generated unit must define.
pub const ENTRY_POINT: &str = "calculate_quote";

/// Name of the global constant holding the parsed schema document.
pub const SCHEMA_CONSTANT: &str = "SCHEMA";

const SLEEP_UNAVAILABLE: &str = "sleep is not available";

/// The deadline is checked once per this many operations.
const PROGRESS_STRIDE: u64 = 1024;

/// Compile and invoke `function` against `input` under `config`'s limits.
///
/// Never panics: a panic inside the script engine is reported as
/// `FaultCause::HostPanic`.
pub fn run_sandboxed(
    config: &RunnerConfig,
    schema: &str,
    function: &str,
    input: &Value,
) -> Result<QuoteResult, ExecutionFault> {
    let deadline = Instant::now() + config.timeout();
    panic::catch_unwind(AssertUnwindSafe(|| invoke(config, deadline, schema, function, input)))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ExecutionFault::runtime(FaultCause::HostPanic, message))
        })
}

fn invoke(
    config: &RunnerConfig,
    deadline: Instant,
    schema: &str,
    function: &str,
    input: &Value,
) -> Result<QuoteResult, ExecutionFault> {
    let engine = build_engine(config, deadline);
    let ast = compile_unit(&engine, schema, function)?;

    let argument = rhai::serde::to_dynamic(input).map_err(|e| {
        ExecutionFault::runtime(FaultCause::Thrown, format!("input could not be passed to the function: {e}"))
    })?;

    let mut scope = Scope::new();
    let returned: Dynamic = engine
        .call_fn(&mut scope, &ast, ENTRY_POINT, (argument,))
        .map_err(|err| classify(*err))?;

    let value: Value = rhai::serde::from_dynamic(&returned).map_err(|e| {
        ExecutionFault::runtime(
            FaultCause::ContractViolation,
            format!("returned value cannot be represented as JSON: {e}"),
        )
    })?;
    check_quote_result(value)
}

fn build_engine(config: &RunnerConfig, deadline: Instant) -> Engine {
    let mut engine = Engine::new_raw();

    engine.register_global_module(CorePackage::new().as_shared_module());
    for capability in config.capability_set().all() {
        let module = match capability {
            SandboxCapability::Logic => LogicPackage::new().as_shared_module(),
            SandboxCapability::Math => BasicMathPackage::new().as_shared_module(),
            SandboxCapability::Strings => MoreStringPackage::new().as_shared_module(),
            SandboxCapability::Arrays => BasicArrayPackage::new().as_shared_module(),
            SandboxCapability::Maps => BasicMapPackage::new().as_shared_module(),
        };
        engine.register_global_module(module);
    }

    // The core package ships `sleep`, which blocks without spending operations
    // and so never reaches the deadline check.
    engine.register_fn("sleep", |_: INT| -> Result<(), Box<EvalAltResult>> {
        Err(SLEEP_UNAVAILABLE.into())
    });
    engine.register_fn("sleep", |_: FLOAT| -> Result<(), Box<EvalAltResult>> {
        Err(SLEEP_UNAVAILABLE.into())
    });

    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("import");
    engine.disable_symbol("eval");
    engine.on_print(|_| {});
    engine.on_debug(|_, _, _| {});

    engine.set_max_operations(config.max_operations);
    engine.set_max_call_levels(config.max_call_levels);
    engine.set_max_expr_depths(config.max_expr_depth, config.max_function_expr_depth);
    engine.set_max_string_size(config.max_string_size);
    engine.set_max_array_size(config.max_array_size);
    engine.set_max_map_size(config.max_map_size);

    engine.on_progress(move |ops| {
        if ops % PROGRESS_STRIDE == 0 && Instant::now() >= deadline {
            Some(Dynamic::UNIT)
        } else {
            None
        }
    });

    engine
}

/// Prepend the schema constant to the function and compile both as one unit.
///
/// The constant occupies exactly the first line, so function-relative line
/// numbers are the unit's line numbers minus one.
fn compile_unit(engine: &Engine, schema: &str, function: &str) -> Result<AST, ExecutionFault> {
    let schema_doc = parse_schema(schema)?;
    let unit = format!(
        "const {} = {};\n{}",
        SCHEMA_CONSTANT,
        to_script_literal(&schema_doc),
        function
    );

    let ast = engine.compile(&unit).map_err(|err| compile_fault(&err))?;

    let entry = ast.iter_functions().find(|f| f.name == ENTRY_POINT);
    match entry {
        None => Err(ExecutionFault::EntryPointMissing {
            entry_point: ENTRY_POINT.to_string(),
        }),
        Some(f) if f.params.len() != 1 => Err(ExecutionFault::CompileError {
            message: format!(
                "'{}' must take exactly one parameter, found {}",
                ENTRY_POINT,
                f.params.len()
            ),
            line: None,
        }),
        Some(_) => {
            debug!(unit_len = unit.len(), "generated unit compiled");
            Ok(ast)
        }
    }
}

/// An empty schema is an empty object. Anything else must be a JSON Schema
/// document the `jsonschema` crate can compile.
fn parse_schema(schema: &str) -> Result<Value, ExecutionFault> {
    if schema.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let doc: Value = serde_json::from_str(schema).map_err(|e| ExecutionFault::CompileError {
        message: format!("schema is not valid JSON: {e}"),
        line: None,
    })?;
    jsonschema::validator_for(&doc).map_err(|e| ExecutionFault::CompileError {
        message: format!("schema is not a valid JSON Schema: {e}"),
        line: None,
    })?;
    Ok(doc)
}

fn compile_fault(err: &ParseError) -> ExecutionFault {
    let line = err.position().line();
    let message = err.err_type().to_string();
    match line {
        Some(1) => ExecutionFault::CompileError {
            message: format!("schema constant: {message}"),
            line: None,
        },
        Some(n) => ExecutionFault::CompileError {
            message,
            line: Some(n - 1),
        },
        None => ExecutionFault::CompileError { message, line: None },
    }
}

/// Map a script error to a fault cause, looking through function-call
/// wrappers to the original error.
///
/// Positions are reported relative to the function source, like compile
/// errors.
fn classify(err: EvalAltResult) -> ExecutionFault {
    let mut root = into_root_cause(err);
    let cause = match &root {
        EvalAltResult::ErrorTerminated(..) => FaultCause::Timeout,
        EvalAltResult::ErrorTooManyOperations(..)
        | EvalAltResult::ErrorStackOverflow(..)
        | EvalAltResult::ErrorDataTooLarge(..) => FaultCause::ResourceLimit,
        _ => FaultCause::Thrown,
    };
    let message = match cause {
        FaultCause::Timeout => "wall-clock budget exceeded".to_string(),
        _ => {
            let position = root.take_position();
            match function_line(position) {
                Some(line) => format!("{root} (line {line})"),
                None => root.to_string(),
            }
        }
    };
    ExecutionFault::runtime(cause, message)
}

fn into_root_cause(err: EvalAltResult) -> EvalAltResult {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => into_root_cause(*inner),
        other => other,
    }
}

/// Line within the function source. The schema constant is line 1 of the unit.
fn function_line(position: Position) -> Option<usize> {
    position.line().filter(|n| *n > 1).map(|n| n - 1)
}
