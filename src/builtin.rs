use core::fmt::{self, Write as _};
use std::{cell::RefCell, io::{self, Write}, rc::Rc};

use crate::{
    config::Config,
    environment::Environment,
    error::LambError,
    interpreter::{EvaluationResult, LambValue},
};


/// Where the host functions write to. Shared between all builtins of a
/// context; the evaluator itself never performs any I/O.
#[derive(Clone)]
pub struct Output(Rc<RefCell<dyn Write>>);

impl Output {
    pub fn new<W: Write + 'static>(writer: Rc<RefCell<W>>) -> Self {
        Self(writer)
    }

    pub fn stdout() -> Self {
        Self(Rc::new(RefCell::new(io::stdout())))
    }

    fn write(&self, text: fmt::Arguments<'_>) -> io::Result<()> {
        let mut writer = self.0.borrow_mut();
        writer.write_fmt(text)?;
        writer.flush()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output")
    }
}

// Builtins take their text as the first argument, a missing one reads as false
fn first_argument(values: Vec<LambValue>) -> LambValue {
    values.into_iter().next().unwrap_or(LambValue::Boolean(false))
}

fn builtin_print(values: Vec<LambValue>, output: &Output) -> EvaluationResult {
    output.write(format_args!("{}", first_argument(values)))?;
    Ok(LambValue::Boolean(false))
}

fn builtin_println(values: Vec<LambValue>, output: &Output) -> EvaluationResult {
    output.write(format_args!("{}\n", first_argument(values)))?;
    Ok(LambValue::Boolean(false))
}

fn builtin_log(values: Vec<LambValue>, output: &Output, time_format: &str) -> EvaluationResult {
    // chrono reports a bad format only while rendering
    let mut time = String::new();
    write!(time, "{}", chrono::Local::now().format(time_format))
        .map_err(|_| LambError::Output(format!("invalid log time format {:?}", time_format)))?;

    output.write(format_args!("{} {}\n", time, first_argument(values)))?;
    Ok(LambValue::Boolean(false))
}

/// Binds `print`, `println` and `log` in the root scope, all writing to `output`.
pub(crate) fn register_builtins(environment: &mut Environment, output: &Output, config: &Config) {
    let root = environment.root();

    let sink = output.clone();
    environment.def(root, "print", LambValue::builtin("print", move |values| builtin_print(values, &sink)));

    let sink = output.clone();
    environment.def(root, "println", LambValue::builtin("println", move |values| builtin_println(values, &sink)));

    let sink = output.clone();
    let time_format = config.log_time_format.clone();
    environment.def(root, "log", LambValue::builtin("log", move |values| builtin_log(values, &sink, &time_format)));

    tracing::debug!(time_format = %config.log_time_format, "registered builtins");
}
