use crate::{
    builtin::{register_builtins, Output},
    config::Config,
    environment::Environment,
    error::LambError,
    interpreter::{evaluate, CallStack, EvaluationResult, LambValue},
    parser::{parse, Node},
};

/// An evaluation context that takes source text or parsed programs and
/// evaluates them to values.
///
/// The root scope persists between evaluations: globals assigned by one
/// program are visible to the next, which is what a REPL wants. The
/// builtins `print`, `println` and `log` are registered up front and write
/// to the context's [Output]. Scopes no longer reachable from the root are
/// reclaimed after every evaluation.
pub struct EvaluationContext {
    environment: Environment,
    config: Config,
}

impl EvaluationContext {
    /// A context writing to stdout with the default [Config]
    pub fn new() -> Self {
        Self::with_output(Output::stdout(), Config::default())
    }

    pub fn with_output(output: Output, config: Config) -> Self {
        if let Err(error) = config.validate() {
            tracing::warn!(%error, "using an invalid config");
        }

        let mut environment = Environment::new();
        register_builtins(&mut environment, &output, &config);

        Self { environment, config }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Makes a host function callable from programs under `name`.
    pub fn define_builtin(&mut self, name: &str, function: impl Fn(Vec<LambValue>) -> EvaluationResult + 'static) {
        tracing::debug!(name, "defining builtin");
        let root = self.environment.root();
        self.environment.def(root, name, LambValue::builtin(name, function));
    }

    pub fn evaluate_node(&mut self, node: &Node) -> Result<LambValue, LambError> {
        let mut stack = CallStack::new(self.config.max_call_depth);
        let root = self.environment.root();
        let result = evaluate(node, root, &mut self.environment, &mut stack);

        // The returned value may still be a closure over a call scope
        self.environment.collect(result.as_ref().ok());
        result
    }

    pub fn evaluate_str(&mut self, source: &str) -> Result<LambValue, LambError> {
        let program = parse(source)?;
        tracing::debug!(bytes = source.len(), "parsed program");

        let result = self.evaluate_node(&program);
        if let Err(error) = &result {
            tracing::debug!(%error, "evaluation failed");
        }
        result
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::error::ErrorKind;

    use super::*;

    fn buffered(config: Config) -> (EvaluationContext, Rc<RefCell<Vec<u8>>>) {
        let buffer = Rc::new(RefCell::new(Vec::new()));
        (EvaluationContext::with_output(Output::new(buffer.clone()), config), buffer)
    }

    #[test]
    fn globals_persist_between_evaluations() -> anyhow::Result<()> {
        let program = vec![
            "spam = lambda() eggs * 3",
            "eggs = 20",
            "spam()",
        ];

        let mut context = EvaluationContext::new();
        let results = program.into_iter()
            .map(|source| context.evaluate_str(source))
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(results[2], LambValue::Number(60.0));
        Ok(())
    }

    #[test]
    fn failures_do_not_poison_the_context() -> anyhow::Result<()> {
        let mut context = EvaluationContext::new();
        context.evaluate_str("x = 1")?;

        assert_eq!(context.evaluate_str("x = 2; 1 / 0").unwrap_err().kind(), ErrorKind::DivideByZero);
        assert_eq!(context.evaluate_str("x +").unwrap_err().kind(), ErrorKind::SyntaxError);

        // Effects that happened before the failure stay
        assert_eq!(context.evaluate_str("x")?, LambValue::Number(2.0));
        Ok(())
    }

    #[test]
    fn prints_the_reference_range() -> anyhow::Result<()> {
        let (mut context, buffer) = buffered(Config::default());
        context.evaluate_str(r#"
            print_range = lambda(a, b) if a <= b {
              print(a);
              if a + 1 <= b {
                print(", ");
                print_range(a + 1, b);
              } else println("");
            };
            print_range(1, 10);
        "#)?;

        assert_eq!(String::from_utf8(buffer.borrow().clone())?, "1, 2, 3, 4, 5, 6, 7, 8, 9, 10\n");
        Ok(())
    }

    #[test]
    fn host_functions_use_the_closure_convention() -> anyhow::Result<()> {
        let mut context = EvaluationContext::new();
        context.define_builtin("twice", |values| match values.first() {
            Some(LambValue::Number(number)) => Ok(LambValue::Number(number * 2.0)),
            Some(other) => Err(LambError::TypeError(format!("{:?}", other))),
            None => Ok(LambValue::Boolean(false)),
        });

        assert_eq!(context.evaluate_str("twice(21)")?, LambValue::Number(42.0));
        assert_eq!(context.evaluate_str("apply = lambda(f, x) f(x); apply(twice, 4)")?, LambValue::Number(8.0));
        assert_eq!(context.evaluate_str("twice()")?, LambValue::Boolean(false));
        Ok(())
    }

    #[test]
    fn call_depth_comes_from_the_config() -> anyhow::Result<()> {
        let (mut context, _) = buffered(Config { max_call_depth: 3, ..Config::default() });
        context.evaluate_str("down = lambda(n) if n > 0 then down(n - 1) else 0")?;

        assert_eq!(context.evaluate_str("down(2)")?, LambValue::Number(0.0));
        assert_eq!(context.evaluate_str("down(3)").unwrap_err(), LambError::StackOverflow(3));
        assert_eq!(context.config().max_call_depth, 3);
        Ok(())
    }

    #[test]
    fn evaluates_parsed_programs() -> anyhow::Result<()> {
        let program = parse("n = 2; n * n")?;
        let mut context = EvaluationContext::new();

        assert_eq!(context.evaluate_node(&program)?, LambValue::Number(4.0));
        let environment = context.environment();
        assert_eq!(environment.lookup(environment.root(), "n"), Some(environment.root()));
        Ok(())
    }

    #[test]
    fn dropping_the_context_releases_the_output() -> anyhow::Result<()> {
        let buffer = Rc::new(RefCell::new(Vec::new()));
        {
            let mut context = EvaluationContext::with_output(Output::new(buffer.clone()), Config::default());
            context.evaluate_str("f = lambda() println(1); f()")?;
            assert!(Rc::strong_count(&buffer) > 1);
        }

        assert_eq!(Rc::strong_count(&buffer), 1);
        assert_eq!(String::from_utf8(buffer.borrow().clone())?, "1\n");
        Ok(())
    }

    #[test]
    fn unreachable_scopes_are_reclaimed_between_evaluations() -> anyhow::Result<()> {
        let mut context = EvaluationContext::new();

        // A parameter rebound to a closure over its own call scope
        context.evaluate_str("f = lambda(g) { g = lambda() g; 0 }; f(0); f(0)")?;
        assert_eq!(context.environment().live_scopes(), 1);

        context.evaluate_str("make = lambda(n) lambda() n; counter = make(5)")?;
        assert_eq!(context.environment().live_scopes(), 2);
        assert_eq!(context.evaluate_str("counter()")?, LambValue::Number(5.0));

        context.evaluate_str("counter = 0")?;
        assert_eq!(context.environment().live_scopes(), 1);
        Ok(())
    }

    #[test]
    fn returned_closures_outlive_their_evaluation() -> anyhow::Result<()> {
        let mut context = EvaluationContext::new();
        let value = context.evaluate_str("(lambda(n) lambda() n)(3)")?;

        assert_eq!(value.to_string(), "lambda()");
        assert_eq!(context.environment().live_scopes(), 2);
        Ok(())
    }

    #[test]
    fn invalid_time_format_fails_the_call() {
        let (mut context, buffer) = buffered(Config { log_time_format: "%Q".to_owned(), ..Config::default() });

        let error = context.evaluate_str("log(1)").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Output);
        assert!(buffer.borrow().is_empty());
    }
}
