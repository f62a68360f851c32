use std::{cell::RefCell, rc::Rc};

use lamb::{parse, Config, EvaluationContext, LambError, LambValue, Node, Output};

fn main() -> anyhow::Result<()> {
    let programs = vec![
        "square = lambda(x) x * x",
        "square(upper(\"ignored\"))",
        "hypot2 = lambda(a, b) square(a) + square(b); hypot2(3, 4)",
        "log(\"done\"); 1 / 0",
    ].into_iter()
        .map(|source| parse(source).map(|node| (source, node)))
        .collect::<Result<Vec<(&str, Node)>, LambError>>()?;

    // Capture everything the programs print instead of writing to stdout
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let mut context = EvaluationContext::with_output(Output::new(buffer.clone()), Config::default());
    context.define_builtin("upper", |values| match values.first() {
        Some(LambValue::String(text)) => Ok(LambValue::from(text.to_uppercase().as_str())),
        Some(other) => Err(LambError::TypeError(format!("{:?}", other))),
        None => Ok(LambValue::Boolean(false)),
    });

    for (source, node) in &programs {
        match context.evaluate_node(node) {
            Ok(value) => println!("{}: {:?}", source, value),
            Err(err) => println!("{}: {}", source, err),
        }
    }

    print!("captured output: {}", String::from_utf8_lossy(&buffer.borrow()));
    Ok(())
}
