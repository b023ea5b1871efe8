use super::{type_error, BuiltinImpl, BuiltinTable, Shape};
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::values::Value;

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value, operation: &str) -> EvalResult<Num> {
        match value {
            Value::Integer(i) => Ok(Num::Int(*i)),
            Value::Float(f) => Ok(Num::Float(*f)),
            other => Err(type_error("number", other, operation)),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::Integer(i),
            Num::Float(f) => Value::Float(f),
        }
    }
}

fn overflow(operation: &str) -> EvalError {
    EvalError::invalid_argument(operation, "integer overflow")
}

/// Folds a binary operation over the arguments. Integers stay integers until a
/// float shows up; integer overflow is reported rather than wrapped.
fn fold(
    args: &[Value],
    operation: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    let mut iter = args.iter();
    let mut acc = match iter.next() {
        Some(first) => Num::of(first, operation)?,
        None => return Err(EvalError::arity(operation, "at least 1", 0)),
    };
    for arg in iter {
        let next = Num::of(arg, operation)?;
        acc = match (acc, next) {
            (Num::Int(a), Num::Int(b)) => Num::Int(int_op(a, b).ok_or_else(|| overflow(operation))?),
            (a, b) => Num::Float(float_op(a.as_f64(), b.as_f64())),
        };
    }
    Ok(acc.into_value())
}

fn add(args: &[Value]) -> EvalResult<Value> {
    fold(args, "+", i64::checked_add, |a, b| a + b)
}

fn multiply(args: &[Value]) -> EvalResult<Value> {
    fold(args, "*", i64::checked_mul, |a, b| a * b)
}

fn subtract(args: &[Value]) -> EvalResult<Value> {
    if args.len() == 1 {
        return match Num::of(&args[0], "-")? {
            Num::Int(i) => i.checked_neg().map(Value::Integer).ok_or_else(|| overflow("-")),
            Num::Float(f) => Ok(Value::Float(-f)),
        };
    }
    fold(args, "-", i64::checked_sub, |a, b| a - b)
}

fn divide_pair(a: Num, b: Num) -> EvalResult<Num> {
    match (a, b) {
        (_, Num::Int(0)) => Err(EvalError::DivisionByZero {
            operation: "/".to_string(),
        }),
        (_, Num::Float(d)) if d == 0.0 => Err(EvalError::DivisionByZero {
            operation: "/".to_string(),
        }),
        (Num::Int(x), Num::Int(y)) if x % y == 0 => {
            x.checked_div(y).map(Num::Int).ok_or_else(|| overflow("/"))
        }
        (x, y) => Ok(Num::Float(x.as_f64() / y.as_f64())),
    }
}

fn divide(args: &[Value]) -> EvalResult<Value> {
    let first = Num::of(&args[0], "/")?;
    if args.len() == 1 {
        return divide_pair(Num::Int(1), first).map(Num::into_value);
    }
    let mut acc = first;
    for arg in &args[1..] {
        acc = divide_pair(acc, Num::of(arg, "/")?)?;
    }
    Ok(acc.into_value())
}

fn integer_division(args: &[Value], operation: &str) -> EvalResult<(Num, Num)> {
    let a = Num::of(&args[0], operation)?;
    let b = Num::of(&args[1], operation)?;
    if b.as_f64() == 0.0 {
        return Err(EvalError::DivisionByZero {
            operation: operation.to_string(),
        });
    }
    Ok((a, b))
}

// Remainder with the sign of the divisor.
fn modulo(args: &[Value]) -> EvalResult<Value> {
    match integer_division(args, "mod")? {
        (Num::Int(a), Num::Int(b)) => {
            let r = a.checked_rem(b).ok_or_else(|| overflow("mod"))?;
            Ok(Value::Integer(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }))
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            let r = a % b;
            Ok(Value::Float(if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }))
        }
    }
}

// Remainder with the sign of the dividend.
fn remainder(args: &[Value]) -> EvalResult<Value> {
    match integer_division(args, "rem")? {
        (Num::Int(a), Num::Int(b)) => a
            .checked_rem(b)
            .map(Value::Integer)
            .ok_or_else(|| overflow("rem")),
        (a, b) => Ok(Value::Float(a.as_f64() % b.as_f64())),
    }
}

fn quotient(args: &[Value]) -> EvalResult<Value> {
    match integer_division(args, "quot")? {
        (Num::Int(a), Num::Int(b)) => a
            .checked_div(b)
            .map(Value::Integer)
            .ok_or_else(|| overflow("quot")),
        (a, b) => Ok(Value::Float((a.as_f64() / b.as_f64()).trunc())),
    }
}

fn inc(args: &[Value]) -> EvalResult<Value> {
    add(&[args[0].clone(), Value::Integer(1)])
        .map_err(|e| rename_operation(e, "inc"))
}

fn dec(args: &[Value]) -> EvalResult<Value> {
    subtract(&[args[0].clone(), Value::Integer(1)])
        .map_err(|e| rename_operation(e, "dec"))
}

fn rename_operation(err: EvalError, name: &str) -> EvalError {
    match err {
        EvalError::TypeError {
            expected, actual, ..
        } => EvalError::TypeError {
            expected,
            actual,
            operation: name.to_string(),
        },
        EvalError::InvalidArgument { message, .. } => EvalError::invalid_argument(name, message),
        other => other,
    }
}

fn abs(args: &[Value]) -> EvalResult<Value> {
    match Num::of(&args[0], "abs")? {
        Num::Int(i) => i.checked_abs().map(Value::Integer).ok_or_else(|| overflow("abs")),
        Num::Float(f) => Ok(Value::Float(f.abs())),
    }
}

fn extreme(args: &[Value], operation: &str, pick_new: fn(f64, f64) -> bool) -> EvalResult<Value> {
    let mut best = &args[0];
    let mut best_num = Num::of(best, operation)?.as_f64();
    for arg in &args[1..] {
        let n = Num::of(arg, operation)?.as_f64();
        if pick_new(n, best_num) {
            best = arg;
            best_num = n;
        }
    }
    Ok(best.clone())
}

fn max(args: &[Value]) -> EvalResult<Value> {
    extreme(args, "max", |new, best| new > best)
}

fn min(args: &[Value]) -> EvalResult<Value> {
    extreme(args, "min", |new, best| new < best)
}

fn to_integer(value: f64, operation: &str) -> EvalResult<Value> {
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return Err(EvalError::invalid_argument(
            operation,
            format!("{} cannot be represented as an integer", value),
        ));
    }
    Ok(Value::Integer(value as i64))
}

fn rounding(args: &[Value], operation: &str, op: fn(f64) -> f64) -> EvalResult<Value> {
    match Num::of(&args[0], operation)? {
        Num::Int(i) => Ok(Value::Integer(i)),
        Num::Float(f) => to_integer(op(f), operation),
    }
}

fn round(args: &[Value]) -> EvalResult<Value> {
    rounding(args, "round", f64::round)
}

fn floor(args: &[Value]) -> EvalResult<Value> {
    rounding(args, "floor", f64::floor)
}

fn ceil(args: &[Value]) -> EvalResult<Value> {
    rounding(args, "ceil", f64::ceil)
}

fn sqrt(args: &[Value]) -> EvalResult<Value> {
    let x = Num::of(&args[0], "sqrt")?.as_f64();
    if x < 0.0 {
        return Err(EvalError::invalid_argument(
            "sqrt",
            format!("cannot take the square root of negative number {}", x),
        ));
    }
    Ok(Value::Float(x.sqrt()))
}

fn pow(args: &[Value]) -> EvalResult<Value> {
    match (Num::of(&args[0], "pow")?, Num::of(&args[1], "pow")?) {
        (Num::Int(base), Num::Int(exp)) if exp >= 0 => {
            let exp = u32::try_from(exp).map_err(|_| overflow("pow"))?;
            base.checked_pow(exp)
                .map(Value::Integer)
                .ok_or_else(|| overflow("pow"))
        }
        (base, exp) => Ok(Value::Float(base.as_f64().powf(exp.as_f64()))),
    }
}

pub fn load_arithmetic_functions(table: &mut BuiltinTable) {
    table.define(
        "+",
        Shape::Variadic {
            identity: || Value::Integer(0),
            func: BuiltinImpl::Pure(add),
        },
    );
    table.define(
        "-",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Pure(subtract),
        },
    );
    table.define(
        "*",
        Shape::Variadic {
            identity: || Value::Integer(1),
            func: BuiltinImpl::Pure(multiply),
        },
    );
    table.define(
        "/",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Pure(divide),
        },
    );
    table.define_pure("mod", 2, modulo);
    table.define_pure("rem", 2, remainder);
    table.define_pure("quot", 2, quotient);
    table.define_pure("inc", 1, inc);
    table.define_pure("dec", 1, dec);
    table.define_pure("abs", 1, abs);
    table.define(
        "max",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Pure(max),
        },
    );
    table.define(
        "min",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Pure(min),
        },
    );
    table.define_pure("round", 1, round);
    table.define_pure("floor", 1, floor);
    table.define_pure("ceil", 1, ceil);
    table.define_pure("sqrt", 1, sqrt);
    table.define_pure("pow", 2, pow);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(xs: &[i64]) -> Vec<Value> {
        xs.iter().map(|x| Value::Integer(*x)).collect()
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(add(&ints(&[1, 2, 3])).unwrap(), Value::Integer(6));
        assert_eq!(subtract(&ints(&[5])).unwrap(), Value::Integer(-5));
        assert_eq!(divide(&ints(&[6, 3])).unwrap(), Value::Integer(2));
        assert_eq!(divide(&ints(&[7, 2])).unwrap(), Value::Float(3.5));
    }

    #[test]
    fn floats_are_contagious() {
        assert_eq!(
            add(&[Value::Integer(1), Value::Float(0.5)]).unwrap(),
            Value::Float(1.5)
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(matches!(
            divide(&ints(&[1, 0])),
            Err(EvalError::DivisionByZero { .. })
        ));
        assert!(matches!(
            modulo(&ints(&[1, 0])),
            Err(EvalError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn mod_follows_divisor_sign() {
        assert_eq!(modulo(&ints(&[-7, 2])).unwrap(), Value::Integer(1));
        assert_eq!(modulo(&ints(&[7, -2])).unwrap(), Value::Integer(-1));
        assert_eq!(remainder(&ints(&[-7, 2])).unwrap(), Value::Integer(-1));
    }

    #[test]
    fn overflow_is_reported() {
        let err = add(&ints(&[i64::MAX, 1])).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn rounding_yields_integers() {
        assert_eq!(round(&[Value::Float(2.5)]).unwrap(), Value::Integer(3));
        assert_eq!(floor(&[Value::Float(-1.5)]).unwrap(), Value::Integer(-2));
        assert_eq!(ceil(&[Value::Float(1.1)]).unwrap(), Value::Integer(2));
    }

    #[test]
    fn type_errors_name_the_operation() {
        let err = inc(&[Value::string("x")]).unwrap_err();
        assert_eq!(err, EvalError::type_error("number", "string", "inc"));
    }
}
