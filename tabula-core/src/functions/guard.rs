use std::fmt;

use crate::{eval::EvalErrorKind, value::Value};

pub type Predicate = fn(&Value) -> bool;

/// How many arguments a built-in expects, for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Between(usize, usize),
    AtLeast(usize),
}
impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        match self {
            Arity::Exactly(n) => write!(f, "{n} argument{}", plural(*n)),
            Arity::Between(min, max) => write!(f, "{min} to {max} arguments"),
            Arity::AtLeast(n) => write!(f, "at least {n} argument{}", plural(*n)),
        }
    }
}

/// Argument checks run before a built-in's body
///
/// Once a guard passes, the body may rely on the shapes it checked.
#[derive(Debug, Clone, Copy)]
pub enum Guard {
    /// The body inspects its arguments itself
    Any,
    Arity(usize),
    /// Zero or more arguments, all satisfying one predicate
    SameType(Predicate),
    /// One or more arguments, all satisfying one predicate
    NonEmpty(Predicate),
    /// Exactly these arguments, in order
    Exact(&'static [Predicate]),
    /// Required arguments followed by trailing optional ones
    Optional {
        required: &'static [Predicate],
        optional: &'static [Predicate],
    },
}

impl Guard {
    pub fn check(&self, signature: &'static str, args: &[Value]) -> Result<(), EvalErrorKind> {
        let arity = |expected: Arity| EvalErrorKind::Arity {
            signature,
            expected,
            got: args.len(),
        };
        let each = |predicate: Predicate, args: &[Value]| match args.iter().find(|a| !predicate(a)) {
            Some(value) => Err(EvalErrorKind::InvalidArgument {
                signature,
                value: value.clone(),
            }),
            None => Ok(()),
        };
        let pairwise = |predicates: &[Predicate]| -> Result<(), EvalErrorKind> {
            for (predicate, value) in predicates.iter().zip(args) {
                each(*predicate, std::slice::from_ref(value))?;
            }
            Ok(())
        };

        match *self {
            Guard::Any => Ok(()),
            Guard::Arity(n) if args.len() != n => Err(arity(Arity::Exactly(n))),
            Guard::Arity(_) => Ok(()),
            Guard::SameType(predicate) => each(predicate, args),
            Guard::NonEmpty(_) if args.is_empty() => Err(arity(Arity::AtLeast(1))),
            Guard::NonEmpty(predicate) => each(predicate, args),
            Guard::Exact(predicates) if args.len() != predicates.len() => {
                Err(arity(Arity::Exactly(predicates.len())))
            }
            Guard::Exact(predicates) => pairwise(predicates),
            Guard::Optional { required, optional } => {
                let (min, max) = (required.len(), required.len() + optional.len());
                if !(min..=max).contains(&args.len()) {
                    return Err(arity(Arity::Between(min, max)));
                }
                let predicates = required.iter().chain(optional).copied().collect::<Vec<_>>();
                pairwise(&predicates)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SIG: &str = "F(a:number):number";

    fn message(guard: Guard, args: &[Value]) -> Option<String> {
        guard.check(SIG, args).err().map(|e| e.to_string())
    }

    #[test]
    fn arity_messages() {
        assert_eq!(
            message(Guard::Arity(1), &[]),
            Some(format!("{SIG} expects 1 argument, got 0"))
        );
        assert_eq!(
            message(Guard::Exact(&[Value::is_int, Value::is_str]), &[Value::Int(1)]),
            Some(format!("{SIG} expects 2 arguments, got 1"))
        );
        assert_eq!(
            message(
                Guard::Optional {
                    required: &[Value::is_str],
                    optional: &[Value::is_int]
                },
                &[Value::from("a"), Value::Int(1), Value::Int(2)]
            ),
            Some(format!("{SIG} expects 1 to 2 arguments, got 3"))
        );
        assert_eq!(
            message(Guard::NonEmpty(Value::is_numeric), &[]),
            Some(format!("{SIG} expects at least 1 argument, got 0"))
        );
    }

    #[test]
    fn type_messages() {
        assert_eq!(
            message(Guard::SameType(Value::is_numeric), &[Value::Int(1), Value::from("x")]),
            Some(format!("{SIG} received invalid argument \"x\""))
        );
        assert_eq!(
            message(Guard::Exact(&[Value::is_int, Value::is_str]), &[Value::Int(1), Value::Int(2)]),
            Some(format!("{SIG} received invalid argument 2"))
        );
        assert_eq!(
            message(
                Guard::Optional {
                    required: &[Value::is_str],
                    optional: &[Value::is_int]
                },
                &[Value::from("a"), Value::Float(1.5)]
            ),
            Some(format!("{SIG} received invalid argument 1.5"))
        );
    }

    #[test]
    fn passing_guards() {
        assert_eq!(message(Guard::Any, &[Value::Int(1), Value::from("x")]), None);
        assert_eq!(message(Guard::SameType(Value::is_numeric), &[]), None);
        assert_eq!(
            message(Guard::SameType(Value::is_numeric), &[Value::Int(1), Value::Float(2.5)]),
            None
        );
        assert_eq!(
            message(
                Guard::Optional {
                    required: &[Value::is_str],
                    optional: &[Value::is_int]
                },
                &[Value::from("a")]
            ),
            None
        );
    }
}
