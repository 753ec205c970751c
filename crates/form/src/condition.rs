//! Comparison operators used by conditional number and date rules.

use std::fmt;

/// A comparison operator from a rule definition.
///
/// Parsing never fails: an unrecognized symbol becomes
/// [`Operator::Unrecognized`], which compares `false` against everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `=` or `==`
    Eq,
    /// `!=` or `<>`
    Ne,
    /// Any other symbol.
    Unrecognized,
}

impl Operator {
    /// Parses an operator symbol.
    #[must_use]
    pub fn parse(symbol: &str) -> Self {
        match symbol.trim() {
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "=" | "==" => Self::Eq,
            "!=" | "<>" => Self::Ne,
            _ => Self::Unrecognized,
        }
    }

    /// Tests `lhs <op> rhs`.
    ///
    /// Works over anything with a partial order, which covers `f64` (where
    /// `NaN` compares false except under `!=`) and `NaiveDateTime`.
    #[inline]
    pub fn test<T: PartialOrd + ?Sized>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Unrecognized => false,
        }
    }

    /// The canonical symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Unrecognized => "?",
        }
    }
}

impl From<&str> for Operator {
    fn from(symbol: &str) -> Self {
        Self::parse(symbol)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The condition attached to a conditional rule.
///
/// `Single` compares against one parameter, `Range` against two (the
/// "between" form), requiring both sides to hold. Each side carries its own
/// operator, so a range is inclusive or exclusive per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// One operator against `params[0]`.
    Single(Operator),
    /// `lower` against `params[0]` and `upper` against `params[1]`.
    Range { lower: Operator, upper: Operator },
}

impl Condition {
    /// Inclusive range, `>=` and `<=`.
    pub const INCLUSIVE: Self = Self::Range {
        lower: Operator::Ge,
        upper: Operator::Le,
    };

    /// Exclusive range, `>` and `<`.
    pub const EXCLUSIVE: Self = Self::Range {
        lower: Operator::Gt,
        upper: Operator::Lt,
    };

    /// Number of parameters the condition consumes.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Range { .. } => 2,
        }
    }

    /// Evaluates the condition for `value` against its bounds.
    ///
    /// `bounds` must hold [`arity`](Self::arity) values; missing bounds make
    /// the condition fail.
    pub fn test<T: PartialOrd>(self, value: &T, bounds: &[T]) -> bool {
        match (self, bounds) {
            (Self::Single(op), [bound, ..]) => op.test(value, bound),
            (Self::Range { lower, upper }, [low, high, ..]) => {
                lower.test(value, low) && upper.test(value, high)
            }
            _ => false,
        }
    }
}

/// Tests `lhs <symbol> rhs` for a raw operator symbol.
///
/// Unknown symbols yield `false`.
pub fn test_condition<T: PartialOrd + ?Sized>(symbol: &str, lhs: &T, rhs: &T) -> bool {
    Operator::parse(symbol).test(lhs, rhs)
}
