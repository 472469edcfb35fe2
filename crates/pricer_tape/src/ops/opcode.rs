//! Built-in operation codes.

use std::fmt;

use super::error::OpError;

/// Number of built-in operations.
pub const OP_COUNT: usize = 19;

/// Operations understood by the built-in operation and gradient tables.
///
/// The discriminants are the op ids stored in the
/// [`ComputationGraph`](crate::graph::ComputationGraph).
///
/// # Example
///
/// ```rust
/// use pricer_tape::ops::OpCode;
///
/// assert_eq!(usize::from(OpCode::Max), 11);
/// assert_eq!(OpCode::try_from(13).unwrap(), OpCode::Exp);
/// assert_eq!(OpCode::NormalCdf.to_string(), "NormalCdf");
/// assert!(OpCode::try_from(19).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum OpCode {
    /// Leaf placeholder; evaluates to an uninitialised variable.
    None = 0,
    /// n-ary sum.
    Add = 1,
    /// `a - b`
    Subtract = 2,
    /// `-a`
    Negative = 3,
    /// `a * b`
    Mult = 4,
    /// `a / b`
    Div = 5,
    /// `E[regressand | regressors]` with arguments `[regressand, filter, regressors...]`.
    ConditionalExpectation = 6,
    /// `1{a == b}`
    IndicatorEq = 7,
    /// `1{a > b}`
    IndicatorGt = 8,
    /// `1{a >= b}`
    IndicatorGeq = 9,
    /// `min(a, b)`
    Min = 10,
    /// `max(a, b)`
    Max = 11,
    /// `|a|`
    Abs = 12,
    /// `exp(a)`
    Exp = 13,
    /// `sqrt(a)`
    Sqrt = 14,
    /// `ln(a)`
    Log = 15,
    /// `a^b`
    Pow = 16,
    /// Standard normal CDF.
    NormalCdf = 17,
    /// Standard normal density.
    NormalPdf = 18,
}

/// Number of arguments an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments.
    Exact(usize),
    /// At least `n` arguments.
    AtLeast(usize),
}

impl Arity {
    /// Returns `true` if `n` arguments are acceptable.
    #[inline]
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "{}", k),
            Arity::AtLeast(k) => write!(f, "at least {}", k),
        }
    }
}

impl OpCode {
    /// All op codes in op id order.
    pub const ALL: [OpCode; OP_COUNT] = [
        OpCode::None,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Negative,
        OpCode::Mult,
        OpCode::Div,
        OpCode::ConditionalExpectation,
        OpCode::IndicatorEq,
        OpCode::IndicatorGt,
        OpCode::IndicatorGeq,
        OpCode::Min,
        OpCode::Max,
        OpCode::Abs,
        OpCode::Exp,
        OpCode::Sqrt,
        OpCode::Log,
        OpCode::Pow,
        OpCode::NormalCdf,
        OpCode::NormalPdf,
    ];

    /// Display labels in op id order, suitable for [`ssa_form`](crate::graph::ssa_form).
    pub const LABELS: [&'static str; OP_COUNT] = [
        "None",
        "Add",
        "Subtract",
        "Negative",
        "Mult",
        "Div",
        "ConditionalExpectation",
        "IndicatorEq",
        "IndicatorGt",
        "IndicatorGeq",
        "Min",
        "Max",
        "Abs",
        "Exp",
        "Sqrt",
        "Log",
        "Pow",
        "NormalCdf",
        "NormalPdf",
    ];

    /// Op id of this code.
    #[inline]
    pub fn id(self) -> usize {
        self as usize
    }

    /// Display label.
    #[inline]
    pub fn label(self) -> &'static str {
        Self::LABELS[self.id()]
    }

    /// Accepted number of arguments.
    pub fn arity(self) -> Arity {
        match self {
            OpCode::None => Arity::AtLeast(0),
            OpCode::Add => Arity::AtLeast(1),
            OpCode::ConditionalExpectation => Arity::AtLeast(2),
            OpCode::Negative
            | OpCode::Abs
            | OpCode::Exp
            | OpCode::Sqrt
            | OpCode::Log
            | OpCode::NormalCdf
            | OpCode::NormalPdf => Arity::Exact(1),
            _ => Arity::Exact(2),
        }
    }

    pub(crate) fn check_arity(self, n: usize) -> Result<(), OpError> {
        let expected = self.arity();
        if expected.accepts(n) {
            Ok(())
        } else {
            Err(OpError::ArityMismatch {
                op: self,
                expected,
                got: n,
            })
        }
    }
}

impl From<OpCode> for usize {
    #[inline]
    fn from(op: OpCode) -> usize {
        op.id()
    }
}

impl TryFrom<usize> for OpCode {
    type Error = OpError;

    fn try_from(id: usize) -> Result<Self, Self::Error> {
        OpCode::ALL.get(id).copied().ok_or(OpError::UnknownOp(id))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_dense() {
        for (i, op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(op.id(), i);
            assert_eq!(OpCode::try_from(i).unwrap(), *op);
        }
    }

    #[test]
    fn test_labels_match_variants() {
        assert_eq!(OpCode::ConditionalExpectation.label(), "ConditionalExpectation");
        assert_eq!(format!("{:?}", OpCode::IndicatorGeq), OpCode::IndicatorGeq.label());
    }

    #[test]
    fn test_arity() {
        assert!(OpCode::Add.arity().accepts(5));
        assert!(!OpCode::Add.arity().accepts(0));
        assert!(OpCode::ConditionalExpectation.arity().accepts(2));
        assert!(!OpCode::ConditionalExpectation.arity().accepts(1));
        assert!(OpCode::Exp.arity().accepts(1));
        assert!(!OpCode::Pow.arity().accepts(3));
        assert!(OpCode::None.arity().accepts(0));
    }

    #[test]
    fn test_unknown_op() {
        assert_eq!(OpCode::try_from(OP_COUNT), Err(OpError::UnknownOp(OP_COUNT)));
    }
}
