//! Band-maths expressions.
//!
//! Expressions are parsed once, bound against the bands of a [`Scene`] and
//! evaluated per tile. Besides band names the symbols `X` and `Y` (pixel
//! centre coordinates) and the constants `PI`, `E` and `NaN` are available.
//! Booleans are numbers: comparisons yield 1 or 0, and a value counts as
//! true when it is non-zero and not NaN.
//!
//! [`Scene`]: crate::scene::Scene

mod ast;
mod bind;
mod error;
mod eval;
mod lexer;
mod parser;

pub use error::ExprError;
pub use eval::{BoundExpression, Expression, ExpressionImage};

/// Parse expression text without binding it.
pub fn parse(text: &str) -> Result<Expression, ExprError> {
    Expression::parse(text)
}
