use crate::core::raster::Raster;
use crate::expression::ast::{BinaryOp, Expr, UnaryOp};
use crate::expression::error::ExprError;
use crate::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Func {
    Abs,
    Sqrt,
    Exp,
    Log,
    Log10,
    Sin,
    Cos,
    Tan,
    Floor,
    Ceil,
    Round,
    Sign,
    Min,
    Max,
    Pow,
    /// 1 when the argument is NaN
    Nan,
    /// 1 when the argument is infinite
    Inf,
}

impl Func {
    fn lookup(name: &str) -> Option<Func> {
        let func = match name {
            "abs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "exp" => Func::Exp,
            "log" => Func::Log,
            "log10" => Func::Log10,
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "round" | "rint" => Func::Round,
            "sign" => Func::Sign,
            "min" => Func::Min,
            "max" => Func::Max,
            "pow" => Func::Pow,
            "nan" => Func::Nan,
            "inf" => Func::Inf,
            _ => return None,
        };
        Some(func)
    }

    fn arity(self) -> usize {
        match self {
            Func::Min | Func::Max | Func::Pow => 2,
            _ => 1,
        }
    }

    pub(crate) fn apply1(self, v: f64) -> f64 {
        match self {
            Func::Abs => v.abs(),
            Func::Sqrt => v.sqrt(),
            Func::Exp => v.exp(),
            Func::Log => v.ln(),
            Func::Log10 => v.log10(),
            Func::Sin => v.sin(),
            Func::Cos => v.cos(),
            Func::Tan => v.tan(),
            Func::Floor => v.floor(),
            Func::Ceil => v.ceil(),
            Func::Round => v.round(),
            Func::Sign => {
                if v.is_nan() || v == 0.0 {
                    v
                } else {
                    v.signum()
                }
            }
            Func::Nan => bool_value(v.is_nan()),
            Func::Inf => bool_value(v.is_infinite()),
            Func::Min | Func::Max | Func::Pow => f64::NAN,
        }
    }

    pub(crate) fn apply2(self, a: f64, b: f64) -> f64 {
        match self {
            Func::Min => a.min(b),
            Func::Max => a.max(b),
            Func::Pow => a.powf(b),
            _ => f64::NAN,
        }
    }
}

/// An expression with every symbol resolved.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BoundExpr {
    Const(f64),
    /// Index into the bound band list
    Band(usize),
    /// Pixel-centre x
    PixelX,
    /// Pixel-centre y
    PixelY,
    Unary(UnaryOp, Box<BoundExpr>),
    Binary(BinaryOp, Box<BoundExpr>, Box<BoundExpr>),
    Conditional(Box<BoundExpr>, Box<BoundExpr>, Box<BoundExpr>),
    Call(Func, Vec<BoundExpr>),
}

/// A value counts as true when it is non-zero and not NaN.
pub(crate) fn truthy(v: f64) -> bool {
    v != 0.0 && !v.is_nan()
}

pub(crate) fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

pub(crate) struct Binder<'a> {
    scene: &'a Scene,
    bands: Vec<(String, Raster)>,
}

impl<'a> Binder<'a> {
    pub(crate) fn new(scene: &'a Scene) -> Self {
        Self {
            scene,
            bands: Vec::new(),
        }
    }

    /// Bands referenced so far, in first-use order.
    pub(crate) fn into_bands(self) -> Vec<(String, Raster)> {
        self.bands
    }

    /// Band names shadow the built-in symbols; `X`, `Y`, `PI`, `E` and `NaN`
    /// are only used when no band of that name exists.
    fn symbol(&mut self, name: &str, offset: usize) -> Result<BoundExpr, ExprError> {
        if let Some(index) = self.bands.iter().position(|(n, _)| n == name) {
            return Ok(BoundExpr::Band(index));
        }
        if let Some(raster) = self.scene.band(name) {
            self.bands.push((name.to_owned(), raster.clone()));
            return Ok(BoundExpr::Band(self.bands.len() - 1));
        }
        match name {
            "X" => Ok(BoundExpr::PixelX),
            "Y" => Ok(BoundExpr::PixelY),
            "PI" => Ok(BoundExpr::Const(std::f64::consts::PI)),
            "E" => Ok(BoundExpr::Const(std::f64::consts::E)),
            "NaN" => Ok(BoundExpr::Const(f64::NAN)),
            _ => Err(ExprError::new(offset, format!("unknown symbol '{name}'"))),
        }
    }

    pub(crate) fn bind(&mut self, expr: &Expr) -> Result<BoundExpr, ExprError> {
        Ok(match expr {
            Expr::Lit(lit) => BoundExpr::Const(lit.value()),
            Expr::Ident { name, offset } => self.symbol(name, *offset)?,
            Expr::Unary { op, expr } => BoundExpr::Unary(*op, Box::new(self.bind(expr)?)),
            Expr::Binary { op, left, right } => {
                BoundExpr::Binary(*op, Box::new(self.bind(left)?), Box::new(self.bind(right)?))
            }
            Expr::Conditional { cond, then, otherwise } => BoundExpr::Conditional(
                Box::new(self.bind(cond)?),
                Box::new(self.bind(then)?),
                Box::new(self.bind(otherwise)?),
            ),
            Expr::Call { func, args, offset } => {
                let f = Func::lookup(func)
                    .ok_or_else(|| ExprError::new(*offset, format!("unknown function '{func}'")))?;
                if args.len() != f.arity() {
                    return Err(ExprError::new(
                        *offset,
                        format!("function '{func}' takes {} argument(s), got {}", f.arity(), args.len()),
                    ));
                }
                let args = args.iter().map(|a| self.bind(a)).collect::<Result<Vec<_>, _>>()?;
                BoundExpr::Call(f, args)
            }
        })
    }
}
