use crate::core::buffer::PixelBuffer;
use crate::core::error::RasterResult;
use crate::core::raster::{Raster, RasterLayout, RasterSource};
use crate::core::tile::TileRegion;
use crate::core::types::{PixelKind, TileSize, INVALID, VALID};
use crate::expression::ast::{BinaryOp, Expr, UnaryOp};
use crate::expression::bind::{bool_value, truthy, Binder, BoundExpr};
use crate::expression::error::ExprError;
use crate::expression::parser::parse_expr;
use crate::scene::Scene;
use std::fmt;

/// A parsed, not yet bound, expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    text: String,
    root: Expr,
}

impl Expression {
    /// Parse expression text.
    pub fn parse(text: &str) -> Result<Self, ExprError> {
        let root = parse_expr(text)?;
        Ok(Self {
            text: text.to_owned(),
            root,
        })
    }

    /// Source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Resolve symbols against the bands of `scene`.
    pub fn bind(&self, scene: &Scene) -> Result<BoundExpression, ExprError> {
        let mut binder = Binder::new(scene);
        let root = binder.bind(&self.root)?;
        Ok(BoundExpression {
            text: self.text.clone(),
            root,
            bands: binder.into_bands(),
        })
    }
}

/// An expression ready to be evaluated over scene regions.
#[derive(Clone)]
pub struct BoundExpression {
    text: String,
    root: BoundExpr,
    bands: Vec<(String, Raster)>,
}

impl fmt::Debug for BoundExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundExpression")
            .field("text", &self.text)
            .field("bands", &self.band_names().collect::<Vec<_>>())
            .finish()
    }
}

struct EvalContext<'a> {
    region: TileRegion,
    bands: &'a [Vec<f64>],
}

impl BoundExpression {
    /// Source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Names of the bands the expression reads.
    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|(name, _)| name.as_str())
    }

    /// Evaluate every pixel of `region`, row-major.
    pub fn evaluate(&self, region: TileRegion) -> RasterResult<Vec<f64>> {
        let bands = self
            .bands
            .iter()
            .map(|(_, raster)| raster.region(region).map(|buffer| widen(&buffer)))
            .collect::<RasterResult<Vec<_>>>()?;
        let ctx = EvalContext {
            region,
            bands: &bands,
        };
        Ok(eval(&self.root, &ctx))
    }

    /// Evaluate `region` as a validity mask: 255 where the value is true.
    pub fn evaluate_mask(&self, region: TileRegion) -> RasterResult<Vec<u8>> {
        Ok(self
            .evaluate(region)?
            .into_iter()
            .map(|v| if truthy(v) { VALID } else { INVALID })
            .collect())
    }
}

fn widen(buffer: &PixelBuffer) -> Vec<f64> {
    (0..buffer.region().len())
        .map(|i| buffer.data().get_f64(i).unwrap_or(f64::NAN))
        .collect()
}

fn eval(node: &BoundExpr, ctx: &EvalContext<'_>) -> Vec<f64> {
    let n = ctx.region.len();
    let width = ctx.region.width.max(1) as usize;
    match node {
        BoundExpr::Const(v) => vec![*v; n],
        BoundExpr::Band(index) => ctx.bands[*index].clone(),
        BoundExpr::PixelX => (0..n)
            .map(|i| ctx.region.x as f64 + (i % width) as f64 + 0.5)
            .collect(),
        BoundExpr::PixelY => (0..n)
            .map(|i| ctx.region.y as f64 + (i / width) as f64 + 0.5)
            .collect(),
        BoundExpr::Unary(op, expr) => {
            let mut values = eval(expr, ctx);
            for v in &mut values {
                *v = match op {
                    UnaryOp::Neg => -*v,
                    UnaryOp::Not => bool_value(!truthy(*v)),
                };
            }
            values
        }
        BoundExpr::Binary(op, left, right) => {
            let mut values = eval(left, ctx);
            let rhs = eval(right, ctx);
            for (l, r) in values.iter_mut().zip(rhs) {
                *l = binary(*op, *l, r);
            }
            values
        }
        BoundExpr::Conditional(cond, then, otherwise) => {
            let cond = eval(cond, ctx);
            let then = eval(then, ctx);
            let otherwise = eval(otherwise, ctx);
            cond.into_iter()
                .zip(then.into_iter().zip(otherwise))
                .map(|(c, (t, o))| if truthy(c) { t } else { o })
                .collect()
        }
        BoundExpr::Call(func, args) => match args.as_slice() {
            [a] => eval(a, ctx).into_iter().map(|v| func.apply1(v)).collect(),
            [a, b] => eval(a, ctx)
                .into_iter()
                .zip(eval(b, ctx))
                .map(|(x, y)| func.apply2(x, y))
                .collect(),
            _ => vec![f64::NAN; n],
        },
    }
}

fn binary(op: BinaryOp, l: f64, r: f64) -> f64 {
    match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => l / r,
        BinaryOp::Mod => l % r,
        BinaryOp::Eq => bool_value(l == r),
        BinaryOp::Ne => bool_value(l != r),
        BinaryOp::Lt => bool_value(l < r),
        BinaryOp::Le => bool_value(l <= r),
        BinaryOp::Gt => bool_value(l > r),
        BinaryOp::Ge => bool_value(l >= r),
        BinaryOp::And => bool_value(truthy(l) && truthy(r)),
        BinaryOp::Or => bool_value(truthy(l) || truthy(r)),
    }
}

/// Validity mask computed from a bound expression, one tile at a time.
pub struct ExpressionImage {
    layout: RasterLayout,
    expression: BoundExpression,
}

impl ExpressionImage {
    /// Mask covering `scene` with the given tiling.
    pub fn new(scene: &Scene, expression: BoundExpression, tile_size: TileSize) -> Self {
        Self {
            layout: RasterLayout::new(scene.width(), scene.height(), PixelKind::UInt8, tile_size),
            expression,
        }
    }

    /// Wrap into a lazily evaluated raster.
    pub fn into_raster(self) -> Raster {
        Raster::new(self)
    }
}

impl RasterSource for ExpressionImage {
    fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    fn compute_tile(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
        PixelBuffer::from_vec(region, self.expression.evaluate_mask(region)?)
    }

    fn name(&self) -> &str {
        "expression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(scene: &Scene, text: &str) -> BoundExpression {
        Expression::parse(text).unwrap().bind(scene).unwrap()
    }

    #[test]
    fn test_pixel_centre_symbols() {
        let scene = Scene::new("s", 20, 10);
        let expr = bound(&scene, "X == 10.5");
        let mask = expr.evaluate_mask(TileRegion::new(8, 2, 4, 2)).unwrap();
        assert_eq!(mask, vec![0, 0, 255, 0, 0, 0, 255, 0]);

        let y = bound(&scene, "Y").evaluate(TileRegion::new(0, 3, 2, 2)).unwrap();
        assert_eq!(y, vec![3.5, 3.5, 4.5, 4.5]);
    }

    #[test]
    fn test_band_values_and_nan() {
        let raster = Raster::from_vec(3, 1, vec![1.0f32, f32::NAN, 0.0]).unwrap();
        let scene = Scene::new("s", 3, 1).with_band("B1", raster).unwrap();
        let region = TileRegion::new(0, 0, 3, 1);

        assert_eq!(bound(&scene, "B1").evaluate_mask(region).unwrap(), vec![255, 0, 0]);
        assert_eq!(bound(&scene, "nan(B1)").evaluate_mask(region).unwrap(), vec![0, 255, 0]);
        assert_eq!(bound(&scene, "!B1").evaluate_mask(region).unwrap(), vec![0, 255, 255]);
        assert_eq!(
            bound(&scene, "B1 > 0.5 ? 2 : -1").evaluate(region).unwrap(),
            vec![2.0, -1.0, -1.0]
        );
    }

    #[test]
    fn test_arithmetic() {
        let scene = Scene::new("s", 1, 1);
        let values = bound(&scene, "max(2, 3) * -2 + 7 % 4 - sqrt(16)").evaluate(TileRegion::new(0, 0, 1, 1)).unwrap();
        assert_eq!(values, vec![-7.0]);
    }

    #[test]
    fn test_expression_image_tiles() {
        let scene = Scene::new("s", 5, 5);
        let raster = ExpressionImage::new(&scene, bound(&scene, "X < 2 and Y >= 3"), TileSize::square(2)).into_raster();
        let buffer = raster.materialize().unwrap();
        let valid: usize = buffer.as_slice::<u8>().unwrap().iter().filter(|&&v| v == VALID).count();
        assert_eq!(valid, 4);
        assert_eq!(buffer.sample_f64(1, 4), Some(255.0));
        assert_eq!(buffer.sample_f64(2, 4), Some(0.0));
    }
}
