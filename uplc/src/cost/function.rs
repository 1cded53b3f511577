//! Cost functions for builtin applications.
//!
//! Every builtin carries one [`Function`] for execution units and one for
//! memory units, evaluated over the memory footprints of its value
//! arguments (`x`, `y`, `z` name the first three). A handful of builtins
//! report a literal argument value instead of a footprint; see
//! [`Builtin::argument_sizes`](crate::Builtin).

use super::ModelError;

/// A cursor over the flat parameter array of a cost model.
#[derive(Debug, Clone, Copy)]
pub struct Stream<'a> {
    data: &'a [i64],
    position: usize,
}

impl<'a> Stream<'a> {
    pub fn new(data: &'a [i64]) -> Self {
        Stream { data, position: 0 }
    }

    pub fn next(&mut self) -> Result<i64, ModelError> {
        let value = self
            .data
            .get(self.position)
            .copied()
            .ok_or(ModelError::MissingParameters)?;
        self.position += 1;
        Ok(value)
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position.min(self.data.len())
    }
}

/// The execution and memory cost functions of one builtin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub execution: Function,
    pub memory: Function,
}

impl Pair {
    /// Rebuild the pair with parameters drained from `stream`, keeping the
    /// shapes. This is how the flat cost-model array is interpreted: the
    /// shape table is fixed per version, only the numbers travel.
    pub fn reparameterize(&self, stream: &mut Stream<'_>) -> Result<Pair, ModelError> {
        Ok(Pair {
            execution: self.execution.reparameterize(stream)?,
            memory: self.memory.reparameterize(stream)?,
        })
    }

    pub(crate) fn push_parameters(&self, out: &mut Vec<i64>) {
        self.execution.push_parameters(out);
        self.memory.push_parameters(out);
    }
}

/// The closed family of cost-function shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Constant(i64),
    LinearInX { intercept: i64, slope: i64 },
    LinearInY { intercept: i64, slope: i64 },
    LinearInZ { intercept: i64, slope: i64 },
    AddedSizes { intercept: i64, slope: i64 },
    MultipliedSizes { intercept: i64, slope: i64 },
    MinSize { intercept: i64, slope: i64 },
    MaxSize { intercept: i64, slope: i64 },
    /// Linear in `max(x - y, minimum)`.
    SubtractedSizes { intercept: i64, slope: i64, minimum: i64 },
    /// Linear in `x` on the diagonal (`x == y`), constant off it.
    LinearOnDiagonal { constant: i64, intercept: i64, slope: i64 },
    /// Constant when `x < y`, the inner model otherwise.
    ConstAboveDiagonal { constant: i64, model: Box<Function> },
    /// Constant when `x > y`, the inner model otherwise.
    ConstBelowDiagonal { constant: i64, model: Box<Function> },
    QuadraticInY { c0: i64, c1: i64, c2: i64 },
    QuadraticInZ { c0: i64, c1: i64, c2: i64 },
    /// The literal `y` (rounded up to words) when non-zero, else linear in
    /// `z`. Used by `integerToByteString`, whose width argument is costed
    /// literally.
    LiteralInYOrLinearInZ { intercept: i64, slope: i64 },
    LinearInMaxYZ { intercept: i64, slope: i64 },
    LinearInYAndZ { intercept: i64, slope_y: i64, slope_z: i64 },
}

impl Function {
    pub fn cost(&self, sizes: &[i64]) -> i64 {
        let size = |n: usize| sizes.get(n).copied().unwrap_or(0);
        let (x, y, z) = (size(0), size(1), size(2));
        match *self {
            Function::Constant(constant) => constant,
            Function::LinearInX { intercept, slope } => affine(intercept, slope, x),
            Function::LinearInY { intercept, slope } => affine(intercept, slope, y),
            Function::LinearInZ { intercept, slope } => affine(intercept, slope, z),
            Function::AddedSizes { intercept, slope } => {
                affine(intercept, slope, x.saturating_add(y))
            }
            Function::MultipliedSizes { intercept, slope } => {
                affine(intercept, slope, x.saturating_mul(y))
            }
            Function::MinSize { intercept, slope } => affine(intercept, slope, x.min(y)),
            Function::MaxSize { intercept, slope } => affine(intercept, slope, x.max(y)),
            Function::SubtractedSizes {
                intercept,
                slope,
                minimum,
            } => affine(intercept, slope, x.saturating_sub(y).max(minimum)),
            Function::LinearOnDiagonal {
                constant,
                intercept,
                slope,
            } => {
                if x == y {
                    affine(intercept, slope, x)
                } else {
                    constant
                }
            }
            Function::ConstAboveDiagonal { constant, ref model } => {
                if x < y { constant } else { model.cost(sizes) }
            }
            Function::ConstBelowDiagonal { constant, ref model } => {
                if x > y { constant } else { model.cost(sizes) }
            }
            Function::QuadraticInY { c0, c1, c2 } => quadratic(c0, c1, c2, y),
            Function::QuadraticInZ { c0, c1, c2 } => quadratic(c0, c1, c2, z),
            Function::LiteralInYOrLinearInZ { intercept, slope } => {
                if y == 0 {
                    affine(intercept, slope, z)
                } else {
                    y.div_euclid(8) + i64::from(y.rem_euclid(8) != 0)
                }
            }
            Function::LinearInMaxYZ { intercept, slope } => affine(intercept, slope, y.max(z)),
            Function::LinearInYAndZ {
                intercept,
                slope_y,
                slope_z,
            } => intercept
                .saturating_add(slope_y.saturating_mul(y))
                .saturating_add(slope_z.saturating_mul(z)),
        }
    }

    /// Append this function's parameters in canonical order.
    pub(crate) fn push_parameters(&self, out: &mut Vec<i64>) {
        match *self {
            Function::Constant(constant) => out.push(constant),
            Function::LinearInX { intercept, slope }
            | Function::LinearInY { intercept, slope }
            | Function::LinearInZ { intercept, slope }
            | Function::AddedSizes { intercept, slope }
            | Function::MultipliedSizes { intercept, slope }
            | Function::MinSize { intercept, slope }
            | Function::MaxSize { intercept, slope }
            | Function::LiteralInYOrLinearInZ { intercept, slope }
            | Function::LinearInMaxYZ { intercept, slope } => {
                out.extend([intercept, slope]);
            }
            Function::SubtractedSizes {
                intercept,
                slope,
                minimum,
            } => out.extend([intercept, slope, minimum]),
            Function::LinearOnDiagonal {
                constant,
                intercept,
                slope,
            } => out.extend([constant, intercept, slope]),
            Function::ConstAboveDiagonal { constant, ref model }
            | Function::ConstBelowDiagonal { constant, ref model } => {
                out.push(constant);
                model.push_parameters(out);
            }
            Function::QuadraticInY { c0, c1, c2 } | Function::QuadraticInZ { c0, c1, c2 } => {
                out.extend([c0, c1, c2]);
            }
            Function::LinearInYAndZ {
                intercept,
                slope_y,
                slope_z,
            } => out.extend([intercept, slope_y, slope_z]),
        }
    }

    fn reparameterize(&self, stream: &mut Stream<'_>) -> Result<Function, ModelError> {
        Ok(match self {
            Function::Constant(_) => Function::Constant(stream.next()?),
            Function::LinearInX { .. } => Function::LinearInX {
                intercept: stream.next()?,
                slope: stream.next()?,
            },
            Function::LinearInY { .. } => Function::LinearInY {
                intercept: stream.next()?,
                slope: stream.next()?,
            },
            Function::LinearInZ { .. } => Function::LinearInZ {
                intercept: stream.next()?,
                slope: stream.next()?,
            },
            Function::AddedSizes { .. } => Function::AddedSizes {
                intercept: stream.next()?,
                slope: stream.next()?,
            },
            Function::MultipliedSizes { .. } => Function::MultipliedSizes {
                intercept: stream.next()?,
                slope: stream.next()?,
            },
            Function::MinSize { .. } => Function::MinSize {
                intercept: stream.next()?,
                slope: stream.next()?,
            },
            Function::MaxSize { .. } => Function::MaxSize {
                intercept: stream.next()?,
                slope: stream.next()?,
            },
            Function::SubtractedSizes { .. } => Function::SubtractedSizes {
                intercept: stream.next()?,
                slope: stream.next()?,
                minimum: stream.next()?,
            },
            Function::LinearOnDiagonal { .. } => Function::LinearOnDiagonal {
                constant: stream.next()?,
                intercept: stream.next()?,
                slope: stream.next()?,
            },
            Function::ConstAboveDiagonal { model, .. } => Function::ConstAboveDiagonal {
                constant: stream.next()?,
                model: Box::new(model.reparameterize(stream)?),
            },
            Function::ConstBelowDiagonal { model, .. } => Function::ConstBelowDiagonal {
                constant: stream.next()?,
                model: Box::new(model.reparameterize(stream)?),
            },
            Function::QuadraticInY { .. } => Function::QuadraticInY {
                c0: stream.next()?,
                c1: stream.next()?,
                c2: stream.next()?,
            },
            Function::QuadraticInZ { .. } => Function::QuadraticInZ {
                c0: stream.next()?,
                c1: stream.next()?,
                c2: stream.next()?,
            },
            Function::LiteralInYOrLinearInZ { .. } => Function::LiteralInYOrLinearInZ {
                intercept: stream.next()?,
                slope: stream.next()?,
            },
            Function::LinearInMaxYZ { .. } => Function::LinearInMaxYZ {
                intercept: stream.next()?,
                slope: stream.next()?,
            },
            Function::LinearInYAndZ { .. } => Function::LinearInYAndZ {
                intercept: stream.next()?,
                slope_y: stream.next()?,
                slope_z: stream.next()?,
            },
        })
    }
}

fn affine(intercept: i64, slope: i64, size: i64) -> i64 {
    intercept.saturating_add(slope.saturating_mul(size))
}

fn quadratic(c0: i64, c1: i64, c2: i64, size: i64) -> i64 {
    c0.saturating_add(c1.saturating_mul(size))
        .saturating_add(c2.saturating_mul(size.saturating_mul(size)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes() {
        assert_eq!(Function::Constant(7).cost(&[3, 4]), 7);
        assert_eq!(
            Function::MaxSize {
                intercept: 10,
                slope: 2
            }
            .cost(&[3, 4]),
            18
        );
        assert_eq!(
            Function::SubtractedSizes {
                intercept: 0,
                slope: 1,
                minimum: 1
            }
            .cost(&[2, 9]),
            1
        );
        assert_eq!(
            Function::ConstAboveDiagonal {
                constant: 5,
                model: Box::new(Function::MultipliedSizes {
                    intercept: 0,
                    slope: 1
                }),
            }
            .cost(&[2, 9]),
            5
        );
        assert_eq!(
            Function::LiteralInYOrLinearInZ {
                intercept: 0,
                slope: 1
            }
            .cost(&[1, 9, 4]),
            2
        );
        assert_eq!(
            Function::LiteralInYOrLinearInZ {
                intercept: 0,
                slope: 1
            }
            .cost(&[1, 0, 4]),
            4
        );
    }

    #[test]
    fn reparameterize_preserves_shape() {
        let pair = Pair {
            execution: Function::QuadraticInY {
                c0: 0,
                c1: 0,
                c2: 0,
            },
            memory: Function::Constant(0),
        };
        let mut stream = Stream::new(&[1, 2, 3, 4]);
        let loaded = pair.reparameterize(&mut stream).unwrap();
        assert_eq!(
            loaded.execution,
            Function::QuadraticInY {
                c0: 1,
                c1: 2,
                c2: 3,
            }
        );
        assert_eq!(loaded.memory, Function::Constant(4));
        assert_eq!(stream.remaining(), 0);

        let mut short = Stream::new(&[1]);
        assert!(pair.reparameterize(&mut short).is_err());
    }
}
