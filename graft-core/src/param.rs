use crate::error::GraftError;
use crate::transfer::{Transferable, TransferableComponents};
use crate::update::{join_name, Trainables};
use nanoserde::{DeJson, SerJson};
use rand::Rng;

/// Row major f32 matrix
#[derive(Debug, Clone, Default, PartialEq, SerJson, DeJson)]
pub struct Matrix {
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
    /// Values, `rows * cols` of them
    pub data: Vec<f32>,
}

impl Matrix {
    /// Matrix filled with zeros
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Matrix from row major data
    ///
    /// # Errors
    ///
    /// Errors if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Matrix, GraftError> {
        if data.len() != rows * cols {
            return Err(GraftError::shape_error(
                format!("Can not create {rows}x{cols} matrix from {} values", data.len()).into(),
            ));
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Number of elements
    #[must_use]
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    /// Element at row r and column c
    #[must_use]
    pub fn get(&self, r: usize, c: usize) -> f32 {
        self.data[r * self.cols + c]
    }

    /// self · x
    ///
    /// # Errors
    ///
    /// Errors if `x.len() != self.cols`.
    pub fn matvec(&self, x: &[f32]) -> Result<Vec<f32>, GraftError> {
        if x.len() != self.cols || self.data.len() != self.numel() {
            return Err(GraftError::shape_error(
                format!(
                    "Can not multiply {}x{} matrix with vector of {} elements",
                    self.rows,
                    self.cols,
                    x.len()
                )
                .into(),
            ));
        }
        if self.cols == 0 {
            return Ok(vec![0.0; self.rows]);
        }
        Ok(self
            .data
            .chunks_exact(self.cols)
            .map(|row| row.iter().zip(x).map(|(w, x)| w * x).sum::<f32>())
            .collect())
    }
}

/// Single trainable matrix
#[derive(Debug, Clone, Default, PartialEq, SerJson, DeJson)]
pub struct Param {
    /// Current value
    pub val: Matrix,
}

impl Param {
    /// Initialize as `out x in` matrix drawn uniformly from ±sqrt(6 / (in + out))
    pub fn init<R: Rng + ?Sized>(&mut self, out_dim: usize, in_dim: usize, rng: &mut R) {
        let bound = (6.0 / (in_dim + out_dim) as f32).sqrt();
        let data = (0..out_dim * in_dim)
            .map(|_| rng.gen_range(-bound..=bound))
            .collect();
        self.val = Matrix {
            rows: out_dim,
            cols: in_dim,
            data,
        };
    }

    /// Input dimension (columns)
    #[must_use]
    pub const fn in_dim(&self) -> usize {
        self.val.cols
    }

    /// Output dimension (rows)
    #[must_use]
    pub const fn out_dim(&self) -> usize {
        self.val.rows
    }
}

impl Transferable for Param {
    fn host(&self) -> &Matrix {
        &self.val
    }

    fn host_mut(&mut self) -> &mut Matrix {
        &mut self.val
    }
}

/// Parameters of linear projection W·x + b
#[derive(Debug, Clone, Default, PartialEq, SerJson, DeJson)]
pub struct UniParams {
    /// Weight, `out x in`
    pub w: Param,
    /// Bias, `out x 1`, empty if bias is not used
    pub b: Param,
    /// Is b used?
    pub use_bias: bool,
}

impl UniParams {
    /// Initialize projection from in_dim to out_dim
    pub fn init<R: Rng + ?Sized>(
        &mut self,
        out_dim: usize,
        in_dim: usize,
        use_bias: bool,
        rng: &mut R,
    ) {
        self.w.init(out_dim, in_dim, rng);
        if use_bias {
            self.b.init(out_dim, 1, rng);
        } else {
            self.b = Param::default();
        }
        self.use_bias = use_bias;
    }

    /// Input dimension
    #[must_use]
    pub const fn in_dim(&self) -> usize {
        self.w.in_dim()
    }

    /// Output dimension
    #[must_use]
    pub const fn out_dim(&self) -> usize {
        self.w.out_dim()
    }

    /// W·x + b
    ///
    /// # Errors
    ///
    /// Errors if x does not have in_dim elements or bias does not match weight.
    pub fn project(&self, x: &[f32]) -> Result<Vec<f32>, GraftError> {
        let mut y = self.w.val.matvec(x)?;
        if self.use_bias {
            add_bias(&mut y, &self.b)?;
        }
        Ok(y)
    }

    /// Register w, and b if bias is used
    pub fn export_trainables<'a>(&'a mut self, prefix: &str, trainables: &mut Trainables<'a>) {
        trainables.register(join_name(prefix, "w"), &mut self.w);
        if self.use_bias {
            trainables.register(join_name(prefix, "b"), &mut self.b);
        }
    }
}

impl TransferableComponents for UniParams {
    fn name(&self) -> &'static str {
        "UniParams"
    }

    fn transferable_ptrs(&mut self) -> Vec<&mut dyn Transferable> {
        if self.use_bias {
            vec![&mut self.w as &mut dyn Transferable, &mut self.b]
        } else {
            vec![&mut self.w as &mut dyn Transferable]
        }
    }
}

/// Parameters of bilinear combination W1·x1 + W2·x2 + b
#[derive(Debug, Clone, Default, PartialEq, SerJson, DeJson)]
pub struct BiParams {
    /// Weight of first input, `out x in1`
    pub w1: Param,
    /// Weight of second input, `out x in2`
    pub w2: Param,
    /// Bias, `out x 1`, empty if bias is not used
    pub b: Param,
    /// Is b used?
    pub use_bias: bool,
}

impl BiParams {
    /// Initialize combination of in1_dim and in2_dim into out_dim
    pub fn init<R: Rng + ?Sized>(
        &mut self,
        out_dim: usize,
        in1_dim: usize,
        in2_dim: usize,
        use_bias: bool,
        rng: &mut R,
    ) {
        self.w1.init(out_dim, in1_dim, rng);
        self.w2.init(out_dim, in2_dim, rng);
        if use_bias {
            self.b.init(out_dim, 1, rng);
        } else {
            self.b = Param::default();
        }
        self.use_bias = use_bias;
    }

    /// Output dimension
    #[must_use]
    pub const fn out_dim(&self) -> usize {
        self.w1.out_dim()
    }

    /// W1·x1 + W2·x2 + b
    ///
    /// # Errors
    ///
    /// Errors if inputs or bias do not match weights.
    pub fn combine(&self, x1: &[f32], x2: &[f32]) -> Result<Vec<f32>, GraftError> {
        let mut y = self.w1.val.matvec(x1)?;
        let y2 = self.w2.val.matvec(x2)?;
        if y.len() != y2.len() {
            return Err(GraftError::shape_error(
                format!(
                    "Bilinear weights have different output dims {} and {}",
                    y.len(),
                    y2.len()
                )
                .into(),
            ));
        }
        y.iter_mut().zip(y2).for_each(|(a, b)| *a += b);
        if self.use_bias {
            add_bias(&mut y, &self.b)?;
        }
        Ok(y)
    }

    /// Register w1, w2, and b if bias is used
    pub fn export_trainables<'a>(&'a mut self, prefix: &str, trainables: &mut Trainables<'a>) {
        trainables.register(join_name(prefix, "w1"), &mut self.w1);
        trainables.register(join_name(prefix, "w2"), &mut self.w2);
        if self.use_bias {
            trainables.register(join_name(prefix, "b"), &mut self.b);
        }
    }
}

impl TransferableComponents for BiParams {
    fn name(&self) -> &'static str {
        "BiParams"
    }

    fn transferable_ptrs(&mut self) -> Vec<&mut dyn Transferable> {
        if self.use_bias {
            vec![&mut self.w1 as &mut dyn Transferable, &mut self.w2, &mut self.b]
        } else {
            vec![&mut self.w1 as &mut dyn Transferable, &mut self.w2]
        }
    }
}

fn add_bias(y: &mut [f32], b: &Param) -> Result<(), GraftError> {
    if b.val.data.len() != y.len() {
        return Err(GraftError::shape_error(
            format!("Bias of {} elements does not match output of {}", b.val.data.len(), y.len())
                .into(),
        ));
    }
    y.iter_mut().zip(&b.val.data).for_each(|(y, b)| *y += b);
    Ok(())
}
