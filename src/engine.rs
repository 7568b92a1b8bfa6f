use na::{ArrayStorage, Const, Matrix};

pub mod plant;
pub mod sensor;

/// Statically sized column-major matrix, `R` rows by `C` columns.
pub type Mat<T, const R: usize, const C: usize> =
    Matrix<T, Const<R>, Const<C>, ArrayStorage<T, R, C>>;

/// Advances a simulated system by one discrete tick.
pub trait Step {
    fn step(&mut self, control: f64);
}

/// Produces a (noisy) reading of a simulated system.
pub trait Measure {
    fn measure(&mut self) -> f64;
}
