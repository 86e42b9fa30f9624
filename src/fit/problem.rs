//! Adapter exposing a current-density fit to the `levenberg-marquardt` solver.

use levenberg_marquardt::LeastSquaresProblem;
use nalgebra::{DMatrix, DVector, Dyn, storage::Owned};

use crate::models::CurrentDensityModel;

/// Residuals `model(V, p) - J` over a borrowed measurement series.
pub(crate) struct CurrentFitProblem<'a, M: ?Sized> {
    model: &'a M,
    voltage: &'a [f64],
    current: &'a [f64],
    params: DVector<f64>,
}

impl<'a, M> CurrentFitProblem<'a, M>
where
    M: CurrentDensityModel + ?Sized,
{
    pub(crate) fn new(model: &'a M, voltage: &'a [f64], current: &'a [f64], initial_guess: &[f64]) -> Self {
        debug_assert_eq!(voltage.len(), current.len());
        debug_assert_eq!(initial_guess.len(), model.arity());
        Self {
            model,
            voltage,
            current,
            params: DVector::from_column_slice(initial_guess),
        }
    }
}

impl<'a, M> LeastSquaresProblem<f64, Dyn, Dyn> for CurrentFitProblem<'a, M>
where
    M: CurrentDensityModel + ?Sized,
{
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.copy_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let predicted = self.model.evaluate(self.voltage, self.params.as_slice());
        if predicted.len() != self.current.len() {
            return None;
        }
        Some(DVector::from_iterator(
            predicted.len(),
            predicted.iter().zip(self.current).map(|(p, obs)| p - obs),
        ))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let jac = self.model.jacobian(self.voltage, self.params.as_slice());
        if jac.nrows() != self.voltage.len() || jac.ncols() != self.params.len() {
            return None;
        }
        Some(jac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelKind;

    #[test]
    fn residuals_are_zero_at_generating_parameters() {
        let v = [-1.0, -0.5, 0.5, 1.0];
        let j = ModelKind::Simmons.evaluate(&v, &[1.0, 1.0]);
        let problem = CurrentFitProblem::new(&ModelKind::Simmons, &v, &j, &[1.0, 1.0]);
        let r = problem.residuals().unwrap();
        assert!(r.iter().all(|x| *x == 0.0));
        assert_eq!(problem.jacobian().unwrap().shape(), (4, 2));
    }
}
