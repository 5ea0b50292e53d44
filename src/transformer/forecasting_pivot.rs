use std::marker::PhantomData;

use crate::{
    archive::{ArchiveReader, ArchiveWriter},
    error::{FeaturizerError, Result},
    estimator::InferenceOnlyEstimator,
    matrix::Matrix,
    traits::Scalar,
};

use super::Transform;

pub const FORECASTING_PIVOT_ESTIMATOR_NAME: &str = "ForecastingPivotEstimator";

/// Turns forecast matrices into one row per horizon step.
///
/// Every input matrix comes from one forecast column. Column `j` yields the
/// concatenation of column `j` of every matrix, unless any of those cells is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForecastingPivot<T> {
    _scalar: PhantomData<T>,
}
impl<T: Scalar> ForecastingPivot<T> {
    const VERSION: (u16, u16) = (1, 0);

    pub fn new() -> Self {
        Self {
            _scalar: PhantomData,
        }
    }

    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidArgument`] if `matrices` is empty or
    /// their column counts differ.
    pub fn pivot(&self, matrices: &[Matrix<T::Nullable>]) -> Result<Vec<Vec<T>>> {
        let Some(first) = matrices.first() else {
            return Err(FeaturizerError::invalid_argument("no matrix to pivot"));
        };
        let cols = first.cols();
        if let Some(m) = matrices.iter().find(|m| m.cols() != cols) {
            return Err(FeaturizerError::invalid_argument(format!(
                "matrices with {cols} and {} columns",
                m.cols()
            )));
        }

        let mut rows = vec![];
        for col in 0..cols {
            let complete = matrices
                .iter()
                .all(|m| m.column(col).all(|x| !T::is_null(x)));
            if !complete {
                continue;
            }
            let row = matrices
                .iter()
                .flat_map(|m| m.column(col))
                .map(T::get_nullable_value)
                .collect::<Result<Vec<T>>>()?;
            rows.push(row);
        }
        Ok(rows)
    }
}
impl<T: Scalar> Transform for ForecastingPivot<T> {
    type Input = Vec<Matrix<T::Nullable>>;
    type Output = Vec<T>;

    fn execute(&mut self, input: Self::Input, callback: &mut dyn FnMut(Vec<T>)) -> Result<()> {
        for row in self.pivot(&input)? {
            callback(row);
        }
        Ok(())
    }

    fn save(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.write_version(Self::VERSION.0, Self::VERSION.1)
    }

    fn from_archive(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        archive.expect_version(Self::VERSION.0, Self::VERSION.1)?;
        Ok(Self::new())
    }
}

pub fn forecasting_pivot_estimator<T: Scalar>() -> InferenceOnlyEstimator<ForecastingPivot<T>> {
    InferenceOnlyEstimator::new(FORECASTING_PIVOT_ESTIMATOR_NAME, ForecastingPivot::new())
}
