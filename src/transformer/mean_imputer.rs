use num_traits::{Float, NumCast};

use crate::{
    archive::{ArchiveReader, ArchiveWriter},
    error::{FeaturizerError, Result},
    estimator::{Estimate, EstimateTransformer, EstimatorContext, FitResult},
    traits::Scalar,
};

use super::Transform;

#[derive(Debug, Clone, Default)]
pub struct MeanImputerEstimator<T> {
    mean: Option<T>,
    count: u64,
}
impl<T> MeanImputerEstimator<T> {
    pub const NAME: &'static str = "MeanImputerEstimator";

    pub fn new() -> Self {
        Self {
            mean: None,
            count: 0,
        }
    }
}
impl<T: Scalar<Nullable = T> + Float> Estimate for MeanImputerEstimator<T> {
    type Input = T;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fit(&mut self, _context: &EstimatorContext, input: &T) -> Result<FitResult> {
        if T::is_null(input) {
            return Ok(FitResult::Continue);
        }
        self.count += 1;
        let mean = self.mean.unwrap_or_else(T::zero);
        // Finite for any two finite values
        let n = <T as NumCast>::from(self.count).ok_or_else(|| {
            FeaturizerError::invalid_argument(format!("count {} overflows {}", self.count, T::KIND))
        })?;
        self.mean = Some(mean + (*input / n - mean / n));
        Ok(FitResult::Continue)
    }

    fn complete_training(&mut self, _context: &EstimatorContext) -> Result<()> {
        if self.mean.is_none() {
            return Err(FeaturizerError::invalid_state(format!(
                "`{}` observed no non-null value",
                Self::NAME
            )));
        }
        Ok(())
    }
}
impl<T: Scalar<Nullable = T> + Float> EstimateTransformer for MeanImputerEstimator<T> {
    type Transformer = MeanImputer<T>;

    fn create_transformer(&mut self, _context: &EstimatorContext) -> Result<Self::Transformer> {
        let mean = self
            .mean
            .ok_or_else(|| FeaturizerError::invalid_state("mean was never learned"))?;
        MeanImputer::new(mean)
    }
}

/// Replaces NaN with the learned mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanImputer<T> {
    mean: T,
}
impl<T: Scalar<Nullable = T> + Float> MeanImputer<T> {
    const VERSION: (u16, u16) = (1, 0);

    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidArgument`] if `mean` is NaN.
    pub fn new(mean: T) -> Result<Self> {
        if T::is_null(&mean) {
            return Err(FeaturizerError::invalid_argument("mean is NaN"));
        }
        Ok(Self { mean })
    }

    pub fn mean(&self) -> T {
        self.mean
    }

    pub fn transform(&self, x: T) -> T {
        if T::is_null(&x) {
            return self.mean;
        }
        x
    }
}
impl<T: Scalar<Nullable = T> + Float> Transform for MeanImputer<T> {
    type Input = T;
    type Output = T;

    fn execute(&mut self, input: T, callback: &mut dyn FnMut(T)) -> Result<()> {
        callback(self.transform(input));
        Ok(())
    }

    fn save(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.write_version(Self::VERSION.0, Self::VERSION.1)?;
        archive.serialize(&self.mean)
    }

    fn from_archive(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        archive.expect_version(Self::VERSION.0, Self::VERSION.1)?;
        Self::new(archive.deserialize()?)
    }
}
