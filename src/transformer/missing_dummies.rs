use std::marker::PhantomData;

use crate::{
    archive::{ArchiveReader, ArchiveWriter},
    error::Result,
    estimator::InferenceOnlyEstimator,
    traits::Scalar,
};

use super::Transform;

pub const MISSING_DUMMIES_ESTIMATOR_NAME: &str = "MissingDummiesEstimator";

/// Flags null inputs with `1` and everything else with `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MissingDummiesTransformer<T> {
    _scalar: PhantomData<T>,
}
impl<T: Scalar> MissingDummiesTransformer<T> {
    const VERSION: (u16, u16) = (1, 0);

    pub fn new() -> Self {
        Self {
            _scalar: PhantomData,
        }
    }

    pub fn transform(&self, x: &T::Nullable) -> i8 {
        i8::from(T::is_null(x))
    }
}
impl<T: Scalar> Transform for MissingDummiesTransformer<T> {
    type Input = T::Nullable;
    type Output = i8;

    fn execute(&mut self, input: Self::Input, callback: &mut dyn FnMut(i8)) -> Result<()> {
        callback(self.transform(&input));
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

pub fn missing_dummies_estimator<T: Scalar>(
) -> InferenceOnlyEstimator<MissingDummiesTransformer<T>> {
    InferenceOnlyEstimator::new(MISSING_DUMMIES_ESTIMATOR_NAME, MissingDummiesTransformer::new())
}
