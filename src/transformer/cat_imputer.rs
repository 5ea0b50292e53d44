use std::{cmp::Reverse, collections::HashMap, hash::Hash};

use crate::{
    archive::{ArchiveReader, ArchiveWriter},
    error::{FeaturizerError, Result},
    estimator::{Estimate, EstimateTransformer, EstimatorContext, FitResult},
    traits::Scalar,
};

use super::Transform;

#[derive(Debug, Clone, Copy)]
struct Frequency {
    count: u64,
    first_seen: usize,
}

/// Learns the most frequent non-null category of a column.
///
/// Ties go to the category seen first.
#[derive(Debug, Clone)]
pub struct CatImputerEstimator<T> {
    frequencies: HashMap<T, Frequency>,
    most_frequent: Option<T>,
}
impl<T> CatImputerEstimator<T> {
    pub const NAME: &'static str = "CatImputerEstimator";

    pub fn new() -> Self {
        Self {
            frequencies: HashMap::new(),
            most_frequent: None,
        }
    }
}
impl<T> Default for CatImputerEstimator<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: Scalar + Eq + Hash> Estimate for CatImputerEstimator<T> {
    type Input = T::Nullable;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fit(&mut self, _context: &EstimatorContext, input: &Self::Input) -> Result<FitResult> {
        let Some(x) = T::into_option(input.clone()) else {
            return Ok(FitResult::Continue);
        };
        let first_seen = self.frequencies.len();
        self.frequencies
            .entry(x)
            .or_insert(Frequency {
                count: 0,
                first_seen,
            })
            .count += 1;
        Ok(FitResult::Continue)
    }

    fn complete_training(&mut self, _context: &EstimatorContext) -> Result<()> {
        let most_frequent = self
            .frequencies
            .iter()
            .max_by_key(|(_, f)| (f.count, Reverse(f.first_seen)))
            .map(|(x, _)| x.clone());
        let Some(most_frequent) = most_frequent else {
            return Err(FeaturizerError::invalid_state(format!(
                "`{}` observed no non-null value",
                Self::NAME
            )));
        };
        self.most_frequent = Some(most_frequent);
        self.frequencies = HashMap::new();
        Ok(())
    }
}
impl<T: Scalar + Eq + Hash> EstimateTransformer for CatImputerEstimator<T> {
    type Transformer = CatImputer<T>;

    fn create_transformer(&mut self, _context: &EstimatorContext) -> Result<Self::Transformer> {
        let value = self
            .most_frequent
            .clone()
            .ok_or_else(|| FeaturizerError::invalid_state("no category was learned"))?;
        Ok(CatImputer::new(value))
    }
}

/// Replaces null with the learned category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatImputer<T> {
    value: T,
}
impl<T: Scalar> CatImputer<T> {
    const VERSION: (u16, u16) = (1, 0);

    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn transform(&self, x: T::Nullable) -> T {
        T::into_option(x).unwrap_or_else(|| self.value.clone())
    }
}
impl<T: Scalar> Transform for CatImputer<T> {
    type Input = T::Nullable;
    type Output = T;

    fn execute(&mut self, input: Self::Input, callback: &mut dyn FnMut(T)) -> Result<()> {
        callback(self.transform(input));
        Ok(())
    }

    fn save(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.write_version(Self::VERSION.0, Self::VERSION.1)?;
        archive.serialize(&self.value)
    }

    fn from_archive(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        archive.expect_version(Self::VERSION.0, Self::VERSION.1)?;
        Ok(Self::new(archive.deserialize()?))
    }
}
