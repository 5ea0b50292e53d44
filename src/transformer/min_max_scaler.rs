use std::{cmp::Ordering, marker::PhantomData};

use getset::Getters;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    archive::{ArchiveReader, ArchiveWriter},
    error::{FeaturizerError, Result},
    estimator::{Estimate, EstimateTransformer, EstimatorContext, FitResult},
    traits::Scalar,
};

use super::{to_f64, Transform};

/// Observed range of a column, published by [`MinMaxEstimator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct MinMaxAnnotation<T> {
    #[getset(get = "pub")]
    min: T,
    #[getset(get = "pub")]
    max: T,
}

/// Observes the minimum and maximum non-null values of a column.
#[derive(Debug, Clone)]
pub struct MinMaxEstimator<T> {
    range: Option<(T, T)>,
}
impl<T> MinMaxEstimator<T> {
    pub const NAME: &'static str = "MinMaxEstimator";

    pub fn new() -> Self {
        Self { range: None }
    }
}
impl<T> Default for MinMaxEstimator<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: Scalar + PartialOrd> Estimate for MinMaxEstimator<T> {
    type Input = T::Nullable;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fit(&mut self, _context: &EstimatorContext, input: &Self::Input) -> Result<FitResult> {
        let Some(x) = T::into_option(input.clone()) else {
            return Ok(FitResult::Continue);
        };
        match &mut self.range {
            Some((min, max)) => {
                if x < *min {
                    *min = x;
                } else if *max < x {
                    *max = x;
                }
            }
            None => self.range = Some((x.clone(), x)),
        }
        Ok(FitResult::Continue)
    }

    fn complete_training(&mut self, context: &EstimatorContext) -> Result<()> {
        let Some((min, max)) = self.range.clone() else {
            return Err(FeaturizerError::invalid_state(format!(
                "`{}` observed no non-null value",
                Self::NAME
            )));
        };
        context.publish(Self::NAME, MinMaxAnnotation { min, max })
    }
}

/// Builds a [`MinMaxScaler`] from the [`MinMaxAnnotation`] of its column.
///
/// Never trains: its `fit` is a no-op and it is finished from construction.
#[derive(Debug, Clone)]
pub struct AnnotatedMinMaxScalerEstimator<T> {
    _scalar: PhantomData<T>,
}
impl<T> AnnotatedMinMaxScalerEstimator<T> {
    pub const NAME: &'static str = "AnnotatedMinMaxScalerEstimator";

    pub fn new() -> Self {
        Self {
            _scalar: PhantomData,
        }
    }
}
impl<T> Default for AnnotatedMinMaxScalerEstimator<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: Scalar + PartialOrd + ToPrimitive> Estimate for AnnotatedMinMaxScalerEstimator<T> {
    type Input = T::Nullable;

    fn name(&self) -> &'static str {
        Self::NAME
    }
    fn begin_training(&mut self, _context: &EstimatorContext) -> Result<bool> {
        Ok(false)
    }
    fn fit(&mut self, _context: &EstimatorContext, _input: &Self::Input) -> Result<FitResult> {
        Ok(FitResult::Complete)
    }
    fn complete_training(&mut self, _context: &EstimatorContext) -> Result<()> {
        Ok(())
    }
}
impl<T: Scalar + PartialOrd + ToPrimitive> EstimateTransformer
    for AnnotatedMinMaxScalerEstimator<T>
{
    type Transformer = MinMaxScaler<T>;

    fn create_transformer(&mut self, context: &EstimatorContext) -> Result<Self::Transformer> {
        let annotation =
            context.annotation::<MinMaxAnnotation<T>>(MinMaxEstimator::<T>::NAME)?;
        MinMaxScaler::new(annotation.min.clone(), annotation.max.clone())
    }
}

/// Runs a [`MinMaxEstimator`] over the column and then an [`AnnotatedMinMaxScalerEstimator`].
#[derive(Debug, Clone)]
pub struct MinMaxScalerEstimator<T> {
    observer: MinMaxEstimator<T>,
    scaler: AnnotatedMinMaxScalerEstimator<T>,
}
impl<T> MinMaxScalerEstimator<T> {
    pub const NAME: &'static str = "MinMaxScalerEstimator";

    pub fn new() -> Self {
        Self {
            observer: MinMaxEstimator::new(),
            scaler: AnnotatedMinMaxScalerEstimator::new(),
        }
    }
}
impl<T> Default for MinMaxScalerEstimator<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: Scalar + PartialOrd + ToPrimitive> Estimate for MinMaxScalerEstimator<T> {
    type Input = T::Nullable;

    fn name(&self) -> &'static str {
        Self::NAME
    }
    fn begin_training(&mut self, context: &EstimatorContext) -> Result<bool> {
        self.observer.begin_training(context)
    }
    fn fit(&mut self, context: &EstimatorContext, input: &Self::Input) -> Result<FitResult> {
        self.observer.fit(context, input)
    }
    fn on_data_completed(&mut self, context: &EstimatorContext) -> Result<FitResult> {
        self.observer.on_data_completed(context)
    }
    fn complete_training(&mut self, context: &EstimatorContext) -> Result<()> {
        self.observer.complete_training(context)?;
        if self.scaler.begin_training(context)? {
            return Err(FeaturizerError::invalid_state(format!(
                "`{}` expects to need no training",
                AnnotatedMinMaxScalerEstimator::<T>::NAME
            )));
        }
        self.scaler.complete_training(context)
    }
}
impl<T: Scalar + PartialOrd + ToPrimitive> EstimateTransformer for MinMaxScalerEstimator<T> {
    type Transformer = MinMaxScaler<T>;

    fn create_transformer(&mut self, context: &EstimatorContext) -> Result<Self::Transformer> {
        self.scaler.create_transformer(context)
    }
}

/// Maps a column onto `[0, 1]`.
///
/// A constant column (`min == max`) maps to `0`. Null maps to NaN.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct MinMaxScaler<T> {
    #[getset(get = "pub")]
    min: T,
    #[getset(get = "pub")]
    max: T,
}
impl<T: Scalar + PartialOrd + ToPrimitive> MinMaxScaler<T> {
    const VERSION: (u16, u16) = (1, 0);

    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidArgument`] if
    ///
    /// - `max < min` or the two are unordered
    /// - `min != max` and `max - min` is not finite
    pub fn new(min: T, max: T) -> Result<Self> {
        if !matches!(min.partial_cmp(&max), Some(Ordering::Less | Ordering::Equal)) {
            return Err(FeaturizerError::invalid_argument(format!(
                "max {max:?} is not greater than or equal to min {min:?}"
            )));
        }
        let scaler = Self { min, max };
        if scaler.is_constant() {
            warn!(min = ?scaler.min, "zero span, every output will be 0");
            return Ok(scaler);
        }
        let span = scaler.span()?;
        if !span.is_finite() {
            return Err(FeaturizerError::invalid_argument(format!(
                "span between {:?} and {:?} is not finite",
                scaler.min, scaler.max
            )));
        }
        Ok(scaler)
    }

    /// `min == max`, compared in `T` rather than through the `f64` span.
    pub fn is_constant(&self) -> bool {
        self.min.partial_cmp(&self.max) == Some(Ordering::Equal)
    }

    pub fn span(&self) -> Result<f64> {
        Ok(to_f64(&self.max)? - to_f64(&self.min)?)
    }

    pub fn transform(&self, x: &T::Nullable) -> Result<f64> {
        let Some(x) = T::into_option(x.clone()) else {
            return Ok(f64::create_null_value());
        };
        if self.is_constant() {
            return Ok(0.);
        }
        Ok((to_f64(&x)? - to_f64(&self.min)?) / self.span()?)
    }
}
impl<T: Scalar + PartialOrd + ToPrimitive> Transform for MinMaxScaler<T> {
    type Input = T::Nullable;
    type Output = f64;

    fn execute(&mut self, input: Self::Input, callback: &mut dyn FnMut(f64)) -> Result<()> {
        callback(self.transform(&input)?);
        Ok(())
    }

    fn save(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.write_version(Self::VERSION.0, Self::VERSION.1)?;
        archive.serialize(&self.min)?;
        archive.serialize(&self.max)
    }

    fn from_archive(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        archive.expect_version(Self::VERSION.0, Self::VERSION.1)?;
        let min = archive.deserialize()?;
        let max = archive.deserialize()?;
        Self::new(min, max)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        annotation::AnnotationMaps,
        error::ErrorKind,
        estimator::{EstimateExt, Estimator, TrainingState},
        transformer::TransformExt,
    };

    use super::*;

    fn scaler_estimator<T: Scalar + PartialOrd + ToPrimitive>(
    ) -> Estimator<MinMaxScalerEstimator<T>> {
        Estimator::new(MinMaxScalerEstimator::new(), AnnotationMaps::new(1), 0).unwrap()
    }

    #[test]
    fn test() {
        let mut estimator = scaler_estimator::<i32>();
        let mut scaler = [Some(2), Some(8), Some(5)]
            .into_iter()
            .fit(&mut estimator)
            .unwrap();
        assert_eq!(*scaler.min(), 2);
        assert_eq!(*scaler.max(), 8);
        assert_eq!(scaler.span().unwrap(), 6.);

        assert_eq!(scaler.transform(&Some(5)).unwrap(), 0.5);
        assert_eq!(scaler.transform(&Some(2)).unwrap(), 0.);
        assert_eq!(scaler.transform(&Some(8)).unwrap(), 1.);
        assert!(scaler.transform(&None).unwrap().is_nan());

        let mut outputs = vec![];
        scaler.execute(Some(11), &mut |x| outputs.push(x)).unwrap();
        assert_eq!(outputs, [1.5]);
    }

    #[test]
    fn test_nulls_skipped() {
        let mut estimator = scaler_estimator::<f64>();
        let scaler = [f64::NAN, -1.0, -0.5, f64::NAN, 0.0, 1.0]
            .into_iter()
            .fit(&mut estimator)
            .unwrap();
        assert_eq!(*scaler.min(), -1.0);
        let transformed = [-1.0, -0.5, 0.0, 1.0]
            .into_iter()
            .transform_by(scaler)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(transformed, [0.0, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn test_zero_span() {
        let mut estimator = scaler_estimator::<u8>();
        let scaler = [Some(4), None, Some(4)]
            .into_iter()
            .fit(&mut estimator)
            .unwrap();
        for x in [Some(4), Some(0), Some(u8::MAX)] {
            assert_eq!(scaler.transform(&x).unwrap(), 0.);
        }
        assert!(scaler.transform(&None).unwrap().is_nan());
    }

    #[test]
    fn test_constant_infinite_column() {
        let mut estimator = scaler_estimator::<f64>();
        let scaler = [f64::INFINITY, f64::NAN, f64::INFINITY]
            .into_iter()
            .fit(&mut estimator)
            .unwrap();
        assert!(scaler.is_constant());
        for x in [1.0, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(scaler.transform(&x).unwrap(), 0.);
        }
        assert!(scaler.transform(&f64::NAN).unwrap().is_nan());
    }

    #[test]
    fn test_infinite_span() {
        let mut estimator = scaler_estimator::<f64>();
        let err = [f64::NEG_INFINITY, 1.0]
            .into_iter()
            .fit(&mut estimator)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = MinMaxScaler::new(-f64::MAX, f64::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_invalid_range() {
        let err = MinMaxScaler::new(3_i64, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = MinMaxScaler::new(0.0_f32, f32::NAN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_no_values() {
        let mut estimator = scaler_estimator::<i16>();
        let err = [None, None].into_iter().fit(&mut estimator).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(estimator.state(), TrainingState::Training);
    }

    #[test]
    fn test_create_before_finished() {
        let mut estimator = scaler_estimator::<i32>();
        estimator.fit(&Some(1)).unwrap();
        let err = estimator.create_transformer().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_missing_annotation() {
        let annotations = AnnotationMaps::new(2);
        let mut observer =
            Estimator::new(MinMaxEstimator::<i32>::new(), annotations.clone(), 0).unwrap();
        [Some(1), Some(2)].into_iter().train(&mut observer).unwrap();

        // Column 1 never saw a min/max observer
        let mut scaler =
            Estimator::new(AnnotatedMinMaxScalerEstimator::<i32>::new(), annotations, 1).unwrap();
        assert!(scaler.is_training_complete());
        let err = scaler.create_transformer().unwrap_err();
        assert_eq!(
            err,
            FeaturizerError::MissingAnnotation {
                name: MinMaxEstimator::<i32>::NAME.into(),
                column: 1,
            }
        );
    }

    #[test]
    fn test_annotation_reuse() {
        let annotations = AnnotationMaps::new(1);
        let mut observer =
            Estimator::new(MinMaxEstimator::<u32>::new(), annotations.clone(), 0).unwrap();
        [Some(10), Some(30)].into_iter().train(&mut observer).unwrap();

        let mut scaler =
            Estimator::new(AnnotatedMinMaxScalerEstimator::<u32>::new(), annotations, 0).unwrap();
        let err = scaler.fit(&Some(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let scaler = scaler.create_transformer().unwrap();
        assert_eq!(scaler, MinMaxScaler::new(10, 30).unwrap());
    }

    #[test]
    fn test_archive() {
        let scaler = MinMaxScaler::new(-2_i8, 6).unwrap();
        let bytes = scaler.to_bytes().unwrap();
        assert_eq!(bytes, [1, 0, 0, 0, 0xfe, 6]);
        let mut archive = ArchiveReader::new(&bytes);
        assert_eq!(MinMaxScaler::<i8>::from_archive(&mut archive).unwrap(), scaler);
        assert!(archive.at_end());

        let mut bad_version = bytes.clone();
        bad_version[2] = 1;
        let err = MinMaxScaler::<i8>::from_archive(&mut ArchiveReader::new(&bad_version))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptArchive);

        let err = MinMaxScaler::<i8>::from_archive(&mut ArchiveReader::new(&bytes[..5]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptArchive);
    }
}
