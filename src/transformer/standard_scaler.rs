use std::{marker::PhantomData, num::NonZeroUsize};

use getset::CopyGetters;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use strict_num::FiniteF64;
use tracing::{debug, warn};

use crate::{
    archive::{ArchiveReader, ArchiveWriter},
    error::{FeaturizerError, Result},
    estimator::{Estimate, EstimateTransformer, EstimatorContext, FitResult},
    traits::Scalar,
};

use super::{to_f64, Transform};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardScalerConfig {
    /// Number of non-null values each pass looks at; the whole column if absent.
    pub sample_size: Option<NonZeroUsize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pass {
    Mean,
    Deviation { mean: f64 },
}

/// Running mean and squared deviations of `x / 2`.
///
/// Halving keeps every difference of two finite values finite.
#[derive(Debug, Clone, Copy, Default)]
struct RunningMoments {
    count: usize,
    half_mean: f64,
    half_m2: f64,
}
impl RunningMoments {
    fn push(&mut self, x: f64) {
        self.count += 1;
        let half = x / 2.;
        let delta = half - self.half_mean;
        self.half_mean += delta / self.count as f64;
        self.half_m2 += delta * (half - self.half_mean);
    }

    fn mean(&self) -> f64 {
        self.half_mean * 2.
    }

    fn standard_deviation(&self) -> f64 {
        2. * (self.half_m2 / self.count as f64).sqrt()
    }
}

/// Sum of squares stored as `scale² * ssq`.
#[derive(Debug, Clone, Copy, Default)]
struct ScaledSquares {
    count: usize,
    scale: f64,
    ssq: f64,
}
impl ScaledSquares {
    fn push(&mut self, x: f64) {
        self.count += 1;
        let x = x.abs();
        if x == 0. {
            return;
        }
        if self.scale < x {
            self.ssq = 1. + self.ssq * (self.scale / x).powi(2);
            self.scale = x;
        } else {
            self.ssq += (x / self.scale).powi(2);
        }
    }

    fn root_mean_square(&self) -> f64 {
        self.scale * (self.ssq / self.count as f64).sqrt()
    }
}

/// Learns the mean in a first pass and the population standard deviation in a second one.
///
/// With [`StandardScalerConfig::sample_size`] set, each pass stops after that many
/// non-null values: the first with [`FitResult::ResetAndContinue`], the second with
/// [`FitResult::Complete`]. Otherwise a pass ends at `on_data_completed`.
#[derive(Debug, Clone)]
pub struct StandardScalerEstimator<T> {
    config: StandardScalerConfig,
    pass: Pass,
    moments: RunningMoments,
    /// Deviations from the mean, halved.
    deviations: ScaledSquares,
    learned: Option<(FiniteF64, FiniteF64)>,
    _scalar: PhantomData<T>,
}
impl<T> StandardScalerEstimator<T> {
    pub const NAME: &'static str = "StandardScalerEstimator";

    pub fn new(config: StandardScalerConfig) -> Self {
        Self {
            config,
            pass: Pass::Mean,
            moments: RunningMoments::default(),
            deviations: ScaledSquares::default(),
            learned: None,
            _scalar: PhantomData,
        }
    }

    fn mean(&self) -> Result<f64> {
        if self.moments.count == 0 {
            return Err(FeaturizerError::invalid_state(format!(
                "`{}` observed no non-null value",
                Self::NAME
            )));
        }
        Ok(self.moments.mean())
    }

    fn start_deviation_pass(&mut self) -> Result<()> {
        let mean = self.mean()?;
        debug!(mean, count = self.moments.count, "mean learned");
        self.pass = Pass::Deviation { mean };
        Ok(())
    }

    fn sample_reached(&self, count: usize) -> bool {
        self.config.sample_size.map(NonZeroUsize::get) == Some(count)
    }
}
impl<T> Default for StandardScalerEstimator<T> {
    fn default() -> Self {
        Self::new(StandardScalerConfig::default())
    }
}
impl<T: Scalar + ToPrimitive> Estimate for StandardScalerEstimator<T> {
    type Input = T::Nullable;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fit(&mut self, _context: &EstimatorContext, input: &Self::Input) -> Result<FitResult> {
        let Some(x) = T::into_option(input.clone()) else {
            return Ok(FitResult::Continue);
        };
        let x = to_f64(&x)?;
        match self.pass {
            Pass::Mean => {
                self.moments.push(x);
                if self.sample_reached(self.moments.count) {
                    self.start_deviation_pass()?;
                    return Ok(FitResult::ResetAndContinue);
                }
            }
            Pass::Deviation { mean } => {
                self.deviations.push(x / 2. - mean / 2.);
                if self.sample_reached(self.deviations.count) {
                    return Ok(FitResult::Complete);
                }
            }
        }
        Ok(FitResult::Continue)
    }

    fn on_data_completed(&mut self, _context: &EstimatorContext) -> Result<FitResult> {
        match self.pass {
            Pass::Mean => {
                self.start_deviation_pass()?;
                Ok(FitResult::ResetAndContinue)
            }
            Pass::Deviation { .. } => Ok(FitResult::Complete),
        }
    }

    fn complete_training(&mut self, _context: &EstimatorContext) -> Result<()> {
        let mean = self.mean()?;
        let standard_deviation = match self.pass {
            Pass::Deviation { .. } if self.deviations.count != 0 => {
                2. * self.deviations.root_mean_square()
            }
            // Forced to finish before the second pass saw anything
            _ => self.moments.standard_deviation(),
        };
        let finite = |x: f64, what: &str| {
            FiniteF64::new(x).ok_or_else(|| {
                FeaturizerError::invalid_argument(format!("{what} {x} is not finite"))
            })
        };
        self.learned = Some((finite(mean, "mean")?, finite(standard_deviation, "std")?));
        Ok(())
    }
}
impl<T: Scalar + ToPrimitive> EstimateTransformer for StandardScalerEstimator<T> {
    type Transformer = StandardScaler<T>;

    fn create_transformer(&mut self, _context: &EstimatorContext) -> Result<Self::Transformer> {
        let (mean, standard_deviation) = self
            .learned
            .ok_or_else(|| FeaturizerError::invalid_state("statistics were never learned"))?;
        StandardScaler::new(mean, standard_deviation)
    }
}

/// Borrowed from `sklearn.preprocessing.StandardScaler` but only for one feature.
///
/// Mean and standard deviation come from the two passes of [`StandardScalerEstimator`],
/// over at most `sample_size` non-null values each.
/// Null maps to NaN; a zero standard deviation maps every value to `0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, CopyGetters)]
pub struct StandardScaler<T> {
    #[getset(get_copy = "pub")]
    mean: FiniteF64,
    #[getset(get_copy = "pub")]
    standard_deviation: FiniteF64,
    #[serde(skip)]
    _scalar: PhantomData<T>,
}
impl<T: Scalar + ToPrimitive> StandardScaler<T> {
    const VERSION: (u16, u16) = (1, 0);

    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidArgument`] if `standard_deviation` is negative.
    pub fn new(mean: FiniteF64, standard_deviation: FiniteF64) -> Result<Self> {
        if standard_deviation.get() < 0. {
            return Err(FeaturizerError::invalid_argument(format!(
                "negative standard deviation {}",
                standard_deviation.get()
            )));
        }
        if standard_deviation.get() == 0. {
            warn!(mean = mean.get(), "zero standard deviation, every output will be 0");
        }
        Ok(Self {
            mean,
            standard_deviation,
            _scalar: PhantomData,
        })
    }

    pub fn transform(&self, x: &T::Nullable) -> Result<f64> {
        let Some(x) = T::into_option(x.clone()) else {
            return Ok(f64::create_null_value());
        };
        let std = self.standard_deviation.get();
        if std == 0. {
            return Ok(0.);
        }
        Ok((to_f64(&x)? - self.mean.get()) / std)
    }
}
impl<T: Scalar + ToPrimitive> Transform for StandardScaler<T> {
    type Input = T::Nullable;
    type Output = f64;

    fn execute(&mut self, input: Self::Input, callback: &mut dyn FnMut(f64)) -> Result<()> {
        callback(self.transform(&input)?);
        Ok(())
    }

    fn save(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.write_version(Self::VERSION.0, Self::VERSION.1)?;
        archive.serialize(&self.mean.get())?;
        archive.serialize(&self.standard_deviation.get())
    }

    fn from_archive(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        archive.expect_version(Self::VERSION.0, Self::VERSION.1)?;
        let mut finite = || -> Result<FiniteF64> {
            let x: f64 = archive.deserialize()?;
            FiniteF64::new(x)
                .ok_or_else(|| FeaturizerError::corrupt_archive(format!("{x} is not finite")))
        };
        let mean = finite()?;
        let standard_deviation = finite()?;
        Self::new(mean, standard_deviation)
    }
}
