use std::{
    collections::VecDeque,
    num::{NonZeroU32, NonZeroUsize},
};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    archive::{ArchiveReader, ArchiveWriter},
    error::{FeaturizerError, Result},
    estimator::InferenceOnlyEstimator,
    matrix::{Index, Matrix, Size},
    traits::Scalar,
};

use super::Transform;

pub const LAG_LEAD_ESTIMATOR_NAME: &str = "LagLeadOperatorEstimator";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LagLeadConfig {
    /// Width of the window copied for each offset.
    pub horizon: NonZeroU32,
    /// Negative values look back; positive values look ahead.
    pub offsets: Vec<i64>,
}
impl LagLeadConfig {
    fn size(&self) -> Result<Size> {
        let rows = NonZeroUsize::new(self.offsets.len())
            .ok_or_else(|| FeaturizerError::invalid_argument("no offsets"))?;
        let cols = NonZeroUsize::try_from(self.horizon).map_err(|_| {
            FeaturizerError::invalid_argument(format!("horizon {} too large", self.horizon))
        })?;
        Ok(Size { rows, cols })
    }
}

/// Copies windows of past and future values next to every input row.
///
/// For the input at row `t`, output cell `(i, j)` holds
/// `x[t + offsets[i] - (horizon - 1) + j]`, null outside the values seen.
/// A row is held back until the furthest value it looks ahead to has arrived.
#[derive(Debug, Clone)]
pub struct LagLeadOperator<T: Scalar> {
    config: LagLeadConfig,
    size: Size,
    /// Values from absolute row `start` onwards.
    history: VecDeque<T::Nullable>,
    start: i64,
    seen: i64,
    next_row: i64,
}
impl<T: Scalar> LagLeadOperator<T> {
    const VERSION: (u16, u16) = (1, 0);

    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidArgument`] if `config.offsets` is empty.
    pub fn new(config: LagLeadConfig) -> Result<Self> {
        let size = config.size()?;
        Ok(Self {
            config,
            size,
            history: VecDeque::new(),
            start: 0,
            seen: 0,
            next_row: 0,
        })
    }

    pub fn config(&self) -> &LagLeadConfig {
        &self.config
    }

    fn horizon(&self) -> i64 {
        i64::from(self.config.horizon.get())
    }

    fn lead(&self) -> i64 {
        self.config.offsets.iter().copied().max().unwrap_or(0).max(0)
    }

    /// Null for rows outside `i64` or outside the values held.
    fn value(&self, row: Option<i64>) -> T::Nullable {
        let Some(row) = row.filter(|row| (self.start..self.seen).contains(row)) else {
            return T::create_null_value();
        };
        usize::try_from(row - self.start)
            .ok()
            .and_then(|i| self.history.get(i))
            .cloned()
            .unwrap_or_else(T::create_null_value)
    }

    fn build_row(&self, row: i64) -> Matrix<T::Nullable> {
        let first = row - (self.horizon() - 1);
        Matrix::from_fn(self.size, |Index { row: i, col: j }| {
            let source = first
                .checked_add(self.config.offsets[i])
                .and_then(|x| x.checked_add(i64::try_from(j).ok()?));
            self.value(source)
        })
    }

    fn emit_ready(&mut self, until: i64, callback: &mut dyn FnMut(Matrix<T::Nullable>)) {
        while self.next_row < until {
            callback(self.build_row(self.next_row));
            self.next_row += 1;
        }
    }

    /// Drops values no pending row can reach.
    fn trim(&mut self) {
        let min_offset = self.config.offsets.iter().copied().min().unwrap_or(0);
        let oldest_needed = self
            .next_row
            .saturating_add(min_offset)
            .saturating_sub(self.horizon() - 1);
        while self.start < oldest_needed && self.history.pop_front().is_some() {
            self.start += 1;
        }
    }

    fn reset(&mut self) {
        self.history.clear();
        self.start = 0;
        self.seen = 0;
        self.next_row = 0;
    }
}
impl<T: Scalar> PartialEq for LagLeadOperator<T> {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config
    }
}
impl<T: Scalar> Transform for LagLeadOperator<T> {
    type Input = T::Nullable;
    type Output = Matrix<T::Nullable>;

    fn execute(
        &mut self,
        input: Self::Input,
        callback: &mut dyn FnMut(Self::Output),
    ) -> Result<()> {
        self.history.push_back(input);
        self.seen += 1;
        self.emit_ready(self.seen - self.lead(), callback);
        self.trim();
        Ok(())
    }

    fn flush(&mut self, callback: &mut dyn FnMut(Self::Output)) -> Result<()> {
        trace!(pending = self.seen - self.next_row, "flushing lag/lead rows");
        self.emit_ready(self.seen, callback);
        self.reset();
        Ok(())
    }

    fn save(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.write_version(Self::VERSION.0, Self::VERSION.1)?;
        archive.serialize(&self.config.horizon.get())?;
        archive.serialize(&self.config.offsets)
    }

    fn from_archive(archive: &mut ArchiveReader<'_>) -> Result<Self> {
        archive.expect_version(Self::VERSION.0, Self::VERSION.1)?;
        let horizon: u32 = archive.deserialize()?;
        let horizon = NonZeroU32::new(horizon)
            .ok_or_else(|| FeaturizerError::corrupt_archive("zero horizon"))?;
        let offsets: Vec<i64> = archive.deserialize()?;
        if offsets.is_empty() {
            return Err(FeaturizerError::corrupt_archive("no offsets"));
        }
        Self::new(LagLeadConfig { horizon, offsets })
    }
}

/// # Error
///
/// Return [`FeaturizerError::InvalidArgument`] if `config.offsets` is empty.
pub fn lag_lead_estimator<T: Scalar>(
    config: LagLeadConfig,
) -> Result<InferenceOnlyEstimator<LagLeadOperator<T>>> {
    Ok(InferenceOnlyEstimator::new(
        LAG_LEAD_ESTIMATOR_NAME,
        LagLeadOperator::new(config)?,
    ))
}

#[cfg(test)]
mod tests {
    use crate::{
        annotation::AnnotationMaps,
        error::ErrorKind,
        estimator::{EstimateExt, Estimator},
        transformer::TransformExt,
    };

    use super::*;

    fn config(horizon: u32, offsets: &[i64]) -> LagLeadConfig {
        LagLeadConfig {
            horizon: NonZeroU32::new(horizon).unwrap(),
            offsets: offsets.to_vec(),
        }
    }

    fn run<T: Scalar>(
        operator: LagLeadOperator<T>,
        inputs: Vec<T::Nullable>,
    ) -> Vec<Vec<T::Nullable>> {
        inputs
            .into_iter()
            .transform_by(operator)
            .map(|m| m.unwrap().into_buffer())
            .collect()
    }

    #[test]
    fn test_lag_and_lead() {
        let operator = LagLeadOperator::<i32>::new(config(1, &[-1, 1])).unwrap();
        let rows = run(operator, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(
            rows,
            [
                vec![None, Some(2)],
                vec![Some(1), Some(3)],
                vec![Some(2), None],
            ]
        );
    }

    #[test]
    fn test_windows_emitted_lazily() {
        let mut operator = LagLeadOperator::<i32>::new(config(2, &[-1, 1])).unwrap();
        let mut rows = vec![];
        let mut push = |m: Matrix<Option<i32>>| rows.push(m.into_buffer());
        operator.execute(Some(1), &mut push).unwrap();
        operator.execute(Some(2), &mut push).unwrap();
        operator.execute(Some(3), &mut push).unwrap();
        operator.flush(&mut push).unwrap();
        assert_eq!(
            rows,
            [
                vec![None, None, Some(1), Some(2)],
                vec![None, Some(1), Some(2), Some(3)],
                vec![Some(1), Some(2), Some(3), None],
            ]
        );
    }

    #[test]
    fn test_nothing_before_lead() {
        let mut operator = LagLeadOperator::<i32>::new(config(2, &[-1, 1])).unwrap();
        let mut count = 0;
        operator.execute(Some(1), &mut |_| count += 1).unwrap();
        assert_eq!(count, 0);
        operator.execute(Some(2), &mut |_| count += 1).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_extreme_offsets() {
        let operator = LagLeadOperator::<i32>::new(config(2, &[i64::MIN, 0, i64::MAX])).unwrap();
        let rows = run(operator, vec![Some(1), Some(2)]);
        assert_eq!(
            rows,
            [
                vec![None, None, None, Some(1), None, None],
                vec![None, None, Some(1), Some(2), None, None],
            ]
        );
    }

    #[test]
    fn test_horizon() {
        let operator = LagLeadOperator::<f64>::new(config(2, &[0])).unwrap();
        let rows = run(operator, vec![1., 2., 3.]);
        assert_eq!(rows.len(), 3);
        assert!(rows[0][0].is_nan());
        assert_eq!(rows[0][1], 1.);
        assert_eq!(rows[1], [1., 2.]);
        assert_eq!(rows[2], [2., 3.]);
    }

    #[test]
    fn test_held_back_until_lead_arrives() {
        let mut operator = LagLeadOperator::<u8>::new(config(1, &[2])).unwrap();
        let mut rows = vec![];
        let mut push = |m: Matrix<Option<u8>>| rows.push(m.into_buffer());
        operator.execute(Some(10), &mut push).unwrap();
        operator.execute(Some(11), &mut push).unwrap();
        operator.execute(Some(12), &mut push).unwrap();
        operator.execute(Some(13), &mut push).unwrap();
        operator.flush(&mut push).unwrap();
        assert_eq!(
            rows,
            [vec![Some(12)], vec![Some(13)], vec![None], vec![None]]
        );
    }

    #[test]
    fn test_flush_resets() {
        let mut operator = LagLeadOperator::<String>::new(config(1, &[-1])).unwrap();
        let mut rows = vec![];
        let mut push = |m: Matrix<Option<String>>| rows.push(m.into_buffer());
        operator.execute(Some("a".into()), &mut push).unwrap();
        operator.execute(Some("b".into()), &mut push).unwrap();
        operator.flush(&mut push).unwrap();
        operator.execute(Some("c".into()), &mut push).unwrap();
        assert_eq!(
            rows,
            [vec![None], vec![Some(String::from("a"))], vec![None]]
        );
    }

    #[test]
    fn test_nulls_pass_through() {
        let operator = LagLeadOperator::<bool>::new(config(1, &[0])).unwrap();
        let rows = run(operator, vec![Some(true), None]);
        assert_eq!(rows, [vec![Some(true)], vec![None]]);
    }

    #[test]
    fn test_estimator() {
        let inner = lag_lead_estimator::<i64>(config(3, &[-2, 0])).unwrap();
        let mut estimator = Estimator::new(inner, AnnotationMaps::new(1), 0).unwrap();
        assert!(estimator.is_training_complete());
        let operator = std::iter::empty().fit(&mut estimator).unwrap();
        assert_eq!(operator.config(), &config(3, &[-2, 0]));

        let err = lag_lead_estimator::<i64>(config(1, &[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_config() {
        let config: LagLeadConfig =
            serde_json::from_str(r#"{"horizon":2,"offsets":[-1,3]}"#).unwrap();
        assert_eq!(config.horizon.get(), 2);
        assert_eq!(config.offsets, [-1, 3]);
        assert!(serde_json::from_str::<LagLeadConfig>(r#"{"horizon":0,"offsets":[1]}"#).is_err());
    }

    #[test]
    fn test_archive() {
        let operator = LagLeadOperator::<i16>::new(config(2, &[-1])).unwrap();
        let bytes = operator.to_bytes().unwrap();
        assert_eq!(
            bytes,
            [1, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
        let loaded = LagLeadOperator::<i16>::from_archive(&mut ArchiveReader::new(&bytes)).unwrap();
        assert_eq!(loaded, operator);

        let err = LagLeadOperator::<i16>::from_archive(&mut ArchiveReader::new(&[
            1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptArchive);
    }
}
