use std::collections::VecDeque;

use num_traits::ToPrimitive;

use crate::{
    archive::{ArchiveReader, ArchiveWriter},
    error::{FeaturizerError, Result},
    traits::Scalar,
};

pub mod cat_imputer;
pub mod forecasting_pivot;
pub mod lag_lead_operator;
pub mod mean_imputer;
pub mod min_max_scaler;
pub mod missing_dummies;
pub mod standard_scaler;

pub trait Transform: Sized {
    type Input;
    type Output;

    /// Transforms `input`, handing every output that is ready to `callback`.
    ///
    /// Pure transformers emit exactly one output per call; buffered ones may emit none or many.
    fn execute(&mut self, input: Self::Input, callback: &mut dyn FnMut(Self::Output))
        -> Result<()>;

    /// Emits outputs held back by incomplete windows and resets the buffer.
    fn flush(&mut self, _callback: &mut dyn FnMut(Self::Output)) -> Result<()> {
        Ok(())
    }

    /// Writes the version stamp and the learned parameters.
    fn save(&self, archive: &mut ArchiveWriter) -> Result<()>;

    /// Rebuilds a transformer written by [`Transform::save`].
    fn from_archive(archive: &mut ArchiveReader<'_>) -> Result<Self>;

    /// Returns the serialized transformer.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut archive = ArchiveWriter::new();
        self.save(&mut archive)?;
        Ok(archive.commit())
    }
}

pub trait TransformExt: Iterator {
    /// Maps the iterator with a transformer.
    ///
    /// The transformer is flushed once the iterator is exhausted.
    fn transform_by<T: Transform<Input = Self::Item>>(self, transformer: T) -> Transformed<Self, T>
    where
        Self: Sized,
    {
        Transformed::new(self, transformer)
    }
}
impl<I: Iterator> TransformExt for I {}

pub struct Transformed<I, T: Transform> {
    iter: I,
    transformer: T,
    ready: VecDeque<T::Output>,
    flushed: bool,
}
impl<I, T> Iterator for Transformed<I, T>
where
    I: Iterator,
    T: Transform<Input = I::Item>,
{
    type Item = Result<T::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(output) = self.ready.pop_front() {
                return Some(Ok(output));
            }
            if self.flushed {
                return None;
            }
            let ready = &mut self.ready;
            let mut push = |output: T::Output| ready.push_back(output);
            let res = match self.iter.next() {
                Some(input) => self.transformer.execute(input, &mut push),
                None => {
                    self.flushed = true;
                    self.transformer.flush(&mut push)
                }
            };
            if let Err(e) = res {
                return Some(Err(e));
            }
        }
    }
}
impl<I, T: Transform> Transformed<I, T> {
    pub fn new(iter: I, transformer: T) -> Self {
        Self {
            iter,
            transformer,
            ready: VecDeque::new(),
            flushed: false,
        }
    }

    pub fn into_transformer(self) -> T {
        self.transformer
    }
}

pub(crate) fn to_f64<T: Scalar + ToPrimitive>(x: &T) -> Result<f64> {
    x.to_f64().ok_or_else(|| {
        FeaturizerError::invalid_argument(format!("{x:?} is not representable as {}", f64::KIND))
    })
}
