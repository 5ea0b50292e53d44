//! Training state machine shared by every featurizer.
//!
//! A featurizer implements the [`Estimate`] hooks; [`Estimator`] owns the
//! lifecycle and rejects calls that its [`TrainingState`] forbids.

use std::{any::Any, rc::Rc};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    annotation::AnnotationMapsPtr,
    error::{FeaturizerError, Result},
    transformer::Transform,
};

/// Outcome of one training step.
///
/// Failures are reported through the `Err` arm of [`Result`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitResult {
    /// Keep feeding data.
    Continue,
    /// Enough data has been seen; training is finished.
    Complete,
    /// Restart iteration from the beginning of the training data.
    ResetAndContinue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingState {
    Training,
    Finished,
}

/// What the hooks of an estimator can see of their surroundings.
#[derive(Debug, Clone)]
pub struct EstimatorContext {
    annotations: AnnotationMapsPtr,
    col_index: usize,
}
impl EstimatorContext {
    pub fn col_index(&self) -> usize {
        self.col_index
    }
    pub fn annotations(&self) -> &AnnotationMapsPtr {
        &self.annotations
    }

    /// Publishes `annotation` for this column under `name`.
    pub fn publish<A: Any>(&self, name: &str, annotation: A) -> Result<()> {
        self.annotations.publish(self.col_index, name, annotation)
    }

    /// Reads the annotation published for this column under `name`.
    pub fn annotation<A: Any>(&self, name: &str) -> Result<Rc<A>> {
        self.annotations.get(self.col_index, name)
    }
}

/// Featurizer-specific training hooks.
pub trait Estimate {
    type Input;

    /// Canonical name; annotations are published under it.
    fn name(&self) -> &'static str;

    /// Returns `false` if no training data is needed.
    fn begin_training(&mut self, _context: &EstimatorContext) -> Result<bool> {
        Ok(true)
    }

    fn fit(&mut self, context: &EstimatorContext, input: &Self::Input) -> Result<FitResult>;

    /// Called at the end of each pass over the training data.
    ///
    /// Return [`FitResult::ResetAndContinue`] to request another pass.
    /// [`FitResult::Continue`] is not a valid answer here.
    fn on_data_completed(&mut self, _context: &EstimatorContext) -> Result<FitResult> {
        Ok(FitResult::Complete)
    }

    /// Consolidates the accumulated statistics.
    fn complete_training(&mut self, context: &EstimatorContext) -> Result<()>;
}

pub trait EstimateTransformer: Estimate {
    type Transformer: Transform;

    /// Only called once training is finished.
    fn create_transformer(&mut self, context: &EstimatorContext) -> Result<Self::Transformer>;
}

#[derive(Debug)]
pub struct Estimator<E> {
    inner: E,
    context: EstimatorContext,
    state: TrainingState,
}
impl<E: Estimate> Estimator<E> {
    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidArgument`] if `col_index` has no annotation map.
    pub fn new(inner: E, annotations: AnnotationMapsPtr, col_index: usize) -> Result<Self> {
        if annotations.columns() <= col_index {
            return Err(FeaturizerError::invalid_argument(format!(
                "column {col_index} out of range for {} annotation maps",
                annotations.columns()
            )));
        }
        let context = EstimatorContext {
            annotations,
            col_index,
        };
        let mut estimator = Self {
            inner,
            context,
            state: TrainingState::Training,
        };
        if !estimator.inner.begin_training(&estimator.context)? {
            debug!(
                estimator = estimator.name(),
                column = col_index,
                "no training needed"
            );
            estimator.complete_training()?;
        }
        Ok(estimator)
    }

    pub fn name(&self) -> &'static str {
        self.inner.name()
    }
    pub fn col_index(&self) -> usize {
        self.context.col_index
    }
    pub fn state(&self) -> TrainingState {
        self.state
    }
    pub fn is_training_complete(&self) -> bool {
        self.state == TrainingState::Finished
    }
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidState`] if training is finished.
    pub fn fit(&mut self, input: &E::Input) -> Result<FitResult> {
        self.ensure_training("fit")?;
        let result = self.inner.fit(&self.context, input)?;
        if result == FitResult::Complete {
            self.complete_training()?;
        }
        Ok(result)
    }

    /// Feeds `inputs` in order and stops at the first result other than [`FitResult::Continue`].
    ///
    /// # Error
    ///
    /// - [`FeaturizerError::InvalidArgument`] if `inputs` is empty
    /// - [`FeaturizerError::InvalidState`] if training is finished
    pub fn fit_batch(&mut self, inputs: &[E::Input]) -> Result<FitResult> {
        if inputs.is_empty() {
            return Err(FeaturizerError::invalid_argument("empty batch"));
        }
        self.ensure_training("fit")?;
        for input in inputs {
            let result = self.fit(input)?;
            if result != FitResult::Continue {
                return Ok(result);
            }
        }
        Ok(FitResult::Continue)
    }

    /// Marks the end of one pass over the training data.
    ///
    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidState`] if training is finished or the
    /// estimator answers [`FitResult::Continue`] at the end of a pass.
    pub fn on_data_completed(&mut self) -> Result<FitResult> {
        self.ensure_training("on_data_completed")?;
        let result = self.inner.on_data_completed(&self.context)?;
        match result {
            FitResult::Complete => self.complete_training()?,
            FitResult::ResetAndContinue => {
                debug!(estimator = self.name(), "another pass requested")
            }
            FitResult::Continue => {
                return Err(FeaturizerError::invalid_state(format!(
                    "`{}` neither completed nor reset at the end of a pass",
                    self.name()
                )))
            }
        }
        Ok(result)
    }

    /// Idempotent.
    pub fn complete_training(&mut self) -> Result<()> {
        if self.state == TrainingState::Finished {
            return Ok(());
        }
        self.inner.complete_training(&self.context)?;
        self.state = TrainingState::Finished;
        debug!(
            estimator = self.name(),
            column = self.context.col_index,
            "training finished"
        );
        Ok(())
    }

    fn ensure_training(&self, operation: &str) -> Result<()> {
        if self.state != TrainingState::Training {
            return Err(FeaturizerError::invalid_state(format!(
                "`{operation}` called on `{}` after training finished",
                self.name()
            )));
        }
        Ok(())
    }
}
impl<E: EstimateTransformer> Estimator<E> {
    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidState`] if training is not finished.
    pub fn create_transformer(&mut self) -> Result<E::Transformer> {
        if self.state != TrainingState::Finished {
            return Err(FeaturizerError::invalid_state(format!(
                "`create_transformer` called on `{}` before training finished",
                self.name()
            )));
        }
        let transformer = self.inner.create_transformer(&self.context)?;
        debug!(estimator = self.name(), "transformer created");
        Ok(transformer)
    }
}

pub trait EstimateExt: Iterator + Clone {
    /// Feeds the elements of the iterator to `estimator` until it finishes training.
    ///
    /// The iterator is cloned for every pass the estimator asks for.
    fn train<E: Estimate<Input = Self::Item>>(self, estimator: &mut Estimator<E>) -> Result<()> {
        while !estimator.is_training_complete() {
            let mut reset = false;
            for input in self.clone() {
                match estimator.fit(&input)? {
                    FitResult::Continue => (),
                    FitResult::Complete => return Ok(()),
                    FitResult::ResetAndContinue => {
                        reset = true;
                        break;
                    }
                }
            }
            if reset {
                debug!(estimator = estimator.name(), "restarting pass");
                continue;
            }
            estimator.on_data_completed()?;
        }
        Ok(())
    }

    /// Trains `estimator` on the elements of the iterator and creates its transformer.
    fn fit<E: EstimateTransformer<Input = Self::Item>>(
        self,
        estimator: &mut Estimator<E>,
    ) -> Result<E::Transformer> {
        self.train(estimator)?;
        estimator.complete_training()?;
        estimator.create_transformer()
    }
}
impl<I: Iterator + Clone> EstimateExt for I {}

/// Estimator of a transformer that needs no training.
#[derive(Debug, Clone)]
pub struct InferenceOnlyEstimator<T> {
    name: &'static str,
    transformer: T,
}
impl<T> InferenceOnlyEstimator<T> {
    pub fn new(name: &'static str, transformer: T) -> Self {
        Self { name, transformer }
    }
}
impl<T: Transform> Estimate for InferenceOnlyEstimator<T> {
    type Input = T::Input;

    fn name(&self) -> &'static str {
        self.name
    }
    fn begin_training(&mut self, _context: &EstimatorContext) -> Result<bool> {
        Ok(false)
    }
    fn fit(&mut self, _context: &EstimatorContext, _input: &Self::Input) -> Result<FitResult> {
        Err(FeaturizerError::invalid_state(format!(
            "`{}` does not train",
            self.name
        )))
    }
    fn complete_training(&mut self, _context: &EstimatorContext) -> Result<()> {
        Ok(())
    }
}
impl<T: Transform + Clone> EstimateTransformer for InferenceOnlyEstimator<T> {
    type Transformer = T;

    fn create_transformer(&mut self, _context: &EstimatorContext) -> Result<Self::Transformer> {
        Ok(self.transformer.clone())
    }
}
