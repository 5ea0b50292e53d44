//! Side channel through which one estimator publishes a statistic for a
//! column and a downstream estimator reads it back by name.

use std::{any::Any, cell::RefCell, collections::HashMap, rc::Rc};

use tracing::trace;

use crate::error::{FeaturizerError, Result};

/// Annotations published for one column, keyed by the publishing estimator's name.
#[derive(Debug, Default)]
pub struct AnnotationMap {
    annotations: HashMap<String, Rc<dyn Any>>,
}
impl AnnotationMap {
    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.annotations.contains_key(name)
    }
}

pub type AnnotationMapsPtr = Rc<AnnotationMaps>;

/// One [`AnnotationMap`] per training column.
///
/// Append-only: entries are never replaced or removed.
#[derive(Debug)]
pub struct AnnotationMaps {
    maps: Vec<RefCell<AnnotationMap>>,
}
impl AnnotationMaps {
    #[must_use]
    pub fn new(columns: usize) -> AnnotationMapsPtr {
        let maps = (0..columns)
            .map(|_| RefCell::new(AnnotationMap::default()))
            .collect();
        Rc::new(Self { maps })
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.maps.len()
    }

    /// # Error
    ///
    /// - [`FeaturizerError::InvalidArgument`] if `column` is out of range
    /// - [`FeaturizerError::InvalidState`] if `name` already published for `column`
    pub fn publish<A: Any>(&self, column: usize, name: &str, annotation: A) -> Result<()> {
        let mut map = self.map(column)?.borrow_mut();
        if map.contains(name) {
            return Err(FeaturizerError::invalid_state(format!(
                "annotation `{name}` already published for column {column}"
            )));
        }
        trace!(annotation = name, column, "publishing annotation");
        map.annotations.insert(name.to_owned(), Rc::new(annotation));
        Ok(())
    }

    /// # Error
    ///
    /// - [`FeaturizerError::InvalidArgument`] if `column` is out of range
    /// - [`FeaturizerError::MissingAnnotation`] if nothing of type `A` was published under `name`
    pub fn get<A: Any>(&self, column: usize, name: &str) -> Result<Rc<A>> {
        let map = self.map(column)?.borrow();
        let missing = || FeaturizerError::MissingAnnotation {
            name: name.to_owned(),
            column,
        };
        let annotation = map.annotations.get(name).ok_or_else(missing)?;
        trace!(annotation = name, column, "reading annotation");
        Rc::clone(annotation).downcast::<A>().map_err(|_| missing())
    }

    fn map(&self, column: usize) -> Result<&RefCell<AnnotationMap>> {
        self.maps.get(column).ok_or_else(|| {
            FeaturizerError::invalid_argument(format!(
                "column {column} out of range for {} annotation maps",
                self.maps.len()
            ))
        })
    }
}
