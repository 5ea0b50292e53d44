//! Per-type contract shared by every featurizer.
//!
//! Generic estimators and transformers are written once against [`Scalar`]
//! and instantiated for the twelve supported types.

use core::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    archive::Archived,
    error::{FeaturizerError, Result},
    value::{ScalarKind, ScalarValue},
};

pub trait Scalar: Clone + Debug + PartialEq + Archived + Serialize + DeserializeOwned + 'static {
    /// Carries "value or null".
    ///
    /// Floats use themselves with NaN as the null; every other type uses `Option`.
    type Nullable: Clone + Debug + Archived;

    const KIND: ScalarKind;

    fn create_null_value() -> Self::Nullable;

    fn is_null(value: &Self::Nullable) -> bool;

    fn into_nullable(self) -> Self::Nullable;

    fn into_option(value: Self::Nullable) -> Option<Self>;

    fn into_value(self) -> ScalarValue;

    fn from_value(value: ScalarValue) -> Result<Self>;

    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidArgument`] if `value` is null.
    fn get_nullable_value(value: &Self::Nullable) -> Result<Self> {
        Self::into_option(value.clone()).ok_or_else(|| {
            FeaturizerError::invalid_argument(format!("null {} has no value", Self::KIND))
        })
    }
}

fn kind_mismatch(expected: ScalarKind, value: &ScalarValue) -> FeaturizerError {
    FeaturizerError::invalid_argument(format!(
        "expected a {expected} value, found {}",
        value.kind()
    ))
}

macro_rules! impl_optional_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                type Nullable = Option<$ty>;

                const KIND: ScalarKind = ScalarKind::$kind;

                fn create_null_value() -> Self::Nullable {
                    None
                }
                fn is_null(value: &Self::Nullable) -> bool {
                    value.is_none()
                }
                fn into_nullable(self) -> Self::Nullable {
                    Some(self)
                }
                fn into_option(value: Self::Nullable) -> Option<Self> {
                    value
                }
                fn into_value(self) -> ScalarValue {
                    ScalarValue::$kind(self)
                }
                fn from_value(value: ScalarValue) -> Result<Self> {
                    match value {
                        ScalarValue::$kind(x) => Ok(x),
                        other => Err(kind_mismatch(Self::KIND, &other)),
                    }
                }
            }
        )*
    };
}
impl_optional_scalar!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    bool => Bool,
    String => String,
);

macro_rules! impl_float_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                type Nullable = $ty;

                const KIND: ScalarKind = ScalarKind::$kind;

                fn create_null_value() -> Self::Nullable {
                    <$ty>::NAN
                }
                fn is_null(value: &Self::Nullable) -> bool {
                    value.is_nan()
                }
                fn into_nullable(self) -> Self::Nullable {
                    self
                }
                fn into_option(value: Self::Nullable) -> Option<Self> {
                    if value.is_nan() {
                        return None;
                    }
                    Some(value)
                }
                fn into_value(self) -> ScalarValue {
                    ScalarValue::$kind(self)
                }
                fn from_value(value: ScalarValue) -> Result<Self> {
                    match value {
                        ScalarValue::$kind(x) => Ok(x),
                        other => Err(kind_mismatch(Self::KIND, &other)),
                    }
                }
            }
        )*
    };
}
impl_float_scalar!(f32 => Float32, f64 => Float64);

#[cfg(test)]
mod tests {
    use crate::{
        archive::{ArchiveReader, ArchiveWriter},
        error::ErrorKind,
    };

    use super::*;

    fn check_null_contract<T: Scalar>(value: T) {
        let null = T::create_null_value();
        assert!(T::is_null(&null));
        let nullable = value.clone().into_nullable();
        assert!(!T::is_null(&nullable));
        assert_eq!(T::get_nullable_value(&nullable).unwrap(), value);
        let err = T::get_nullable_value(&null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let scalar = value.clone().into_value();
        assert_eq!(scalar.kind(), T::KIND);
        assert_eq!(T::from_value(scalar).unwrap(), value);
    }

    #[test]
    fn test_null_contract() {
        check_null_contract(-5_i8);
        check_null_contract(300_i16);
        check_null_contract(-70_000_i32);
        check_null_contract(i64::MIN);
        check_null_contract(u8::MAX);
        check_null_contract(7_u16);
        check_null_contract(8_u32);
        check_null_contract(u64::MAX);
        check_null_contract(1.5_f32);
        check_null_contract(-2.25_f64);
        check_null_contract(false);
        check_null_contract(String::new());
    }

    #[test]
    fn test_nan_is_null() {
        assert!(f32::is_null(&f32::NAN));
        assert!(f64::is_null(&-f64::NAN));
        assert!(!f64::is_null(&f64::INFINITY));
        assert_eq!(f64::into_option(f64::NAN), None);
    }

    #[test]
    fn test_kind_mismatch() {
        let err = i32::from_value(ScalarValue::Int64(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_nullable_archive() {
        let mut archive = ArchiveWriter::new();
        archive.serialize(&Some(25_i8)).unwrap();
        archive.serialize(&i8::create_null_value()).unwrap();
        archive.serialize(&f64::create_null_value()).unwrap();
        archive.serialize(&String::create_null_value()).unwrap();
        let bytes = archive.commit();
        assert_eq!(bytes.len(), 2 + 1 + 8 + 1);

        let mut archive = ArchiveReader::new(&bytes);
        assert_eq!(archive.deserialize::<Option<i8>>().unwrap(), Some(25));
        assert_eq!(archive.deserialize::<Option<i8>>().unwrap(), None);
        assert!(archive.deserialize::<f64>().unwrap().is_nan());
        assert_eq!(archive.deserialize::<Option<String>>().unwrap(), None);
        assert!(archive.at_end());
    }
}
