use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use crate::types::RowValues;

/// A column value that cannot be stored in the target field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: String,
}

impl ConversionError {
    fn new<T: FromColumn>(value: &RowValues) -> Self {
        Self {
            expected: T::EXPECTED,
            found: value.kind_name().to_string(),
        }
    }

    fn out_of_range<T: FromColumn>(value: &RowValues) -> Self {
        Self {
            expected: T::EXPECTED,
            found: format!("out-of-range {value}"),
        }
    }
}

/// Conversion from a driver value into a field type.
///
/// SQL NULL only converts into `Option<T>` and [`RowValues`]; every other
/// target reports a [`ConversionError`] for it.
pub trait FromColumn: Sized {
    /// Name of the target type used in diagnostics.
    const EXPECTED: &'static str;

    /// # Errors
    /// Returns a [`ConversionError`] when `value` does not fit `Self`.
    fn from_column(value: &RowValues) -> Result<Self, ConversionError>;
}

impl FromColumn for RowValues {
    const EXPECTED: &'static str = "any";

    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl<T: FromColumn> FromColumn for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_column(value).map(Some)
        }
    }
}

impl FromColumn for String {
    const EXPECTED: &'static str = "text";

    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        value
            .as_text()
            .map(ToString::to_string)
            .ok_or_else(|| ConversionError::new::<Self>(value))
    }
}

impl FromColumn for i64 {
    const EXPECTED: &'static str = "i64";

    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        value
            .as_int()
            .copied()
            .ok_or_else(|| ConversionError::new::<Self>(value))
    }
}

macro_rules! narrow_int {
    ($($t:ty => $name:literal),* $(,)?) => {
        $(
            impl FromColumn for $t {
                const EXPECTED: &'static str = $name;

                fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
                    let wide = i64::from_column(value).map_err(|_| ConversionError::new::<Self>(value))?;
                    <$t>::try_from(wide).map_err(|_| ConversionError::out_of_range::<Self>(value))
                }
            }
        )*
    };
}

narrow_int!(i32 => "i32", i16 => "i16", u32 => "u32", u64 => "u64");

impl FromColumn for f64 {
    const EXPECTED: &'static str = "f64";

    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        value
            .as_float()
            .ok_or_else(|| ConversionError::new::<Self>(value))
    }
}

impl FromColumn for f32 {
    const EXPECTED: &'static str = "f32";

    #[allow(clippy::cast_possible_truncation)]
    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        value
            .as_float()
            .map(|v| v as f32)
            .ok_or_else(|| ConversionError::new::<Self>(value))
    }
}

impl FromColumn for bool {
    const EXPECTED: &'static str = "bool";

    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        value
            .as_bool()
            .copied()
            .ok_or_else(|| ConversionError::new::<Self>(value))
    }
}

impl FromColumn for NaiveDateTime {
    const EXPECTED: &'static str = "timestamp";

    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        value
            .as_timestamp()
            .ok_or_else(|| ConversionError::new::<Self>(value))
    }
}

impl FromColumn for NaiveDate {
    const EXPECTED: &'static str = "date";

    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        if let Some(text) = value.as_text() {
            if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                return Ok(date);
            }
        }
        value
            .as_timestamp()
            .map(|dt| dt.date())
            .ok_or_else(|| ConversionError::new::<Self>(value))
    }
}

impl FromColumn for Vec<u8> {
    const EXPECTED: &'static str = "blob";

    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        value
            .as_blob()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ConversionError::new::<Self>(value))
    }
}

impl FromColumn for JsonValue {
    const EXPECTED: &'static str = "json";

    fn from_column(value: &RowValues) -> Result<Self, ConversionError> {
        match value {
            RowValues::JSON(json) => Ok(json.clone()),
            // SQLite stores JSON as text.
            RowValues::Text(text) => {
                serde_json::from_str(text).map_err(|_| ConversionError::new::<Self>(value))
            }
            _ => Err(ConversionError::new::<Self>(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_only_fits_options() {
        assert_eq!(Option::<String>::from_column(&RowValues::Null), Ok(None));
        assert_eq!(RowValues::from_column(&RowValues::Null), Ok(RowValues::Null));
        let err = String::from_column(&RowValues::Null).unwrap_err();
        assert_eq!(err.expected, "text");
        assert_eq!(err.found, "null");
    }

    #[test]
    fn integers_narrow_with_range_checks() {
        assert_eq!(i32::from_column(&RowValues::Int(42)), Ok(42));
        assert_eq!(u64::from_column(&RowValues::Int(7)), Ok(7));
        let err = i16::from_column(&RowValues::Int(70_000)).unwrap_err();
        assert_eq!(err.expected, "i16");
        assert!(err.found.contains("70000"));
        assert!(u32::from_column(&RowValues::Int(-1)).is_err());
        assert!(i32::from_column(&RowValues::Text("42".into())).is_err());
    }

    #[test]
    fn loose_conversions_follow_row_value_helpers() {
        assert_eq!(bool::from_column(&RowValues::Int(1)), Ok(true));
        assert_eq!(f64::from_column(&RowValues::Int(3)), Ok(3.0));
        let date = NaiveDate::from_column(&RowValues::Text("2001-09-11".into())).unwrap();
        assert_eq!(date.to_string(), "2001-09-11");
        let dt = NaiveDateTime::from_column(&RowValues::Text("2001-09-11 08:46:00".into())).unwrap();
        assert_eq!(dt.date(), date);
    }

    #[test]
    fn json_from_text_or_json() {
        let parsed = JsonValue::from_column(&RowValues::Text(r#"{"a":1}"#.into())).unwrap();
        assert_eq!(parsed["a"], 1);
        assert!(JsonValue::from_column(&RowValues::Text("{".into())).is_err());
        let direct = JsonValue::from_column(&RowValues::JSON(serde_json::json!([1, 2]))).unwrap();
        assert_eq!(direct, serde_json::json!([1, 2]));
    }
}
