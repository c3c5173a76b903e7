//! Serde adapters for float data that may contain NaN or infinities.
//!
//! JSON has no literal for non-finite numbers, so NaN is written as `null` and
//! infinities as the strings `"inf"` / `"-inf"`.

use std::collections::BTreeMap;

use itertools::Itertools;
use ndarray::{Array1, Array2};
use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum JsonFloat {
    Number(f64),
    Text(String),
}

fn encode(value: f64) -> Option<JsonFloat> {
    if value.is_nan() {
        None
    } else if value.is_infinite() {
        let text = if value > 0.0 { "inf" } else { "-inf" };
        Some(JsonFloat::Text(text.to_string()))
    } else {
        Some(JsonFloat::Number(value))
    }
}

fn decode<E: Error>(value: Option<JsonFloat>) -> Result<f64, E> {
    match value {
        None => Ok(f64::NAN),
        Some(JsonFloat::Number(v)) => Ok(v),
        Some(JsonFloat::Text(text)) => match text.to_lowercase().as_str() {
            "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
            "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
            "nan" => Ok(f64::NAN),
            other => Err(E::custom(format!("invalid float value {other:?}"))),
        },
    }
}

/// A single `f64`.
pub mod scalar {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &f64,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        encode(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<f64, D::Error> {
        decode(Option::<JsonFloat>::deserialize(deserializer)?)
    }
}

/// An `Array1<f64>` as a flat list.
pub mod array1 {
    use super::*;

    pub fn serialize<S: Serializer>(
        array: &Array1<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(array.iter().map(|&v| encode(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Array1<f64>, D::Error> {
        let values = Vec::<Option<JsonFloat>>::deserialize(deserializer)?;
        values
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<f64>, D::Error>>()
            .map(Array1::from)
    }
}

/// An `Array2<f64>` as a list of rows.
pub mod array2 {
    use super::*;

    pub fn serialize<S: Serializer>(
        array: &Array2<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            array
                .rows()
                .into_iter()
                .map(|row| row.iter().map(|&v| encode(v)).collect_vec()),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Array2<f64>, D::Error> {
        let rows = Vec::<Vec<Option<JsonFloat>>>::deserialize(deserializer)?;
        let num_rows = rows.len();
        let num_columns = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != num_columns) {
            return Err(D::Error::custom("rows of unequal length"));
        }
        let flat = rows
            .into_iter()
            .flatten()
            .map(decode)
            .collect::<Result<Vec<f64>, D::Error>>()?;
        Array2::from_shape_vec((num_rows, num_columns), flat)
            .map_err(D::Error::custom)
    }
}

/// A map from algorithm name to an `Array1<f64>`.
pub mod array1_map {
    use super::*;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, Array1<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(map.iter().map(|(key, array)| {
            (key, array.iter().map(|&v| encode(v)).collect_vec())
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Array1<f64>>, D::Error> {
        BTreeMap::<String, Vec<Option<JsonFloat>>>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, values)| {
                let array = values
                    .into_iter()
                    .map(decode)
                    .collect::<Result<Vec<f64>, D::Error>>()?;
                Ok((key, Array1::from(array)))
            })
            .collect()
    }
}
