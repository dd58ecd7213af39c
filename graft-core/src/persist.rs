use crate::error::GraftError;
use nanoserde::{DeJson, SerJson};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Conversion of parameter sets to and from json documents.
///
/// This trait is implemented automatically for all types that implement
/// both [SerJson] and [DeJson].
pub trait Serializable {
    /// Json document with all dimensions and weights of self
    fn to_json(&self) -> String;
    /// Replace self with contents of json document
    ///
    /// # Errors
    ///
    /// Errors if json is malformed or misses fields.
    fn from_json(&mut self, json: &str) -> Result<(), GraftError>;
}

impl<T: SerJson + DeJson> Serializable for T {
    fn to_json(&self) -> String {
        self.serialize_json()
    }

    fn from_json(&mut self, json: &str) -> Result<(), GraftError> {
        *self = T::deserialize_json(json)?;
        Ok(())
    }
}

/// Save params into file at path
///
/// # Errors
///
/// Returns io error if there was problem writing file to filesystem.
pub fn save(path: impl AsRef<Path>, params: &impl Serializable) -> Result<(), GraftError> {
    let mut f = File::create(path)?;
    f.write_all(params.to_json().as_bytes())?;
    Ok(())
}

/// Load params from file at path. On error params are left unchanged.
///
/// # Errors
///
/// Returns io error if file can not be read and parse error if its contents
/// are not a valid document for params.
pub fn load(path: impl AsRef<Path>, params: &mut impl Serializable) -> Result<(), GraftError> {
    let mut f = File::open(path)?;
    let mut json = String::new();
    f.read_to_string(&mut json)?;
    params.from_json(&json)
}
