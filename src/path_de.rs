use serde::de::DeserializeOwned;

/// A deserialization failure together with where in the document it happened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("at JSON path {path} → {message}")]
pub struct PathError {
    path: String,
    message: String,
}

impl PathError {
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_path_error)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_path_error)
}

fn into_path_error(error: serde_path_to_error::Error<serde_json::Error>) -> PathError {
    PathError {
        path: error.path().to_string(),
        message: error.into_inner().to_string(),
    }
}
