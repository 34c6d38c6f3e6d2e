//! Conversion of diagram source text into drawing elements.
//!
//! Real diagram languages are parsed by an external converter plugged in
//! through [`DiagramConverter`]. [`JsonElementsConverter`] covers the case
//! where the source already is Excalidraw JSON.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiagramError {
    #[error("Diagram source is empty")]
    Empty,
    #[error("Diagram source is not valid JSON: {0}")]
    Syntax(String),
    #[error("Unsupported diagram document: {0}")]
    Unsupported(String),
    #[error("Element {index} is invalid: {reason}")]
    InvalidElement { index: usize, reason: String },
}

/// Pure conversion from diagram syntax to drawing elements
pub trait DiagramConverter: Send + Sync {
    fn convert(&self, source: &str) -> Result<Vec<Value>, DiagramError>;
}

/// Accepts a bare element array or an Excalidraw scene/clipboard document
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonElementsConverter;

impl DiagramConverter for JsonElementsConverter {
    fn convert(&self, source: &str) -> Result<Vec<Value>, DiagramError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(DiagramError::Empty);
        }

        let document: Value =
            serde_json::from_str(source).map_err(|error| DiagramError::Syntax(error.to_string()))?;
        let elements = match document {
            Value::Array(elements) => elements,
            Value::Object(mut object) => match object.remove("elements") {
                Some(Value::Array(elements)) => elements,
                Some(_) => {
                    return Err(DiagramError::Unsupported(
                        "`elements` must be an array".to_string(),
                    ))
                }
                None => {
                    return Err(DiagramError::Unsupported(
                        "object has no `elements` field".to_string(),
                    ))
                }
            },
            _ => {
                return Err(DiagramError::Unsupported(
                    "expected an array or an object".to_string(),
                ))
            }
        };

        for (index, element) in elements.iter().enumerate() {
            validate_element(element).map_err(|reason| DiagramError::InvalidElement {
                index,
                reason: reason.to_string(),
            })?;
        }
        Ok(elements)
    }
}

fn validate_element(element: &Value) -> Result<(), &'static str> {
    let object = element.as_object().ok_or("not an object")?;
    match object.get("type") {
        Some(Value::String(kind)) if !kind.trim().is_empty() => Ok(()),
        Some(_) => Err("`type` must be a non-empty string"),
        None => Err("missing `type`"),
    }
}
