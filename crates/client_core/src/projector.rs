use serde_json::Value;
use shared::domain::{
    AnimalId, MatchRecord, RegistrationResult, SearchResult, WorkflowKind, WorkflowResult,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("response is missing {field}")]
    MissingField { field: &'static str },
    #[error("response field {field} is malformed: {detail}")]
    MalformedField { field: &'static str, detail: String },
}

/// Structural projection of service payloads into renderable results.
/// Order and scores are passed through untouched.
pub struct ResultProjector;

impl ResultProjector {
    pub fn project(raw: &Value, kind: WorkflowKind) -> Result<WorkflowResult, ProjectionError> {
        match kind {
            WorkflowKind::Register => Self::project_registration(raw).map(WorkflowResult::Registered),
            WorkflowKind::Search => Self::project_search(raw).map(WorkflowResult::Matches),
        }
    }

    pub fn project_registration(raw: &Value) -> Result<RegistrationResult, ProjectionError> {
        let body = raw.as_object().ok_or(ProjectionError::NotAnObject)?;
        match body.get("animal_id") {
            None | Some(Value::Null) => Err(ProjectionError::MissingField { field: "animal_id" }),
            Some(Value::String(id)) => Ok(RegistrationResult {
                animal_id: AnimalId(id.clone()),
            }),
            Some(other) => Err(ProjectionError::MalformedField {
                field: "animal_id",
                detail: format!("expected a string, got {other}"),
            }),
        }
    }

    /// A body without `matches` means nothing matched.
    pub fn project_search(raw: &Value) -> Result<SearchResult, ProjectionError> {
        let body = match raw {
            Value::Null => return Ok(SearchResult::default()),
            Value::Object(body) => body,
            _ => return Err(ProjectionError::NotAnObject),
        };
        let matches = match body.get("matches") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value::<Vec<MatchRecord>>(value.clone()).map_err(
                |err| ProjectionError::MalformedField {
                    field: "matches",
                    detail: err.to_string(),
                },
            )?,
        };
        Ok(SearchResult { matches })
    }
}
