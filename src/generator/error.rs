use std::fmt;

use crate::introspect::IntrospectError;

/// Request-level generation failure.
///
/// Returned by [`Generator::generate`](super::Generator::generate) before any
/// unit runs. Failures of a single (table, template) unit never surface here;
/// they are recorded in that unit's result instead.
#[derive(Debug)]
pub enum GenerateError {
    /// The requested template group does not exist
    GroupNotFound {
        /// The group id from the request
        group_id: i64,
    },
    /// The group exists but holds no templates
    EmptyGroup {
        /// The group id from the request
        group_id: i64,
    },
    /// Schema introspection failed for one of the requested tables
    Introspection(IntrospectError),
    /// The template requested for preview does not exist
    TemplateNotFound {
        /// The template id from the request
        template_id: i64,
    },
    /// Rendering failed outside of a batch (preview)
    Render {
        /// Template name
        template: String,
        /// Engine error text
        cause: String,
    },
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::GroupNotFound { group_id } => {
                write!(f, "Template group {group_id} not found")
            }
            GenerateError::EmptyGroup { group_id } => {
                write!(f, "No templates in template group {group_id}")
            }
            GenerateError::Introspection(err) => write!(f, "{err}"),
            GenerateError::TemplateNotFound { template_id } => {
                write!(f, "Template {template_id} not found")
            }
            GenerateError::Render { template, cause } => {
                write!(f, "Error generating code from template {template}: {cause}")
            }
        }
    }
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerateError::Introspection(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IntrospectError> for GenerateError {
    fn from(err: IntrospectError) -> Self {
        GenerateError::Introspection(err)
    }
}
