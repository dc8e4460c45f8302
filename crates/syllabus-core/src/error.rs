use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyllabusError {
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("invalid duration '{0}': expected a positive whole number of hours")]
    InvalidDuration(String),

    #[error("insufficient input: {0}")]
    InsufficientInput(String),

    #[error("topic extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("no question template for {question_type} at level {level}")]
    TemplateExhaustion {
        question_type: String,
        level: String,
    },

    #[error("malformed knowledge base: {0}")]
    KnowledgeBase(String),

    #[error("invalid bloom level: {0}")]
    InvalidBloomLevel(String),

    #[error("artifact graph is inconsistent: {0}")]
    InconsistentGraph(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Who should hear about an error: the person who filled in the request,
/// or whoever deployed the knowledge base and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Extraction,
    Configuration,
    Internal,
}

impl SyllabusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyllabusError::MissingField { .. }
            | SyllabusError::InvalidDuration(_)
            | SyllabusError::InvalidBloomLevel(_) => ErrorKind::Input,
            SyllabusError::InsufficientInput(_) | SyllabusError::ExtractionFailed(_) => {
                ErrorKind::Extraction
            }
            SyllabusError::TemplateExhaustion { .. }
            | SyllabusError::KnowledgeBase(_)
            | SyllabusError::Yaml(_)
            | SyllabusError::Json(_)
            | SyllabusError::Io(_) => ErrorKind::Configuration,
            SyllabusError::InconsistentGraph(_) => ErrorKind::Internal,
        }
    }

    pub fn is_configuration_defect(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

pub type Result<T> = std::result::Result<T, SyllabusError>;
