/// Structured error information with details and suggestions
#[derive(Debug, Clone)]
pub struct StructuredError {
    /// Main error message
    pub message: String,
    /// File the error relates to (score, layout or config)
    pub file_path: Option<String>,
    /// Error category (e.g. "ScoreError", "LayoutError", "TransportError")
    pub error_type: Option<String>,
    /// Optional hint shown as `help:`
    pub suggestion: Option<String>,
    /// Underlying causes, outermost first
    pub causes: Vec<String>,
}

impl StructuredError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file_path: None,
            error_type: None,
            suggestion: None,
            causes: Vec::new(),
        }
    }

    /// Build from any error, collecting its `source()` chain as causes.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut structured = Self::new(error.to_string());
        let mut source = error.source();
        while let Some(cause) = source {
            structured.causes.push(cause.to_string());
            source = cause.source();
        }
        structured
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn add_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Returns (label, content) pairs for the logger to render
    pub fn build_details(&self) -> Vec<(String, String)> {
        let mut details = Vec::new();

        if let Some(file) = &self.file_path {
            details.push(("path".to_string(), file.clone()));
        }

        if let Some(ref error_type) = self.error_type {
            details.push(("code".to_string(), error_type.clone()));
        }

        for cause in &self.causes {
            details.push(("cause".to_string(), cause.clone()));
        }

        if let Some(ref suggestion) = self.suggestion {
            details.push(("help".to_string(), suggestion.clone()));
        }

        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_builder() {
        let error = StructuredError::new("Failed to load score")
            .with_file("song.mid")
            .with_type("ScoreError")
            .with_suggestion("Check that the file is a Standard MIDI File");

        assert_eq!(error.message, "Failed to load score");
        assert_eq!(error.file_path, Some("song.mid".to_string()));
        assert_eq!(error.error_type, Some("ScoreError".to_string()));
        assert!(error.causes.is_empty());
    }

    #[test]
    fn test_build_details_order() {
        let error = StructuredError::new("Cannot open port")
            .with_file("/dev/ttyUSB0")
            .with_type("TransportError")
            .add_cause("permission denied")
            .with_suggestion("Add your user to the dialout group");

        let labels: Vec<String> = error.build_details().into_iter().map(|d| d.0).collect();
        assert_eq!(labels, vec!["path", "code", "cause", "help"]);
    }

    #[test]
    fn test_from_error_collects_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let wrapped = anyhow::Error::new(io).context("failed to read score");
        let structured = StructuredError::from_error(&*wrapped);

        assert_eq!(structured.message, "failed to read score");
        assert_eq!(structured.causes, vec!["no such file".to_string()]);
    }
}
