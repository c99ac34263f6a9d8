// ============================================================================
// AI OPERATIONS - remote generative-image collaborators
// ============================================================================
//
// The network client (auth, retries, prompt templates) lives outside this
// crate. The editor only sees the `ImageService` trait and validates what
// comes back before anything is committed to history.

#![allow(async_fn_in_trait)]

use crate::snapshot::Snapshot;

/// Number of ideas / suggestions a well-formed response carries.
pub const EXPECTED_CHOICES: usize = 3;

/// Reasons a remote call produced no usable result.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The service refused the request on content-policy grounds.
    PolicyBlocked(String),
    /// Generation stopped for a reason other than normal completion.
    IncompleteResponse(String),
    /// The response was empty or did not have the expected shape.
    Malformed(String),
    /// The request never completed (network, auth, quota).
    Transport(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::PolicyBlocked(r) => write!(f, "Request was blocked by the content policy: {}", r),
            ServiceError::IncompleteResponse(r) => write!(f, "Generation did not finish: {}", r),
            ServiceError::Malformed(r) => write!(f, "The service returned an unusable response: {}", r),
            ServiceError::Transport(r) => write!(f, "Could not reach the image service: {}", r),
        }
    }
}

/// Scene description plus candidate lifestyle ideas for the product photo.
#[derive(Clone, Debug, PartialEq)]
pub struct LifestyleIdeas {
    pub description: String,
    pub ideas: Vec<String>,
}

/// Remote collaborators the editor delegates to.
///
/// Implementations return raw results; shape checks happen in
/// [`validate_image`], [`validate_ideas`], [`validate_suggestions`] and
/// [`validate_prompt`].
pub trait ImageService {
    async fn request_adjusted_image(&self, image: &Snapshot, prompt: &str) -> Result<Snapshot, ServiceError>;

    async fn request_lifestyle_ideas(&self, image: &Snapshot, hint: &str) -> Result<LifestyleIdeas, ServiceError>;

    async fn request_detailed_prompt(&self, description: &str, idea: &str) -> Result<String, ServiceError>;

    async fn request_lifestyle_image(&self, image: &Snapshot, detailed_prompt: &str) -> Result<Snapshot, ServiceError>;

    async fn request_text_suggestions(&self, image: &Snapshot) -> Result<Vec<String>, ServiceError>;
}

pub fn validate_image(image: Snapshot) -> Result<Snapshot, ServiceError> {
    if image.is_empty() {
        return Err(ServiceError::Malformed("image has no pixels".to_string()));
    }
    Ok(image)
}

pub fn validate_prompt(prompt: String) -> Result<String, ServiceError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Malformed("empty prompt".to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_choices(choices: Vec<String>, what: &str) -> Result<Vec<String>, ServiceError> {
    if choices.len() != EXPECTED_CHOICES {
        return Err(ServiceError::Malformed(format!(
            "expected {} {}, got {}",
            EXPECTED_CHOICES,
            what,
            choices.len()
        )));
    }
    let cleaned: Vec<String> = choices.iter().map(|c| c.trim().to_string()).collect();
    if cleaned.iter().any(|c| c.is_empty()) {
        return Err(ServiceError::Malformed(format!("empty entry in {}", what)));
    }
    Ok(cleaned)
}

pub fn validate_ideas(ideas: LifestyleIdeas) -> Result<LifestyleIdeas, ServiceError> {
    let description = ideas.description.trim().to_string();
    if description.is_empty() {
        return Err(ServiceError::Malformed("empty scene description".to_string()));
    }
    Ok(LifestyleIdeas {
        description,
        ideas: validate_choices(ideas.ideas, "ideas")?,
    })
}

pub fn validate_suggestions(suggestions: Vec<String>) -> Result<Vec<String>, ServiceError> {
    validate_choices(suggestions, "suggestions")
}

/// What a pending remote edit will ask for.
#[derive(Clone, Debug, PartialEq)]
pub enum EditRequest {
    Adjust { prompt: String },
    Lifestyle { description: String, idea: String },
}

/// A remote edit in flight: the snapshot it was started from plus the request.
///
/// The source is captured when the edit starts, so moving the history cursor
/// while the request runs does not change what is sent. `run` is the single
/// place every remote image call passes through; wrap it to add a timeout.
#[derive(Clone, Debug)]
pub struct PendingEdit {
    pub source: Snapshot,
    pub request: EditRequest,
    /// Session timeline generation the edit was started on.
    pub generation: u64,
}

impl PendingEdit {
    pub async fn run<S: ImageService>(&self, service: &S) -> Result<Snapshot, ServiceError> {
        match &self.request {
            EditRequest::Adjust { prompt } => {
                let image = service.request_adjusted_image(&self.source, prompt).await?;
                validate_image(image)
            }
            EditRequest::Lifestyle { description, idea } => {
                let prompt = service.request_detailed_prompt(description, idea).await?;
                let prompt = validate_prompt(prompt)?;
                let image = service.request_lifestyle_image(&self.source, &prompt).await?;
                validate_image(image)
            }
        }
    }

    /// History label for the committed result.
    pub fn description(&self) -> String {
        match &self.request {
            EditRequest::Adjust { prompt } => format!("Adjust: {}", prompt),
            EditRequest::Lifestyle { idea, .. } => format!("Lifestyle: {}", idea),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn suggestions_need_exactly_three() {
        assert_eq!(
            validate_suggestions(strings(&[" Sale ", "New", "Hot"])).unwrap(),
            strings(&["Sale", "New", "Hot"])
        );
        assert!(matches!(
            validate_suggestions(strings(&["a", "b"])),
            Err(ServiceError::Malformed(_))
        ));
        assert!(matches!(
            validate_suggestions(strings(&["a", " ", "c"])),
            Err(ServiceError::Malformed(_))
        ));
    }

    #[test]
    fn ideas_need_description() {
        let ok = LifestyleIdeas {
            description: "a ceramic mug".to_string(),
            ideas: strings(&["kitchen", "desk", "picnic"]),
        };
        assert_eq!(validate_ideas(ok.clone()).unwrap(), ok);

        let blank = LifestyleIdeas {
            description: "  ".to_string(),
            ..ok
        };
        assert!(validate_ideas(blank).is_err());
    }

    #[test]
    fn empty_prompt_is_malformed() {
        assert!(validate_prompt("   ".to_string()).is_err());
        assert_eq!(validate_prompt(" warm light ".to_string()).unwrap(), "warm light");
    }

    #[test]
    fn error_messages_are_readable() {
        let msg = ServiceError::PolicyBlocked("SAFETY".to_string()).to_string();
        assert!(msg.contains("content policy"));
        assert!(msg.contains("SAFETY"));
    }
}
