//! Instruction text for the two cross-examination queries.

use crate::registry::ChallengeSpec;

/// Field name only the negative query asks for.
pub const NEGATIVE_FIELD: &str = "unrelated_probability";

/// Which side of the cross-examination an instruction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Affirmative,
    Negative,
}

impl PromptKind {
    /// Classifies an instruction built by this module.
    pub fn of(instruction: &str) -> Self {
        if instruction.contains(NEGATIVE_FIELD) {
            PromptKind::Negative
        } else {
            PromptKind::Affirmative
        }
    }
}

fn language_name(tag: &str) -> &str {
    match tag {
        "ko" => "Korean",
        "en" => "English",
        "ja" => "Japanese",
        other => other,
    }
}

/// "Does this image satisfy the challenge?"
pub fn affirmative_prompt(spec: &ChallengeSpec, language: &str) -> String {
    let language = language_name(language);
    format!(
        r#"You verify photos submitted for the eco challenge "{title}".
Decide whether the photo genuinely shows this activity: {target}.

Criteria:
- APPROVED: you are at least 0.9 confident the target is clearly visible and actually in use by the submitter. Not a stock photo, screenshot or picture of a screen.
- NEEDS_REVIEW: the target is visible but the photo is ambiguous (poor angle or lighting, partly visible, usage unclear).
- REJECTED: the target is absent, contradicted, or the photo looks downloaded or staged to deceive.

Respond with JSON only:
{{
  "verification_result": "APPROVED" | "NEEDS_REVIEW" | "REJECTED",
  "confidence": 0.0-1.0,
  "explanation": "2-3 sentences in {language}",
  "rationale": "the concrete objects and actions you see, named with plain nouns in {language}",
  "detected_items": ["objects detected"]
}}"#,
        title = spec.title,
        target = spec.target_description,
        language = language,
    )
}

/// "How likely is this image unrelated to the challenge?"
pub fn negative_prompt(spec: &ChallengeSpec, language: &str) -> String {
    let language = language_name(language);
    format!(
        r#"You audit photos submitted for the eco challenge "{title}".
Estimate how likely it is that the photo is UNRELATED to this activity: {target}.
Treat stock photos, screenshots and photos of screens as unrelated.

Respond with JSON only:
{{
  "{field}": 0.0-1.0,
  "verification_result": "APPROVED" | "NEEDS_REVIEW" | "REJECTED",
  "explanation": "1-2 sentences in {language}"
}}"#,
        title = spec.title,
        target = spec.target_description,
        field = NEGATIVE_FIELD,
        language = language,
    )
}
