use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{RagError, Result};

static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*\$([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap()
});

pub const DB_RECORD: &str = "db_record";
pub const QUERY_TERM: &str = "query_term";

const GROUNDED_RESPONSE: &str = r#"
    You are a chatbot that can have a conversations about any topic related to the provided context.
    Give explicit answers from the provided context or say 'I don't know' if it does not have an answer.
    provided context: {{$db_record}}

    User: {{$query_term}}
    Chatbot:"#;

#[derive(Debug, Clone)]
pub struct InputVariable {
    pub name: String,
    pub description: String,
    pub is_required: bool,
}

/// Instruction text with `{{$name}}` slots.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub name: String,
    template: String,
    input_variables: Vec<InputVariable>,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, template: impl Into<String>, input_variables: Vec<InputVariable>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            input_variables,
        }
    }

    /// The grounded-answer template: retrieved record plus the user's question.
    pub fn grounded_response() -> Self {
        Self::new(
            "grounded_response",
            GROUNDED_RESPONSE,
            vec![
                InputVariable {
                    name: DB_RECORD.to_string(),
                    description: "The database record".to_string(),
                    is_required: true,
                },
                InputVariable {
                    name: QUERY_TERM.to_string(),
                    description: "The user input".to_string(),
                    is_required: true,
                },
            ],
        )
    }

    /// Fills every slot. Required variables must be present; unknown slots render empty.
    pub fn render(&self, args: &[(&str, &str)]) -> Result<String> {
        let lookup = |name: &str| args.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

        for variable in self.input_variables.iter().filter(|v| v.is_required) {
            if lookup(variable.name.as_str()).is_none() {
                return Err(RagError::Template(format!(
                    "{}: missing required variable '{}'",
                    self.name, variable.name
                )));
            }
        }

        let rendered = VARIABLE_PATTERN.replace_all(&self.template, |caps: &Captures| {
            lookup(&caps[1]).unwrap_or_default().to_string()
        });
        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grounded_prompt_fills_both_slots() {
        let prompt = PromptTemplate::grounded_response();
        let rendered = prompt
            .render(&[(DB_RECORD, "Qdrant is a vector database"), (QUERY_TERM, "What is Qdrant?")])
            .unwrap();

        assert!(rendered.contains("provided context: Qdrant is a vector database"));
        assert!(rendered.contains("User: What is Qdrant?"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_missing_required_variable_errors() {
        let prompt = PromptTemplate::grounded_response();
        let err = prompt.render(&[(QUERY_TERM, "hi")]).unwrap_err();
        assert!(err.to_string().contains("db_record"));
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let prompt = PromptTemplate::new("echo", "say {{ $word }}", Vec::new());
        let rendered = prompt.render(&[("word", "{{$other}} $1")]).unwrap();
        assert_eq!(rendered, "say {{$other}} $1");
    }

    #[test]
    fn test_unknown_optional_slot_renders_empty() {
        let prompt = PromptTemplate::new("echo", "[{{$missing}}]", Vec::new());
        assert_eq!(prompt.render(&[]).unwrap(), "[]");
    }
}
