use minijinja::{context, Environment};
use once_cell::sync::Lazy;

use crate::model::message::Message;

pub const DYNAMO_IDENTITY: &str = "I am Dynamo AI, a research assistant built to help you search the web, \
analyze your files and turn answers into documents, slides and audio.";

/// Heading that opens the DeepThink outline; appears once per deep prompt.
#[cfg(test)]
pub const DEEP_OUTLINE_MARKER: &str = "DeepThink v3 (Adaptive Intelligence) is enabled.";

const IDENTITY_PHRASES: &[&str] = &[
    "who are you",
    "your name",
    "what is your name",
    "who made you",
];

macro_rules! template_file {
    ($name:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/", $name))
    };
}

const DEEP_OUTLINE: &str = template_file!("deepthink.txt");

static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    for (name, source) in [
        ("system", template_file!("system.jinja")),
        ("question", template_file!("question.jinja")),
        ("radio_script", template_file!("radio_script.jinja")),
    ] {
        env.add_template(name, source)
            .unwrap_or_else(|err| panic!("prompt template `{name}` does not compile: {err}"));
    }
    env
});

/// Fixed identity answer when the message asks who the assistant is.
pub fn identity_reply(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    IDENTITY_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
        .then_some(DYNAMO_IDENTITY)
}

/// Provider-ready prompt: a system instruction, prior turns and the final
/// user turn (retrieved context plus question).
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub history: Vec<Message>,
    pub question: String,
}

pub fn build_prompt(
    message: &str,
    history: Vec<Message>,
    context: Option<&str>,
    deep: bool,
) -> anyhow::Result<Prompt> {
    let system = TEMPLATES.get_template("system")?.render(context! {
        identity => DYNAMO_IDENTITY,
        deep => deep,
        deep_outline => DEEP_OUTLINE.trim(),
    })?;

    let context = context.map(str::trim).filter(|c| !c.is_empty());
    let question = TEMPLATES.get_template("question")?.render(context! {
        context => context,
        question => message.trim(),
    })?;

    Ok(Prompt {
        system: system.trim().to_string(),
        history,
        question: question.trim().to_string(),
    })
}

pub fn radio_script_prompt(topic: &str) -> anyhow::Result<String> {
    let rendered = TEMPLATES
        .get_template("radio_script")?
        .render(context! { topic => topic.trim() })?;
    Ok(rendered.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::Role;

    #[test]
    fn identity_phrases_match_case_insensitively() {
        assert_eq!(identity_reply("Who are you?"), Some(DYNAMO_IDENTITY));
        assert_eq!(identity_reply("tell me YOUR NAME please"), Some(DYNAMO_IDENTITY));
        assert_eq!(identity_reply("who made you"), Some(DYNAMO_IDENTITY));
        assert_eq!(identity_reply("explain rust lifetimes"), None);
    }

    #[test]
    fn deep_outline_appended_exactly_once() {
        let prompt = build_prompt("what is a CRDT", Vec::new(), None, true).unwrap();
        assert_eq!(prompt.system.matches(DEEP_OUTLINE_MARKER).count(), 1);
        assert!(prompt.system.starts_with("You are Dynamo AI."));
        assert!(prompt.system.contains("## 4. Advantages, Limitations, or Trade-offs"));
        assert!(!prompt.question.contains(DEEP_OUTLINE_MARKER));
    }

    #[test]
    fn fast_prompt_has_no_outline() {
        let prompt = build_prompt("what is a CRDT", Vec::new(), None, false).unwrap();
        assert!(!prompt.system.contains(DEEP_OUTLINE_MARKER));
    }

    #[test]
    fn context_precedes_question() {
        let prompt = build_prompt(
            "latest rust release?",
            Vec::new(),
            Some("[DYNAMO WEB CONTEXT]\n- Rust 1.80"),
            false,
        )
        .unwrap();
        assert!(prompt.question.starts_with("CONTEXT:\n[DYNAMO WEB CONTEXT]"));
        assert!(prompt.question.ends_with("USER QUESTION:\nlatest rust release?"));

        let bare = build_prompt("hi there", Vec::new(), Some("   "), false).unwrap();
        assert_eq!(bare.question, "USER QUESTION:\nhi there");
    }

    #[test]
    fn history_is_carried_as_prior_turns() {
        let history = vec![
            Message::new(Role::User, "first question"),
            Message::new(Role::Assistant, "first answer"),
        ];
        let prompt = build_prompt("follow up", history.clone(), None, false).unwrap();
        assert_eq!(prompt.history, history);
        assert_eq!(prompt.question, "USER QUESTION:\nfollow up");
    }

    #[test]
    fn radio_prompt_names_topic_and_format() {
        let prompt = radio_script_prompt("quantum computing").unwrap();
        assert!(prompt.contains("quantum computing"));
        assert!(prompt.contains("\"dialogue\""));
    }
}
