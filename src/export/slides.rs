use tracing::warn;

use super::pptx::SlideContent;
use crate::model::{
    message::Message,
    presentation::{PresentationSpec, SlideKind, DEFAULT_PRESENTATION_TITLE},
};

pub const REPORT_DECK_TITLE: &str = "Dynamo AI Research Report";
const REPORT_DECK_SUBTITLE: &str = "Generated by Dynamo AI";
pub const INSIGHT_TITLE: &str = "Research Insight";
pub const MAX_INSIGHT_SLIDES: usize = 5;
pub const MAX_INSIGHT_CHARS: usize = 700;

/// Title slide, then one insight slide per assistant message among the
/// last five assistant messages.
pub fn history_deck(messages: &[Message]) -> Vec<SlideContent> {
    let assistant: Vec<&Message> = messages.iter().filter(|m| m.role.is_assistant()).collect();
    let start = assistant.len().saturating_sub(MAX_INSIGHT_SLIDES);

    let mut deck = vec![SlideContent::Title {
        title: REPORT_DECK_TITLE.to_string(),
        subtitle: Some(REPORT_DECK_SUBTITLE.to_string()),
    }];
    deck.extend(assistant[start..].iter().map(|m| SlideContent::Body {
        title: INSIGHT_TITLE.to_string(),
        body: m.content.chars().take(MAX_INSIGHT_CHARS).collect(),
    }));
    deck
}

pub fn smart_deck(spec: &PresentationSpec) -> Vec<SlideContent> {
    let title = spec
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_PRESENTATION_TITLE);

    let mut deck = vec![SlideContent::Title {
        title: title.to_string(),
        subtitle: spec.subtitle.clone().filter(|s| !s.trim().is_empty()),
    }];

    for (i, slide) in spec.slides.iter().enumerate() {
        match slide.kind {
            SlideKind::Content | SlideKind::Conclusion => deck.push(SlideContent::Bullets {
                title: slide.title.clone(),
                bullets: slide.bullets.clone(),
            }),
            SlideKind::TwoColumn => deck.push(SlideContent::TwoColumn {
                title: slide.title.clone(),
                left: slide.left.clone(),
                right: slide.right.clone(),
            }),
            SlideKind::Unknown => {
                warn!(index = i, title = %slide.title, "skipping slide with unknown type");
            }
        }
    }
    deck
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{export::pptx, model::message::Role};

    #[test]
    fn seven_answers_make_title_plus_five() {
        let mut messages = Vec::new();
        for i in 0..7 {
            messages.push(Message::new(Role::User, format!("question {i}")));
            messages.push(Message::new(Role::Assistant, format!("answer {i} {}", "x".repeat(900))));
        }

        let deck = history_deck(&messages);
        assert_eq!(deck.len(), 6);
        assert!(matches!(deck[0], SlideContent::Title { .. }));

        for slide in &deck[1..] {
            match slide {
                SlideContent::Body { title, body } => {
                    assert_eq!(title, INSIGHT_TITLE);
                    assert!(body.chars().count() <= MAX_INSIGHT_CHARS);
                }
                other => panic!("unexpected slide {other:?}"),
            }
        }
        assert!(matches!(&deck[1], SlideContent::Body { body, .. } if body.starts_with("answer 2")));

        let bytes = pptx::build(&deck).unwrap();
        assert_eq!(pptx::tests::slide_parts(&bytes).len(), 6);
    }

    #[test]
    fn no_answers_still_has_title_slide() {
        let deck = history_deck(&[Message::new(Role::User, "hello")]);
        assert_eq!(deck.len(), 1);
    }

    #[test]
    fn smart_deck_skips_unknown_types() {
        let spec: PresentationSpec = serde_json::from_value(serde_json::json!({
            "subtitle": "Q3 review",
            "slides": [
                {"title": "Intro", "bullets": ["a", "b"]},
                {"type": "chart", "title": "Mystery"},
                {"type": "two_column", "title": "Compare", "left": ["l"], "right": ["r"]},
                {"type": "conclusion", "title": "Wrap up", "bullets": ["done"]}
            ]
        }))
        .unwrap();

        let deck = smart_deck(&spec);
        let titles: Vec<&str> = deck.iter().map(SlideContent::title).collect();
        assert_eq!(titles, [DEFAULT_PRESENTATION_TITLE, "Intro", "Compare", "Wrap up"]);
        assert!(matches!(&deck[2], SlideContent::TwoColumn { left, .. } if left == &["l"]));

        let bytes = pptx::build(&deck).unwrap();
        let slides = pptx::tests::slide_parts(&bytes);
        assert_eq!(slides.len(), 4);
        assert!(slides[0].contains("Q3 review"));
    }
}
