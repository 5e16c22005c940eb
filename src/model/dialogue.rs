use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: String,
    pub text: String,
}

/// Two-speaker script returned by a generation backend for the radio flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueScript {
    pub dialogue: Vec<DialogueTurn>,
}

impl DialogueScript {
    /// One `Speaker: text` line per non-empty turn.
    pub fn flatten(&self) -> String {
        self.dialogue
            .iter()
            .filter(|turn| !turn.text.trim().is_empty())
            .map(|turn| format!("{}: {}", turn.speaker.trim(), turn.text.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
