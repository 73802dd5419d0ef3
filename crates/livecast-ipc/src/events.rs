//! Chat notices pushed by the engine to the chat sink.

use serde::{Deserialize, Serialize};

/// Notifications the engine sends to the chat audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// An addressed message was queued for generation.
    Processing { user: String },

    /// A message did not start with the addressing prefix.
    Usage { prefix: String },

    /// A prompt hit the content filter.
    Refused,

    /// Speech synthesis finished, video generation is next.
    AlmostReady,

    /// The video is generated and queued for playback.
    AnytimeNow,

    /// The idle timer picked a previously played clip.
    Replaying,

    /// The broadcast is about to be restarted.
    Restarting,

    /// The prompt timer produced a question on its own.
    Question { text: String },
}

impl Notice {
    /// Returns the chat text for this notice.
    pub fn text(&self) -> String {
        match self {
            Self::Processing { user } => {
                format!("We are processing your request {user}, please wait a minute or two.")
            }
            Self::Usage { prefix } => {
                format!("To talk to me, a message has to start with '{prefix}'")
            }
            Self::Refused => "Sorry, I can't say that.".to_string(),
            Self::AlmostReady => "Almost ready...".to_string(),
            Self::AnytimeNow => "Anytime now...".to_string(),
            Self::Replaying => "Playing a previous question...".to_string(),
            Self::Restarting => "Back in some seconds!".to_string(),
            Self::Question { text } => text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_names_user() {
        let text = Notice::Processing {
            user: "maria".to_string(),
        }
        .text();
        assert!(text.contains("maria"));
    }

    #[test]
    fn test_question_is_verbatim() {
        let notice = Notice::Question {
            text: "Lula, qual o seu prato preferido?".to_string(),
        };
        assert_eq!(notice.text(), "Lula, qual o seu prato preferido?");
    }
}
