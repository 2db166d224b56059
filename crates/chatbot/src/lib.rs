//! Help Chatbot
//!
//! Answers heart-health questions by scanning the message for known topic
//! keywords. The table is ordered and the first keyword found wins.

use tracing::debug;

/// Topic keywords and their canned answers, in match priority order
pub const KEYWORD_RESPONSES: &[(&str, &str)] = &[
    (
        "symptoms",
        "Common symptoms of heart disease include chest pain, shortness of breath, fatigue, irregular heartbeat, and dizziness.",
    ),
    (
        "risk factors",
        "Risk factors for heart disease include high blood pressure, high cholesterol, smoking, diabetes, obesity, poor diet, and lack of exercise.",
    ),
    (
        "prevention",
        "To prevent heart disease: maintain a healthy diet, exercise regularly, avoid smoking, limit alcohol, manage stress, and get regular checkups.",
    ),
    (
        "treatment",
        "Heart disease treatments may include lifestyle changes, medications, medical procedures like angioplasty, or surgery like bypass.",
    ),
    (
        "help",
        "You can ask me about heart disease symptoms, risk factors, prevention methods, or treatment options. How can I assist you?",
    ),
    (
        "test",
        "You can take a heart disease risk assessment by filling out the prediction form with your health data like blood pressure, cholesterol levels, and other indicators.",
    ),
];

/// Reply when no keyword matches
pub const FALLBACK_RESPONSE: &str = "I'm sorry, I don't understand that question. You can ask me about heart disease symptoms, risk factors, prevention, or treatment.";

/// Keyword responder
#[derive(Debug, Clone, Copy)]
pub struct Responder {
    table: &'static [(&'static str, &'static str)],
    fallback: &'static str,
}

impl Responder {
    /// Responder over the built-in table
    pub fn new() -> Self {
        Self {
            table: KEYWORD_RESPONSES,
            fallback: FALLBACK_RESPONSE,
        }
    }

    /// Answer a message. Matching is a case-insensitive substring search.
    pub fn respond(&self, message: &str) -> &'static str {
        let message = message.to_lowercase();

        match self.table.iter().find(|(keyword, _)| message.contains(keyword)) {
            Some((keyword, response)) => {
                debug!("Chatbot matched keyword '{}'", keyword);
                *response
            }
            None => self.fallback,
        }
    }
}

impl Default for Responder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(keyword: &str) -> &'static str {
        KEYWORD_RESPONSES
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, r)| *r)
            .unwrap()
    }

    #[test]
    fn test_keyword_anywhere_case_insensitive() {
        let bot = Responder::new();
        assert_eq!(bot.respond("What are the SYMPTOMS?"), answer("symptoms"));
        assert_eq!(bot.respond("tell me about Prevention please"), answer("prevention"));
    }

    #[test]
    fn test_fallback() {
        let bot = Responder::new();
        assert_eq!(bot.respond("asdf"), FALLBACK_RESPONSE);
        assert_eq!(bot.respond(""), FALLBACK_RESPONSE);
    }

    #[test]
    fn test_first_match_wins() {
        let bot = Responder::new();
        // "symptoms" precedes "treatment" and "help" in the table
        assert_eq!(
            bot.respond("help me with treatment of symptoms"),
            answer("symptoms")
        );
        assert_eq!(bot.respond("treatment help"), answer("treatment"));
    }

    #[test]
    fn test_multi_word_keyword() {
        let bot = Responder::new();
        assert_eq!(bot.respond("what are the risk factors"), answer("risk factors"));
        // "risk" alone is not a keyword
        assert_eq!(bot.respond("what is my risk"), FALLBACK_RESPONSE);
    }

    #[test]
    fn test_substring_match() {
        let bot = Responder::new();
        // "test" inside "latest" still matches
        assert_eq!(bot.respond("latest news"), answer("test"));
    }

    #[test]
    fn test_table_order() {
        let keywords: Vec<_> = KEYWORD_RESPONSES.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keywords,
            ["symptoms", "risk factors", "prevention", "treatment", "help", "test"]
        );
    }
}
