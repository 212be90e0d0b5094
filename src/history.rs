/// Conversation history sent along with each chat request.
///
/// Ordered `(user_text, assistant_text)` pairs. A new user message always
/// starts a new pair; an assistant reply fills the second slot of the most
/// recent pair. The last pair may be pending: user text set, assistant text
/// still empty while a response is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    pairs: Vec<(String, String)>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Start a new pair for a user message.
    pub fn start_pair(&mut self, user_text: &str) {
        self.pairs.push((user_text.to_string(), String::new()));
    }

    /// Fill the assistant slot of the most recent pair, if one exists.
    pub fn complete_pair(&mut self, assistant_text: &str) {
        if let Some(last) = self.pairs.last_mut() {
            last.1 = assistant_text.to_string();
        }
    }

    /// Pairs to include in an outbound request: everything except a trailing
    /// pending pair, which is the message currently being answered.
    pub fn completed_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.pairs.clone();
        if pairs.last().is_some_and(|(_, assistant)| assistant.is_empty()) {
            pairs.pop();
        }
        pairs
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
