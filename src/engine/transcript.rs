use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
    Participant,
    Objection,
}

/// One rendered line of the run's transcript.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
    pub sender_name: Option<String>,
    pub sender_role: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Set on the line that hands the turn to the user.
    pub is_user_turn: bool,
    pub suggested_responses: Vec<String>,
}

impl ChatMessage {
    fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            sender_name: None,
            sender_role: None,
            timestamp: Utc::now(),
            is_user_turn: false,
            suggested_responses: Vec::new(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Sender::Ai, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn participant(
        content: impl Into<String>,
        name: Option<String>,
        role: Option<String>,
    ) -> Self {
        Self {
            sender_name: name,
            sender_role: role,
            ..Self::new(Sender::Participant, content)
        }
    }

    pub fn objection(content: impl Into<String>) -> Self {
        Self {
            sender_name: Some("Opposing Counsel".into()),
            ..Self::new(Sender::Objection, content)
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Mark this line as handing the turn to the user, with optional canned answers.
    pub fn user_turn(mut self, suggestions: Vec<String>) -> Self {
        self.is_user_turn = true;
        self.suggested_responses = suggestions;
        self
    }

    fn speaker_label(&self) -> String {
        match (&self.sender_name, &self.sender_role) {
            (Some(name), Some(role)) => format!("{name} ({role})"),
            (Some(name), None) => name.clone(),
            (None, _) => match self.sender {
                Sender::User => "You".into(),
                Sender::Ai => "Simulation".into(),
                Sender::Participant => "Participant".into(),
                Sender::Objection => "Objection".into(),
            },
        }
    }
}

impl std::fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.speaker_label(), self.content)
    }
}
