use serde::Deserialize;

/// A complete, named simulation exercise.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Stable identifier used on the command line (e.g. "cross-examination").
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    /// Free-form duration label, e.g. "30 min".
    pub duration: String,
    /// Free-form participant count label, e.g. "2-3".
    pub participants_label: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    /// Case background shown in the welcome message.
    pub context: String,
    pub stages: Vec<Stage>,
}

impl Scenario {
    pub fn interaction_count(&self) -> usize {
        self.stages.iter().map(|s| s.interactions.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        f.write_str(label)
    }
}

/// One phase of a scenario. Order within the scenario is the narrative order.
#[derive(Debug, Clone, Deserialize)]
pub struct Stage {
    pub id: String,
    pub title: String,
    pub description: String,
    pub interactions: Vec<Interaction>,
    /// Narrative outcome shown once the run is over.
    #[serde(default)]
    pub outcome: Option<String>,
}

/// One beat of the scripted conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: String,
    /// What is said (prompt) or asked (choice, user-input).
    pub content: String,
    #[serde(flatten)]
    pub kind: InteractionKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InteractionKind {
    /// Narrative line, no user action required.
    Prompt {
        #[serde(default)]
        speaker: Option<String>,
        #[serde(default)]
        role: Option<String>,
    },
    /// The user must pick exactly one option.
    Choice { options: Vec<ChoiceOption> },
    /// The user must type a free-form answer.
    UserInput {
        #[serde(default)]
        suggested_responses: Vec<String>,
    },
    /// Summary beat; positive/negative text depends on the choices so far.
    Feedback {
        #[serde(default)]
        feedback: Option<FeedbackText>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackText {
    pub positive: String,
    pub negative: String,
}

/// A selectable answer to a choice interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
    pub value: Quality,
    /// Explanation shown after the option is picked.
    pub consequence: String,
}

/// Quality rating of an answer. The only scoring signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Neutral,
    Bad,
}

impl Quality {
    pub fn points(self) -> u32 {
        match self {
            Quality::Good => 3,
            Quality::Neutral => 1,
            Quality::Bad => 0,
        }
    }
}
