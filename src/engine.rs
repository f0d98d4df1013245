pub mod scoring;
pub mod transcript;

use log::{debug, info, warn};
use thiserror::Error;

use crate::scenario::{Catalogue, ChoiceOption, Interaction, InteractionKind, Quality, Scenario, Stage};
use scoring::{Tier, TierTable, UserChoice, CUSTOM_INPUT};
use transcript::ChatMessage;

// ---------------------------------------------------------------------------
// Engine state
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("simulation '{0}' not found")]
    NotFound(String),
    #[error("the simulation is not waiting for an answer")]
    NotAwaitingInput,
    #[error("the current interaction is not a multiple choice question")]
    NotAChoice,
    #[error("'{0}' is not one of the available options")]
    UnknownOption(String),
    #[error("please enter a response")]
    EmptyInput,
    #[error("restarting discards your progress and must be confirmed")]
    ConfirmationRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A passive beat (prompt or feedback) has been rendered.
    Running,
    /// A choice or free-text answer is pending.
    AwaitingInput,
    /// The last interaction has been consumed.
    Complete,
    /// Results were shown; the transcript is frozen.
    ShowingResults,
}

/// Position in the scenario tree: (stage index, interaction index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub stage: usize,
    pub interaction: usize,
}

impl Cursor {
    pub const START: Cursor = Cursor {
        stage: 0,
        interaction: 0,
    };
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Step over prompts and feedback without waiting for the caller.
    pub auto_advance: bool,
    pub tiers: TierTable,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            auto_advance: true,
            tiers: TierTable::default(),
        }
    }
}

/// Summary produced by [`Engine::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Results {
    pub score: u8,
    pub tier: Tier,
    /// Consequences of up to three well-judged answers.
    pub strengths: Vec<String>,
    /// Consequences of up to three poorly-judged answers.
    pub improvements: Vec<String>,
    /// Outcome of the final stage, if the script has one.
    pub outcome: Option<String>,
}

const HIGHLIGHT_LIMIT: usize = 3;

/// Drives a single scenario run from the welcome line to scored completion.
pub struct Engine<'a> {
    scenario: &'a Scenario,
    settings: EngineSettings,
    phase: Phase,
    cursor: Cursor,
    transcript: Vec<ChatMessage>,
    choices: Vec<UserChoice>,
}

impl<'a> Engine<'a> {
    /// Look up `id` and start a run. Fails without building an engine when the
    /// id is not in the catalogue.
    pub fn load(
        catalogue: &'a Catalogue,
        id: &str,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let Some(scenario) = catalogue.find(id) else {
            warn!("Simulation not found: {id}");
            return Err(EngineError::NotFound(id.to_string()));
        };
        info!(
            "Loaded scenario '{}' ({} stages, {} interactions)",
            scenario.id,
            scenario.stages.len(),
            scenario.interaction_count()
        );

        let mut engine = Self {
            scenario,
            settings,
            phase: Phase::Idle,
            cursor: Cursor::START,
            transcript: Vec::new(),
            choices: Vec::new(),
        };
        engine.start();
        Ok(engine)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn scenario(&self) -> &'a Scenario {
        self.scenario
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn choices(&self) -> &[UserChoice] {
        &self.choices
    }

    pub fn current_stage(&self) -> &'a Stage {
        &self.scenario.stages[self.cursor.stage]
    }

    /// The interaction under the cursor while a run is in progress.
    pub fn current_interaction(&self) -> Option<&'a Interaction> {
        match self.phase {
            Phase::Running | Phase::AwaitingInput => Some(self.interaction()),
            _ => None,
        }
    }

    /// Whether the cursor sits on the final interaction of the final stage.
    pub fn at_last_interaction(&self) -> bool {
        self.cursor.stage + 1 == self.scenario.stages.len()
            && self.cursor.interaction + 1 == self.current_stage().interactions.len()
    }

    /// Share of interactions already behind the cursor, in percent.
    pub fn progress(&self) -> u8 {
        if matches!(self.phase, Phase::Complete | Phase::ShowingResults) {
            return 100;
        }
        let total = self.scenario.interaction_count();
        if total == 0 {
            return 0;
        }
        let done: usize = self.scenario.stages[..self.cursor.stage]
            .iter()
            .map(|s| s.interactions.len())
            .sum::<usize>()
            + self.cursor.interaction;
        (done * 100 / total) as u8
    }

    pub fn score(&self) -> u8 {
        scoring::score(&self.choices)
    }

    pub fn tier(&self) -> &Tier {
        self.settings.tiers.classify(self.score())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Move past a passive beat. Ignored while an answer is pending and once
    /// the run is complete.
    pub fn advance(&mut self) {
        if self.phase != Phase::Running {
            debug!("advance ignored in phase {:?}", self.phase);
            return;
        }
        self.step();
        self.pump();
    }

    pub fn submit_choice(&mut self, option_id: &str) -> Result<(), EngineError> {
        if self.phase != Phase::AwaitingInput {
            warn!("Choice '{option_id}' rejected in phase {:?}", self.phase);
            return Err(EngineError::NotAwaitingInput);
        }
        let interaction = self.interaction();
        let InteractionKind::Choice { options } = &interaction.kind else {
            warn!("Choice '{option_id}' rejected: '{}' expects text", interaction.id);
            return Err(EngineError::NotAChoice);
        };
        let Some(option) = options.iter().find(|o| o.id == option_id) else {
            warn!("Unknown option '{option_id}' for '{}'", interaction.id);
            return Err(EngineError::UnknownOption(option_id.to_string()));
        };

        info!(
            "Choice: {} -> {} ({:?})",
            interaction.id, option.id, option.value
        );
        self.choices.push(UserChoice {
            interaction_id: interaction.id.clone(),
            option_id: option.id.clone(),
            value: option.value,
        });
        self.push(ChatMessage::user(&option.text));
        if option.value == Quality::Bad {
            self.push(ChatMessage::objection("Objection, Your Honor!"));
        }
        self.push(ChatMessage::ai(&option.consequence).named("Coach"));

        self.step();
        self.pump();
        Ok(())
    }

    /// Answer the pending interaction in free text. On a multiple choice
    /// question the answer is recorded as a neutral custom choice.
    pub fn submit_text(&mut self, text: &str) -> Result<(), EngineError> {
        if self.phase != Phase::AwaitingInput {
            warn!("Text rejected in phase {:?}", self.phase);
            return Err(EngineError::NotAwaitingInput);
        }
        let text = text.trim();
        if text.is_empty() {
            warn!("Empty response rejected");
            return Err(EngineError::EmptyInput);
        }

        let interaction = self.interaction();
        if let InteractionKind::Choice { .. } = interaction.kind {
            info!("Custom answer for '{}' scored as neutral", interaction.id);
            self.choices.push(UserChoice {
                interaction_id: interaction.id.clone(),
                option_id: CUSTOM_INPUT.to_string(),
                value: Quality::Neutral,
            });
        } else {
            info!("Free-text answer for '{}'", interaction.id);
        }
        self.push(ChatMessage::user(text));

        self.step();
        self.pump();
        Ok(())
    }

    /// Close a completed run and return its results. Returns `None` while
    /// the run is still in progress.
    pub fn finish(&mut self) -> Option<Results> {
        match self.phase {
            Phase::Complete => {
                self.phase = Phase::ShowingResults;
                let results = self.results();
                info!(
                    "Scenario '{}' finished: score {} ({})",
                    self.scenario.id, results.score, results.tier.label
                );
                Some(results)
            }
            Phase::ShowingResults => Some(self.results()),
            _ => None,
        }
    }

    /// Discard the run and start over. Outside the results view this throws
    /// away progress, so it must be confirmed.
    pub fn restart(&mut self, confirmed: bool) -> Result<(), EngineError> {
        if self.phase != Phase::ShowingResults && !confirmed {
            return Err(EngineError::ConfirmationRequired);
        }
        info!("Restarting scenario '{}'", self.scenario.id);
        self.transcript.clear();
        self.choices.clear();
        self.phase = Phase::Idle;
        self.start();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn start(&mut self) {
        self.push(
            ChatMessage::ai(format!(
                "Welcome to the {} simulation. {}",
                self.scenario.title, self.scenario.context
            ))
            .named("Simulation"),
        );
        self.cursor = Cursor::START;
        self.enter();
        self.pump();
    }

    fn interaction(&self) -> &'a Interaction {
        let scenario: &'a Scenario = self.scenario;
        &scenario.stages[self.cursor.stage].interactions[self.cursor.interaction]
    }

    fn push(&mut self, message: ChatMessage) {
        debug!("transcript += {message}");
        self.transcript.push(message);
    }

    /// Render the interaction under the cursor and classify it as passive or blocking.
    fn enter(&mut self) {
        let interaction = self.interaction();
        debug!(
            "Entering '{}' at stage {} / interaction {}",
            interaction.id, self.cursor.stage, self.cursor.interaction
        );

        match &interaction.kind {
            InteractionKind::Prompt { speaker, role } => {
                let message = match speaker {
                    Some(_) => {
                        ChatMessage::participant(&interaction.content, speaker.clone(), role.clone())
                    }
                    None => ChatMessage::ai(&interaction.content),
                };
                self.push(message);
                self.phase = Phase::Running;
            }
            InteractionKind::Choice { options } => {
                let texts = options.iter().map(|o| o.text.clone()).collect();
                self.push(ChatMessage::ai(&interaction.content).user_turn(texts));
                self.phase = Phase::AwaitingInput;
            }
            InteractionKind::UserInput {
                suggested_responses,
            } => {
                self.push(
                    ChatMessage::ai(&interaction.content).user_turn(suggested_responses.clone()),
                );
                self.phase = Phase::AwaitingInput;
            }
            InteractionKind::Feedback { feedback } => {
                self.push(ChatMessage::ai(&interaction.content));
                if let Some(text) = feedback {
                    if self.answered(Quality::Good) {
                        self.push(ChatMessage::ai(&text.positive).named("Strengths"));
                    }
                    if self.answered(Quality::Bad) {
                        self.push(ChatMessage::ai(&text.negative).named("Areas for Improvement"));
                    }
                }
                self.phase = Phase::Running;
            }
        }
    }

    /// Move the cursor one interaction forward and render it, or complete the run.
    fn step(&mut self) {
        let stage_len = self.current_stage().interactions.len();
        if self.cursor.interaction + 1 < stage_len {
            self.cursor.interaction += 1;
        } else if self.cursor.stage + 1 < self.scenario.stages.len() {
            self.cursor.stage += 1;
            self.cursor.interaction = 0;
            debug!("Stage {}: {}", self.cursor.stage + 1, self.current_stage().title);
        } else {
            info!("Scenario '{}' complete", self.scenario.id);
            self.phase = Phase::Complete;
            return;
        }
        self.enter();
    }

    fn pump(&mut self) {
        while self.settings.auto_advance && self.phase == Phase::Running {
            self.step();
        }
    }

    fn answered(&self, value: Quality) -> bool {
        self.choices.iter().any(|c| c.value == value)
    }

    fn option_for(&self, choice: &UserChoice) -> Option<&'a ChoiceOption> {
        let scenario: &'a Scenario = self.scenario;
        scenario
            .stages
            .iter()
            .flat_map(|s| &s.interactions)
            .find(|i| i.id == choice.interaction_id)
            .and_then(|i| match &i.kind {
                InteractionKind::Choice { options } => {
                    options.iter().find(|o| o.id == choice.option_id)
                }
                _ => None,
            })
    }

    fn highlights(&self, value: Quality) -> Vec<String> {
        self.choices
            .iter()
            .filter(|c| c.value == value)
            .filter_map(|c| self.option_for(c))
            .map(|o| o.consequence.clone())
            .take(HIGHLIGHT_LIMIT)
            .collect()
    }

    fn results(&self) -> Results {
        let score = self.score();
        Results {
            score,
            tier: self.settings.tiers.classify(score).clone(),
            strengths: self.highlights(Quality::Good),
            improvements: self.highlights(Quality::Bad),
            outcome: self.scenario.stages.last().and_then(|s| s.outcome.clone()),
        }
    }
}
