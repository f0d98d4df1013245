use std::io::{BufRead, Write};

use anyhow::Result;
use log::{debug, info, warn};

use crate::engine::transcript::Sender;
use crate::engine::{Engine, EngineError, EngineSettings, Phase, Results};
use crate::pacing::{Beat, Pacer};
use crate::scenario::{Catalogue, InteractionKind, Scenario};
use crate::session::{Session, SessionStore};

// ---------------------------------------------------------------------------
// Terminal I/O
// ---------------------------------------------------------------------------

/// Line-oriented terminal. Generic so tests can drive it from memory.
pub struct Console<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    /// Print `prompt` and read one trimmed line. `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask a yes/no question; anything but "y"/"yes" is a no.
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{question} [y/N] "))?;
        Ok(matches!(
            answer.as_deref().map(str::to_lowercase).as_deref(),
            Some("y") | Some("yes")
        ))
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out
    }
}

// ---------------------------------------------------------------------------
// Scenario picker
// ---------------------------------------------------------------------------

pub fn list_scenarios(catalogue: &Catalogue, out: &mut impl Write) -> Result<()> {
    writeln!(out, "\nAvailable simulations:\n")?;
    for s in catalogue.scenarios() {
        writeln!(out, "  {:<20} {}", s.id, s.title)?;
        writeln!(
            out,
            "  {:<20} {} | {} | {} participants",
            "", s.difficulty, s.duration, s.participants_label
        )?;
        writeln!(out, "  {:<20} {}\n", "", s.description)?;
    }
    writeln!(out, "Start one with: courtsim play <id>")?;
    Ok(())
}

pub fn show_scenario(scenario: &Scenario, out: &mut impl Write) -> Result<()> {
    writeln!(out, "\n{} ({})", scenario.title, scenario.difficulty)?;
    writeln!(out, "{}\n", scenario.description)?;
    writeln!(out, "Background:\n  {}\n", scenario.context)?;
    writeln!(out, "Objectives:")?;
    for objective in &scenario.objectives {
        writeln!(out, "  - {objective}")?;
    }
    writeln!(out, "\nStages:")?;
    for (i, stage) in scenario.stages.iter().enumerate() {
        writeln!(out, "  {}. {} - {}", i + 1, stage.title, stage.description)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Running a simulation
// ---------------------------------------------------------------------------

/// How a single pass through the scenario ended.
enum RoundOutcome {
    Finished(Results),
    /// Player left mid-run.
    Quit,
}

/// Tracks what has already been printed for the current round.
struct View {
    shown: usize,
    stage: Option<usize>,
}

impl View {
    fn new() -> Self {
        Self {
            shown: 0,
            stage: None,
        }
    }
}

fn render<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    engine: &Engine,
    view: &mut View,
    pacer: &dyn Pacer,
) -> Result<()> {
    let cursor = engine.cursor();
    if view.stage != Some(cursor.stage) {
        let stage = engine.current_stage();
        writeln!(
            console.out,
            "\n--- Stage {} of {}: {} ({}% complete) ---\n    {}",
            cursor.stage + 1,
            engine.scenario().stages.len(),
            stage.title,
            engine.progress(),
            stage.description
        )?;
        view.stage = Some(cursor.stage);
    }

    let fresh = &engine.transcript()[view.shown..];
    if fresh.iter().any(|m| m.sender != Sender::User) {
        pacer.pause(Beat::Thinking);
    }
    for message in fresh {
        if message.sender == Sender::User {
            // the player's own line is already on screen
            continue;
        }
        writeln!(console.out, "\n{} {message}", message.timestamp.format("%H:%M"))?;
        if message.is_user_turn {
            render_answers(console, engine, &message.suggested_responses)?;
        }
    }
    view.shown = engine.transcript().len();
    Ok(())
}

fn render_answers<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    engine: &Engine,
    suggestions: &[String],
) -> Result<()> {
    let is_choice = matches!(
        engine.current_interaction().map(|i| &i.kind),
        Some(InteractionKind::Choice { .. })
    );
    if is_choice {
        for (i, text) in suggestions.iter().enumerate() {
            writeln!(console.out, "  {}) {text}", i + 1)?;
        }
        writeln!(console.out, "  (Type a number, or answer in your own words.)")?;
    } else if !suggestions.is_empty() {
        writeln!(console.out, "  Suggestions:")?;
        for text in suggestions {
            writeln!(console.out, "    - {text}")?;
        }
    }
    Ok(())
}

/// What a typed line means at the pending interaction.
enum Answer {
    /// Id of the numbered option.
    Option(String),
    /// A number that names no option; carries the option count.
    OutOfRange(usize),
    Text,
}

/// Numbers select options on a pending choice; anything else is free text.
fn parse_answer(engine: &Engine, line: &str) -> Answer {
    let Some(InteractionKind::Choice { options }) = engine.current_interaction().map(|i| &i.kind)
    else {
        return Answer::Text;
    };
    let Ok(n) = line.parse::<usize>() else {
        return Answer::Text;
    };
    match n.checked_sub(1).and_then(|i| options.get(i)) {
        Some(option) => Answer::Option(option.id.clone()),
        None => Answer::OutOfRange(options.len()),
    }
}

const EXIT_QUESTION: &str = "Are you sure you want to exit? Your progress will be lost.";

fn play_round<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    engine: &mut Engine,
    pacer: &dyn Pacer,
) -> Result<RoundOutcome> {
    let mut view = View::new();

    loop {
        render(console, engine, &mut view, pacer)?;

        let prompt = match engine.phase() {
            Phase::AwaitingInput => "\n[You]: ",
            Phase::Running if engine.at_last_interaction() => "\n[Enter] Complete simulation ",
            Phase::Running => "\n[Enter] Continue ",
            Phase::Complete | Phase::ShowingResults => {
                let proceed = console.read_line("\n[Enter] View results ")?;
                if proceed.is_none() {
                    return Ok(RoundOutcome::Quit);
                }
                return Ok(match engine.finish() {
                    Some(results) => RoundOutcome::Finished(results),
                    None => RoundOutcome::Quit,
                });
            }
            Phase::Idle => {
                warn!("Engine is idle; leaving the simulation");
                return Ok(RoundOutcome::Quit);
            }
        };

        let Some(input) = console.read_line(prompt)? else {
            return Ok(RoundOutcome::Quit);
        };

        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            if console.confirm(EXIT_QUESTION)? {
                return Ok(RoundOutcome::Quit);
            }
            continue;
        }
        if input.eq_ignore_ascii_case("restart") {
            if console.confirm("Restart the simulation? Your progress will be lost.")? {
                engine.restart(true)?;
                view = View::new();
            }
            continue;
        }

        if engine.phase() == Phase::Running {
            engine.advance();
            continue;
        }

        let submitted = match parse_answer(engine, &input) {
            Answer::Option(option_id) => engine.submit_choice(&option_id),
            Answer::OutOfRange(count) => {
                warn!("No option numbered {input}");
                writeln!(console.out, "(Pick a number from 1 to {count}.)")?;
                continue;
            }
            Answer::Text => engine.submit_text(&input),
        };
        match submitted {
            Ok(()) => debug!(
                "Progress: {}%, {} answers, running score {} ({})",
                engine.progress(),
                engine.choices().len(),
                engine.score(),
                engine.tier().label
            ),
            Err(EngineError::EmptyInput) => writeln!(console.out, "(Please say something.)")?,
            Err(e) => writeln!(console.out, "({e})")?,
        }
    }
}

fn show_results<W: Write>(out: &mut W, scenario: &Scenario, results: &Results) -> Result<()> {
    writeln!(out, "\n========================================")?;
    writeln!(out, "          SIMULATION COMPLETE")?;
    writeln!(out, "========================================")?;
    writeln!(out, "  You've completed the {} simulation", scenario.title)?;
    writeln!(out, "  Performance score: {}%", results.score)?;
    writeln!(
        out,
        "  Achievement: {} - {}",
        results.tier.label, results.tier.blurb
    )?;

    writeln!(out, "\n  Strengths:")?;
    if results.strengths.is_empty() {
        writeln!(out, "    No notable strengths identified")?;
    }
    for line in &results.strengths {
        writeln!(out, "    + {line}")?;
    }

    writeln!(out, "\n  Areas for improvement:")?;
    if results.improvements.is_empty() {
        writeln!(out, "    No major issues identified")?;
    }
    for line in &results.improvements {
        writeln!(out, "    - {line}")?;
    }

    if let Some(outcome) = &results.outcome {
        writeln!(out, "\n  Outcome:\n    {outcome}")?;
    }
    writeln!(out, "========================================\n")?;
    writeln!(out, "  [r] Restart    [q] Return to scenarios\n")?;
    Ok(())
}

/// Read the player's post-results choice. Returns `true` to restart.
fn prompt_restart<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<bool> {
    loop {
        let Some(input) = console.read_line("> ")? else {
            return Ok(false);
        };
        match input.to_lowercase().as_str() {
            "r" => return Ok(true),
            "q" => return Ok(false),
            _ => writeln!(console.out, "  Press [r] to restart or [q] to return.")?,
        }
    }
}

/// Ask for name and email. `None` when the player backs out or sign-in fails.
fn prompt_sign_in<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    store: &SessionStore,
) -> Result<Option<Session>> {
    writeln!(console.out, "\nPlease sign in to start a simulation.")?;
    let name = match console.read_line("Name (blank to cancel): ")? {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(None),
    };
    let Some(email) = console.read_line("Email: ")? else {
        return Ok(None);
    };
    match store.sign_in(&name, &email) {
        Ok(session) => {
            writeln!(console.out, "Welcome, {name}!")?;
            Ok(Some(session))
        }
        Err(e) => {
            writeln!(console.out, "Sign-in failed: {e:#}")?;
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry point: runs the chosen scenario until the player leaves
// ---------------------------------------------------------------------------

pub fn run<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    catalogue: &Catalogue,
    id: &str,
    settings: EngineSettings,
    session: &Session,
    store: &SessionStore,
    pacer: &dyn Pacer,
) -> Result<()> {
    if !session.is_authenticated() && prompt_sign_in(console, store)?.is_none() {
        writeln!(console.out, "You need to be signed in to run simulations.")?;
        return Ok(());
    }

    let mut engine = match Engine::load(catalogue, id, settings) {
        Ok(engine) => engine,
        Err(e) => {
            writeln!(console.out, "{e}")?;
            return list_scenarios(catalogue, &mut console.out);
        }
    };

    let scenario = engine.scenario();
    writeln!(console.out, "\n========================================")?;
    writeln!(console.out, "   {}", scenario.title.to_uppercase())?;
    writeln!(console.out, "========================================")?;
    writeln!(console.out, "Type 'quit' to leave or 'restart' to start over.")?;

    loop {
        match play_round(console, &mut engine, pacer)? {
            RoundOutcome::Quit => {
                info!("Player left '{}' mid-run", scenario.id);
                break;
            }
            RoundOutcome::Finished(results) => {
                show_results(&mut console.out, scenario, &results)?;
                if !prompt_restart(console)? {
                    break;
                }
                info!("Player chose to restart");
                engine.restart(false)?;
            }
        }
    }

    list_scenarios(catalogue, &mut console.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::Instant;

    fn signed_in() -> (tempfile::TempDir, SessionStore, Session) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let session = store.sign_in("Jane", "jane@example.com").unwrap();
        (dir, store, session)
    }

    fn play(id: &str, input: &str, settings: EngineSettings) -> String {
        let (_dir, store, session) = signed_in();
        play_as(id, input, settings, &session, &store)
    }

    fn play_as(
        id: &str,
        input: &str,
        settings: EngineSettings,
        session: &Session,
        store: &SessionStore,
    ) -> String {
        let catalogue = Catalogue::builtin().unwrap();
        let mut console = Console::new(input.as_bytes(), Vec::new());
        run(&mut console, &catalogue, id, settings, session, store, &Instant).unwrap();
        String::from_utf8(console.into_output()).unwrap()
    }

    #[test]
    fn test_perfect_cross_examination() {
        let input = "2\n1\n1\n1\n1\nNo further questions, Your Honor.\n\nq\n";
        let out = play("cross-examination", input, EngineSettings::default());

        assert!(out.contains("CROSS-EXAMINATION"));
        assert!(out.contains("Stage 4 of 4: Closing"));
        assert!(out.contains("Performance score: 100%"));
        assert!(out.contains("Achievement: Lead Counsel"));
        assert!(out.contains("No major issues identified"));
        assert!(out.contains("Available simulations"));
    }

    #[test]
    fn test_bad_answers_draw_objections() {
        let input = "3\n3\n1\n1\n\nq\n";
        let out = play("opening-statement", input, EngineSettings::default());
        assert!(out.contains("[Opposing Counsel]: Objection, Your Honor!"));
        assert!(out.contains("Performance score: 0%"));
        assert!(out.contains("[Areas for Improvement]:"));
    }

    #[test]
    fn test_invalid_answers_are_reported() {
        let catalogue = Catalogue::builtin().unwrap();
        let mut engine =
            Engine::load(&catalogue, "jury-selection", EngineSettings::default()).unwrap();
        let before = engine.cursor();

        let mut console = Console::new("\n9\n0\nquit\ny\n".as_bytes(), Vec::new());
        let outcome = play_round(&mut console, &mut engine, &Instant).unwrap();
        assert!(matches!(outcome, RoundOutcome::Quit));

        let out = String::from_utf8(console.into_output()).unwrap();
        assert!(out.contains("(Please say something.)"));
        assert_eq!(out.matches("(Pick a number from 1 to 3.)").count(), 2);
        assert!(engine.choices().is_empty());
        assert_eq!(engine.cursor(), before);
        assert_eq!(engine.phase(), Phase::AwaitingInput);
    }

    #[test]
    fn test_words_at_a_choice_count_as_custom_answer() {
        let catalogue = Catalogue::builtin().unwrap();
        let mut engine =
            Engine::load(&catalogue, "jury-selection", EngineSettings::default()).unwrap();

        let input = "I'd read the juror questionnaires first.\nquit\ny\n";
        let mut console = Console::new(input.as_bytes(), Vec::new());
        play_round(&mut console, &mut engine, &Instant).unwrap();

        assert_eq!(engine.choices().len(), 1);
        assert_eq!(engine.choices()[0].option_id, "custom-input");
        assert_eq!(engine.choices()[0].value, crate::scenario::Quality::Neutral);
    }

    #[test]
    fn test_quit_needs_confirmation() {
        let input = "quit\nn\n1\nquit\nyes\n";
        let out = play("jury-selection", input, EngineSettings::default());
        assert_eq!(out.matches(EXIT_QUESTION).count(), 2);
        assert!(out.contains("Juror #4"));
    }

    #[test]
    fn test_restart_after_results() {
        let input = "1\n1\n1\n1\n\nr\nquit\ny\n";
        let out = play("jury-selection", input, EngineSettings::default());
        assert_eq!(out.matches("Welcome to the Jury Selection simulation.").count(), 2);
        assert_eq!(out.matches("SIMULATION COMPLETE").count(), 1);
    }

    #[test]
    fn test_manual_advance_waits_for_enter() {
        let settings = EngineSettings {
            auto_advance: false,
            ..EngineSettings::default()
        };
        let input = "\n2\nquit\ny\n";
        let out = play("cross-examination", input, settings);
        assert!(out.contains("[Enter] Continue"));
        assert!(out.contains("Sarah Johnson"));
    }

    #[test]
    fn test_unknown_scenario_returns_to_picker() {
        let out = play("nonexistent-id", "", EngineSettings::default());
        assert!(out.contains("simulation 'nonexistent-id' not found"));
        assert!(out.contains("cross-examination"));
    }

    #[test]
    fn test_anonymous_user_must_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let out = play_as(
            "cross-examination",
            "\n",
            EngineSettings::default(),
            &Session::anonymous(),
            &store,
        );
        assert!(out.contains("Please sign in"));
        assert!(!out.contains("Welcome to the"));
    }

    #[test]
    fn test_anonymous_user_signs_in_then_plays() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let out = play_as(
            "cross-examination",
            "Jane\njane@example.com\nquit\ny\n",
            EngineSettings::default(),
            &Session::anonymous(),
            &store,
        );
        assert!(out.contains("Welcome, Jane!"));
        assert!(out.contains("Welcome to the Cross-Examination simulation."));
        assert!(store.load().is_authenticated());
    }

    #[test]
    fn test_show_scenario_lists_objectives() {
        let catalogue = Catalogue::builtin().unwrap();
        let mut out = Vec::new();
        show_scenario(catalogue.find("jury-selection").unwrap(), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Jury Selection (Hard)"));
        assert!(out.contains("  - Ask effective voir dire questions"));
        assert!(out.contains("3. Juror Challenges"));
    }
}
