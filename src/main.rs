mod config;
mod engine;
mod pacing;
mod play;
mod scenario;
mod session;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use config::Config;
use play::Console;
use scenario::Catalogue;
use session::SessionStore;

#[derive(Parser)]
#[command(name = "courtsim")]
#[command(about = "Practice courtroom skills against scripted scenarios")]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, env = "COURTSIM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available simulations
    List,
    /// Show the background and objectives of a simulation
    Show { id: String },
    /// Run a simulation
    Play { id: String },
    /// Store a local sign-in record
    SignIn {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Remove the local sign-in record
    SignOut,
}

fn main() -> Result<()> {
    // Control verbosity with RUST_LOG (logs go to stderr):
    //   RUST_LOG=info   courtsim play cross-examination   # loads, choices, results
    //   RUST_LOG=debug  courtsim play cross-examination   # + cursor moves and transcript lines
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let catalogue = match &config.catalogue_path {
        Some(path) => Catalogue::load(path)?,
        None => Catalogue::builtin()?,
    };
    let store = SessionStore::new(&config.session_path);
    let mut stdout = io::stdout();

    match cli.command {
        Command::List => play::list_scenarios(&catalogue, &mut stdout)?,
        Command::Show { id } => match catalogue.find(&id) {
            Some(scenario) => play::show_scenario(scenario, &mut stdout)?,
            None => {
                println!("Simulation not found: {id}");
                play::list_scenarios(&catalogue, &mut stdout)?;
            }
        },
        Command::Play { id } => {
            let session = store.load();
            let pacer = config.pacer();
            let mut console = Console::new(io::stdin().lock(), stdout);
            play::run(
                &mut console,
                &catalogue,
                &id,
                config.engine_settings(),
                &session,
                &store,
                pacer.as_ref(),
            )?;
        }
        Command::SignIn { name, email } => {
            let session = store
                .sign_in(&name, &email)
                .context("could not sign in")?;
            if let Some(user) = session.user() {
                println!("Signed in as {} <{}>", user.name, user.email);
            }
            info!("Session stored at {}", store.path().display());
        }
        Command::SignOut => {
            store.sign_out()?;
            println!("Signed out.");
        }
    }

    info!("Done");
    Ok(())
}
