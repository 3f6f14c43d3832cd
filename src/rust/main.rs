use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dentascan::{
    is_image_path, ClassificationResult, HeatmapStore, HttpInferenceService, ImageFile,
    InferenceConfig, SessionController, SessionError, SessionState, SubmitOutcome,
};
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the inference service (overrides DENTASCAN_ENDPOINT)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Request timeout in seconds (overrides DENTASCAN_TIMEOUT_SECS)
    #[arg(short, long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one image and print the result
    Predict {
        /// Image to upload
        image: PathBuf,

        /// Write the heat map PNG to this path
        #[arg(long)]
        save_heatmap: Option<PathBuf>,
    },
    /// Interactive session: open, predict, close, show, quit
    Shell,
}

type Controller = SessionController<HttpInferenceService>;
type StdinLines = Lines<BufReader<Stdin>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = InferenceConfig::from_env()?;
    if let Some(endpoint) = &args.endpoint {
        config = InferenceConfig::new(endpoint)?.with_timeout(config.timeout);
    }
    if let Some(secs) = args.timeout {
        if secs == 0 {
            bail!("--timeout must be at least one second");
        }
        config.timeout = Duration::from_secs(secs);
    }

    let controller = SessionController::builder().with_config(config).build()?;

    match args.command {
        Command::Predict { image, save_heatmap } => {
            predict_once(&controller, &image, save_heatmap.as_deref()).await
        }
        Command::Shell => run_shell(&controller).await,
    }
}

/// The file-picker filter: only image types may be chosen.
fn open_image(path: &Path) -> Result<ImageFile> {
    if !is_image_path(path) {
        bail!("{} is not an image file", path.display());
    }
    ImageFile::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
}

async fn predict_once(controller: &Controller, path: &Path, save_heatmap: Option<&Path>) -> Result<()> {
    controller.select_image(open_image(path)?);
    print!("{}", controller.view());

    match controller.submit_for_classification().await {
        Ok(SubmitOutcome::Completed(result)) => {
            print!("{}", controller.view());
            report_heatmap(&result, save_heatmap);
            Ok(())
        }
        Ok(outcome) => bail!("Prediction did not complete: {:?}", outcome),
        Err(e) => {
            eprintln!("{}", e.notice());
            Err(e.into())
        }
    }
}

/// Saves the heat map, to `target` if given, else to the cache. Failures are reported, not fatal.
fn report_heatmap(result: &ClassificationResult, target: Option<&Path>) {
    let saved = match target {
        Some(target) => HeatmapStore::save_to(result, target),
        None => HeatmapStore::save_default(result),
    };
    match saved {
        Ok(Some(path)) => println!("  Heatmap saved to {}", path.display()),
        Ok(None) => {}
        Err(e) => eprintln!("  Could not save heatmap: {}", e),
    }
}

async fn run_shell(controller: &Controller) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Commands: open <path>, predict, close, show, quit");
    print!("{}", controller.view());

    while let Some(line) = lines.next_line().await? {
        let (command, arg) = split_command(&line);
        match command {
            "" => continue,
            "quit" | "exit" => break,
            "predict" => {
                if !submit_interactive(controller, &mut lines).await? {
                    break;
                }
            }
            _ => {
                if !apply_command(controller, command, arg) {
                    break;
                }
            }
        }
        print!("{}", controller.view());
    }

    controller.reset();
    Ok(())
}

/// Runs a submission while still reading commands.
///
/// `close` abandons the request, since its answer would be discarded anyway.
/// Returns false when the user asked to quit.
async fn submit_interactive(controller: &Controller, lines: &mut StdinLines) -> Result<bool> {
    let submit = controller.submit_for_classification();
    tokio::pin!(submit);

    let mut stdin_open = true;
    loop {
        tokio::select! {
            biased;
            outcome = &mut submit => {
                report_outcome(outcome);
                return Ok(true);
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                let (command, arg) = split_command(&line);
                match command {
                    "" => {}
                    "quit" | "exit" => {
                        controller.reset();
                        return Ok(false);
                    }
                    "predict" => println!("Still analyzing..."),
                    _ => {
                        apply_command(controller, command, arg);
                    }
                }
                if controller.state() != SessionState::Submitting {
                    info!("Abandoning superseded prediction request");
                    return Ok(true);
                }
            }
        }
    }
}

/// Handles the synchronous commands. Returns false when the shell should stop.
fn apply_command(controller: &Controller, command: &str, arg: &str) -> bool {
    match command {
        "open" => {
            if arg.is_empty() {
                println!("Usage: open <path>");
                return true;
            }
            match open_image(Path::new(arg)) {
                Ok(image) => controller.select_image(image),
                Err(e) => println!("{:#}", e),
            }
        }
        "close" | "reset" => controller.reset(),
        "show" => print!("{}", controller.view()),
        "quit" | "exit" => return false,
        other => println!("Unknown command: {}", other),
    }
    true
}

fn report_outcome(outcome: Result<SubmitOutcome, SessionError>) {
    match outcome {
        Ok(SubmitOutcome::Completed(result)) => report_heatmap(&result, None),
        Ok(SubmitOutcome::AlreadySubmitting) => println!("Already analyzing."),
        Ok(SubmitOutcome::Discarded) => info!("Response arrived after the session changed"),
        Err(e) => println!("{}", e.notice()),
    }
}

fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    }
}
