//! The attrplan-runner executable
//!
//! Runs the plan modifiers of a resource schema outside of any provider
//! process, which is useful for trying out schemas and for testing.
mod logging;

use std::{path::PathBuf, process::exit};

use anyhow::{bail, Result};
use attrplan_runner::{read_request, run};
use clap::{ColorChoice, CommandFactory as _, Parser, Subcommand};
use tracing::{debug, info};

fn main() {
    let args = Args::parse();
    handle_result(run_args(args));
}

fn run_args(args: Args) -> Result<()> {
    match &args.command {
        Commands::Plan { request } => {
            logging::set_up(&logging::Options {
                verbose: args.options.verbose,
                color: args.options.color,
            })?;
            plan(request.as_deref())
        }
        Commands::GenerateMan => {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(())
        }
        Commands::GenerateMarkdown => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(())
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(
                *shell,
                &mut cmd,
                "attrplan-runner",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

fn plan(request: Option<&std::path::Path>) -> Result<()> {
    match request {
        Some(path) => debug!(path = %path.display(), "reading request"),
        None => debug!("reading request from stdin"),
    }
    let request = read_request(request)?;
    let response = run(&request)?;

    println!("{}", serde_json::to_string_pretty(&response)?);

    info!(
        requires_replace = response.requires_replace.len(),
        diagnostics = response.diagnostics.len(),
        "plan modification finished"
    );
    if response.has_errors() {
        bail!("plan modification reported errors");
    }
    Ok(())
}

fn handle_result(r: Result<()>) {
    match r {
        Ok(()) => {}
        Err(e) => {
            eprintln!("attrplan-runner error: {:#}", e);
            exit(1);
        }
    }
}

/// Run attribute plan modifiers over a resource
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: Options,
}

#[derive(Parser, Debug, Clone)]
struct Options {
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute the planned state of a resource, and print the response as JSON
    ///
    /// The request is a JSON object with the `schema`, `config`,
    /// `proposed_new_state` and optionally `prior_state` and `prior_private`
    /// of the resource. Unknown values are written as `{"$unknown": true}`.
    Plan {
        /// The request file; read from stdin when omitted
        request: Option<PathBuf>,
    },

    /// Generate markdown documentation for attrplan-runner
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage for attrplan-runner
    #[command(hide = true)]
    GenerateMan,

    /// Generate shell completion for attrplan-runner
    #[command(hide = true)]
    GenerateCompletion {
        /// The shell to generate completion for
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}
