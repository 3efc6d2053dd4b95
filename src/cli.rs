use clap::{Parser, Subcommand};
use crate::errors::SubmitError;
use crate::models::Grade;

/// Exit status for a failed command
pub const EXIT_FAILURE: u8 = 1;
/// Exit status when the form was incomplete and nothing was sent
pub const EXIT_INCOMPLETE_FORM: u8 = 2;

#[derive(Parser)]
#[command(name = "ourclass")]
#[command(about = "Register your class: search a school, pick grade and class, submit")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend base URL (overrides OURCLASS_API_BASE_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Institutional suffix stripped from school names (overrides OURCLASS_SCHOOL_SUFFIX)
    #[arg(long, global = true)]
    pub suffix: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive class info form (default)
    Tui {
        /// School already chosen elsewhere; shown read-only
        #[arg(short, long)]
        school: Option<String>,
    },

    /// Search schools by name and print the suggestions
    Search {
        /// Partial school name
        keyword: String,
    },

    /// Register a class without the interactive form
    Register {
        /// School name, with or without the institutional suffix
        #[arg(short, long)]
        school: String,

        /// Grade (1-6)
        #[arg(short, long, default_value = "3")]
        grade: Grade,

        /// Class number
        #[arg(short, long = "class", default_value = "1")]
        class_number: String,
    },
}

/// Map a command's error to the process exit status
pub fn exit_status(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<SubmitError>() {
        Some(SubmitError::Validation(_)) => EXIT_INCOMPLETE_FORM,
        _ => EXIT_FAILURE,
    }
}
