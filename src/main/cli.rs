use clap::{Args, Parser as ClapParser, Subcommand};

#[derive(ClapParser)]
#[command(name = "valtype", about = "Runtime value typing: cast, convert and stamp values")]
pub(super) struct Cli {
    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(Subcommand)]
pub(super) enum Commands {
    /// Print the runtime error catalogue
    Errors {
        /// Only show kinds of this category (e.g. TypeCastError)
        #[arg(long)]
        category: Option<String>,
    },
    /// Parse a type annotation and describe it
    Type { annotation: String },
    /// Cast a JSON value to a type (shape check, no conversion of containers)
    Cast(EngineArgs),
    /// Convert a JSON value to a type
    Convert(EngineArgs),
    /// Deep-copy a JSON value retyped as the given type
    Stamp(EngineArgs),
}

#[derive(Args)]
pub(super) struct EngineArgs {
    /// Target type annotation, e.g. 'record {| int id; string name?; |}'
    pub(super) annotation: String,
    /// Input value as JSON text
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    pub(super) json: Option<String>,
    /// Read the input JSON from this file
    #[arg(long)]
    pub(super) input: Option<String>,
    /// Freeze the input before running the engine
    #[arg(long)]
    pub(super) readonly: bool,
}
