// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::{print_profiles, Args, PresetArg};
pub use output::{format_json, format_result, format_summary, SurveyOutput};
