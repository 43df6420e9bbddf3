use std::{
    path::PathBuf,
    process::exit,
};

use clap::{Args, Parser, Subcommand};
use log::info;
use declmerge::{
    MergeConfig, MergeError, RenamingStrategy, merge_directories, merge_files, merge_revisions,
    settings::DisplaySettings,
};

/// Semistructured merge driver for Java sources.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct CliArgs {
    /// Verbosity
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: CliCommand,
}

/// Flags shared by all merge subcommands.
#[derive(Debug, Args)]
struct MergeOptions {
    /// Policy applied when a renaming or deletion collides with an edit
    #[arg(long, value_enum, default_value_t = RenamingStrategy::Safe)]
    strategy: RenamingStrategy,
    /// Treat whitespace-only changes as no changes at all
    #[arg(long)]
    ignore_whitespace: bool,
    /// Match renamed declarations against the most similar candidate instead
    /// of the first sufficiently similar one
    #[arg(long)]
    prefer_most_similar: bool,
    /// Disable the recovery of method/constructor renamings and deletions
    #[arg(long)]
    no_renaming_handler: bool,
    /// Disable the collapsing of declarations added by both sides
    #[arg(long)]
    no_duplicate_handler: bool,
    /// Disable the re-matching of initializer blocks by similarity
    #[arg(long)]
    no_initializer_handler: bool,
    /// Disable flagging new declarations which reference edited ones
    #[arg(long)]
    no_reference_handler: bool,
    /// Disable the detection of ambiguous import pairs
    #[arg(long)]
    no_import_handler: bool,
    /// Length of conflict markers
    #[arg(short = 'l', long)]
    conflict_marker_size: Option<usize>,
    /// Name to use for the left revision in conflict markers
    #[arg(long)]
    left_name: Option<String>,
    /// Name to use for the base revision in conflict markers
    #[arg(long)]
    base_name: Option<String>,
    /// Name to use for the right revision in conflict markers
    #[arg(long)]
    right_name: Option<String>,
}

impl MergeOptions {
    fn config(&self) -> MergeConfig {
        MergeConfig {
            renaming_strategy: self.strategy,
            handle_duplicate_declarations: !self.no_duplicate_handler,
            handle_initialization_blocks: !self.no_initializer_handler,
            handle_new_element_referencing_edited_one: !self.no_reference_handler,
            handle_method_and_constructor_renaming_deletion: !self.no_renaming_handler,
            handle_type_ambiguity_error: !self.no_import_handler,
            ignore_whitespace_change: self.ignore_whitespace,
            prefer_most_similar: self.prefer_most_similar,
        }
    }

    fn settings(&self) -> DisplaySettings {
        let mut settings = DisplaySettings::default();
        if let Some(size) = self.conflict_marker_size {
            settings.conflict_marker_size = size;
        }
        if let Some(name) = &self.left_name {
            settings.left_revision_name = name.clone();
        }
        if let Some(name) = &self.base_name {
            settings.base_revision_name = name.clone();
        }
        if let Some(name) = &self.right_name {
            settings.right_revision_name = name.clone();
        }
        settings
    }
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Do a three-way merge of single files
    Merge {
        /// Path to the file containing the left revision
        left: PathBuf,
        /// Path to the file containing the base revision
        base: PathBuf,
        /// Path to the file containing the right revision
        right: PathBuf,
        /// The path to write the merge result to, instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        options: MergeOptions,
    },
    /// Merge three directory trees, pairing files by relative path
    MergeDirs {
        /// Directory containing the left revision
        left: PathBuf,
        /// Directory containing the base revision
        base: PathBuf,
        /// Directory containing the right revision
        right: PathBuf,
        /// Directory to write the merged files to
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        options: MergeOptions,
    },
    /// Merge the three directories listed in a revisions file
    /// (left, base and right paths on three lines)
    Revisions {
        /// Path to the revisions file
        revisions_file: PathBuf,
        /// Directory to write the merged files to
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        options: MergeOptions,
    },
}

fn main() {
    let args = CliArgs::parse();

    stderrlog::new()
        .module(module_path!())
        .verbosity(if args.verbose { 3 } else { 2 })
        .init()
        .unwrap();

    match real_main(args) {
        Ok(exit_code) => exit(exit_code),
        Err(error) => {
            eprintln!("declmerge: {error}");
            exit(-1)
        }
    }
}

fn real_main(args: CliArgs) -> Result<i32, MergeError> {
    let return_code = match args.command {
        CliCommand::Merge { left, base, right, output, options } => {
            let result = merge_files(
                Some(&left),
                Some(&base),
                Some(&right),
                output.as_deref(),
                &options.settings(),
                &options.config(),
            )?;
            if output.is_none() {
                print!("{}", result.contents);
            }
            i32::from(result.conflict_count > 0)
        }
        CliCommand::MergeDirs { left, base, right, output, options } => {
            let outcomes = merge_directories(
                &left,
                &base,
                &right,
                output.as_deref(),
                &options.settings(),
                &options.config(),
            )?;
            summarize(&outcomes)
        }
        CliCommand::Revisions { revisions_file, output, options } => {
            let outcomes = merge_revisions(
                &revisions_file,
                output.as_deref(),
                &options.settings(),
                &options.config(),
            )?;
            summarize(&outcomes)
        }
    };
    Ok(return_code)
}

fn summarize(outcomes: &[declmerge::FileOutcome]) -> i32 {
    let mut conflicted = 0;
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(result) if result.conflict_count > 0 => {
                info!(
                    "{}: {} conflict(s)",
                    outcome.relative_path.display(),
                    result.conflict_count
                );
                conflicted += 1;
            }
            Ok(_) => {}
            Err(_) => failed += 1,
        }
    }
    info!("merged {} file(s), {conflicted} with conflicts, {failed} failed", outcomes.len());
    i32::from(conflicted > 0 || failed > 0)
}
