//! CLI tool for spreadsheet-driven mail merge into PowerPoint templates.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mailmerge_core::{
    consolidate, convert_batch, convert_one, discover_artifacts, merge_slide_per_row,
    run_split_pipeline, ArtifactFilter, ErrorClass, MergeOptions, PipelineStep, Table,
    CONSOLIDATED_NAME,
};
use mailmerge_pdf::{LopdfMerger, SofficeConverter};
use mailmerge_pptx::PptxDocument;
use serde::Serialize;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const EXIT_FAILURE: u8 = 1;
const EXIT_SOURCE_READ: u8 = 2;
const EXIT_CONVERSION: u8 = 3;
const EXIT_CONSOLIDATION: u8 = 4;
const EXIT_ROWS_FAILED: u8 = 5;

/// Subcommand names; anything else in first position is taken as the
/// spreadsheet of a `merge`.
const COMMANDS: &[&str] = &["merge", "split", "pdf", "convert-all", "consolidate", "help"];

/// Global options that take a separate value.
const VALUE_OPTIONS: &[&str] = &["-o", "--output-dir", "--soffice", "--report"];

/// Fill PowerPoint templates from spreadsheet rows.
#[derive(Parser, Debug)]
#[command(name = "pptx-mailmerge")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output directory (default: current directory)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// LibreOffice executable used for PDF conversion
    #[arg(long, global = true)]
    soffice: Option<PathBuf>,

    /// Write a JSON report of the run to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill slide N with data row N into merged_<template> (legacy: no flag)
    Merge {
        /// Spreadsheet (.xlsx); row 1 holds the placeholder tokens
        tabular: PathBuf,
        /// Template presentation (.pptx)
        template: PathBuf,
    },

    /// One filled copy of the template per row, then PDF and merged.pdf (legacy: /s)
    Split {
        /// Spreadsheet (.xlsx); row 1 holds the placeholder tokens
        tabular: PathBuf,
        /// Template presentation (.pptx)
        template: PathBuf,
        /// Stop after generating the documents
        #[arg(long)]
        no_pdf: bool,
    },

    /// Convert one .pptx to PDF next to it (legacy: /p)
    Pdf {
        /// Presentation to convert
        file: PathBuf,
    },

    /// Convert every *_slide.pptx in the output directory to PDF (legacy: /a)
    ConvertAll,

    /// Merge every PDF in the output directory into merged.pdf (legacy: /m)
    Consolidate,
}

fn main() -> ExitCode {
    let args = Args::parse_from(normalize_args(std::env::args_os()));

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Run the selected command; the returned code is the process exit status.
fn run(args: &Args) -> Result<u8> {
    let output_dir = args.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let mut converter = SofficeConverter::new();
    if let Some(program) = &args.soffice {
        converter = converter.with_program(program);
    }

    match &args.command {
        Command::Merge { tabular, template } => {
            let table = read_table(tabular)?;
            let document = open_template(template)?;
            let options = MergeOptions::new().with_output_dir(&output_dir);

            let report = merge_slide_per_row(document, template, &table, &options)
                .with_context(|| format!("Failed to merge into {}", template.display()))?;
            write_report(args.report.as_deref(), &report)?;

            log::info!(
                "{} row(s) merged, {} skipped, {} failed",
                report.applied.len(),
                report.skipped.len(),
                report.failed.len()
            );
            Ok(rows_exit_code(report.failed.len()))
        }

        Command::Split {
            tabular,
            template,
            no_pdf,
        } => {
            let table = read_table(tabular)?;
            let document = open_template(template)?;
            let options = MergeOptions::new()
                .with_output_dir(&output_dir)
                .with_conversion(!no_pdf);

            let report = run_split_pipeline(
                &document,
                template,
                &table,
                &options,
                &converter,
                &LopdfMerger::new(),
            )
            .with_context(|| format!("Failed to split {}", template.display()))?;
            write_report(args.report.as_deref(), &report)?;

            log::info!(
                "{} document(s) generated, {} row(s) failed",
                report.merge.artifacts.len(),
                report.merge.failed.len()
            );
            if let Some(failure) = &report.failure {
                eprintln!("Error: {}", failure.reason);
                return Ok(step_exit_code(failure.step));
            }
            Ok(rows_exit_code(report.merge.failed.len()))
        }

        Command::Pdf { file } => {
            let target = convert_one(&converter, file)
                .with_context(|| format!("Failed to convert {}", file.display()))?;
            println!("{}", target.display());
            Ok(0)
        }

        Command::ConvertAll => {
            let sources = discover_artifacts(&output_dir, ArtifactFilter::SplitDocuments)
                .with_context(|| format!("Failed to list {}", output_dir.display()))?;
            let report = convert_batch(&converter, &sources)?;
            write_report(args.report.as_deref(), &report)?;

            if report.converted.is_empty() && !report.failed.is_empty() {
                eprintln!("Error: none of {} document(s) converted", report.failed.len());
                return Ok(EXIT_CONVERSION);
            }
            Ok(0)
        }

        Command::Consolidate => {
            let inputs = discover_artifacts(&output_dir, ArtifactFilter::PageDocuments)
                .with_context(|| format!("Failed to list {}", output_dir.display()))?;
            let output = output_dir.join(CONSOLIDATED_NAME);
            let consolidated = consolidate(&LopdfMerger::new(), &inputs, &output)?;
            write_report(args.report.as_deref(), &consolidated)?;
            Ok(0)
        }
    }
}

fn read_table(path: &Path) -> Result<Table> {
    mailmerge_xlsx::read_table(path)
        .with_context(|| format!("Failed to read rows from {}", path.display()))
}

fn open_template(path: &Path) -> Result<PptxDocument> {
    PptxDocument::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Write `report` as pretty JSON if a report file was requested.
fn write_report<T: Serialize>(path: Option<&Path>, report: &T) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    log::debug!("Wrote report to {}", path.display());
    Ok(())
}

fn rows_exit_code(failed: usize) -> u8 {
    if failed > 0 {
        EXIT_ROWS_FAILED
    } else {
        0
    }
}

/// Exit status for an error, from the first merge error in its chain.
/// Exit code for a split pipeline stopped after generation.
fn step_exit_code(step: PipelineStep) -> u8 {
    match step {
        PipelineStep::Conversion => EXIT_CONVERSION,
        PipelineStep::Consolidation => EXIT_CONSOLIDATION,
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    let class = err
        .chain()
        .find_map(|e| e.downcast_ref::<mailmerge_core::Error>())
        .map(mailmerge_core::Error::class);

    match class {
        Some(ErrorClass::SourceRead) => EXIT_SOURCE_READ,
        Some(ErrorClass::Conversion) => EXIT_CONVERSION,
        Some(ErrorClass::Consolidation) => EXIT_CONSOLIDATION,
        Some(ErrorClass::Row) => EXIT_ROWS_FAILED,
        Some(ErrorClass::Skipped) | Some(ErrorClass::Other) | None => EXIT_FAILURE,
    }
}

/// Accept the legacy command line: `/p <file>`, `/a`, `/m`,
/// `/s <tabular> <template>` and a bare `<tabular> <template>` for `merge`.
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();

    // Find the first positional argument, skipping global options.
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].to_string_lossy().into_owned();
        if VALUE_OPTIONS.contains(&arg.as_str()) {
            i += 2;
        } else if arg.starts_with('-') {
            i += 1;
        } else {
            break;
        }
    }
    if i >= args.len() {
        return args;
    }

    let first = args[i].to_string_lossy().into_owned();
    match legacy_command(&first) {
        Some(command) => args[i] = command.into(),
        None if !COMMANDS.contains(&first.as_str()) => args.insert(i, "merge".into()),
        None => {}
    }
    args
}

fn legacy_command(flag: &str) -> Option<&'static str> {
    match flag.to_ascii_lowercase().as_str() {
        "/p" => Some("pdf"),
        "/a" => Some("convert-all"),
        "/m" => Some("consolidate"),
        "/s" => Some("split"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Args {
        let argv = std::iter::once("pptx-mailmerge")
            .chain(args.iter().copied())
            .map(OsString::from);
        Args::try_parse_from(normalize_args(argv)).unwrap()
    }

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_bare_arguments_mean_merge() {
        let args = parse(&["data.xlsx", "deck.pptx"]);
        match args.command {
            Command::Merge { tabular, template } => {
                assert_eq!(tabular, PathBuf::from("data.xlsx"));
                assert_eq!(template, PathBuf::from("deck.pptx"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_options_before_bare_arguments() {
        let args = parse(&["-v", "-o", "out", "data.xlsx", "deck.pptx"]);
        assert!(args.verbose);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert!(matches!(args.command, Command::Merge { .. }));
    }

    #[test]
    fn test_legacy_flags() {
        assert!(matches!(parse(&["/p", "deck.pptx"]).command, Command::Pdf { .. }));
        assert!(matches!(parse(&["/a"]).command, Command::ConvertAll));
        assert!(matches!(parse(&["/M"]).command, Command::Consolidate));
        match parse(&["/s", "data.xlsx", "deck.pptx"]).command {
            Command::Split { no_pdf, .. } => assert!(!no_pdf),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_named_subcommands_untouched() {
        let args = parse(&["split", "data.xlsx", "deck.pptx", "--no-pdf", "--report", "r.json"]);
        match args.command {
            Command::Split { no_pdf, .. } => assert!(no_pdf),
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(args.report, Some(PathBuf::from("r.json")));
    }

    #[test]
    fn test_help_is_not_rewritten() {
        let argv = ["pptx-mailmerge", "--help"].map(OsString::from);
        assert_eq!(normalize_args(argv.clone()), argv.to_vec());
    }

    #[test]
    fn test_exit_codes_follow_error_class() {
        let source = anyhow::Error::new(mailmerge_core::Error::source_read("d.xlsx", "bad"))
            .context("Failed to read rows");
        assert_eq!(exit_code(&source), EXIT_SOURCE_READ);

        let conversion =
            anyhow::Error::new(mailmerge_core::Error::ConverterUnavailable("soffice".into()));
        assert_eq!(exit_code(&conversion), EXIT_CONVERSION);

        let consolidation = anyhow::Error::new(mailmerge_core::Error::NothingToConsolidate);
        assert_eq!(exit_code(&consolidation), EXIT_CONSOLIDATION);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), EXIT_FAILURE);
        assert_eq!(rows_exit_code(2), EXIT_ROWS_FAILED);
        assert_eq!(rows_exit_code(0), 0);
    }

    #[test]
    fn test_step_exit_codes() {
        assert_eq!(step_exit_code(PipelineStep::Conversion), EXIT_CONVERSION);
        assert_eq!(step_exit_code(PipelineStep::Consolidation), EXIT_CONSOLIDATION);
    }
}
