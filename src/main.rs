use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use dialoguer::Input;
use rota::core::{DEFAULT_FORM_PRIORITY, EntryRecord, RawRow, Schedule};
use rota::format::format_entry;
use rota::parser;
use rota::projectors::summary_projector;
use rota::projectors::upcoming_projector::{self, ProjectOptions};
use rota::storage::{FsScheduleStore, ScheduleStore};
use rota::table;

#[derive(Debug, Parser)]
#[command(
    name = "rota",
    about = "Personal schedule ledger over one semicolon-delimited file",
    version
)]
struct Cli {
    /// Schedule file to operate on.
    #[arg(
        short,
        long,
        global = true,
        default_value = "schedule.csv",
        value_name = "FILE"
    )]
    file: PathBuf,
    /// Enable verbose logging for debugging.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the near-term high-priority schedule.
    Show(ShowArgs),

    /// Add one entry through the form fields, inserted in sorted position.
    Add(AddArgs),

    /// Import free-text entry lines (legacy format) in one batch.
    Import(ImportArgs),

    /// Rewrite the file in chronological order.
    Sort,

    /// Parse the file and print every structured record.
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Include every date instead of only today and tomorrow.
    #[arg(long)]
    all: bool,
    /// Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Entry date as DD-MM-YY. Prompted when absent.
    #[arg(long)]
    date: Option<String>,
    /// Entry time as HH.MM AM/PM. Prompted when absent.
    #[arg(long)]
    time: Option<String>,
    /// Entry topic. Prompted when absent.
    #[arg(long)]
    topic: Option<String>,
}

#[derive(Debug, Args)]
struct ImportArgs {
    /// Entry lines in the file grammar; read from stdin when omitted.
    lines: Vec<String>,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Emit JSON instead of a debug representation.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let Cli {
        file,
        verbose,
        command,
    } = Cli::parse();
    match command {
        Commands::Show(args) => handle_show(&file, args, verbose),
        Commands::Add(args) => handle_add(&file, args, verbose),
        Commands::Import(args) => handle_import(&file, args, verbose),
        Commands::Sort => handle_sort(&file, verbose),
        Commands::Parse(args) => handle_parse(&file, args, verbose),
    }
}

fn handle_show(file: &Path, args: ShowArgs, verbose: bool) -> Result<()> {
    let ShowArgs { all, json } = args;
    let schedule = FsScheduleStore.load(file)?;
    if verbose {
        eprintln!("Loaded {} rows from {:?}", schedule.rows.len(), file);
    }
    let schedule = table::sort_by_datetime(schedule);
    let records = parser::parse_records(&schedule);
    if verbose {
        eprintln!("Parsed {} records", records.len());
    }

    let today = Local::now().date_naive();
    let items = upcoming_projector::project(&records, today, ProjectOptions { all_dates: all });
    if items.is_empty() {
        eprintln!("No schedule entries to show for the selected window.");
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    print_records_table(&items);
    let summary = summary_projector::summarize(&items);
    println!();
    println!(
        "{} entries, {} unique topics",
        summary.total, summary.unique_topics
    );
    Ok(())
}

fn handle_add(file: &Path, args: AddArgs, verbose: bool) -> Result<()> {
    let AddArgs { date, time, topic } = args;
    let date = match date {
        Some(date) => date,
        None => Input::new()
            .with_prompt("Date (DD-MM-YY)")
            .default(upcoming_projector::date_tag(Local::now().date_naive()))
            .interact_text()?,
    };
    let time = match time {
        Some(time) => time,
        None => Input::new()
            .with_prompt("Time (HH.MM AM/PM)")
            .default("12.00 PM".to_string())
            .interact_text()?,
    };
    let topic = match topic {
        Some(topic) => topic,
        None => Input::new()
            .with_prompt("Topic")
            .default("Assignment".to_string())
            .interact_text()?,
    };

    let entry = build_form_entry(&date, &time, &topic)?;
    let schedule = apply_insertions(file, &[entry], verbose)?;
    println!("Added entry: {date} {time} - {topic}");

    // Fresh view recomputed from the mutated table.
    let records = parser::parse_records(&schedule);
    let items = upcoming_projector::project(
        &records,
        Local::now().date_naive(),
        ProjectOptions::default(),
    );
    if !items.is_empty() {
        println!();
        print_records_table(&items);
    }
    Ok(())
}

fn handle_import(file: &Path, args: ImportArgs, verbose: bool) -> Result<()> {
    let ImportArgs { lines } = args;
    let lines: Vec<String> = if lines.is_empty() {
        let text = io::read_to_string(io::stdin()).context("reading entries from stdin")?;
        text.lines().map(str::to_string).collect()
    } else {
        lines
    };

    let entries: Vec<String> = lines
        .iter()
        .filter_map(|line| table::normalize_legacy_line(line))
        .collect();
    if entries.is_empty() {
        anyhow::bail!("no entries provided");
    }
    if verbose {
        for entry in &entries {
            eprintln!("Normalized entry: {entry}");
        }
    }

    apply_insertions(file, &entries, verbose)?;
    println!("Added {} new entries", entries.len());
    Ok(())
}

fn handle_sort(file: &Path, verbose: bool) -> Result<()> {
    let store = FsScheduleStore;
    let schedule = store.load(file)?;
    if verbose {
        eprintln!("Loaded {} rows from {:?}", schedule.rows.len(), file);
    }
    let schedule = table::sort_by_datetime(schedule);
    store.save(file, &schedule)?;
    println!(
        "Wrote {} entries in chronological order to {}",
        schedule.rows.len(),
        file.display()
    );
    Ok(())
}

fn handle_parse(file: &Path, args: ParseArgs, verbose: bool) -> Result<()> {
    let ParseArgs { json } = args;
    let schedule = FsScheduleStore.load(file)?;

    let mut records = Vec::new();
    for row in &schedule.rows {
        match parser::parse_record(&row.text) {
            Ok(record) => records.push(record),
            Err(err) => {
                if verbose {
                    eprintln!("Skipping row {:?}: {err}", row.text);
                }
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in &records {
            println!("{:#?}", record);
        }
    }
    Ok(())
}

/// Assemble a form entry, rejecting date/time input that does not even have
/// the timestamp shape. Calendar validity is left to the ordering logic, the
/// same as for entries already in the file.
fn build_form_entry(date: &str, time: &str, topic: &str) -> Result<String> {
    let spec = format!("{date} {time}");
    if parser::timestamp_key(spec.trim()).is_none() {
        anyhow::bail!("`{spec}` does not match `DD-MM-YY HH.MM AM/PM`");
    }
    Ok(format_entry(date, time, DEFAULT_FORM_PRIORITY, topic, "", ""))
}

/// One read-modify-write interaction: load the table, sort it, insert the
/// new entries one by one, and rewrite the whole file.
fn apply_insertions(file: &Path, entries: &[String], verbose: bool) -> Result<Schedule> {
    let store = FsScheduleStore;
    let mut schedule = store.load(file)?;
    if verbose {
        eprintln!("Loaded {} rows from {:?}", schedule.rows.len(), file);
    }
    schedule = table::sort_by_datetime(schedule);
    for entry in entries {
        schedule = table::insert_sorted(schedule, RawRow::new(entry.clone()));
    }
    store.save(file, &schedule)?;
    Ok(schedule)
}

fn print_records_table(records: &[EntryRecord]) {
    println!(
        "{:<9} {:<9} {:>4}  {:<8} {}",
        "DATE", "TIME", "MIN", "PRIORITY", "TOPIC"
    );
    for record in records {
        println!(
            "{:<9} {:<9} {:>4}  {:<8} {}",
            record.date, record.time, record.required_minutes, record.priority.0, record.topic
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn form_entry_is_validated_and_formatted() {
        let entry = build_form_entry("10-05-25", "09.00 AM", "Gym").expect("entry");
        assert_eq!(entry, "10-05-25 09.00 AM (ABCDE);Gym;;");

        assert!(build_form_entry("2025-05-10", "09.00 AM", "Gym").is_err());
        assert!(build_form_entry("10-05-25", "9 o'clock", "Gym").is_err());
    }

    #[test]
    fn insertions_persist_in_sorted_position() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("schedule.csv");
        fs::write(
            &path,
            "10-05-25 09.00 AM (A);T1;;\n10-05-25 05.00 PM (B);T2;;\n",
        )
        .expect("fixture");

        let entry = build_form_entry("10-05-25", "01.00 PM", "T3").expect("entry");
        apply_insertions(&path, &[entry], false).expect("apply");

        let bytes = fs::read_to_string(&path).expect("reread");
        assert_eq!(
            bytes,
            "10-05-25 09.00 AM (A);T1;;\n\
             10-05-25 01.00 PM (ABCDE);T3;;\n\
             10-05-25 05.00 PM (B);T2;;\n"
        );
    }

    #[test]
    fn legacy_lines_normalize_then_insert() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("schedule.csv");
        fs::write(
            &path,
            "16-08-25 06.30 PM (B);GTMBJ24-4;Sumit Sarkar;LC2/L.H. 17\n",
        )
        .expect("fixture");

        let entries: Vec<String> = ["15-08-25 02.45 PM (ABCD)\tMSTBJ24-4\tProf\tHall", "   "]
            .iter()
            .filter_map(|line| table::normalize_legacy_line(line))
            .collect();
        assert_eq!(entries.len(), 1);
        apply_insertions(&path, &entries, false).expect("apply");

        let bytes = fs::read_to_string(&path).expect("reread");
        assert_eq!(
            bytes,
            "15-08-25 02.45 PM (ABCD);MSTBJ24-4;Prof;Hall\n\
             16-08-25 06.30 PM (B);GTMBJ24-4;Sumit Sarkar;LC2/L.H. 17\n"
        );
    }

    #[test]
    fn unparseable_form_input_never_reaches_the_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("schedule.csv");
        fs::write(&path, "10-05-25 09.00 AM (A);T1;;\n").expect("fixture");

        assert!(build_form_entry("soon", "ish", "Gym").is_err());

        let bytes = fs::read_to_string(&path).expect("reread");
        assert_eq!(bytes, "10-05-25 09.00 AM (A);T1;;\n");
    }
}
