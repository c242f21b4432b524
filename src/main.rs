use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{info, warn};

use studyplan::db;
use studyplan::error::SessionError;
use studyplan::llm::{LlmClient, McqBackend};
use studyplan::models::{Exam, Session};
use studyplan::quiz::{self, McqSource};
use studyplan::reader;
use studyplan::session::{self, SessionInput};

#[derive(Parser)]
#[command(name = "studyplan", about = "Turn study notes into a timed session with quizzes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a session from note files
    Start {
        /// Session name (unique, case-insensitive)
        #[arg(long)]
        name: String,
        /// Total minutes (default from settings)
        #[arg(short, long)]
        minutes: Option<u32>,
        /// Note files (.md, .markdown, .txt, .pdf, .pptx)
        #[arg(long, required = true, num_args = 1..)]
        notes: Vec<PathBuf>,
        /// Syllabus file, one topic per line
        #[arg(long)]
        syllabus: Option<PathBuf>,
        /// Question bank file
        #[arg(long)]
        bank: Option<PathBuf>,
    },
    /// List recent sessions
    Sessions {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Show a session's blocks and fragments
    Show { sid: String },
    /// Toggle a block's covered flag
    Toggle { sid: String, bid: String },
    /// Pin or unpin a fragment text
    Pin { sid: String, text: String },
    /// Generate MCQs for a block
    Mcq {
        sid: String,
        bid: String,
        /// Number of questions (default from settings)
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Log the generated questions as asked
        #[arg(long)]
        record: bool,
    },
    /// Change the session length, rescaling every block
    Duration { sid: String, minutes: u32 },
    /// Reorder blocks by syllabus and nearest exam, reallocating minutes
    Reprioritize { sid: String },
    /// Print the session as Markdown
    Export { sid: String },
    /// Delete a session
    Delete { sid: String },
    /// Manage exams
    Exam {
        #[command(subcommand)]
        command: ExamCommands,
    },
}

#[derive(Subcommand)]
enum ExamCommands {
    /// Add an exam
    Add {
        #[arg(long)]
        title: String,
        /// ISO date, e.g. 2026-11-03
        #[arg(long)]
        date: String,
        /// Focus topics, comma separated
        #[arg(long, value_delimiter = ',')]
        topics: Vec<String>,
    },
    /// List exams
    List,
    /// Remove an exam
    Remove { id: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = studyplan::config::load()?;

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Start {
            name,
            minutes,
            notes,
            syllabus,
            bank,
        } => {
            let name = session::clean_name(&name)?;
            if db::session_name_taken(&conn, &name)? {
                return Err(SessionError::DuplicateName(name).into());
            }

            let docs = reader::read_docs(&notes);
            if docs.is_empty() {
                return Err(SessionError::NoUsableContent.into());
            }
            let syllabus = match syllabus {
                Some(p) => reader::parse_syllabus(&read_text(&p)?),
                None => Vec::new(),
            };
            let bank = match bank {
                Some(p) => quiz::parse_bank(&read_text(&p)?),
                None => Default::default(),
            };

            println!("Chunking {} documents...", docs.len());
            let pb = progress_bar(docs.len() as u64)?;
            let input = SessionInput {
                name,
                minutes: minutes.unwrap_or(settings.plan.default_minutes),
                docs,
                syllabus,
                bank,
            };
            let sess = session::build_session(input, &settings, &pb)?;
            pb.finish_and_clear();

            db::save_session(&conn, &sess)?;
            print_session(&sess);
            println!("\nSaved session {}", sess.id);
        }
        Commands::Sessions { limit } => {
            let rows = db::list_sessions(&conn, limit)?;
            if rows.is_empty() {
                println!("No sessions yet. Run 'start' first.");
                return Ok(());
            }
            println!("{:<12} | {:<16} | {}", "ID", "Created", "Name");
            println!("{}", "-".repeat(60));
            for r in rows {
                println!("{:<12} | {:<16} | {}", r.id, r.created_at, truncate(&r.name, 40));
            }
        }
        Commands::Show { sid } => {
            let sess = load(&conn, &sid)?;
            print_session(&sess);
        }
        Commands::Toggle { sid, bid } => {
            let mut sess = load(&conn, &sid)?;
            let covered = sess.toggle_covered(&bid)?;
            db::save_session(&conn, &sess)?;
            println!("{bid}: {}", if covered { "covered" } else { "not covered" });
        }
        Commands::Pin { sid, text } => {
            let mut sess = load(&conn, &sid)?;
            let pinned = sess.toggle_pin(&text);
            db::save_session(&conn, &sess)?;
            println!("{} ({} pinned)", if pinned { "Pinned" } else { "Unpinned" }, sess.pins.len());
        }
        Commands::Mcq {
            sid,
            bid,
            count,
            record,
        } => {
            let mut sess = load(&conn, &sid)?;
            let block = sess.block(&bid)?;
            let fragments: Vec<String> = block.fragments.iter().map(|f| f.text.clone()).collect();
            let client = LlmClient::from_env(&settings.llm);
            let backend = client.as_ref().map(|c| c as &dyn McqBackend);

            let report = quiz::generate(
                &block.title,
                &fragments,
                &sess.bank,
                backend,
                count.unwrap_or(settings.quiz.count),
                &mut rand::thread_rng(),
            );
            for (source, reason) in &report.skipped {
                info!(?source, ?reason, "tier skipped");
            }
            if report.count(McqSource::Placeholder) > 0 {
                warn!(block = %bid, "not enough material, padded with placeholder questions");
            }
            println!("{}", serde_json::to_string_pretty(&report.items)?);

            if record {
                let mut added = 0;
                for mcq in report.into_mcqs() {
                    if sess.record_asked(&bid, mcq)? {
                        added += 1;
                    }
                }
                db::save_session(&conn, &sess)?;
                eprintln!("Recorded {added} new questions.");
            }
        }
        Commands::Duration { sid, minutes } => {
            let mut sess = load(&conn, &sid)?;
            sess.update_duration(minutes, &settings.plan.allocator());
            db::save_session(&conn, &sess)?;
            print_session(&sess);
        }
        Commands::Reprioritize { sid } => {
            let mut sess = load(&conn, &sid)?;
            let exams = db::list_exams(&conn)?;
            sess.reprioritize(&exams, Local::now().date_naive(), &settings.plan.allocator());
            db::save_session(&conn, &sess)?;
            print_session(&sess);
        }
        Commands::Export { sid } => {
            let sess = load(&conn, &sid)?;
            println!("{}", sess.export_markdown());
        }
        Commands::Delete { sid } => {
            if db::delete_session(&conn, &sid)? {
                println!("Deleted {sid}");
            } else {
                println!("No session {sid}");
            }
        }
        Commands::Exam { command } => exam_command(&conn, command)?,
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn exam_command(conn: &Connection, command: ExamCommands) -> Result<()> {
    match command {
        ExamCommands::Add { title, date, topics } => {
            let exam = Exam {
                id: db::new_id(),
                title: title.trim().to_string(),
                date: date.trim().to_string(),
                topics: topics
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
            };
            if exam.parsed_date().is_none() {
                warn!(date = %exam.date, "not a YYYY-MM-DD date; exam will not drive focus");
            }
            db::insert_exam(conn, &exam)?;
            println!("Added exam {}", exam.id);
        }
        ExamCommands::List => {
            let exams = db::list_exams(conn)?;
            if exams.is_empty() {
                println!("No exams.");
                return Ok(());
            }
            for e in exams {
                println!("{:<12} | {:<10} | {:<24} | {}", e.id, e.date, truncate(&e.title, 24), e.topics.join(", "));
            }
        }
        ExamCommands::Remove { id } => {
            if db::delete_exam(conn, &id)? {
                println!("Removed {id}");
            } else {
                println!("No exam {id}");
            }
        }
    }
    Ok(())
}

fn load(conn: &Connection, sid: &str) -> Result<Session> {
    db::load_session(conn, sid)?.ok_or_else(|| SessionError::NotFound(sid.to_string()).into())
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn print_session(sess: &Session) {
    println!("{} ({}) - {} min, created {}", sess.name, sess.id, sess.total_minutes(), sess.created_at);
    println!("{:>3} | {:<4} | {:<32} | {:>4} | {}", "#", "ID", "Topic", "Min", "Done");
    println!("{}", "-".repeat(60));
    for (i, b) in sess.blocks.iter().enumerate() {
        println!(
            "{:>3} | {:<4} | {:<32} | {:>4} | {}",
            i + 1,
            b.id,
            truncate(&b.title, 32),
            b.minutes,
            if b.covered { "x" } else { "" }
        );
        for f in &b.fragments {
            println!("      - {}", truncate(&f.text, 90));
        }
    }
    if !sess.pins.is_empty() {
        println!("\nPinned:");
        for p in &sess.pins {
            println!("  > {}", p.text);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
