use clap::{Parser, Subcommand, ValueEnum};
use rich_readme::{Document, DocumentSnapshot, ObjectFieldRegistry, StyleTag};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the text of a snapshot with all markup removed
    Poor { snapshot: PathBuf },
    /// Checks that every tag in a snapshot is closed in order
    Check { snapshot: PathBuf },
    /// Toggles a style over a range of the plain text
    Toggle {
        snapshot: PathBuf,
        #[arg(long, value_enum)]
        tag: TagArg,
        #[arg(long)]
        start: usize,
        #[arg(long)]
        len: usize,
        /// Save the result back into the snapshot file
        #[arg(long)]
        write: bool,
    },
    /// Lists object field placeholders and the objects they resolve to
    Fields {
        snapshot: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TagArg {
    Bold,
    Italic,
}

impl From<TagArg> for StyleTag {
    fn from(tag: TagArg) -> Self {
        match tag {
            TagArg::Bold => StyleTag::Bold,
            TagArg::Italic => StyleTag::Italic,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldRow {
    object_id: i32,
    index: usize,
    length: usize,
    name: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Poor { snapshot } => poor_command(&snapshot),
        Commands::Check { snapshot } => check_command(&snapshot),
        Commands::Toggle {
            snapshot,
            tag,
            start,
            len,
            write,
        } => toggle_command(&snapshot, tag.into(), start, len, write),
        Commands::Fields { snapshot, json } => fields_command(&snapshot, json),
    }
}

/// Reads a snapshot file. Unreadable or malformed files end the process with
/// status 2.
fn load(path: &Path) -> Document<String> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) => {
            eprintln!("Error: {}: {err}", path.display());
            std::process::exit(2);
        }
    };
    match DocumentSnapshot::from_json(&json) {
        Ok(snapshot) => Document::from_snapshot(snapshot),
        Err(err) => {
            eprintln!("Error: {}: {err}", path.display());
            std::process::exit(2);
        }
    }
}

fn poor_command(path: &Path) {
    let document = load(path);
    println!("{}", document.poor_text());
}

fn check_command(path: &Path) {
    let document = load(path);
    match document.imbalance() {
        None => println!("Tags are balanced."),
        Some(err) => {
            println!("Unbalanced: {err}");
            std::process::exit(1);
        }
    }
}

fn toggle_command(path: &Path, tag: StyleTag, start: usize, len: usize, write: bool) {
    let mut document = load(path);
    if let Err(err) = document.toggle_style(tag, start, len) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
    println!("{}", document.rich_text());

    if write {
        let json = match document.to_json() {
            Ok(json) => json,
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        };
        if let Err(err) = fs::write(path, json) {
            eprintln!("Error: {}: {err}", path.display());
            std::process::exit(1);
        }
    }
}

fn fields_command(path: &Path, json: bool) {
    let document = load(path);
    let mut registry = ObjectFieldRegistry::new();
    for collision in document.discover_object_fields(&mut registry) {
        tracing::warn!(%collision, "conflicting object field pair in snapshot");
    }

    let rows: Vec<FieldRow> = document
        .object_fields()
        .into_iter()
        .map(|field| FieldRow {
            object_id: field.id.0,
            index: field.index,
            length: field.length,
            name: document.resolve_object_field(field.id, &mut registry, &[&document]),
        })
        .collect();

    if json {
        match serde_json::to_string_pretty(&rows) {
            Ok(output) => println!("{output}"),
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        }
        return;
    }

    if rows.is_empty() {
        println!("No object fields.");
    }
    for row in rows {
        let name = row.name.as_deref().unwrap_or("<missing>");
        println!("{}\t{}\t{}\t{name}", row.object_id, row.index, row.length);
    }
}
