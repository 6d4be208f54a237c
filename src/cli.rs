use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::config::{env_vars, Overrides};
use crate::domain::note::NotePatch;
use crate::domain::tags::parse_tag_list;
use crate::listing::{NoteListFilter, NoteSort};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

/// The full command tree, used by completion generation.
pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "notely")]
#[command(bin_name = "notely")]
#[command(version)]
#[command(about = "Personal notes with tags, pins, archiving and [[wiki links]]")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        global = true,
        env = env_vars::DB_PATH,
        help = "Path to the SQLite notes database."
    )]
    pub db: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = env_vars::CONFIG,
        help = "Path to a TOML config file."
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        let bind = match &self.command {
            Commands::Serve(args) => args.bind.clone(),
            _ => None,
        };
        Overrides {
            db_path: self.db.clone(),
            config_path: self.config.clone(),
            bind,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Create a note.")]
    Add(AddArgs),
    #[command(about = "List notes with filters.")]
    List(ListArgs),
    #[command(about = "Show one note with its links and backlinks.")]
    Show(ShowArgs),
    #[command(about = "Edit fields of a note.")]
    Edit(EditArgs),
    #[command(about = "Archive a note, or remove it with --hard.")]
    Delete(DeleteArgs),
    #[command(about = "Pin a note.")]
    Pin(TargetArgs),
    #[command(about = "Unpin a note.")]
    Unpin(TargetArgs),
    #[command(about = "Archive a note.")]
    Archive(TargetArgs),
    #[command(about = "Unarchive a note.")]
    Unarchive(TargetArgs),
    #[command(about = "Restore an archived note.")]
    Restore(TargetArgs),
    #[command(about = "Permanently delete a note.")]
    Purge(TargetArgs),
    #[command(about = "List the [[links]] a note makes.")]
    Links(TargetArgs),
    #[command(about = "List notes that link to a note.")]
    Backlinks(BacklinksArgs),
    #[command(about = "Write every note to a JSON file.")]
    Export(ExportArgs),
    #[command(about = "Create notes from a JSON export.")]
    Import(ImportArgs),
    #[command(about = "Serve the HTTP API and browser page.")]
    Serve(ServeArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(short = 't', long, help = "Note title.")]
    pub title: String,

    #[arg(short = 'c', long, default_value = "", help = "Note content.")]
    pub content: String,

    #[arg(short = 'g', long, default_value = "", help = "Comma-separated tags.")]
    pub tags: String,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, help = "Only notes whose tags contain this text.")]
    pub tag: Option<String>,

    #[arg(short = 's', long, help = "Case-insensitive text to find in title or content.")]
    pub search: Option<String>,

    #[arg(short = 'a', long, help = "Include archived notes.")]
    pub archived: bool,

    #[arg(long, default_value_t = NoteSort::Updated, help = "Sort by updated, created or title.")]
    pub sort: NoteSort,

    #[arg(long, help = "Print JSON instead of a table.")]
    pub json: bool,
}

impl ListArgs {
    pub fn filter(&self) -> NoteListFilter {
        NoteListFilter {
            tag: self.tag.clone(),
            search: self.search.clone(),
            include_archived: self.archived,
            sort: self.sort,
        }
    }
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(help = "Note id or exact title.")]
    pub identifier: String,

    #[arg(long = "by-title", help = "Treat the identifier as a title even if numeric.")]
    pub by_title: bool,

    #[arg(long, help = "Print JSON instead of formatted text.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    #[arg(help = "Note id or exact title.")]
    pub identifier: String,

    #[arg(short = 't', long, help = "Set title.")]
    pub title: Option<String>,

    #[arg(short = 'c', long, help = "Set content.")]
    pub content: Option<String>,

    #[arg(short = 'g', long, help = "Replace tags (comma-separated).")]
    pub tags: Option<String>,

    #[arg(long, conflicts_with = "no_pin", help = "Pin the note.")]
    pub pin: bool,

    #[arg(long = "no-pin", help = "Unpin the note.")]
    pub no_pin: bool,

    #[arg(long, conflicts_with = "unarchive", help = "Archive the note.")]
    pub archive: bool,

    #[arg(long, help = "Unarchive the note.")]
    pub unarchive: bool,
}

impl EditArgs {
    pub fn patch(&self) -> NotePatch {
        NotePatch {
            title: self.title.clone(),
            content: self.content.clone(),
            tags: self.tags.as_deref().map(parse_tag_list),
            pinned: flag_pair(self.pin, self.no_pin),
            archived: flag_pair(self.archive, self.unarchive),
        }
    }
}

fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[arg(help = "Note id or exact title.")]
    pub identifier: String,

    #[arg(long, help = "Remove the note instead of archiving it.")]
    pub hard: bool,
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    #[arg(help = "Note id or exact title.")]
    pub identifier: String,
}

#[derive(Debug, Args)]
pub struct BacklinksArgs {
    #[arg(help = "Note id or exact title.")]
    pub identifier: String,

    #[arg(short = 'a', long, help = "Include archived linking notes.")]
    pub archived: bool,

    #[arg(long, help = "Print JSON instead of a table.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(long = "to", help = "Destination JSON file.")]
    pub to: PathBuf,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(long = "from", help = "JSON file produced by export.")]
    pub from: PathBuf,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(
        long,
        env = env_vars::BIND,
        help = "Address to listen on (default 127.0.0.1:8000)."
    )]
    pub bind: Option<String>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
