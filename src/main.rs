mod cli;
mod completions;
mod config;
mod db;
mod domain;
mod links;
mod listing;
mod server;
mod service;
mod timestamp;
mod transfer;
mod ui;

use std::error::Error;
use std::fmt;

use serde::Serialize;

use config::{env_vars, ConfigError, Settings};
use domain::note::Note;
use service::{NoteService, ServiceError};

fn main() {
    dotenvy::dotenv().ok();
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn init_logging(default_filter: &str) {
    let filter = std::env::var(env_vars::LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_filter.to_string());
    env_logger::Builder::new().parse_filters(&filter).init();
}

fn run() -> Result<(), RunError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    let serving = matches!(cli.command, Commands::Serve(_));
    init_logging(if serving { "info" } else { "warn" });

    if let Commands::Completions(args) = &cli.command {
        completions::run_completions_command(args.shell.as_deref(), args.install)?;
        return Ok(());
    }

    let settings = Settings::resolve(&cli.overrides())?;
    if let Some(path) = settings.config_path.as_deref() {
        log::debug!("loaded config {}", path.display());
    }
    let service = NoteService::open(&settings.db_path)?;
    log::debug!("opened notes database {}", settings.db_path.display());

    match cli.command {
        Commands::Add(args) => {
            service::validate_title(&args.title)?;
            let tags = domain::tags::parse_tag_list(&args.tags);
            let note = service.create_note(&args.title, &args.content, tags)?;
            println!("{}", note_line("created", &note));
        }
        Commands::List(args) => {
            let filter = args.filter();
            let notes = service.list_notes(&filter)?;
            if args.json {
                print_json(&notes);
            } else {
                ui::print_note_list(&notes, &filter);
            }
        }
        Commands::Show(args) => show_note(&service, &args)?,
        Commands::Edit(args) => {
            let note = service.edit_note(&args.identifier, args.patch())?;
            println!("{}", note_line("updated", &note));
        }
        Commands::Delete(args) => {
            service.delete_note(&args.identifier, args.hard)?;
            let mode = if args.hard { "hard" } else { "soft" };
            println!("deleted {} ({mode})", args.identifier);
        }
        Commands::Pin(args) => {
            let note = service.pin_note(&args.identifier, true)?;
            println!("{}", note_line("pinned", &note));
        }
        Commands::Unpin(args) => {
            let note = service.pin_note(&args.identifier, false)?;
            println!("{}", note_line("unpinned", &note));
        }
        Commands::Archive(args) => {
            let note = service.archive_note(&args.identifier, true)?;
            println!("{}", note_line("archived", &note));
        }
        Commands::Unarchive(args) => {
            let note = service.archive_note(&args.identifier, false)?;
            println!("{}", note_line("unarchived", &note));
        }
        Commands::Restore(args) => {
            let note = service.restore_note(&args.identifier)?;
            println!("{}", note_line("restored", &note));
        }
        Commands::Purge(args) => {
            service.purge_note(&args.identifier)?;
            println!("purged {}", args.identifier);
        }
        Commands::Links(args) => {
            let note = service
                .get_note(&args.identifier)?
                .ok_or_else(|| not_found(&args.identifier, false))?;
            ui::print_links(&note, &links::extract_links(&note.content));
        }
        Commands::Backlinks(args) => show_backlinks(&service, &args)?,
        Commands::Export(args) => {
            let notes = service.export_all()?;
            transfer::write_export(&args.to, &notes)?;
            println!("exported {} note(s) to {}", notes.len(), args.to.display());
        }
        Commands::Import(args) => {
            let records = transfer::read_import(&args.from)?;
            let imported = service.import_notes(records)?;
            println!("imported {} note(s)", imported.len());
        }
        Commands::Serve(_) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(server::serve(service, &settings.bind))?;
        }
        // handled before the store is opened
        Commands::Completions(_) => {}
    }

    Ok(())
}

fn show_note(service: &NoteService, args: &cli::ShowArgs) -> Result<(), ServiceError> {
    let found = if args.by_title {
        service.get_note_by_title(&args.identifier)?
    } else {
        service.get_note(&args.identifier)?
    };
    let note = found.ok_or_else(|| not_found(&args.identifier, args.by_title))?;
    let links = links::extract_links(&note.content);
    let backlinks = service.backlinks_for(note.id, false)?;
    if args.json {
        print_json(&NoteDetail {
            note: &note,
            links: &links,
            backlinks: backlinks.iter().map(BacklinkRef::from).collect(),
        });
    } else {
        ui::print_note_detail(&note, &links, &backlinks);
    }
    Ok(())
}

fn show_backlinks(service: &NoteService, args: &cli::BacklinksArgs) -> Result<(), ServiceError> {
    let target = service.get_note(&args.identifier)?;
    let notes = service.backlinks_for(&args.identifier, args.archived)?;
    if args.json {
        print_json(&notes);
    } else {
        ui::print_backlinks(target.as_ref(), &notes);
    }
    Ok(())
}

fn note_line(verb: &str, note: &Note) -> String {
    format!(
        "{} {}: {}",
        verb,
        ui::Palette::auto().id(&format!("#{}", note.id)),
        note.title
    )
}

fn not_found(identifier: &str, by_title: bool) -> ServiceError {
    if by_title {
        ServiceError::NotFound(format!("note titled '{identifier}'"))
    } else {
        ServiceError::NotFound(format!(
            "note {}",
            domain::identifier::NoteRef::parse(identifier)
        ))
    }
}

#[derive(Debug, Serialize)]
struct NoteDetail<'a> {
    #[serde(flatten)]
    note: &'a Note,
    links: &'a [String],
    backlinks: Vec<BacklinkRef<'a>>,
}

#[derive(Debug, Serialize)]
struct BacklinkRef<'a> {
    id: i64,
    title: &'a str,
}

impl<'a> From<&'a Note> for BacklinkRef<'a> {
    fn from(note: &'a Note) -> Self {
        Self {
            id: note.id,
            title: &note.title,
        }
    }
}

#[derive(Debug)]
enum RunError {
    Config(ConfigError),
    Service(ServiceError),
    Io(std::io::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Config(err) => write!(f, "{}", err),
            RunError::Service(err) => write!(f, "{}", err),
            RunError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RunError::Config(err) => Some(err),
            RunError::Service(err) => Some(err),
            RunError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(value: ConfigError) -> Self {
        RunError::Config(value)
    }
}

impl From<ServiceError> for RunError {
    fn from(value: ServiceError) -> Self {
        RunError::Service(value)
    }
}

impl From<std::io::Error> for RunError {
    fn from(value: std::io::Error) -> Self {
        RunError::Io(value)
    }
}
