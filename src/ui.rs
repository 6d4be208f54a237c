use std::io::{self, IsTerminal};

use time::macros::format_description;

use crate::domain::note::Note;
use crate::listing::NoteListFilter;

pub fn print_note_list(notes: &[Note], filter: &NoteListFilter) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Notes"));
    if let Some(summary) = filter.summary() {
        println!("{}", palette.dim(&format!("filters: {summary}")));
    }

    if notes.is_empty() {
        println!("{}", palette.dim("no notes matched"));
        return;
    }

    for line in format_note_table(notes, &palette) {
        println!("{line}");
    }
    println!("{}", palette.dim(&format!("{} note(s)", notes.len())));
}

pub fn print_note_detail(note: &Note, links: &[String], backlinks: &[Note]) {
    print!("{}", format_note_detail(note, links, backlinks, &Palette::auto()));
}

pub fn print_links(note: &Note, links: &[String]) {
    let palette = Palette::auto();
    println!(
        "{} {}",
        palette.heading("Links from"),
        palette.id(&format!("#{}", note.id))
    );
    if links.is_empty() {
        println!("{}", palette.dim("no links"));
        return;
    }
    for link in links {
        println!("  {}", palette.link(link));
    }
}

pub fn print_backlinks(target: Option<&Note>, notes: &[Note]) {
    let palette = Palette::auto();
    match target {
        Some(target) => println!(
            "{} {}",
            palette.heading("Backlinks to"),
            palette.id(&format!("#{}", target.id))
        ),
        None => println!("{}", palette.heading("Backlinks")),
    }
    if notes.is_empty() {
        println!("{}", palette.dim("no backlinks"));
        return;
    }
    for note in notes {
        println!("{}", format_note_row(note, &palette));
    }
}

const TABLE_HEADERS: [&str; 6] = ["ID", "TITLE", "TAGS", "PINNED", "ARCHIVED", "UPDATED"];

/// Header plus one aligned row per note. Widths are measured before
/// painting so escape codes never skew the columns.
fn format_note_table(notes: &[Note], palette: &Palette) -> Vec<String> {
    let rows: Vec<[String; 6]> = notes
        .iter()
        .map(|note| {
            [
                format!("#{}", note.id),
                note.title.clone(),
                if note.tags.is_empty() {
                    "-".to_string()
                } else {
                    note.tags.join(",")
                },
                yes_no(note.pinned).to_string(),
                yes_no(note.archived).to_string(),
                short_time(note.updated_at),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADERS.map(|header| header.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = TABLE_HEADERS.map(str::to_string);
    let mut lines = vec![join_cells(&header, &widths, |_, cell| palette.dim(cell))];
    lines.extend(rows.iter().map(|row| {
        join_cells(row, &widths, |column, cell| match column {
            0 => palette.id(cell),
            2 => palette.tags(cell),
            3 if cell.trim_end() == "yes" => palette.flag(cell, "33"),
            5 => palette.dim(cell),
            _ => cell.to_string(),
        })
    }));
    lines
}

fn join_cells(
    cells: &[String; 6],
    widths: &[usize; 6],
    paint: impl Fn(usize, &str) -> String,
) -> String {
    let last = cells.len() - 1;
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(column, (cell, width))| {
            let padded = if column == last {
                cell.clone()
            } else {
                format!("{cell:<width$}")
            };
            paint(column, &padded)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn format_note_row(note: &Note, palette: &Palette) -> String {
    let mut line = format!("{} {}", palette.id(&format!("#{}", note.id)), note.title);
    if note.pinned {
        line.push(' ');
        line.push_str(&palette.flag("[pinned]", "33"));
    }
    if note.archived {
        line.push(' ');
        line.push_str(&palette.flag("[archived]", "90"));
    }
    if !note.tags.is_empty() {
        line.push(' ');
        line.push_str(&palette.tags(&format!("#{}", note.tags.join(" #"))));
    }
    line.push(' ');
    line.push_str(&palette.dim(&short_time(note.updated_at)));
    line
}

fn format_note_detail(
    note: &Note,
    links: &[String],
    backlinks: &[Note],
    palette: &Palette,
) -> String {
    let mut out = String::new();
    let mut header = format!(
        "{} {}",
        palette.id(&format!("#{}", note.id)),
        palette.heading(&note.title)
    );
    if note.pinned {
        header.push(' ');
        header.push_str(&palette.flag("[pinned]", "33"));
    }
    if note.archived {
        header.push(' ');
        header.push_str(&palette.flag("[archived]", "90"));
    }
    out.push_str(&header);
    out.push('\n');
    out.push_str(&palette.dim(&format!(
        "created {}  updated {}",
        short_time(note.created_at),
        short_time(note.updated_at)
    )));
    out.push('\n');

    let tags = if note.tags.is_empty() {
        "-".to_string()
    } else {
        note.tags.join(", ")
    };
    out.push_str(&format!("tags: {}\n\n", palette.tags(&tags)));

    if note.content.trim().is_empty() {
        out.push_str(&palette.dim("_<empty>_"));
        out.push('\n');
    } else {
        out.push_str(&note.content);
        if !note.content.ends_with('\n') {
            out.push('\n');
        }
    }

    if !links.is_empty() {
        out.push('\n');
        out.push_str(&palette.heading("Links"));
        out.push('\n');
        for link in links {
            out.push_str(&format!("  {}\n", palette.link(link)));
        }
    }
    if !backlinks.is_empty() {
        out.push('\n');
        out.push_str(&palette.heading("Backlinks"));
        out.push('\n');
        for source in backlinks {
            out.push_str(&format!(
                "  {} {}\n",
                palette.id(&format!("#{}", source.id)),
                source.title
            ));
        }
    }
    out
}

fn short_time(value: time::OffsetDateTime) -> String {
    value
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| value.to_string())
}

pub(crate) struct Palette {
    enabled: bool,
}

impl Palette {
    pub(crate) fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    #[cfg(test)]
    fn plain() -> Self {
        Self { enabled: false }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    pub(crate) fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn flag(&self, text: &str, code: &str) -> String {
        self.paint(code, text)
    }

    fn link(&self, title: &str) -> String {
        self.paint("35", &format!("[[{title}]]"))
    }

    fn tags(&self, text: &str) -> String {
        self.paint("90", text)
    }
}

#[cfg(test)]
mod tests {
    use super::{format_note_detail, format_note_row, format_note_table, Palette};
    use crate::domain::note::Note;
    use time::macros::datetime;

    fn note(id: i64, title: &str, content: &str) -> Note {
        Note {
            id,
            title: title.to_string(),
            content: content.to_string(),
            tags: Vec::new(),
            pinned: false,
            archived: false,
            created_at: datetime!(2026-03-01 09:15 UTC),
            updated_at: datetime!(2026-03-02 10:30 UTC),
        }
    }

    #[test]
    fn row_shows_flags_tags_and_update_time() {
        let mut row = note(4, "Plan", "");
        row.pinned = true;
        row.archived = true;
        row.tags = vec!["ideas".to_string(), "work".to_string()];
        assert_eq!(
            format_note_row(&row, &Palette::plain()),
            "#4 Plan [pinned] [archived] #ideas #work 2026-03-02 10:30"
        );
    }

    #[test]
    fn table_has_header_and_aligned_columns() {
        let mut first = note(4, "Plan", "");
        first.pinned = true;
        first.tags = vec!["ideas".to_string(), "work".to_string()];
        let mut second = note(12, "Groceries list", "");
        second.archived = true;

        let lines = format_note_table(&[first, second], &Palette::plain());
        assert_eq!(
            lines,
            vec![
                "ID   TITLE           TAGS        PINNED  ARCHIVED  UPDATED",
                "#4   Plan            ideas,work  yes     no        2026-03-02 10:30",
                "#12  Groceries list  -           no      yes       2026-03-02 10:30",
            ]
        );
    }

    #[test]
    fn detail_marks_empty_content_and_omits_empty_sections() {
        let text = format_note_detail(&note(1, "Blank", "  "), &[], &[], &Palette::plain());
        assert!(text.starts_with("#1 Blank\n"));
        assert!(text.contains("tags: -\n"));
        assert!(text.contains("_<empty>_"));
        assert!(!text.contains("Links"));
        assert!(!text.contains("Backlinks"));
    }

    #[test]
    fn detail_lists_links_and_backlinks() {
        let target = note(2, "B", "see [[C]]");
        let source = note(1, "A", "see [[B]]");
        let text = format_note_detail(
            &target,
            &["C".to_string()],
            std::slice::from_ref(&source),
            &Palette::plain(),
        );
        assert!(text.contains("see [[C]]\n"));
        assert!(text.contains("Links\n  [[C]]\n"));
        assert!(text.contains("Backlinks\n  #1 A\n"));
    }

    #[test]
    fn palette_wraps_only_when_enabled() {
        assert_eq!(Palette::plain().id("#1"), "#1");
        let colored = Palette { enabled: true };
        assert_eq!(colored.id("#1"), "\x1b[1;94m#1\x1b[0m");
    }
}
