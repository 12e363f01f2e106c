use std::path::Path;

use colored::Colorize;
use fb_core::{Segment, Session};

pub fn run(store_path: &Path, id: &str) -> Result<(), String> {
    let session = super::find_session(store_path, id)?;
    print_header(&session);
    for (index, segment) in session.segments.iter().enumerate() {
        print_segment(index, segment);
    }
    if session.completed {
        println!("  {}\n", "The End.".bold());
    } else {
        println!(
            "  {}\n",
            format!("To be continued. Run `fabula resume {id}`.").dimmed()
        );
    }
    Ok(())
}

pub(super) fn print_header(session: &Session) {
    let meta = &session.metadata;
    println!("{}", format!("Story {}", session.session_id).bold());
    if !meta.character.is_empty() {
        println!("  Character: {}", meta.character);
    }
    if !meta.setting.is_empty() {
        println!("  Setting:   {}", meta.setting);
    }
    if !meta.object.is_empty() {
        println!("  Object:    {}", meta.object);
    }
    println!();
}

/// Print a segment's narrative, preceded by the choice that led to it.
pub(super) fn print_segment(index: usize, segment: &Segment) {
    println!("{}", format!("Part {}", index + 1).cyan().bold());
    if let Some(choice) = &segment.choice_made {
        println!("  {} {}", "You chose:".dimmed(), choice.italic());
    }
    for line in segment.story_text.lines() {
        println!("  {line}");
    }
    println!();
}
