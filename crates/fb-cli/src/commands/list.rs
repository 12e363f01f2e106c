use std::path::Path;

use comfy_table::{ContentArrangement, Table};

pub fn run(store_path: &Path) -> Result<(), String> {
    let store = super::open_store(store_path)?;
    let unusable: Vec<_> = store.unusable_ids().collect();

    if store.is_empty() && unusable.is_empty() {
        println!("  No sessions found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Session", "Character", "Segments", "Status", "Updated"]);

    let current = store.current_id();
    for session in store.sessions() {
        let id = if current == Some(&session.session_id) {
            format!("* {}", session.session_id)
        } else {
            session.session_id.to_string()
        };
        let character = if session.metadata.character.is_empty() {
            "—".to_string()
        } else {
            session.metadata.character.clone()
        };
        let status = if session.completed {
            "completed"
        } else {
            "in progress"
        };
        table.add_row(vec![
            id,
            character,
            session.len().to_string(),
            status.to_string(),
            session.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    for id in &unusable {
        table.add_row(vec![
            id.to_string(),
            "—".to_string(),
            "—".to_string(),
            "unusable".to_string(),
            "—".to_string(),
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} sessions", store.len() + unusable.len());

    Ok(())
}
