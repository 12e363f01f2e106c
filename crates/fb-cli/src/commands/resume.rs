use std::path::Path;

use fb_core::SessionId;
use fb_reader::{ProgressionController, ReaderConfig};

pub fn run(store_path: &Path, session: Option<&str>, api_url: Option<&str>) -> Result<(), String> {
    let mut store = super::open_store(store_path)?;

    let id = match session {
        Some(id) => SessionId::new(id),
        None => store
            .current_id()
            .cloned()
            .ok_or("no current session. Start one with `fabula read`")?,
    };
    store.set_current(&id).map_err(|e| e.to_string())?;
    super::save_store(store_path, &store)?;

    let session = store.get_session(&id).map_err(|e| e.to_string())?;
    if session.completed {
        super::show::print_header(session);
        if let Some(last) = session.last_index() {
            super::show::print_segment(last, &session.segments[last]);
        }
        println!("  This story has ended. Use `fabula show {id}` to read it all.");
        return Ok(());
    }

    let backend = super::backend(api_url)?;
    let controller = ProgressionController::new(store.shared(), backend, ReaderConfig::default());
    super::runtime()?.block_on(super::read::interact(&controller, store_path, &id))
}
