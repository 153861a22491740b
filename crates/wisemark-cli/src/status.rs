//! Download-folder inventory: marking progress per dated folder.

use std::path::Path;

use anyhow::Result;
use tracing::info;
use wisemark_core::paths;

pub fn run(root: &Path) -> Result<()> {
    let folders = paths::download_folders(root);
    if folders.is_empty() {
        info!(root = %root.display(), "no download folders yet");
        return Ok(());
    }

    for folder in &folders {
        let total = paths::count_pdfs(folder);
        let marked = paths::count_marked(folder);
        let name = folder.file_name().and_then(|n| n.to_str()).unwrap_or("");
        println!("{name}: {marked}/{total} marked");
    }
    Ok(())
}
