//! Terminal rendering of turns and saving of returned images and files.

use std::path::{Path, PathBuf};
use threadline_core::message::{Role, Turn};

/// Print a turn with a role prefix on every line.
pub fn print_turn(turn: &Turn) {
    let prefix = match turn.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    let text = turn.text.display_text();
    println!();
    for line in text.lines() {
        println!("  {prefix} > {line}");
    }
    if turn.role == Role::User && !turn.text.image_file_ids().is_empty() {
        println!("  {prefix} > [image attached]");
    }
}

/// Write a turn's images and files under `dir`, returning the written paths.
///
/// Images are named after the turn id; generated files keep their display
/// name. Existing files with the same name are overwritten.
pub async fn save_outputs(turn: &Turn, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if turn.images.is_empty() && turn.files.is_empty() {
        return Ok(Vec::new());
    }

    tokio::fs::create_dir_all(dir).await?;
    let stem: String = turn.id.chars().take(8).collect();
    let mut written = Vec::new();

    for (i, image) in turn.images.iter().enumerate() {
        let path = dir.join(format!("image-{stem}-{}.png", i + 1));
        tokio::fs::write(&path, image).await?;
        written.push(path);
    }

    for file in &turn.files {
        // Keep writes inside `dir`
        let name = Path::new(&file.name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| format!("file-{stem}").into());
        let path = dir.join(name);
        tokio::fs::write(&path, &file.data).await?;
        written.push(path);
    }

    Ok(written)
}

/// Print the saved paths under the reply.
pub fn print_saved(paths: &[PathBuf]) {
    for path in paths {
        println!("  [saved] {}", path.display());
    }
}
