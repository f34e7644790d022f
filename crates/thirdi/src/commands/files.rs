//! Recorded-file commands.

use thirdi_api::types::FileEntry;

use crate::cli::{FilesArgs, FilesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::Session;

pub async fn handle(
    session: &Session,
    args: FilesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        FilesCommand::Ls => {
            let root = session.backend.files().await?;
            print_tree(&root, 0);
            Ok(())
        }

        FilesCommand::Mv { src, dst } => {
            let root = session.backend.files().await?;
            let entry = find_by_path(&root, &src).ok_or(CliError::FileNotFound { path: src })?;
            session.backend.rename_file(&entry.url, &dst).await?;
            output::note(global.quiet, &format!("moved to {dst}"));
            Ok(())
        }

        FilesCommand::Rm { path } => {
            let root = session.backend.files().await?;
            let entry = find_by_path(&root, &path).ok_or(CliError::FileNotFound { path })?;
            session.backend.delete_file(&entry.url).await?;
            output::note(global.quiet, "deleted");
            Ok(())
        }
    }
}

fn print_tree(entry: &FileEntry, depth: usize) {
    // The root directory has no name; skip its line but keep its children
    // unindented.
    let child_depth = if depth == 0 && entry.name.is_empty() {
        0
    } else {
        let indent = "  ".repeat(depth);
        let suffix = if entry.directory { "/" } else { "" };
        println!("{indent}{}{suffix}", entry.name);
        depth + 1
    };
    for child in &entry.children {
        print_tree(child, child_depth);
    }
}

/// Walk the tree looking for an entry whose device path matches.
fn find_by_path<'a>(entry: &'a FileEntry, path: &str) -> Option<&'a FileEntry> {
    if entry.path == path {
        return Some(entry);
    }
    entry
        .children
        .iter()
        .find_map(|child| find_by_path(child, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> FileEntry {
        FileEntry {
            name: String::new(),
            path: "/".into(),
            url: "/files/".into(),
            directory: true,
            children: vec![FileEntry {
                name: "2026-08".into(),
                path: "/2026-08".into(),
                url: "/files/2026-08".into(),
                directory: true,
                children: vec![FileEntry {
                    name: "clip.mp4".into(),
                    path: "/2026-08/clip.mp4".into(),
                    url: "/files/2026-08/clip.mp4".into(),
                    directory: false,
                    children: Vec::new(),
                }],
            }],
        }
    }

    #[test]
    fn finds_nested_entries_by_path() {
        let root = tree();
        let found = find_by_path(&root, "/2026-08/clip.mp4").expect("entry");
        assert_eq!(found.url, "/files/2026-08/clip.mp4");
        assert!(find_by_path(&root, "/nope").is_none());
    }
}
