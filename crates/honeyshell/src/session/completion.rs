//! Tab completion of file names against the virtual filesystem

use std::path::Path;

use crate::fs::{FileSystem, resolve_path};

/// Result of completing the word before the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Completion {
    /// Nothing matched.
    None,
    /// Text to insert at the cursor.
    Insert(String),
    /// Several candidates and no longer common prefix; show them.
    List(Vec<String>),
}

/// Complete the last word of `before_cursor`.
///
/// The directory part of the word (or `cwd` when there is none) is listed;
/// entries starting with the rest of the word are candidates. Dotfiles are
/// only offered when the word's last component starts with `.`.
pub(crate) async fn complete(
    fs: &dyn FileSystem,
    cwd: &Path,
    home: &str,
    before_cursor: &str,
) -> Completion {
    let word = before_cursor
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default();
    let (dir_part, prefix) = match word.rfind('/') {
        Some(idx) => (&word[..=idx], &word[idx + 1..]),
        None => ("", word),
    };

    let directory = if dir_part.is_empty() {
        cwd.to_path_buf()
    } else if let Some(rest) = dir_part.strip_prefix("~/") {
        resolve_path(cwd, &format!("{}/{}", home, rest))
    } else {
        resolve_path(cwd, dir_part)
    };

    let Ok(entries) = fs.read_dir(&directory).await else {
        return Completion::None;
    };
    let show_hidden = prefix.starts_with('.');
    let matches: Vec<(String, bool)> = entries
        .into_iter()
        .filter(|e| e.name.starts_with(prefix) && (show_hidden || !e.name.starts_with('.')))
        .map(|e| (e.name, e.metadata.file_type.is_dir()))
        .collect();

    match matches.as_slice() {
        [] => Completion::None,
        [(name, is_dir)] => {
            let suffix = if *is_dir { "/" } else { " " };
            Completion::Insert(format!("{}{}", &name[prefix.len()..], suffix))
        }
        _ => {
            let names: Vec<&str> = matches.iter().map(|(n, _)| n.as_str()).collect();
            let common = longest_common_prefix(&names);
            if common.len() > prefix.len() {
                Completion::Insert(common[prefix.len()..].to_string())
            } else {
                Completion::List(
                    matches
                        .into_iter()
                        .map(|(n, d)| if d { format!("{}/", n) } else { n })
                        .collect(),
                )
            }
        }
    }
}

fn longest_common_prefix<'a>(items: &[&'a str]) -> &'a str {
    let Some((first, rest)) = items.split_first() else {
        return "";
    };
    let mut len = first.len();
    for item in rest {
        len = first
            .char_indices()
            .zip(item.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(len);
    }
    &first[..len]
}

/// Lay names out in columns sized to the terminal width, filled top to
/// bottom like `ls`.
pub(crate) fn format_columns(names: &[String], width: usize) -> String {
    let col_width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0) + 2;
    let cols = (width / col_width).max(1);
    let rows = names.len().div_ceil(cols);

    let mut out = String::new();
    for row in 0..rows {
        let mut line = String::new();
        for col in 0..cols {
            if let Some(name) = names.get(col * rows + row) {
                line.push_str(&format!("{:<w$}", name, w = col_width));
            }
        }
        out.push_str(line.trim_end());
        out.push_str("\r\n");
    }
    out
}
