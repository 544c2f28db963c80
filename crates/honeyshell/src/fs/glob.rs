//! Pathname expansion against the virtual filesystem

use std::path::{Path, PathBuf};

use super::path::resolve_path;
use super::traits::FileSystem;
use crate::error::Result;

/// Whether `word` contains any wildcard characters.
pub fn has_glob_chars(word: &str) -> bool {
    word.contains(['*', '?', '['])
}

/// Match one path component against a wildcard pattern.
///
/// Supports `*`, `?`, `[abc]`, `[a-z]` and negated `[!abc]` / `[^abc]`.
/// A `[` without a closing `]` matches itself.
///
/// Runs in `O(pattern * name)`: on a mismatch only the most recent `*`
/// is retried, one character further along the name.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern = compile(pattern);
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    // Pattern index after the last `*` and the name index it is retried at
    let mut star: Option<(usize, usize)> = None;
    while n < name.len() {
        match pattern.get(p) {
            Some(Piece::Star) => {
                p += 1;
                star = Some((p, n));
                continue;
            }
            Some(piece) if piece.matches(name[n]) => {
                p += 1;
                n += 1;
                continue;
            }
            _ => {}
        }
        match star {
            Some((after, from)) => {
                p = after;
                n = from + 1;
                star = Some((after, from + 1));
            }
            None => return false,
        }
    }
    pattern[p..].iter().all(|piece| matches!(piece, Piece::Star))
}

enum Piece {
    Star,
    Any,
    Set(CharSet),
    Char(char),
}

impl Piece {
    fn matches(&self, c: char) -> bool {
        match self {
            Piece::Star => false,
            Piece::Any => true,
            Piece::Set(set) => set.matches(c),
            Piece::Char(expected) => *expected == c,
        }
    }
}

fn compile(pattern: &str) -> Vec<Piece> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut pieces = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            // Runs of stars behave like one
            '*' if matches!(pieces.last(), Some(Piece::Star)) => {}
            '*' => pieces.push(Piece::Star),
            '?' => pieces.push(Piece::Any),
            '[' => {
                if let Some((set, consumed)) = parse_bracket(&chars[i + 1..]) {
                    pieces.push(Piece::Set(set));
                    i += 1 + consumed;
                    continue;
                }
                pieces.push(Piece::Char('['));
            }
            c => pieces.push(Piece::Char(c)),
        }
        i += 1;
    }
    pieces
}

struct CharSet {
    negated: bool,
    ranges: Vec<(char, char)>,
}

impl CharSet {
    fn matches(&self, c: char) -> bool {
        let hit = self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        hit != self.negated
    }
}

/// Parse a bracket expression following `[`. Returns the set and the number
/// of chars consumed including the closing `]`.
fn parse_bracket(chars: &[char]) -> Option<(CharSet, usize)> {
    let mut i = 0;
    let negated = matches!(chars.first(), Some('!') | Some('^'));
    if negated {
        i += 1;
    }
    let mut ranges = Vec::new();
    let mut first = true;
    while i < chars.len() {
        let c = chars[i];
        // `]` right after the opening bracket is a literal member
        if c == ']' && !first {
            return Some((CharSet { negated, ranges }, i + 1));
        }
        first = false;
        if i + 2 < chars.len() && chars[i + 1] == '-' && chars[i + 2] != ']' {
            ranges.push((c, chars[i + 2]));
            i += 3;
        } else {
            ranges.push((c, c));
            i += 1;
        }
    }
    None
}

/// Expand a wildcard word into the sorted list of matching paths.
///
/// Relative patterns are matched under `cwd` and produce relative results.
/// Dotfiles are only matched when the pattern component itself starts with
/// `.`. Returns an empty list when nothing matches; the caller decides
/// whether to keep the word literal.
pub async fn expand_glob(fs: &dyn FileSystem, cwd: &Path, pattern: &str) -> Result<Vec<String>> {
    if !has_glob_chars(pattern) {
        return Ok(Vec::new());
    }

    let absolute = pattern.starts_with('/');
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();

    // (display text, resolved path)
    let mut candidates: Vec<(String, PathBuf)> = if absolute {
        vec![(String::new(), PathBuf::from("/"))]
    } else {
        vec![(String::new(), cwd.to_path_buf())]
    };

    for (index, component) in components.iter().enumerate() {
        let last = index + 1 == components.len();
        let mut next = Vec::new();

        for (display, dir) in &candidates {
            let join = |name: &str| {
                if display.is_empty() && !absolute {
                    name.to_string()
                } else if display.is_empty() {
                    format!("/{}", name)
                } else {
                    format!("{}/{}", display, name)
                }
            };

            if !has_glob_chars(component) {
                let path = resolve_path(dir, component);
                let keep = match fs.stat(&path).await {
                    Ok(meta) => last || meta.file_type.is_dir(),
                    Err(_) => false,
                };
                if keep {
                    next.push((join(component), path));
                }
                continue;
            }

            let entries = match fs.read_dir(dir).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries {
                if entry.name.starts_with('.') && !component.starts_with('.') {
                    continue;
                }
                if !glob_match(component, &entry.name) {
                    continue;
                }
                if !last && !entry.metadata.file_type.is_dir() {
                    continue;
                }
                next.push((join(&entry.name), dir.join(&entry.name)));
            }
        }

        candidates = next;
        if candidates.is_empty() {
            break;
        }
    }

    let mut matches: Vec<String> = candidates.into_iter().map(|(display, _)| display).collect();
    if pattern.ends_with('/') {
        for m in &mut matches {
            m.push('/');
        }
    }
    matches.sort();
    Ok(matches)
}
