//! # Resolver
//!
//! Turns each input source (one `-a` argument list, one `-f` file, or the
//! lines read from stdin) into a single [`TaskList`]. Raw tokens go through
//! range expansion and glob expansion before they are appended.

use crate::core::range::{self, RangeError};
use crate::core::tasks::TaskList;
use glob::MatchOptions;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Resolution failures. All of them are fatal for the run.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("Argument list '{0}' has unbalanced quotes.")]
    UnbalancedQuotes(String),
    #[error("Could not read argument file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One place task values come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A literal `-a` argument: whitespace separated tokens, shell quoting allowed.
    Arguments(String),
    /// A `-f` file: one task per non-blank line.
    File(PathBuf),
}

/// Resolves a source into a sealed-ready list, shuffling it once when requested.
pub fn resolve_source<R: Rng + ?Sized>(
    source: &InputSource,
    shuffle: Option<&mut R>,
) -> Result<TaskList, ResolveError> {
    let mut list = match source {
        InputSource::Arguments(raw) => resolve_arguments(raw)?,
        InputSource::File(path) => read_lines(path)?,
    };
    if let Some(rng) = shuffle {
        list.shuffle(rng);
    }
    log::debug!("Resolved {:?} into {} task(s).", source, list.len());
    Ok(list)
}

/// Splits one argument list and expands every token in it.
pub fn resolve_arguments(raw: &str) -> Result<TaskList, ResolveError> {
    let tokens = shlex::split(raw).ok_or_else(|| ResolveError::UnbalancedQuotes(raw.to_string()))?;
    let mut list = TaskList::new();
    for token in tokens {
        resolve_token(token.trim(), &mut list)?;
    }
    Ok(list)
}

/// Expands a single raw token and appends the result to `list`.
///
/// Ranges are expanded (errors are fatal); glob patterns are replaced by the
/// matching files; anything else is appended literally.
pub fn resolve_token(token: &str, list: &mut TaskList) -> Result<(), ResolveError> {
    if token.is_empty() {
        return Ok(());
    }

    if range::is_range_expression(token) {
        list.extend(range::expand_range(token)?);
        return Ok(());
    }

    match expand_glob(token) {
        Ok(Some(files)) => list.extend(files),
        Ok(None) => list.add(token),
        Err(e) => {
            // A bad pattern only drops this token; everything gathered so far stays.
            log::warn!("Skipping invalid glob pattern '{}': {}", token, e);
        }
    }
    Ok(())
}

/// Resolves a glob token against the filesystem.
///
/// Matches are reported by file name, without their directory part.
/// Returns `Ok(None)` when `token` is not a pattern or matches nothing, so the
/// caller keeps it literally. Directories are never returned.
pub fn expand_glob(token: &str) -> Result<Option<Vec<String>>, glob::PatternError> {
    if !token.contains(['*', '?', '[']) {
        return Ok(None);
    }

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let mut matched_any = false;
    let mut files = Vec::new();
    for entry in glob::glob_with(token, options)? {
        match entry {
            Ok(path) => {
                matched_any = true;
                if path.is_dir() {
                    continue;
                }
                if let Some(name) = path.file_name() {
                    files.push(name.to_string_lossy().into_owned());
                }
            }
            Err(e) => log::debug!("Ignoring unreadable glob entry: {}", e),
        }
    }

    Ok(matched_any.then_some(files))
}

/// Reads a file into a task list, one trimmed, non-blank line per task.
pub fn read_lines(path: &Path) -> Result<TaskList, ResolveError> {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
    let content = fs::read_to_string(&expanded).map_err(|source| ResolveError::Io {
        path: expanded.clone(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tasks::Task;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::fs::File;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn values(list: &TaskList) -> Vec<String> {
        list.tasks().iter().map(Task::to_string).collect()
    }

    #[test]
    fn test_literal_tokens() {
        let list = resolve_arguments("alpha beta  gamma").unwrap();
        assert_eq!(values(&list), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_quoted_tokens_stay_together() {
        let list = resolve_arguments("'hello world' x").unwrap();
        assert_eq!(values(&list), vec!["hello world", "x"]);

        assert!(matches!(
            resolve_arguments("'unterminated"),
            Err(ResolveError::UnbalancedQuotes(_))
        ));
    }

    #[test]
    fn test_range_tokens_are_expanded_in_place() {
        let list = resolve_arguments("start {1..3} end").unwrap();
        assert_eq!(values(&list), vec!["start", "1", "2", "3", "end"]);
    }

    #[test]
    fn test_malformed_range_is_fatal() {
        let result = resolve_arguments("{1..oops}");
        assert!(matches!(result, Err(ResolveError::Range(_))));
    }

    #[test]
    fn test_glob_replaces_token_with_file_names_only() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        File::create(dir.path().join("b.txt")).unwrap();
        std::fs::create_dir(dir.path().join("c.txt")).unwrap();

        let pattern = dir.path().join("*.txt");
        let files = expand_glob(&pattern.to_string_lossy()).unwrap().unwrap();
        assert_eq!(files, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_glob_without_match_is_kept_literally() {
        let dir = TempDir::new().unwrap();
        let pattern = dir.path().join("*.nothing").to_string_lossy().into_owned();
        let mut list = TaskList::new();
        resolve_token(&pattern, &mut list).unwrap();
        assert_eq!(values(&list), vec![pattern]);
    }

    #[test]
    fn test_glob_matching_only_directories_contributes_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let pattern = dir.path().join("su?").to_string_lossy().into_owned();
        let mut list = TaskList::new();
        resolve_token(&pattern, &mut list).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_invalid_glob_is_skipped_not_fatal() {
        let mut list = TaskList::new();
        list.add("kept");
        resolve_token("[unclosed", &mut list).unwrap();
        resolve_token("after", &mut list).unwrap();
        assert_eq!(values(&list), vec!["kept", "after"]);
    }

    #[test]
    fn test_file_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  one  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "two").unwrap();
        file.flush().unwrap();

        let source = InputSource::File(file.path().to_path_buf());
        let list = resolve_source::<StdRng>(&source, None).unwrap();
        assert_eq!(values(&list), vec!["one", "two"]);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let source = InputSource::File(PathBuf::from("definitely/not/here.txt"));
        let result = resolve_source::<StdRng>(&source, None);
        assert!(matches!(result, Err(ResolveError::Io { .. })));
    }

    #[test]
    fn test_shuffle_is_applied_once_per_source() {
        let source = InputSource::Arguments("{1..20}".to_string());
        let mut rng = StdRng::seed_from_u64(1);
        let list = resolve_source(&source, Some(&mut rng)).unwrap();

        let mut sorted: Vec<i32> = list.tasks().iter().map(|t| t.value().parse().unwrap()).collect();
        assert_ne!(sorted, (1..=20).collect::<Vec<_>>());
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=20).collect::<Vec<_>>());
    }
}
