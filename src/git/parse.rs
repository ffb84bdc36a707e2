use std::borrow::Cow;

use super::types::{FileChangeRecord, LineChangeTotals, ParsedStatus, StatusCode};

/// Splits `git status --porcelain` output into staged and unstaged records.
///
/// Lines shorter than four characters are skipped. Renames keep only the
/// destination path. Quoted paths lose their quotes and C-style escapes.
pub fn parse_status(porcelain: &str) -> ParsedStatus {
    let mut parsed = ParsedStatus::default();

    for line in porcelain.lines() {
        if line.chars().count() < 4 {
            continue;
        }
        let mut chars = line.chars();
        let (index, worktree) = match (chars.next(), chars.next()) {
            (Some(x), Some(y)) => (x, y),
            _ => continue,
        };
        let Some(raw_path) = line.get(3..) else {
            continue;
        };
        let path = raw_path.rsplit(" -> ").next().unwrap_or(raw_path);
        let path = unquote(path);
        if path.is_empty() {
            continue;
        }

        let untracked = index == '?' && worktree == '?';
        let staged = index != ' ' && index != '?';
        let unstaged = worktree != ' ' || untracked;

        if staged {
            parsed.staged.push(FileChangeRecord {
                status: StatusCode::from_char(index),
                path: path.to_string(),
                partial: worktree != ' ',
            });
        }
        if unstaged {
            let status = if untracked {
                StatusCode::Untracked
            } else {
                StatusCode::from_char(worktree)
            };
            parsed.unstaged.push(FileChangeRecord {
                status,
                path: path.to_string(),
                partial: staged && worktree != ' ',
            });
        }
    }

    parsed
}

/// Undoes git's path quoting, so `"caf\303\251.txt"` reads as `café.txt`.
fn unquote(path: &str) -> Cow<'_, str> {
    let Some(inner) = path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) else {
        return Cow::Borrowed(path.trim_matches('"'));
    };
    if !inner.contains('\\') {
        return Cow::Borrowed(inner);
    }

    let raw = inner.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 == raw.len() {
            bytes.push(raw[i]);
            i += 1;
            continue;
        }
        let octal = raw
            .get(i + 1..i + 4)
            .filter(|digits| digits.iter().all(|d| (b'0'..=b'7').contains(d)));
        if let Some(digits) = octal {
            bytes.push(
                digits
                    .iter()
                    .fold(0u8, |acc, d| acc.wrapping_mul(8).wrapping_add(d - b'0')),
            );
            i += 4;
            continue;
        }
        bytes.push(match raw[i + 1] {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'v' => 0x0b,
            other => other,
        });
        i += 2;
    }
    Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
}

/// Sums `git diff --numstat` output. Binary entries (`-\t-\tpath`) add nothing.
pub fn parse_numstat(numstat: &str) -> LineChangeTotals {
    let mut totals = LineChangeTotals::default();

    for line in numstat.lines() {
        let mut fields = line.split_whitespace();
        let (Some(added), Some(deleted), Some(_path)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let (Ok(added), Ok(deleted)) = (added.parse::<u64>(), deleted.parse::<u64>()) else {
            continue;
        };
        totals.added += added;
        totals.deleted += deleted;
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(records: &[FileChangeRecord]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn modified_in_both_is_partial_in_both_sections() {
        let parsed = parse_status("MM src/lib.rs\n");
        assert_eq!(paths(&parsed.staged), ["src/lib.rs"]);
        assert_eq!(paths(&parsed.unstaged), ["src/lib.rs"]);
        assert!(parsed.staged[0].partial);
        assert!(parsed.unstaged[0].partial);
        assert_eq!(parsed.staged[0].status, StatusCode::Modified);
    }

    #[test]
    fn untracked_only_in_unstaged() {
        let parsed = parse_status("?? notes.txt\n");
        assert!(parsed.staged.is_empty());
        assert_eq!(parsed.unstaged.len(), 1);
        assert_eq!(parsed.unstaged[0].status, StatusCode::Untracked);
        assert!(!parsed.unstaged[0].partial);
    }

    #[test]
    fn staged_only_and_worktree_only() {
        let parsed = parse_status("A  new.rs\n M old.rs\n D gone.rs\n");
        assert_eq!(paths(&parsed.staged), ["new.rs"]);
        assert!(!parsed.staged[0].partial);
        assert_eq!(paths(&parsed.unstaged), ["old.rs", "gone.rs"]);
        assert_eq!(parsed.unstaged[1].status, StatusCode::Deleted);
        assert!(parsed.unstaged.iter().all(|r| !r.partial));
    }

    #[test]
    fn rename_keeps_destination() {
        let parsed = parse_status("R  src/old.rs -> src/new.rs\n");
        assert_eq!(parsed.staged.len(), 1);
        assert_eq!(parsed.staged[0].path, "src/new.rs");
        assert_eq!(parsed.staged[0].status, StatusCode::Renamed);
        assert_eq!(parsed.staged[0].mark(), "R");
    }

    #[test]
    fn quotes_are_stripped() {
        let parsed = parse_status("?? \"with space.txt\"\nR  \"a b.rs\" -> \"c d.rs\"\n");
        assert_eq!(paths(&parsed.unstaged), ["with space.txt"]);
        assert_eq!(paths(&parsed.staged), ["c d.rs"]);
    }

    #[test]
    fn escaped_paths_are_decoded() {
        let parsed = parse_status(
            "?? \"caf\\303\\251.txt\"\n M \"tab\\there\"\nA  \"say \\\"hi\\\".md\"\n",
        );
        assert_eq!(paths(&parsed.unstaged), ["café.txt", "tab\there"]);
        assert_eq!(paths(&parsed.staged), ["say \"hi\".md"]);
    }

    #[test]
    fn short_and_empty_lines_are_skipped() {
        let parsed = parse_status("\nM\n?? \n M a\n");
        assert!(parsed.staged.is_empty());
        assert_eq!(paths(&parsed.unstaged), ["a"]);
    }

    #[test]
    fn every_path_is_non_empty_and_unquoted() {
        let input = "MM \"x\"\n?? \"\"\nA  b/c.rs\n M \"q\" -> \"r/s\"\n";
        let parsed = parse_status(input);
        for record in parsed.staged.iter().chain(&parsed.unstaged) {
            assert!(!record.path.is_empty());
            assert!(!record.path.starts_with('"') && !record.path.ends_with('"'));
        }
    }

    #[test]
    fn numstat_skips_binary_lines() {
        let totals = parse_numstat("3\t1\tfoo.txt\n-\t-\tbin.png\n");
        assert_eq!(totals, LineChangeTotals { added: 3, deleted: 1 });
    }

    #[test]
    fn numstat_accumulates_and_ignores_garbage() {
        let totals = parse_numstat("10\t0\ta.rs\n\n2\t5\tdir/b.rs\nnot numstat\n");
        assert_eq!(totals, LineChangeTotals { added: 12, deleted: 5 });
    }
}
