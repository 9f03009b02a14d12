//! Path globbing over manifest entry paths
//!
//! `*` matches within one path segment, `**` matches any number of segments
//! (including none), `?` matches one character.

/// Match `path` against `pattern`
pub fn glob_match(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match_segments(&pattern, &path)
}

/// Whether `pattern` contains glob metacharacters
pub fn is_literal(pattern: &str) -> bool {
    !pattern.contains(['*', '?'])
}

/// Segment-level wildcard match; backtracks only to the most recent `**`,
/// so the cost is bounded by `pattern.len() * path.len()` segment checks
fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    let (mut pi, mut si) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while si < path.len() {
        if pi < pattern.len() && pattern[pi] == "**" {
            star = Some(pi);
            mark = si;
            pi += 1;
        } else if pi < pattern.len() && match_segment(pattern[pi], path[si]) {
            pi += 1;
            si += 1;
        } else if let Some(star_at) = star {
            pi = star_at + 1;
            mark += 1;
            si = mark;
        } else {
            return false;
        }
    }

    while pi < pattern.len() && pattern[pi] == "**" {
        pi += 1;
    }
    pi == pattern.len()
}

fn match_segment(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = text.chars().collect();
    let (mut pi, mut si) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while si < s.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == s[si]) {
            pi += 1;
            si += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = si;
            pi += 1;
        } else if let Some(star_at) = star {
            pi = star_at + 1;
            mark += 1;
            si = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
