//! Line-oriented diff between an original and a modified text.
//!
//! Output format:
//! ```text
//! *** <file>
//! --- <file>
//!  unchanged line
//! -removed line
//! +inserted line
//! ```
//! Every line of both texts appears exactly once, so the diff is
//! deterministic for a given pair of inputs.

/// Renders the full-context diff of `original` against `modified`.
pub fn line_diff(file: &str, original: &str, modified: &str) -> String {
    let old: Vec<&str> = original.split('\n').collect();
    let new: Vec<&str> = modified.split('\n').collect();

    let mut out = format!("*** {file}\n--- {file}\n");
    for op in diff_ops(&old, &new) {
        let (marker, line) = match op {
            Op::Keep(line) => (' ', line),
            Op::Delete(line) => ('-', line),
            Op::Insert(line) => ('+', line),
        };
        out.push(marker);
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op<'a> {
    Keep(&'a str),
    Delete(&'a str),
    Insert(&'a str),
}

/// Longest-common-subsequence edit script. The shared prefix and suffix are
/// peeled off first so the table only covers the changed middle.
fn diff_ops<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Op<'a>> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0u32; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops: Vec<Op<'a>> = old[..prefix].iter().map(|l| Op::Keep(l)).collect();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            ops.push(Op::Keep(a[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(Op::Delete(a[i]));
            i += 1;
        } else {
            ops.push(Op::Insert(b[j]));
            j += 1;
        }
    }
    ops.extend(a[i..].iter().map(|l| Op::Delete(l)));
    ops.extend(b[j..].iter().map(|l| Op::Insert(l)));
    ops.extend(old[old.len() - suffix..].iter().map(|l| Op::Keep(l)));
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_are_all_context() {
        let d = line_diff("a.css", "x\ny", "x\ny");
        assert_eq!(d, "*** a.css\n--- a.css\n x\n y\n");
    }

    #[test]
    fn test_removed_line() {
        let d = line_diff("a.css", ".foo {}\n.bar {}\n.baz {}\n", ".foo {}\n.baz {}\n");
        assert_eq!(d, "*** a.css\n--- a.css\n .foo {}\n-.bar {}\n .baz {}\n \n");
    }

    #[test]
    fn test_replaced_line() {
        let d = line_diff("a.css", ".a, .b {}", ".a {}");
        assert_eq!(d, "*** a.css\n--- a.css\n-.a, .b {}\n+.a {}\n");
    }

    #[test]
    fn test_insertions_after_deletions_in_block() {
        let d = line_diff("a.js", "keep\nfunction f() {}\nend", "keep\n/* banner */\n// function f() {}\nend");
        let body: Vec<&str> = d.lines().skip(2).collect();
        assert_eq!(
            body,
            vec![" keep", "-function f() {}", "+/* banner */", "+// function f() {}", " end"]
        );
    }

    #[test]
    fn test_deterministic() {
        let (o, m) = ("a\nb\nc\nd", "a\nc\nx\nd");
        assert_eq!(line_diff("f", o, m), line_diff("f", o, m));
    }
}
