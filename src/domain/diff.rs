//! Line-aligned comparison of current and proposed node content

use itertools::{EitherOrBoth, Itertools};

/// One row of a side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    Same(String),
    Added(String),
    Removed(String),
    Changed { before: String, after: String },
}

/// Compare `original` and `modified` line by line at equal positions.
pub fn line_diff(original: &str, modified: &str) -> Vec<LineChange> {
    original
        .split('\n')
        .zip_longest(modified.split('\n'))
        .map(|pair| match pair {
            EitherOrBoth::Both(a, b) if a == b => LineChange::Same(a.to_string()),
            EitherOrBoth::Both(a, b) => LineChange::Changed {
                before: a.to_string(),
                after: b.to_string(),
            },
            EitherOrBoth::Left(a) => LineChange::Removed(a.to_string()),
            EitherOrBoth::Right(b) => LineChange::Added(b.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_longer_modified_text_then_trailing_lines_added() {
        let diff = line_diff("a\nb", "a\nc\nd");
        assert_eq!(
            diff,
            vec![
                LineChange::Same("a".into()),
                LineChange::Changed {
                    before: "b".into(),
                    after: "c".into()
                },
                LineChange::Added("d".into()),
            ]
        );
    }
}
