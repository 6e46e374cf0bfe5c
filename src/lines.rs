/// A single line of a file, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
}

/// Split text on `\n` into numbered lines.
///
/// Only `\n` separates lines, so a `\r` before it stays part of the line, and
/// text ending in `\n` yields a final empty line. Empty text is one empty line.
pub fn split_lines(content: &str) -> impl Iterator<Item = Line<'_>> {
    content
        .split('\n')
        .enumerate()
        .map(|(index, text)| Line {
            number: index + 1,
            text,
        })
}
