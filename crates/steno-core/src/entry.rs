//! The per-half-move mark entry.

use crate::conditions::CondGroup;
use crate::error::StenoError;
use crate::vocabulary::Vocabulary;

/// One half-move of a steno: the authored mark expression plus the
/// constraints the solver synthesises from the rest of the puzzle.
///
/// `marks`/`meta_marks` stay in their character form; the matcher scans them
/// with `&` as a separator and `!` negating the following atom.
#[derive(Debug, Clone)]
pub struct MarkEntry {
    /// 0-based half-move index; even = White to move.
    pub index: usize,
    /// The authored mark expression.
    pub marks: String,
    /// Solver-synthesised extra marks (e.g. `!#`, `!K`).
    pub meta_marks: String,
    /// Parsed user bracket groups.
    pub conditions: Vec<CondGroup>,
    /// The authored bracket text, kept for checkpoints and echo.
    pub conditions_src: String,
    /// Solver-synthesised bracket groups.
    pub meta_conditions: Vec<CondGroup>,
    /// Rendered text of the synthesised groups; doubles as the idempotence
    /// guard for re-running synthesis.
    pub meta_conditions_src: String,
    /// Trailing `$`: snapshot a checkpoint after this entry.
    pub checkpoint: bool,
}

impl MarkEntry {
    pub fn new(index: usize, marks: String) -> Self {
        MarkEntry {
            index,
            marks,
            meta_marks: String::new(),
            conditions: Vec::new(),
            conditions_src: String::new(),
            meta_conditions: Vec::new(),
            meta_conditions_src: String::new(),
            checkpoint: false,
        }
    }

    /// Rebuilds an entry from the pieces a checkpoint stores.
    pub fn from_parts(index: usize, marks: &str, conditions_src: &str) -> Result<Self, StenoError> {
        let mut entry = MarkEntry::new(index, marks.to_string());
        for inner in split_bracket_groups(conditions_src)? {
            entry.conditions.push(CondGroup::parse(inner)?);
        }
        entry.conditions_src = conditions_src.to_string();
        Ok(entry)
    }

    pub fn is_white(&self) -> bool {
        self.index % 2 == 0
    }

    /// Atoms of the authored expression only.
    pub fn user_atoms(&self) -> Atoms<'_> {
        Atoms::new(&self.marks)
    }

    /// Atoms of the authored expression followed by the synthesised ones.
    pub fn all_atoms(&self) -> impl Iterator<Item = (bool, char)> + '_ {
        Atoms::new(&self.marks).chain(Atoms::new(&self.meta_marks))
    }

    /// Appends a meta-mark unless it is already present.
    pub fn push_meta_mark(&mut self, meta: &str) {
        if !self.meta_marks.contains(meta) {
            self.meta_marks.push_str(meta);
        }
    }

    /// Appends a meta-condition unless an identical group was already
    /// injected (substring test on the rendered text).
    pub fn push_meta_condition(&mut self, group: CondGroup) {
        let rendered = group.to_string();
        if self.meta_conditions_src.contains(&rendered) {
            return;
        }
        self.meta_conditions_src.push_str(&rendered);
        self.meta_conditions.push(group);
    }

    /// User conditions followed by synthesised ones; all must hold.
    pub fn all_conditions(&self) -> impl Iterator<Item = &CondGroup> {
        self.conditions.iter().chain(self.meta_conditions.iter())
    }

    /// Does the authored expression contain this mark, un-negated?
    pub fn has_positive_user_mark(&self, pred: impl Fn(char) -> bool) -> bool {
        self.user_atoms().any(|(neg, c)| !neg && pred(c))
    }

    /// The entry as the user would echo it, with synthesised parts appended.
    pub fn describe(&self, show_meta: bool) -> String {
        let mut out = format!("{}{}", self.marks, self.conditions_src);
        if show_meta {
            out.push_str(&self.meta_marks);
            out.push_str(&self.meta_conditions_src);
        }
        out
    }
}

/// Iterator over the `(negated, mark)` atoms of a mark string.
pub struct Atoms<'a> {
    chars: std::str::Chars<'a>,
}

impl<'a> Atoms<'a> {
    fn new(marks: &'a str) -> Self {
        Atoms { chars: marks.chars() }
    }
}

impl Iterator for Atoms<'_> {
    type Item = (bool, char);

    fn next(&mut self) -> Option<(bool, char)> {
        let mut negated = false;
        loop {
            match self.chars.next()? {
                '&' => continue,
                '!' => negated = true,
                c => return Some((negated, c)),
            }
        }
    }
}

/// Splits `"[a][b|c]"` into the inner texts `a`, `b|c`.
pub fn split_bracket_groups(src: &str) -> Result<Vec<&str>, StenoError> {
    let mut groups = Vec::new();
    let mut rest = src;
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(StenoError::invalid(rest, "expected `[`"));
        }
        let end = rest
            .find(']')
            .ok_or_else(|| StenoError::invalid(rest, "unterminated condition bracket"))?;
        groups.push(&rest[1..end]);
        rest = &rest[end + 1..];
    }
    Ok(groups)
}

/// Validates a checkpoint-stored marks string against a vocabulary.
pub fn marks_are_valid(marks: &str, vocab: Vocabulary) -> bool {
    marks
        .chars()
        .all(|c| c == '&' || c == '!' || vocab.contains(c))
}
