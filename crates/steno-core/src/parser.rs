//! The steno parser: comments, chunk directive, resume marker, entries.

use regex::Regex;

use crate::entry::MarkEntry;
use crate::error::StenoError;
use crate::vocabulary::Vocabulary;

/// Positions per checkpoint chunk.
pub const CHUNK_SIZE: usize = 1000;

/// The parsed form of a steno string.
#[derive(Debug, Clone)]
pub struct ParsedSteno {
    /// 1-based inclusive chunk range from a leading `N[-M]*` directive.
    pub chunks: Option<(u32, u32)>,
    /// Leading `$`: continue from the loaded checkpoint's mark prefix.
    pub resume: bool,
    /// The new entries, indexed from 0; the solver re-indexes on resume.
    pub entries: Vec<MarkEntry>,
}

/// Parses a steno string against a vocabulary.
pub fn parse(steno: &str, vocab: Vocabulary) -> Result<ParsedSteno, StenoError> {
    let text = strip_comments(steno)?;
    let mut rest = text.as_str();

    let chunks = parse_chunk_directive(&mut rest)?;
    let mut resume = false;
    if let Some(tail) = rest.strip_prefix('$') {
        resume = true;
        rest = tail;
    }

    let mut entries = Vec::new();
    let mut dollars = usize::from(resume);
    let chars: Vec<char> = rest.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let entry = parse_entry(&chars, &mut i, entries.len(), vocab, &mut dollars)?;
        entries.push(entry);
    }

    if dollars > 1 {
        return Err(StenoError::invalid(steno, "at most one `$` is allowed"));
    }
    if let Some((first, last)) = chunks {
        if last > first && dollars > 0 {
            return Err(StenoError::invalid(
                steno,
                "`$` cannot be combined with multi-chunk work",
            ));
        }
    }
    if entries.is_empty() && !resume && chunks.is_none() {
        return Err(StenoError::invalid(steno, "empty steno"));
    }

    Ok(ParsedSteno { chunks, resume, entries })
}

/// Removes balanced `(...)` comments (iteratively, so nesting unwinds from
/// the inside out) and then all whitespace.
fn strip_comments(steno: &str) -> Result<String, StenoError> {
    let comment = Regex::new(r"\([^()]*\)").expect("static regex");
    let mut text = steno.to_string();
    loop {
        let stripped = comment.replace_all(&text, "").into_owned();
        if stripped == text {
            break;
        }
        text = stripped;
    }
    if text.contains('(') || text.contains(')') {
        return Err(StenoError::invalid(&text, "unbalanced comment parentheses"));
    }
    Ok(text.split_whitespace().collect())
}

fn parse_chunk_directive(rest: &mut &str) -> Result<Option<(u32, u32)>, StenoError> {
    let directive = Regex::new(r"^([0-9]+)(?:-([0-9]+))?\*").expect("static regex");
    let text = *rest;
    let Some(caps) = directive.captures(text) else {
        return Ok(None);
    };
    let whole = caps.get(0).expect("whole match");
    let first: u32 = caps[1]
        .parse()
        .map_err(|_| StenoError::invalid(whole.as_str(), "chunk number out of range"))?;
    let last: u32 = match caps.get(2) {
        Some(m) => m
            .as_str()
            .parse()
            .map_err(|_| StenoError::invalid(whole.as_str(), "chunk number out of range"))?,
        None => first,
    };
    if first == 0 || last < first {
        return Err(StenoError::invalid(whole.as_str(), "bad chunk range"));
    }
    *rest = &text[whole.end()..];
    Ok(Some((first, last)))
}

fn parse_entry(
    chars: &[char],
    i: &mut usize,
    index: usize,
    vocab: Vocabulary,
    dollars: &mut usize,
) -> Result<MarkEntry, StenoError> {
    let mut marks = String::new();
    marks.push(read_mark(chars, i, vocab)?);

    // `&MARK`, `!MARK` and `&!MARK` continuations.
    while *i < chars.len() {
        match chars[*i] {
            '&' => {
                *i += 1;
                marks.push('&');
                if chars.get(*i) == Some(&'!') {
                    *i += 1;
                    marks.push('!');
                }
                marks.push(read_mark(chars, i, vocab)?);
            }
            '!' => {
                *i += 1;
                marks.push('!');
                marks.push(read_mark(chars, i, vocab)?);
            }
            _ => break,
        }
    }

    let mut entry = MarkEntry::new(index, marks);

    while *i < chars.len() && chars[*i] == '[' {
        let start = *i;
        let end = chars[start..]
            .iter()
            .position(|&c| c == ']')
            .map(|p| start + p)
            .ok_or_else(|| {
                StenoError::invalid(context_at(chars, start), "unterminated condition bracket")
            })?;
        let inner: String = chars[start + 1..end].iter().collect();
        entry.conditions.push(crate::conditions::CondGroup::parse(&inner)?);
        entry.conditions_src.push('[');
        entry.conditions_src.push_str(&inner);
        entry.conditions_src.push(']');
        *i = end + 1;
    }

    if *i < chars.len() && chars[*i] == '$' {
        entry.checkpoint = true;
        *dollars += 1;
        *i += 1;
    }

    Ok(entry)
}

/// Reads one mark character, folding the Classic/Extended apostrophe
/// shorthand (`N'` means `n`).
fn read_mark(chars: &[char], i: &mut usize, vocab: Vocabulary) -> Result<char, StenoError> {
    let Some(&c) = chars.get(*i) else {
        return Err(StenoError::invalid("end of steno", "expected a mark"));
    };
    if c == '&' || c == '!' || c == '[' || c == ']' || c == '$' {
        return Err(StenoError::invalid(context_at(chars, *i), "expected a mark"));
    }
    *i += 1;
    if vocab.folds_apostrophe()
        && matches!(c, 'N' | 'L' | 'R' | 'Q')
        && chars.get(*i) == Some(&'\'')
    {
        *i += 1;
        return Ok(c.to_ascii_lowercase());
    }
    if !vocab.contains(c) {
        return Err(StenoError::invalid(
            context_at(chars, *i - 1),
            format!("`{c}` is not a {} mark", vocab.name()),
        ));
    }
    Ok(c)
}

fn context_at(chars: &[char], i: usize) -> String {
    chars[i..chars.len().min(i + 8)].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_entries_one_char_each() {
        let parsed = parse("~ ~ ~ #", Vocabulary::Pgn).unwrap();
        assert_eq!(parsed.entries.len(), 4);
        assert!(!parsed.resume);
        assert!(parsed.chunks.is_none());
        assert_eq!(parsed.entries[3].marks, "#");
    }

    #[test]
    fn test_adjacent_marks_split_into_entries() {
        let parsed = parse("eeBc5N#", Vocabulary::Extended).unwrap();
        let marks: Vec<&str> = parsed.entries.iter().map(|e| e.marks.as_str()).collect();
        assert_eq!(marks, vec!["e", "e", "B", "c", "5", "N", "#"]);
    }

    #[test]
    fn test_conjunction_and_negation() {
        let parsed = parse("N&c!x e", Vocabulary::Classic).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].marks, "N&c!x");
        let atoms: Vec<_> = parsed.entries[0].user_atoms().collect();
        assert_eq!(atoms, vec![(false, 'N'), (false, 'c'), (true, 'x')]);

        // `A&B&!C` spells out the same conjunction.
        let parsed = parse("N&c&!x", Vocabulary::Classic).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        let atoms: Vec<_> = parsed.entries[0].user_atoms().collect();
        assert_eq!(atoms, vec![(false, 'N'), (false, 'c'), (true, 'x')]);
    }

    #[test]
    fn test_comments_and_whitespace() {
        let parsed = parse("(fool's mate (both orders)) ~ ~\n~ #", Vocabulary::Classic).unwrap();
        assert_eq!(parsed.entries.len(), 4);
        assert!(parse("~ ) ~", Vocabulary::Classic).is_err());
    }

    #[test]
    fn test_conditions_attach_to_entry() {
        let parsed = parse("~~~~e[=Q]", Vocabulary::Classic).unwrap();
        assert_eq!(parsed.entries.len(), 5);
        assert_eq!(parsed.entries[4].conditions.len(), 1);
        assert_eq!(parsed.entries[4].conditions_src, "[=Q]");
        assert!(parsed.entries[3].conditions.is_empty());
    }

    #[test]
    fn test_apostrophe_fold() {
        let parsed = parse("~~~~~~~~Q'", Vocabulary::Classic).unwrap();
        assert_eq!(parsed.entries[8].marks, "q");
        // PGN keeps the apostrophe out of the vocabulary entirely.
        assert!(parse("Q'", Vocabulary::Pgn).is_err());
    }

    #[test]
    fn test_dollar_rules() {
        let parsed = parse("$~~", Vocabulary::Classic).unwrap();
        assert!(parsed.resume);
        assert_eq!(parsed.entries.len(), 2);

        let parsed = parse("~~$", Vocabulary::Classic).unwrap();
        assert!(parsed.entries[1].checkpoint);

        assert!(parse("$~~$", Vocabulary::Classic).is_err());
        assert!(parse("~$~$", Vocabulary::Classic).is_err());
    }

    #[test]
    fn test_chunk_directive() {
        let parsed = parse("2-5*~~", Vocabulary::Classic).unwrap();
        assert_eq!(parsed.chunks, Some((2, 5)));
        assert_eq!(parsed.entries.len(), 2);

        let parsed = parse("3*~$", Vocabulary::Classic).unwrap();
        assert_eq!(parsed.chunks, Some((3, 3)));
        assert!(parsed.entries[0].checkpoint);

        // Multi-chunk work cannot also snapshot or resume.
        assert!(parse("2-5*~$", Vocabulary::Classic).is_err());
        assert!(parse("2-5*$~", Vocabulary::Classic).is_err());
        assert!(parse("0*~", Vocabulary::Classic).is_err());
        assert!(parse("5-2*~", Vocabulary::Classic).is_err());
    }

    #[test]
    fn test_vocabulary_rejection() {
        assert!(parse("^", Vocabulary::Classic).is_err());
        assert!(parse("^", Vocabulary::Extended).is_ok());
        assert!(parse("o", Vocabulary::Pgn).is_err());
    }
}
