//! Bracketed post-move conditions.
//!
//! A condition block `[..]` is one group; all groups attached to a mark must
//! hold. Inside a group, `|` separates alternatives and `&` joins atoms of
//! one alternative. Piece letters are uppercase for White, lowercase for
//! Black; `L`/`l` and `D`/`d` name the light- and dark-squared bishops.

use std::fmt;

use crate::error::StenoError;

/// A full square, a file, or a rank. `e4`, `e`, and `4` are all valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialSquare {
    /// 0-based file index (a = 0).
    pub file: Option<u8>,
    /// 0-based rank index (rank 1 = 0).
    pub rank: Option<u8>,
}

impl PartialSquare {
    pub fn parse(text: &str) -> Result<Self, StenoError> {
        let mut chars = text.chars().peekable();
        let mut file = None;
        let mut rank = None;
        if let Some(&c) = chars.peek() {
            if ('a'..='h').contains(&c) {
                file = Some(c as u8 - b'a');
                chars.next();
            }
        }
        if let Some(&c) = chars.peek() {
            if ('1'..='8').contains(&c) {
                rank = Some(c as u8 - b'1');
                chars.next();
            }
        }
        if chars.next().is_some() || (file.is_none() && rank.is_none()) {
            return Err(StenoError::invalid(text, "expected a square, file or rank"));
        }
        Ok(PartialSquare { file, rank })
    }

    /// Every (file, rank) pair the partial square denotes.
    pub fn squares(&self) -> Vec<(u8, u8)> {
        match (self.file, self.rank) {
            (Some(f), Some(r)) => vec![(f, r)],
            (Some(f), None) => (0..8).map(|r| (f, r)).collect(),
            (None, Some(r)) => (0..8).map(|f| (f, r)).collect(),
            (None, None) => Vec::new(),
        }
    }

    pub fn covers(&self, file: u8, rank: u8) -> bool {
        self.file.map_or(true, |f| f == file) && self.rank.map_or(true, |r| r == rank)
    }
}

impl fmt::Display for PartialSquare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = self.file {
            write!(f, "{}", (b'a' + file) as char)?;
        }
        if let Some(rank) = self.rank {
            write!(f, "{}", (b'1' + rank) as char)?;
        }
        Ok(())
    }
}

/// One condition atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CondAtom {
    /// `xP`: this move captured a piece of the given type (colour implicit).
    CapturedNow(char),
    /// `XPP..`: every listed piece has been captured over the game so far.
    CapturedAll(String),
    /// `=PP..`: every listed piece has been created by promotion; an empty
    /// list means "any promotion has happened".
    PromotedAll(String),
    /// `^R`: some White pawn stands on rank >= R (0-based stored).
    WhitePawnAtLeast(u8),
    /// `vR`: some Black pawn stands on rank <= R (0-based stored).
    BlackPawnAtMost(u8),
    /// `-sq`: the square (or the whole file/rank) is empty.
    Empty(PartialSquare),
    /// `psq`: the given piece stands on the square (or anywhere on the
    /// file/rank).
    PieceAt(char, PartialSquare),
    /// `@sq`: the moving piece originated on the square.
    OriginWas(PartialSquare),
}

const COND_PIECES: &str = "PNBRQKLDpnbrqkld";

impl CondAtom {
    fn parse(text: &str) -> Result<Self, StenoError> {
        let mut chars = text.chars();
        let head = chars
            .next()
            .ok_or_else(|| StenoError::invalid(text, "empty condition atom"))?;
        let rest = chars.as_str();
        match head {
            'x' => {
                let mut rest_chars = rest.chars();
                match (rest_chars.next(), rest_chars.next()) {
                    (Some(p), None) if COND_PIECES.contains(p) => Ok(CondAtom::CapturedNow(p)),
                    _ => Err(StenoError::invalid(text, "expected one captured piece letter")),
                }
            }
            'X' => {
                if rest.is_empty() || !rest.chars().all(|p| COND_PIECES.contains(p)) {
                    return Err(StenoError::invalid(text, "expected captured piece letters"));
                }
                Ok(CondAtom::CapturedAll(rest.to_string()))
            }
            '=' => {
                if !rest.chars().all(|p| COND_PIECES.contains(p)) {
                    return Err(StenoError::invalid(text, "expected promoted piece letters"));
                }
                Ok(CondAtom::PromotedAll(rest.to_string()))
            }
            '^' | 'v' => {
                let rank = rest
                    .chars()
                    .next()
                    .filter(|c| ('1'..='8').contains(c) && rest.len() == 1)
                    .ok_or_else(|| StenoError::invalid(text, "expected a rank digit"))?;
                let rank = rank as u8 - b'1';
                if head == '^' {
                    Ok(CondAtom::WhitePawnAtLeast(rank))
                } else {
                    Ok(CondAtom::BlackPawnAtMost(rank))
                }
            }
            '-' => Ok(CondAtom::Empty(PartialSquare::parse(rest)?)),
            '@' => Ok(CondAtom::OriginWas(PartialSquare::parse(rest)?)),
            p if COND_PIECES.contains(p) => Ok(CondAtom::PieceAt(p, PartialSquare::parse(rest)?)),
            _ => Err(StenoError::invalid(text, "unrecognised condition atom")),
        }
    }
}

impl fmt::Display for CondAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CondAtom::CapturedNow(p) => write!(f, "x{p}"),
            CondAtom::CapturedAll(ps) => write!(f, "X{ps}"),
            CondAtom::PromotedAll(ps) => write!(f, "={ps}"),
            CondAtom::WhitePawnAtLeast(r) => write!(f, "^{}", r + 1),
            CondAtom::BlackPawnAtMost(r) => write!(f, "v{}", r + 1),
            CondAtom::Empty(sq) => write!(f, "-{sq}"),
            CondAtom::PieceAt(p, sq) => write!(f, "{p}{sq}"),
            CondAtom::OriginWas(sq) => write!(f, "@{sq}"),
        }
    }
}

/// One bracket group: a disjunction of conjunctions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondGroup {
    pub any: Vec<Vec<CondAtom>>,
}

impl CondGroup {
    /// Parses the text between `[` and `]`.
    pub fn parse(inner: &str) -> Result<Self, StenoError> {
        let mut any = Vec::new();
        for alternative in inner.split('|') {
            let mut all = Vec::new();
            for atom in alternative.split('&') {
                all.push(CondAtom::parse(atom)?);
            }
            any.push(all);
        }
        Ok(CondGroup { any })
    }

    /// Convenience constructor for a single-atom group.
    pub fn single(atom: CondAtom) -> Self {
        CondGroup { any: vec![vec![atom]] }
    }

    /// A group whose alternatives are each a single atom.
    pub fn any_of(atoms: Vec<CondAtom>) -> Self {
        CondGroup {
            any: atoms.into_iter().map(|a| vec![a]).collect(),
        }
    }
}

impl fmt::Display for CondGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, alternative) in self.any.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            for (j, atom) in alternative.iter().enumerate() {
                if j > 0 {
                    write!(f, "&")?;
                }
                write!(f, "{atom}")?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_square_forms() {
        let full = PartialSquare::parse("e4").unwrap();
        assert_eq!(full.squares(), vec![(4, 3)]);

        let file = PartialSquare::parse("e").unwrap();
        assert_eq!(file.squares().len(), 8);
        assert!(file.covers(4, 6));
        assert!(!file.covers(3, 6));

        let rank = PartialSquare::parse("4").unwrap();
        assert_eq!(rank.squares().len(), 8);

        assert!(PartialSquare::parse("").is_err());
        assert!(PartialSquare::parse("e9").is_err());
        assert!(PartialSquare::parse("4e").is_err());
    }

    #[test]
    fn test_atom_parse_roundtrip() {
        for text in ["xq", "XQr", "=QN", "=", "^6", "v3", "-f1", "-e", "Rh1", "nb1", "@e2", "@d"] {
            let atom = CondAtom::parse(text).unwrap();
            assert_eq!(atom.to_string(), text, "roundtrip for {text}");
        }
    }

    #[test]
    fn test_group_parse() {
        let group = CondGroup::parse("^6|=Q").unwrap();
        assert_eq!(group.any.len(), 2);
        assert_eq!(group.to_string(), "[^6|=Q]");

        let group = CondGroup::parse("xP&-e4|XQ").unwrap();
        assert_eq!(group.any[0].len(), 2);
        assert_eq!(group.any[1].len(), 1);

        assert!(CondGroup::parse("?z").is_err());
        assert!(CondGroup::parse("x").is_err());
        assert!(CondGroup::parse("xqq").is_err());
    }
}
