//! Adapter over the chess-rules library.
//!
//! The solver only talks to this wrapper: FEN/key round-trips, legal move
//! enumeration, defensive move application, SAN rendering, and endgame
//! classification. Everything else in the crate treats `shakmaty` values as
//! opaque move/square data.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, File, FromSetup, Move, MoveList, Position, Rank, Role, Square};
use tracing::error;

use crate::config::StartPosition;
use crate::error::SolveError;

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndgameKind {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
}

impl EndgameKind {
    /// The PGN result token from the point of view of the player who just
    /// moved.
    pub fn result_token(&self, mover_was_white: bool) -> &'static str {
        match self {
            EndgameKind::Checkmate => {
                if mover_was_white {
                    "1-0"
                } else {
                    "0-1"
                }
            }
            EndgameKind::Stalemate | EndgameKind::InsufficientMaterial => "½-½",
        }
    }
}

/// A position plus the number of half-moves played to reach it.
#[derive(Debug, Clone)]
pub struct Board {
    pos: Chess,
    ply: usize,
    chess960: bool,
}

impl Board {
    pub fn from_start(start: &StartPosition) -> Result<Self, SolveError> {
        match start {
            StartPosition::Standard => Ok(Board {
                pos: Chess::default(),
                ply: 0,
                chess960: false,
            }),
            StartPosition::Chess960 { back_rank } => {
                let fen = format!(
                    "{}/pppppppp/8/8/8/8/PPPPPPPP/{} w KQkq - 0 1",
                    back_rank.to_lowercase(),
                    back_rank.to_uppercase()
                );
                Ok(Board {
                    pos: parse_fen(&fen, CastlingMode::Chess960)?,
                    ply: 0,
                    chess960: true,
                })
            }
            StartPosition::Fen(fen) => Ok(Board {
                pos: parse_fen(fen, CastlingMode::Standard)?,
                ply: 0,
                chess960: false,
            }),
        }
    }

    /// Rebuilds a board from a position key; the dropped FEN counters are
    /// derived from the number of half-moves played.
    pub fn from_key(key: &str, ply: usize, chess960: bool) -> Result<Self, SolveError> {
        let mode = if chess960 {
            CastlingMode::Chess960
        } else {
            CastlingMode::Standard
        };
        let fen = format!("{} 0 {}", key, ply / 2 + 1);
        Ok(Board {
            pos: parse_fen(&fen, mode)?,
            ply,
            chess960,
        })
    }

    /// The position key: the first four FEN fields.
    pub fn key(&self) -> String {
        let fen = Fen::from_position(self.pos.clone(), EnPassantMode::Legal).to_string();
        fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
    }

    pub fn ply(&self) -> usize {
        self.ply
    }

    pub fn white_to_move(&self) -> bool {
        self.pos.turn() == Color::White
    }

    pub fn is_check(&self) -> bool {
        self.pos.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.pos.is_checkmate()
    }

    pub fn legal_moves(&self) -> MoveList {
        self.pos.legal_moves()
    }

    pub fn endgame(&self) -> Option<EndgameKind> {
        if self.pos.is_checkmate() {
            Some(EndgameKind::Checkmate)
        } else if self.pos.is_stalemate() {
            Some(EndgameKind::Stalemate)
        } else if self.pos.has_insufficient_material(Color::White)
            && self.pos.has_insufficient_material(Color::Black)
        {
            Some(EndgameKind::InsufficientMaterial)
        } else {
            None
        }
    }

    /// Applies a legal move on a fresh FEN copy of the position.
    ///
    /// The copy-before-make is deliberate: a freshly loaded board may report
    /// an endgame the incumbent copy missed, and such moves are skipped
    /// (`None`). A move the rules library rejects outright is an invariant
    /// violation and panics after logging the FEN and move.
    pub fn make(&self, m: &Move) -> Option<Board> {
        let copy = match Board::from_key(&self.key(), self.ply, self.chess960) {
            Ok(b) => b,
            Err(e) => {
                error!(fen = %self.key(), "board copy failed: {e}");
                panic!("board service failed to round-trip its own FEN");
            }
        };
        if copy.endgame().is_some() {
            return None;
        }
        match copy.pos.play(m) {
            Ok(pos) => Some(Board {
                pos,
                ply: self.ply + 1,
                chess960: self.chess960,
            }),
            Err(_) => {
                error!(fen = %self.key(), mv = %m, "board service rejected a generated move");
                panic!("board service rejected a generated move");
            }
        }
    }

    /// SAN for a legal move of this position, with `+`/`#` appended from the
    /// post-move board.
    pub fn san_with_suffix(&self, m: &Move, after: &Board) -> String {
        let mut san = San::from_move(&self.pos, m).to_string();
        if after.pos.is_checkmate() {
            san.push('#');
        } else if after.pos.is_check() {
            san.push('+');
        }
        san
    }

    /// Minimal SAN disambiguation of a move (PGN dialect marks match it).
    pub fn san_disambiguation(&self, m: &Move) -> (Option<u32>, Option<u32>) {
        match San::from_move(&self.pos, m) {
            San::Normal { file, rank, .. } => {
                (file.map(|f| f as u32), rank.map(|r| r as u32))
            }
            _ => (None, None),
        }
    }

    /// The multiset character for the piece this move captures, if any.
    /// Bishops record their square shade (`L`/`D`, lowercase for Black).
    pub fn capture_char(&self, m: &Move) -> Option<char> {
        let victim_white = !self.white_to_move();
        match m {
            Move::Normal { capture: Some(role), to, .. } => {
                Some(piece_char(*role, victim_white, square_is_light(*to)))
            }
            Move::EnPassant { .. } => Some(piece_char(Role::Pawn, victim_white, false)),
            _ => None,
        }
    }

    /// The multiset character for the piece this move promotes to, if any.
    pub fn promotion_char(&self, m: &Move) -> Option<char> {
        match m {
            Move::Normal { promotion: Some(role), to, .. } => {
                Some(piece_char(*role, self.white_to_move(), square_is_light(*to)))
            }
            _ => None,
        }
    }

    pub fn piece_at(&self, file: u32, rank: u32) -> Option<(char, bool)> {
        let sq = Square::from_coords(File::new(file), Rank::new(rank));
        self.pos.board().piece_at(sq).map(|p| {
            (
                piece_char(p.role, p.color == Color::White, square_is_light(sq)),
                square_is_light(sq),
            )
        })
    }

    /// Is any pawn of the given colour on a rank satisfying `pred`?
    pub fn pawn_on_rank(&self, white: bool, pred: impl Fn(u32) -> bool) -> bool {
        for rank in 0..8 {
            for file in 0..8 {
                if let Some((c, _)) = self.piece_at(file, rank) {
                    if (white && c == 'P' || !white && c == 'p') && pred(rank) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

fn parse_fen(fen: &str, mode: CastlingMode) -> Result<Chess, SolveError> {
    let parsed = Fen::from_ascii(fen.as_bytes())
        .map_err(|e| SolveError::InvalidFen(format!("{fen}: {e}")))?;
    Chess::from_setup(parsed.into_setup(), mode)
        .map_err(|e| SolveError::InvalidFen(format!("{fen}: {e}")))
}

/// `(file + rank)` odd means a light square.
pub fn square_is_light(sq: Square) -> bool {
    (sq.file() as u32 + sq.rank() as u32) % 2 == 1
}

/// FEN-style piece letter, with bishops split into shades.
pub fn piece_char(role: Role, white: bool, light_square: bool) -> char {
    let upper = match role {
        Role::Pawn => 'P',
        Role::Knight => 'N',
        Role::Bishop => {
            if light_square {
                'L'
            } else {
                'D'
            }
        }
        Role::Rook => 'R',
        Role::Queen => 'Q',
        Role::King => 'K',
    };
    if white {
        upper
    } else {
        upper.to_ascii_lowercase()
    }
}

/// The moving piece's role (castling counts as a king move).
pub fn move_role(m: &Move) -> Role {
    match m {
        Move::Normal { role, .. } => *role,
        Move::EnPassant { .. } => Role::Pawn,
        Move::Castle { .. } => Role::King,
        Move::Put { role, .. } => *role,
    }
}

/// The origin square; for castling, the king's square.
pub fn move_origin(m: &Move) -> Option<Square> {
    match m {
        Move::Normal { from, .. } => Some(*from),
        Move::EnPassant { from, .. } => Some(*from),
        Move::Castle { king, .. } => Some(*king),
        Move::Put { .. } => None,
    }
}

/// The destination square; for castling, where the king lands.
pub fn move_dest(m: &Move) -> Square {
    match m {
        Move::Normal { to, .. } => *to,
        Move::EnPassant { to, .. } => *to,
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() { 6 } else { 2 };
            Square::from_coords(File::new(file), king.rank())
        }
        Move::Put { to, .. } => *to,
    }
}

/// `Some(true)` for a short castle, `Some(false)` for long.
pub fn castle_side(m: &Move) -> Option<bool> {
    match m {
        Move::Castle { king, rook } => Some(rook.file() > king.file()),
        _ => None,
    }
}

pub fn is_capture(m: &Move) -> bool {
    matches!(m, Move::Normal { capture: Some(_), .. } | Move::EnPassant { .. })
}

pub fn is_en_passant(m: &Move) -> bool {
    matches!(m, Move::EnPassant { .. })
}

pub fn promotion_role(m: &Move) -> Option<Role> {
    match m {
        Move::Normal { promotion, .. } => *promotion,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> Board {
        Board::from_start(&StartPosition::Standard).unwrap()
    }

    #[test]
    fn test_key_drops_counters() {
        let board = standard();
        assert_eq!(
            board.key(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
        );
    }

    #[test]
    fn test_key_roundtrip() {
        let board = standard();
        let rebuilt = Board::from_key(&board.key(), 0, false).unwrap();
        assert_eq!(rebuilt.key(), board.key());
        assert_eq!(rebuilt.legal_moves().len(), 20);
    }

    #[test]
    fn test_make_and_san() {
        let board = standard();
        let moves = board.legal_moves();
        let e4 = moves
            .iter()
            .find(|m| move_dest(m).to_string() == "e4")
            .unwrap();
        let after = board.make(e4).unwrap();
        assert_eq!(board.san_with_suffix(e4, &after), "e4");
        assert_eq!(after.ply(), 1);
        assert!(!after.white_to_move());
    }

    #[test]
    fn test_endgame_classification() {
        // Fool's mate final position.
        let mated = Board::from_key(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq -",
            4,
            false,
        )
        .unwrap();
        assert_eq!(mated.endgame(), Some(EndgameKind::Checkmate));
        assert_eq!(EndgameKind::Checkmate.result_token(false), "0-1");

        let bare_kings = Board::from_key("8/8/4k3/8/8/4K3/8/8 w - -", 40, false).unwrap();
        assert_eq!(bare_kings.endgame(), Some(EndgameKind::InsufficientMaterial));

        assert_eq!(standard().endgame(), None);
    }

    #[test]
    fn test_square_shades() {
        assert!(!square_is_light(Square::A1));
        assert!(square_is_light(Square::H1));
        assert!(square_is_light(Square::B1));
        assert!(!square_is_light(Square::H8));
    }
}
