//! The breadth-first frontier engine.
//!
//! Mark entries are consumed strictly in order. Within one entry the live
//! positions are split into contiguous slices and expanded in parallel; the
//! next frontier is the only shared mutable state, behind one coarse mutex.
//! Successor keys that future lookahead rules out are memoised as `Dead`
//! slots for the remainder of the step.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use steno_core::{parse, CondGroup, MarkEntry, CHUNK_SIZE};

use crate::board::Board;
use crate::cancel::CancelToken;
use crate::checkpoint;
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::eval::{eval_conditions, CondInput};
use crate::frontier::{Frontier, MoveSet, Position};
use crate::lookahead::{fen_could_solve, future_needs, FutureNeeds};
use crate::matcher::{match_post, match_pre, MatchContext, PreMatch};
use crate::message::{render_board, Message, MessageSink};
use crate::meta;
use crate::validator;

/// Next-frontier slot: a reachable position, or a memoised negative
/// lookahead result.
enum Slot {
    Live(Position),
    Dead,
}

/// A final position with its retained move histories.
#[derive(Debug, Clone)]
pub struct SolvedPosition {
    pub key: String,
    pub move_sets: Vec<MoveSet>,
}

/// What a completed solve produced.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// Final positions, sorted by key.
    pub positions: Vec<SolvedPosition>,
    /// Positions examined across all entries.
    pub examined: u64,
}

pub struct Solver {
    config: SolverConfig,
    sink: Arc<dyn MessageSink>,
    pool: rayon::ThreadPool,
    cancel: Mutex<CancelToken>,
    checkpoint: Mutex<Option<Vec<u8>>>,
}

impl Solver {
    pub fn new(config: SolverConfig, sink: Arc<dyn MessageSink>) -> Result<Self, SolveError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_solver_tasks)
            .build()
            .map_err(|e| SolveError::InvalidLimit(e.to_string()))?;
        Ok(Solver {
            config,
            sink,
            pool,
            cancel: Mutex::new(CancelToken::new()),
            checkpoint: Mutex::new(None),
        })
    }

    /// The token a host can use to abort the solve in flight. A fresh token
    /// is installed at the start of every solve.
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.lock().expect("cancel mutex").clone()
    }

    /// Installs a previously saved checkpoint for `$`/chunk resumes.
    pub fn load_checkpoint(&self, bytes: Vec<u8>) -> Result<(), SolveError> {
        checkpoint::decode(&bytes)?;
        *self.checkpoint.lock().expect("checkpoint mutex") = Some(bytes);
        Ok(())
    }

    /// The most recent snapshot (loaded or produced by a `$` entry).
    pub fn checkpoint_bytes(&self) -> Option<Vec<u8>> {
        self.checkpoint.lock().expect("checkpoint mutex").clone()
    }

    pub fn solve(&self, steno: &str) -> Result<SolveOutcome, SolveError> {
        *self.cancel.lock().expect("cancel mutex") = CancelToken::new();
        match self.run(steno) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if e.is_abort() {
                    self.sink.send(Message::Abort(e.to_string()));
                } else {
                    self.sink.send(Message::Error(e.to_string()));
                }
                Err(e)
            }
        }
    }

    fn run(&self, steno: &str) -> Result<SolveOutcome, SolveError> {
        let vocab = self.config.vocabulary;
        let standard = self.config.start.is_standard();
        let chess960 = self.config.start.is_chess960();
        let parsed = parse(steno, vocab)?;

        if parsed.chunks.is_some() && !self.config.allow_chunking {
            return Err(SolveError::InvalidCheckpointChunk("chunking is disabled".into()));
        }
        let resuming = parsed.resume || parsed.chunks.is_some();

        let loaded = if resuming {
            let bytes = self
                .checkpoint
                .lock()
                .expect("checkpoint mutex")
                .clone()
                .ok_or_else(|| {
                    SolveError::InvalidCheckpointChunk("no checkpoint loaded".into())
                })?;
            Some(checkpoint::decode(&bytes)?)
        } else {
            None
        };

        // Entry list: the consumed prefix (on resume) plus the new entries.
        let mut entries: Vec<MarkEntry> = Vec::new();
        if let Some(data) = &loaded {
            for (i, stored) in data.prefix.iter().enumerate() {
                if !steno_core::entry::marks_are_valid(&stored.marks, vocab) {
                    return Err(SolveError::InvalidCheckpoint(format!(
                        "mark prefix `{}` does not fit the {} vocabulary",
                        stored.marks,
                        vocab.name()
                    )));
                }
                entries.push(MarkEntry::from_parts(i, &stored.marks, &stored.conditions)?);
            }
        }
        let start_index = entries.len();
        for (offset, mut entry) in parsed.entries.into_iter().enumerate() {
            entry.index = start_index + offset;
            entries.push(entry);
        }

        validator::validate(&entries, vocab, standard)?;
        meta::synthesise(&mut entries, vocab, standard);

        if self.config.show_meta_marks {
            for entry in &entries[start_index..] {
                self.sink.send(Message::Status(format!(
                    "mark {}: {}",
                    entry.index + 1,
                    entry.describe(true)
                )));
            }
        }

        let needs = future_needs(&entries, vocab);

        // The initial frontier(s): one per requested chunk, else a single
        // run from the checkpoint or the configured start position.
        let mut runs: Vec<Frontier> = Vec::new();
        if let Some(data) = &loaded {
            let mut full = checkpoint::rebuild_frontier(&data.frontier, chess960)?;
            match parsed.chunks {
                Some((first, last)) => {
                    let keys: Vec<String> =
                        full.sorted_keys().into_iter().cloned().collect();
                    let chunk_count = keys.len().div_ceil(CHUNK_SIZE).max(1);
                    if first as usize > chunk_count {
                        return Err(SolveError::InvalidCheckpointChunk(format!(
                            "chunk {first} of {chunk_count}"
                        )));
                    }
                    let last = (last as usize).min(chunk_count);
                    for chunk in first as usize..=last {
                        let slice =
                            &keys[(chunk - 1) * CHUNK_SIZE..(chunk * CHUNK_SIZE).min(keys.len())];
                        let mut frontier = Frontier::default();
                        for key in slice {
                            if let Some(position) = full.map.remove(key) {
                                frontier.map.insert(key.clone(), position);
                            }
                        }
                        runs.push(frontier);
                    }
                }
                None => runs.push(full),
            }
        } else {
            runs.push(Frontier::start(Board::from_start(&self.config.start)?));
        }

        let chunked = runs.len() > 1;
        let mut merged = Frontier::default();
        let mut examined_total = 0u64;
        for (run_no, mut frontier) in runs.into_iter().enumerate() {
            if chunked {
                self.sink.send(Message::Status(format!(
                    "chunk {} of this run: {} positions",
                    run_no + 1,
                    frontier.len()
                )));
            }
            // Each chunk is an independent resumed run; extinction synthesis
            // must not leak between them.
            let mut run_entries = entries.clone();
            for i in start_index..run_entries.len() {
                if self.cancel_handle().is_cancelled() {
                    return Err(SolveError::UserAborted);
                }
                let entry = run_entries[i].clone();
                frontier = self.step(&entry, frontier, &needs[i + 1], &mut examined_total)?;
                if frontier.is_empty() {
                    self.sink.send(Message::Status(format!(
                        "no positions remain after mark {}",
                        i + 1
                    )));
                    break;
                }
                if entry.checkpoint {
                    let bytes = checkpoint::encode(&frontier, &run_entries[..=i])?;
                    self.sink.send(Message::Status(format!(
                        "checkpoint saved after mark {} ({} positions, {} bytes)",
                        i + 1,
                        frontier.len(),
                        bytes.len()
                    )));
                    *self.checkpoint.lock().expect("checkpoint mutex") = Some(bytes);
                }
                meta::extinction_forecast(&mut run_entries, i + 1, &frontier, vocab);
            }
            merged.merge(frontier, self.config.max_cooks_to_keep);
        }

        let mut positions: Vec<SolvedPosition> = merged
            .map
            .into_iter()
            .map(|(key, position)| SolvedPosition {
                key,
                move_sets: position.move_sets,
            })
            .collect();
        positions.sort_by(|a, b| a.key.cmp(&b.key));

        let report = self.build_report(&positions);
        self.sink.send(Message::Success {
            positions: positions.len() as u64,
            report,
        });
        Ok(SolveOutcome {
            positions,
            examined: examined_total,
        })
    }

    /// Expands every live position by every matching move of one entry.
    fn step(
        &self,
        entry: &MarkEntry,
        frontier: Frontier,
        needs_after: &FutureNeeds,
        examined_total: &mut u64,
    ) -> Result<Frontier, SolveError> {
        let cancel = self.cancel_handle();
        let positions: Vec<Position> = frontier.map.into_values().collect();
        let total = positions.len() as u64;
        let progress_step = (total / 1000).max(1);

        let next: Mutex<HashMap<String, Slot>> = Mutex::new(HashMap::new());
        let overflow = AtomicBool::new(false);
        let examined = AtomicU64::new(0);
        let inserted = AtomicU64::new(0);

        let slice_len = positions
            .len()
            .div_ceil(self.config.max_solver_tasks)
            .max(1);
        self.pool.install(|| {
            positions.par_chunks(slice_len).for_each(|slice| {
                for position in slice {
                    if cancel.is_cancelled() || overflow.load(Ordering::Relaxed) {
                        return;
                    }
                    self.expand_position(
                        entry, position, needs_after, &cancel, &next, &overflow, &inserted, total,
                    );
                    let done = examined.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % progress_step == 0 {
                        self.sink.send(Message::InProgress {
                            entry: entry.index,
                            examined: done,
                            total,
                            inserted: inserted.load(Ordering::Relaxed),
                        });
                    }
                }
            });
        });

        *examined_total += examined.load(Ordering::Relaxed);
        if overflow.load(Ordering::Relaxed) {
            return Err(SolveError::PositionLimitReached {
                examined: self.config.max_positions_to_examine,
            });
        }
        if cancel.is_cancelled() {
            return Err(SolveError::UserAborted);
        }

        let map = next.into_inner().expect("frontier mutex");
        let mut out = Frontier::default();
        for (key, slot) in map {
            if let Slot::Live(position) = slot {
                out.map.insert(key, position);
            }
        }
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_position(
        &self,
        entry: &MarkEntry,
        position: &Position,
        needs_after: &FutureNeeds,
        cancel: &CancelToken,
        next: &Mutex<HashMap<String, Slot>>,
        overflow: &AtomicBool,
        inserted: &AtomicU64,
        total: u64,
    ) {
        // A game that already ended cannot satisfy another mark.
        if position.board.endgame().is_some() {
            return;
        }
        let vocab = self.config.vocabulary;
        let cook_cap = self.config.max_cooks_to_keep;
        let ctx = MatchContext {
            board: &position.board,
            entry,
            vocab,
        };

        for m in position.board.legal_moves() {
            if cancel.is_cancelled() || overflow.load(Ordering::Relaxed) {
                return;
            }
            let Some(pre) = match_pre(&ctx, &m, &position.move_sets) else {
                continue;
            };
            let Some(after) = position.board.make(&m) else {
                continue;
            };
            if pre.needs_post && !match_post(&ctx, &m, &after) {
                continue;
            }

            let key = after.key();
            let capture = position.board.capture_char(&m);
            let promotion = position.board.promotion_char(&m);
            let san = position.board.san_with_suffix(&m, &after);
            let result = after
                .endgame()
                .map(|end| end.result_token(position.board.white_to_move()));
            let mut extended =
                extend_histories(position, &pre, &san, capture, promotion, result);

            // Reuse: a key already admitted this step merges without any
            // recheck; a memoised negative skips outright.
            {
                let mut guard = next.lock().expect("frontier mutex");
                match guard.get_mut(&key) {
                    Some(Slot::Dead) => continue,
                    Some(Slot::Live(existing)) => {
                        existing.absorb(extended, cook_cap);
                        self.note_insertion(entry, inserted, total);
                        continue;
                    }
                    None => {}
                }
            }

            // Conditions and lookahead run outside the lock.
            let groups: Vec<&CondGroup> = entry.all_conditions().collect();
            if !groups.is_empty() {
                let input = CondInput {
                    after: &after,
                    m: &m,
                    capture,
                };
                if !eval_conditions(&groups, &input, &mut extended) {
                    continue;
                }
            }
            if position.check_future && !fen_could_solve(&key, needs_after) {
                let mut guard = next.lock().expect("frontier mutex");
                guard.entry(key).or_insert(Slot::Dead);
                continue;
            }

            let check_future = position.check_future && needs_after.any();
            let mut guard = next.lock().expect("frontier mutex");
            match guard.entry(key) {
                MapEntry::Occupied(mut occupied) => {
                    if let Slot::Live(existing) = occupied.get_mut() {
                        existing.absorb(extended, cook_cap);
                    }
                }
                MapEntry::Vacant(vacant) => {
                    extended.truncate(cook_cap + 1);
                    vacant.insert(Slot::Live(Position {
                        board: after,
                        check_future,
                        move_sets: extended,
                    }));
                    if guard.len() as u64 >= self.config.max_positions_to_examine {
                        guard.clear();
                        overflow.store(true, Ordering::Relaxed);
                        return;
                    }
                }
            }
            drop(guard);
            self.note_insertion(entry, inserted, total);
        }
    }

    fn note_insertion(&self, entry: &MarkEntry, inserted: &AtomicU64, total: u64) {
        let count = inserted.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 1000 == 0 {
            self.sink.send(Message::InProgress {
                entry: entry.index,
                examined: 0,
                total,
                inserted: count,
            });
        }
    }

    fn build_report(&self, positions: &[SolvedPosition]) -> String {
        let limit = self.config.max_solutions_to_list;
        if limit == 0 || positions.is_empty() {
            return String::new();
        }
        let cook_cap = self.config.max_cooks_to_keep;
        let mut lines = Vec::new();
        let mut listed = 0;
        'positions: for position in positions {
            if self.config.display_positions {
                lines.push(render_board(&position.key));
            }
            let overfull = position.move_sets.len() > cook_cap;
            for ms in &position.move_sets {
                if listed == limit {
                    lines.push("...".to_string());
                    break 'positions;
                }
                lines.push(ms.moves.clone());
                listed += 1;
            }
            if overfull {
                lines.push("(at least)".to_string());
            }
        }
        lines.join("\n")
    }
}

/// Extends the parent's histories (filtered to the `"` witnesses) by one
/// half-move.
fn extend_histories(
    position: &Position,
    pre: &PreMatch,
    san: &str,
    capture: Option<char>,
    promotion: Option<char>,
    result: Option<&str>,
) -> Vec<MoveSet> {
    position
        .move_sets
        .iter()
        .enumerate()
        .filter(|(i, _)| pre.witness.as_ref().map_or(true, |w| w[*i]))
        .map(|(_, ms)| ms.extended(san, capture, promotion, result))
        .collect()
}

/// One-shot convenience wiring.
pub fn solve_once(
    config: SolverConfig,
    sink: Arc<dyn MessageSink>,
    steno: &str,
) -> Result<SolveOutcome, SolveError> {
    Solver::new(config, sink)?.solve(steno)
}
