//! Concurrent self-play between two contestants.
//!
//! Matches of a batch run in parallel on one rayon pool. Every move request
//! runs on its own short-lived thread and is awaited with a deadline, so a
//! slow, hung or crashing policy only costs its own match. Learning seats
//! receive one [`Experience`] per move they make.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::ai::heuristic::{positional_score, EvaluationStrategy, HeuristicKind};
use crate::ai::minimax::{MinimaxSearch, Pruning, SearchPolicy};
use crate::ai::state_encoding::{action_index, encode_board};
use crate::ai::{LearnedPolicy, Policy, RandomPolicy};
use crate::checkpoint::CheckpointManager;
use crate::error::SelfPlayError;
use crate::game::{Board, GameOutcome, Move, Player};
use crate::store::{BatchRecord, ResultsSink};
use crate::training::experience::Experience;
use crate::training::trainer::Learner;

/// Self-play configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    pub games_per_batch: usize,
    pub batches: usize,
    /// Match workers; 0 uses the available parallelism.
    pub worker_threads: usize,
    pub move_timeout_ms: u64,
    pub base_seed: u64,
    /// Scale of the positional reward given for non-terminal moves.
    pub reward_shaping: f32,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        SelfPlayConfig {
            games_per_batch: 10,
            batches: 1,
            worker_threads: 0,
            move_timeout_ms: 5000,
            base_seed: 42,
            reward_shaping: 0.0,
        }
    }
}

impl SelfPlayConfig {
    pub fn worker_count(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

/// Derive a per-match seed from a base seed and a match index.
pub fn episode_seed(base_seed: u64, episode_index: usize) -> u64 {
    let mut hash = base_seed ^ 0x517cc1b727220a95;
    let index = episode_index as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index >> 32;
    hash
}

type PolicyFactory = Arc<dyn Fn(u64) -> Box<dyn Policy> + Send + Sync>;

/// One side of a pairing: builds a fresh policy per match from a seed, and
/// optionally names the learner that should be fed its transitions.
#[derive(Clone)]
pub struct Contestant {
    name: String,
    factory: PolicyFactory,
    learner: Option<Arc<dyn Learner>>,
}

impl Contestant {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(u64) -> Box<dyn Policy> + Send + Sync + 'static,
    {
        Contestant {
            name: name.into(),
            factory: Arc::new(factory),
            learner: None,
        }
    }

    pub fn search(depth: usize, heuristic: HeuristicKind, pruning: Pruning) -> Self {
        let build = move |seed| {
            let engine =
                MinimaxSearch::new(EvaluationStrategy::from_kind(heuristic, seed)).with_pruning(pruning);
            SearchPolicy::new(engine, depth)
        };
        let name = build(0).name().to_string();
        Contestant::new(name, move |seed| Box::new(build(seed)) as Box<dyn Policy>)
    }

    pub fn random() -> Self {
        Contestant::new("Random", |seed| {
            Box::new(RandomPolicy::seeded(seed)) as Box<dyn Policy>
        })
    }

    /// Exploring policy backed by `learner`, which also receives this
    /// seat's transitions.
    pub fn learned(learner: Arc<dyn Learner>) -> Self {
        let shared = Arc::clone(&learner);
        let mut contestant = Contestant::new(format!("Learned({})", learner.name()), move |_| {
            Box::new(LearnedPolicy::new(Arc::clone(&shared))) as Box<dyn Policy>
        });
        contestant.learner = Some(learner);
        contestant
    }

    /// Inference only: plays the learner's best legal move and feeds it
    /// nothing.
    pub fn greedy(learner: Arc<dyn Learner>) -> Self {
        let name = format!("Greedy({})", learner.name());
        Contestant::new(name, move |_| {
            Box::new(LearnedPolicy::greedy(Arc::clone(&learner))) as Box<dyn Policy>
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn learner(&self) -> Option<&Arc<dyn Learner>> {
        self.learner.as_ref()
    }

    fn policy(&self, seed: u64) -> Box<dyn Policy> {
        (self.factory)(seed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Winner(Seat),
    Draw,
}

impl MatchOutcome {
    fn reward_for(self, seat: Seat) -> f32 {
        match self {
            MatchOutcome::Winner(winner) if winner == seat => 1.0,
            MatchOutcome::Winner(_) => -1.0,
            MatchOutcome::Draw => 0.0,
        }
    }
}

/// Why a seat lost without the game running to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForfeitReason {
    Timeout,
    Panic(String),
    IllegalMove(Move),
    /// The policy returned no move although legal moves existed.
    NoMove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    pub forfeit: Option<(Seat, ForfeitReason)>,
    /// Discs placed before the match ended.
    pub moves: usize,
    /// Colour of the first seat.
    pub first_color: Player,
    pub final_board: Board,
}

/// Outcome counters shared by all match workers of a batch.
#[derive(Debug, Default)]
pub struct MatchTally {
    first_wins: AtomicU32,
    second_wins: AtomicU32,
    draws: AtomicU32,
    completed: AtomicU32,
}

impl MatchTally {
    pub fn record(&self, outcome: MatchOutcome) {
        let counter = match outcome {
            MatchOutcome::Winner(Seat::First) => &self.first_wins,
            MatchOutcome::Winner(Seat::Second) => &self.second_wins,
            MatchOutcome::Draw => &self.draws,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn to_record(&self, duration: Duration) -> BatchRecord {
        BatchRecord {
            total_games: self.completed(),
            first_bot_wins: self.first_wins.load(Ordering::Relaxed),
            second_bot_wins: self.second_wins.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Everything a batch produced, in match order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch: usize,
    pub record: BatchRecord,
    pub results: Vec<MatchResult>,
}

impl BatchReport {
    /// Share of matches won by `seat`; draws count as non-wins.
    pub fn win_rate(&self, seat: Seat) -> f64 {
        if self.record.total_games == 0 {
            return 0.0;
        }
        let wins = match seat {
            Seat::First => self.record.first_bot_wins,
            Seat::Second => self.record.second_bot_wins,
        };
        f64::from(wins) / f64::from(self.record.total_games)
    }

    /// Win rate of a learner that sat in both seats: each match counts as
    /// two games for it, one per seat.
    pub fn combined_win_rate(&self) -> f64 {
        if self.record.total_games == 0 {
            return 0.0;
        }
        let wins = self.record.first_bot_wins + self.record.second_bot_wins;
        f64::from(wins) / (2.0 * f64::from(self.record.total_games))
    }
}

/// Per-seat state inside one match.
struct SeatState {
    seat: Seat,
    color: Player,
    policy: Option<Box<dyn Policy>>,
    learner: Option<Arc<dyn Learner>>,
    /// Last non-terminal transition handed to the learner.
    pending: Option<Experience>,
}

pub struct SelfPlayOrchestrator {
    config: SelfPlayConfig,
    match_pool: ThreadPool,
    results: Option<Arc<dyn ResultsSink>>,
    checkpoints: Option<CheckpointManager>,
}

impl SelfPlayOrchestrator {
    pub fn new(config: SelfPlayConfig) -> Result<Self, SelfPlayError> {
        let workers = config.worker_count();
        let match_pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("match-{i}"))
            .build()
            .map_err(|source| SelfPlayError::ThreadPool {
                name: "match",
                source,
            })?;

        Ok(SelfPlayOrchestrator {
            config,
            match_pool,
            results: None,
            checkpoints: None,
        })
    }

    pub fn with_results(mut self, sink: Arc<dyn ResultsSink>) -> Self {
        self.results = Some(sink);
        self
    }

    pub fn with_checkpoints(mut self, manager: CheckpointManager) -> Self {
        self.checkpoints = Some(manager);
        self
    }

    pub fn config(&self) -> &SelfPlayConfig {
        &self.config
    }

    /// Run `batches` batches back to back.
    pub fn run(&self, first: &Contestant, second: &Contestant) -> Vec<BatchReport> {
        (0..self.config.batches)
            .map(|batch| self.run_batch(first, second, batch))
            .collect()
    }

    /// Play one batch in parallel, then report, record win rates and
    /// checkpoint learners.
    pub fn run_batch(&self, first: &Contestant, second: &Contestant, batch: usize) -> BatchReport {
        let start = Instant::now();
        let tally = MatchTally::default();
        let base_seed = self.config.base_seed ^ batch as u64;

        let results: Vec<MatchResult> = self.match_pool.install(|| {
            (0..self.config.games_per_batch)
                .into_par_iter()
                .map(|i| {
                    let result = self.play_match(first, second, episode_seed(base_seed, i), i % 2 == 0);
                    tally.record(result.outcome);
                    result
                })
                .collect()
        });

        let report = BatchReport {
            batch,
            record: tally.to_record(start.elapsed()),
            results,
        };
        info!(
            "batch {}: {} games, {} {} / {} {} / {} draws in {} ms",
            batch,
            report.record.total_games,
            first.name(),
            report.record.first_bot_wins,
            second.name(),
            report.record.second_bot_wins,
            report.record.draws,
            report.record.duration_ms,
        );

        if let Some(sink) = &self.results {
            if let Err(e) = sink.append(&report.record) {
                error!("failed to write batch {batch} results: {e}");
            }
        }
        self.finish_learners(first, second, &report);
        report
    }

    fn finish_learners(&self, first: &Contestant, second: &Contestant, report: &BatchReport) {
        match (first.learner(), second.learner()) {
            (Some(a), Some(b)) if Arc::ptr_eq(a, b) => {
                a.record_win_rate(report.combined_win_rate(), first.name());
                self.checkpoint(a, report.batch);
            }
            (first_learner, second_learner) => {
                if let Some(learner) = first_learner {
                    learner.record_win_rate(report.win_rate(Seat::First), second.name());
                    self.checkpoint(learner, report.batch);
                }
                if let Some(learner) = second_learner {
                    learner.record_win_rate(report.win_rate(Seat::Second), first.name());
                    self.checkpoint(learner, report.batch);
                }
            }
        }
    }

    fn checkpoint(&self, learner: &Arc<dyn Learner>, batch: usize) {
        let Some(manager) = &self.checkpoints else {
            return;
        };
        match learner.save_checkpoint(&manager.scoped(learner.name()), batch) {
            Ok(path) => info!("checkpoint saved: {}", path.display()),
            Err(e) => warn!("checkpoint for {} failed: {e}", learner.name()),
        }
    }

    /// Play a single match to completion or forfeit.
    pub fn play_match(
        &self,
        first: &Contestant,
        second: &Contestant,
        seed: u64,
        first_is_black: bool,
    ) -> MatchResult {
        let first_color = if first_is_black {
            Player::Black
        } else {
            Player::White
        };
        let mut seats = [
            SeatState {
                seat: Seat::First,
                color: first_color,
                policy: Some(first.policy(episode_seed(seed, 0))),
                learner: first.learner().cloned(),
                pending: None,
            },
            SeatState {
                seat: Seat::Second,
                color: first_color.other(),
                policy: Some(second.policy(episode_seed(seed, 1))),
                learner: second.learner().cloned(),
                pending: None,
            },
        ];

        let mut board = Board::new();
        let mut to_move = Player::Black;
        let mut moves = 0;

        let (outcome, forfeit) = loop {
            if let Some(outcome) = board.outcome() {
                let outcome = match outcome {
                    GameOutcome::Winner(color) if color == first_color => MatchOutcome::Winner(Seat::First),
                    GameOutcome::Winner(_) => MatchOutcome::Winner(Seat::Second),
                    GameOutcome::Draw => MatchOutcome::Draw,
                };
                break (outcome, None);
            }
            if !board.has_legal_move(to_move) {
                to_move = to_move.other();
                continue;
            }

            let state = &mut seats[if to_move == first_color { 0 } else { 1 }];
            match self.take_turn(state, &mut board) {
                Ok(()) => {
                    moves += 1;
                    to_move = to_move.other();
                }
                Err(reason) => {
                    let loser = state.seat;
                    warn!(
                        "{} forfeits after {moves} moves: {reason:?}",
                        if loser == Seat::First { first.name() } else { second.name() }
                    );
                    break (MatchOutcome::Winner(loser.other()), Some((loser, reason)));
                }
            }
        };

        // A learner whose last transition was not terminal still needs to
        // see how the match ended.
        for state in &mut seats {
            if let (Some(learner), Some(mut last)) = (&state.learner, state.pending.take()) {
                last.done = true;
                last.reward = outcome.reward_for(state.seat);
                learner.learn(last);
            }
        }

        MatchResult {
            outcome,
            forfeit,
            moves,
            first_color,
            final_board: board,
        }
    }

    /// Ask the seat's policy for a move, apply it, and feed the learner.
    fn take_turn(&self, state: &mut SeatState, board: &mut Board) -> Result<(), ForfeitReason> {
        let policy = state.policy.take().ok_or(ForfeitReason::NoMove)?;
        let (policy, choice) = self.request_move(policy, *board, state.color);
        state.policy = policy;

        let mv = choice?.ok_or(ForfeitReason::NoMove)?;
        let before = encode_board(board, state.color);
        board
            .play(state.color, mv)
            .map_err(|_| ForfeitReason::IllegalMove(mv))?;

        if let Some(learner) = &state.learner {
            let done = board.is_terminal();
            let reward = match board.outcome() {
                Some(GameOutcome::Winner(color)) if color == state.color => 1.0,
                Some(GameOutcome::Winner(_)) => -1.0,
                Some(GameOutcome::Draw) => 0.0,
                None => (self.config.reward_shaping * positional_score(board, state.color) as f32)
                    .clamp(-1.0, 1.0),
            };
            let experience = Experience::new(
                before,
                action_index(mv),
                reward,
                encode_board(board, state.color),
                done,
            );
            state.pending = (!done).then(|| experience.clone());
            learner.learn(experience);
        }
        Ok(())
    }

    /// Run `choose_move` on a detached thread and wait for it. The policy
    /// comes back unless the call timed out or panicked. A timed-out thread
    /// is left to finish on its own and holds nothing other matches need.
    fn request_move(
        &self,
        mut policy: Box<dyn Policy>,
        board: Board,
        player: Player,
    ) -> (Option<Box<dyn Policy>>, Result<Option<Move>, ForfeitReason>) {
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name(format!("move-{player:?}").to_lowercase())
            .spawn(move || {
                let choice =
                    panic::catch_unwind(AssertUnwindSafe(|| policy.choose_move(&board, player)));
                // The receiver is gone after a timeout
                let _ = tx.send((policy, choice));
            });
        if let Err(e) = spawned {
            error!("failed to start move thread: {e}");
            return (None, Err(ForfeitReason::Panic(format!("move thread not started: {e}"))));
        }

        match rx.recv_timeout(Duration::from_millis(self.config.move_timeout_ms)) {
            Ok((policy, Ok(choice))) => (Some(policy), Ok(choice)),
            Ok((_, Err(payload))) => (None, Err(ForfeitReason::Panic(panic_message(payload)))),
            Err(RecvTimeoutError::Timeout) => (None, Err(ForfeitReason::Timeout)),
            Err(RecvTimeoutError::Disconnected) => (
                None,
                Err(ForfeitReason::Panic("move task dropped its channel".to_string())),
            ),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::model::QModel;
    use crate::store::InMemoryStore;
    use crate::training::test_support::{FailingStore, StubModel};
    use crate::training::{Trainer, TrainerConfig, TrainerHandle};

    struct Sleeper;

    impl Policy for Sleeper {
        fn choose_move(&mut self, board: &Board, player: Player) -> Option<Move> {
            thread::sleep(Duration::from_millis(400));
            board.legal_moves(player).first().copied()
        }

        fn name(&self) -> &str {
            "Sleeper"
        }
    }

    /// Never answers within any reasonable deadline.
    struct Hanger;

    impl Policy for Hanger {
        fn choose_move(&mut self, board: &Board, player: Player) -> Option<Move> {
            thread::sleep(Duration::from_secs(5));
            board.legal_moves(player).first().copied()
        }

        fn name(&self) -> &str {
            "Hanger"
        }
    }

    struct Crasher;

    impl Policy for Crasher {
        fn choose_move(&mut self, _board: &Board, _player: Player) -> Option<Move> {
            panic!("evaluation blew up");
        }

        fn name(&self) -> &str {
            "Crasher"
        }
    }

    /// Always plays a1, which is never legal from the opening.
    struct Cornerer;

    impl Policy for Cornerer {
        fn choose_move(&mut self, _board: &Board, _player: Player) -> Option<Move> {
            Some(Move::new(0, 0))
        }

        fn name(&self) -> &str {
            "Cornerer"
        }
    }

    fn config(games_per_batch: usize, move_timeout_ms: u64) -> SelfPlayConfig {
        SelfPlayConfig {
            games_per_batch,
            worker_threads: 2,
            move_timeout_ms,
            base_seed: 7,
            ..SelfPlayConfig::default()
        }
    }

    fn config_for(games_per_batch: usize) -> SelfPlayConfig {
        config(games_per_batch, 5000)
    }

    fn student(batch_size: usize) -> TrainerHandle<StubModel> {
        let config = TrainerConfig {
            batch_size,
            seed: Some(5),
            ..TrainerConfig::default()
        };
        TrainerHandle::new(Trainer::new(StubModel::constant(0.0), config).with_name("student"))
    }

    #[test]
    fn test_episode_seed_deterministic() {
        assert_eq!(episode_seed(42, 100), episode_seed(42, 100));
    }

    #[test]
    fn test_episode_seed_varies() {
        let s1 = episode_seed(42, 0);
        let s2 = episode_seed(42, 1);
        let s3 = episode_seed(42, 2);
        assert_ne!(s1, s2);
        assert_ne!(s2, s3);
        assert_ne!(s1, s3);
        assert_ne!(episode_seed(1, 0), episode_seed(2, 0));
    }

    #[test]
    fn test_tally_counts() {
        let tally = MatchTally::default();
        tally.record(MatchOutcome::Winner(Seat::First));
        tally.record(MatchOutcome::Winner(Seat::First));
        tally.record(MatchOutcome::Draw);
        let record = tally.to_record(Duration::from_millis(12));
        assert_eq!(record.total_games, 3);
        assert_eq!(record.first_bot_wins, 2);
        assert_eq!(record.second_bot_wins, 0);
        assert_eq!(record.draws, 1);
        assert_eq!(record.duration_ms, 12);
    }

    #[test]
    fn test_fixed_seed_batch_is_reproducible() {
        let first = Contestant::search(2, HeuristicKind::Positional, Pruning::AlphaBeta);
        let second = Contestant::random();

        let run = || {
            let orchestrator = SelfPlayOrchestrator::new(config(10, 5000)).unwrap();
            orchestrator.run_batch(&first, &second, 0)
        };
        let a = run();
        let b = run();

        let r = &a.record;
        assert_eq!(r.total_games, 10);
        assert_eq!(r.first_bot_wins + r.second_bot_wins + r.draws, 10);
        assert_eq!(
            (r.first_bot_wins, r.second_bot_wins, r.draws),
            (b.record.first_bot_wins, b.record.second_bot_wins, b.record.draws)
        );
        let outcomes = |report: &BatchReport| -> Vec<(MatchOutcome, Board)> {
            report
                .results
                .iter()
                .map(|m| (m.outcome, m.final_board))
                .collect()
        };
        assert_eq!(outcomes(&a), outcomes(&b));
        assert!(a.results.iter().all(|m| m.forfeit.is_none()));
    }

    #[test]
    fn test_seats_alternate_colours() {
        let orchestrator = SelfPlayOrchestrator::new(config(4, 5000)).unwrap();
        let report =
            orchestrator.run_batch(&Contestant::random(), &Contestant::random(), 0);
        let colours: Vec<Player> = report.results.iter().map(|m| m.first_color).collect();
        assert_eq!(
            colours,
            vec![Player::Black, Player::White, Player::Black, Player::White]
        );
    }

    #[test]
    fn test_timeout_forfeits_to_opponent() {
        let orchestrator = SelfPlayOrchestrator::new(config(2, 50)).unwrap();
        let sleeper = Contestant::new("Sleeper", |_| Box::new(Sleeper) as Box<dyn Policy>);
        let report = orchestrator.run_batch(&sleeper, &Contestant::random(), 0);

        assert_eq!(report.record.second_bot_wins, 2);
        for result in &report.results {
            assert_eq!(result.forfeit, Some((Seat::First, ForfeitReason::Timeout)));
        }
    }

    #[test]
    fn test_hung_moves_do_not_starve_later_matches() {
        let orchestrator = SelfPlayOrchestrator::new(SelfPlayConfig {
            games_per_batch: 4,
            worker_threads: 1,
            move_timeout_ms: 100,
            ..SelfPlayConfig::default()
        })
        .unwrap();
        let hanger = Contestant::new("Hanger", |_| Box::new(Hanger) as Box<dyn Policy>);

        let stalled = orchestrator.run_batch(&hanger, &Contestant::random(), 0);
        assert_eq!(stalled.record.second_bot_wins, 4);

        // Four abandoned moves are still sleeping while this batch plays
        let healthy = orchestrator.run_batch(&Contestant::random(), &Contestant::random(), 1);
        assert_eq!(healthy.record.total_games, 4);
        assert!(healthy.results.iter().all(|m| m.forfeit.is_none()));
    }

    #[test]
    fn test_panic_forfeits_to_opponent() {
        let orchestrator = SelfPlayOrchestrator::new(config(2, 5000)).unwrap();
        let crasher = Contestant::new("Crasher", |_| Box::new(Crasher) as Box<dyn Policy>);
        let report = orchestrator.run_batch(&Contestant::random(), &crasher, 0);

        assert_eq!(report.record.first_bot_wins, 2);
        let (seat, reason) = report.results[0].forfeit.clone().unwrap();
        assert_eq!(seat, Seat::Second);
        assert_eq!(reason, ForfeitReason::Panic("evaluation blew up".to_string()));
    }

    #[test]
    fn test_illegal_move_forfeits() {
        let orchestrator = SelfPlayOrchestrator::new(config(1, 5000)).unwrap();
        let cornerer = Contestant::new("Cornerer", |_| Box::new(Cornerer) as Box<dyn Policy>);
        let report = orchestrator.run_batch(&cornerer, &Contestant::random(), 0);

        assert_eq!(report.record.second_bot_wins, 1);
        assert_eq!(
            report.results[0].forfeit,
            Some((Seat::First, ForfeitReason::IllegalMove(Move::new(0, 0))))
        );
        assert_eq!(report.results[0].moves, 0);
    }

    #[test]
    fn test_learner_seat_receives_experiences() {
        let handle = student(1000);
        let learner: Arc<dyn Learner> = Arc::new(handle.clone());
        let orchestrator = SelfPlayOrchestrator::new(config(2, 5000)).unwrap();
        let report = orchestrator.run_batch(&Contestant::learned(learner), &Contestant::random(), 0);

        let trainer = handle.lock();
        assert!(trainer.buffer().len() > 2);
        // Exactly one terminal transition per match
        assert_eq!(trainer.buffer().iter().filter(|e| e.done).count(), 2);
        assert_eq!(trainer.metrics().total_games(), 2);
        assert_eq!(trainer.win_rate(), report.win_rate(Seat::First));
    }

    #[test]
    fn test_learner_trains_during_play() {
        let handle = student(8);
        let learner: Arc<dyn Learner> = Arc::new(handle.clone());
        let orchestrator = SelfPlayOrchestrator::new(config(2, 5000)).unwrap();
        orchestrator.run_batch(&Contestant::random(), &Contestant::learned(learner), 0);

        assert!(handle.lock().model().iteration_count() > 0);
    }

    #[test]
    fn test_forfeit_replays_last_transition_as_terminal() {
        // The learner makes one move, then its opponent forfeits
        let handle = student(1000);
        let learner: Arc<dyn Learner> = Arc::new(handle.clone());
        let orchestrator = SelfPlayOrchestrator::new(config(1, 5000)).unwrap();
        let crasher = Contestant::new("Crasher", |_| Box::new(Crasher) as Box<dyn Policy>);
        orchestrator.run_batch(&Contestant::learned(learner), &crasher, 0);

        let trainer = handle.lock();
        let experiences: Vec<&Experience> = trainer.buffer().iter().collect();
        assert_eq!(experiences.len(), 2);
        assert!(!experiences[0].done);
        assert!(experiences[1].done);
        assert_eq!(experiences[1].reward, 1.0);
    }

    #[test]
    fn test_shared_learner_records_one_combined_rate() {
        let store = Arc::new(InMemoryStore::new());
        let config = TrainerConfig {
            batch_size: 1000,
            seed: Some(5),
            ..TrainerConfig::default()
        };
        let handle = TrainerHandle::new(
            Trainer::new(StubModel::constant(0.0), config)
                .with_name("mirror")
                .with_store(store.clone()),
        );
        let learner: Arc<dyn Learner> = Arc::new(handle.clone());
        let orchestrator = SelfPlayOrchestrator::new(config_for(4)).unwrap();
        let report = orchestrator.run_batch(
            &Contestant::learned(Arc::clone(&learner)),
            &Contestant::learned(learner),
            0,
        );

        let rates = store.win_rates();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].win_rate, report.combined_win_rate());
        assert_eq!(handle.lock().win_rate(), report.combined_win_rate());
    }

    #[test]
    fn test_combined_win_rate_counts_both_seats() {
        let report = BatchReport {
            batch: 0,
            record: BatchRecord {
                total_games: 4,
                first_bot_wins: 2,
                second_bot_wins: 1,
                draws: 1,
                duration_ms: 0,
            },
            results: Vec::new(),
        };
        assert_eq!(report.combined_win_rate(), 3.0 / 8.0);
        assert_eq!(report.win_rate(Seat::First), 0.5);
    }

    #[test]
    fn test_greedy_contestant_feeds_nothing() {
        let handle = student(8);
        let learner: Arc<dyn Learner> = Arc::new(handle.clone());
        let greedy = Contestant::greedy(learner);
        assert_eq!(greedy.name(), "Greedy(student)");
        assert!(greedy.learner().is_none());

        let orchestrator = SelfPlayOrchestrator::new(config_for(2)).unwrap();
        let report = orchestrator.run_batch(&greedy, &Contestant::random(), 0);
        assert_eq!(report.record.total_games, 2);
        assert!(report.results.iter().all(|m| m.forfeit.is_none()));

        let trainer = handle.lock();
        assert!(trainer.buffer().is_empty());
        assert_eq!(trainer.model().iteration_count(), 0);
    }

    #[test]
    fn test_failing_sink_and_store_do_not_stop_batch() {
        let config = TrainerConfig {
            batch_size: 8,
            seed: Some(5),
            ..TrainerConfig::default()
        };
        let handle = TrainerHandle::new(
            Trainer::new(StubModel::constant(0.0), config)
                .with_name("offline")
                .with_store(Arc::new(FailingStore)),
        );
        let learner: Arc<dyn Learner> = Arc::new(handle.clone());
        let orchestrator = SelfPlayOrchestrator::new(config_for(3))
            .unwrap()
            .with_results(Arc::new(FailingStore));

        let report = orchestrator.run_batch(&Contestant::learned(learner), &Contestant::random(), 0);
        assert_eq!(report.record.total_games, 3);
        assert_eq!(report.results.len(), 3);
        assert_eq!(
            report.record.first_bot_wins + report.record.second_bot_wins + report.record.draws,
            3
        );

        let trainer = handle.lock();
        assert!(trainer.buffer().len() > 3);
        assert!(trainer.model().iteration_count() > 0);
        assert_eq!(trainer.win_rate(), report.win_rate(Seat::First));
    }

    #[test]
    fn test_batch_reports_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(InMemoryStore::new());
        let handle = student(1000);
        let learner: Arc<dyn Learner> = Arc::new(handle);

        let mut cfg = config(2, 5000);
        cfg.batches = 2;
        let orchestrator = SelfPlayOrchestrator::new(cfg)
            .unwrap()
            .with_results(sink.clone())
            .with_checkpoints(CheckpointManager::new(
                crate::checkpoint::CheckpointManagerConfig {
                    checkpoint_dir: dir.path().to_path_buf(),
                    ..Default::default()
                },
            ));

        let reports = orchestrator.run(&Contestant::learned(learner), &Contestant::random());
        assert_eq!(reports.len(), 2);
        assert_eq!(sink.batches().len(), 2);
        assert!(sink.batches().iter().all(|b| b.total_games == 2));
        assert!(dir.path().join("student").join("checkpoint_0000001").is_dir());
    }
}
