//! In-memory coaching sessions: one loaded game, its timeline and the
//! active recommendation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chess_core::{
    Attempt, AttemptOutcome, CoachingReport, GameMetadata, MoveRecord, Recommendation, Timeline,
    Validator,
};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug)]
pub struct Session {
    pub timeline: Timeline,
    pub report: CoachingReport,
    pub validator: Option<Validator>,
    /// Position shown instead of the timeline's until the next navigation.
    pinned_fen: Option<String>,
}

impl Session {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            report: CoachingReport::default(),
            validator: None,
            pinned_fen: None,
        }
    }

    pub fn validator_mut(&mut self) -> Result<&mut Validator, AppError> {
        self.validator
            .as_mut()
            .ok_or(AppError::Core(chess_core::CoreError::NoRecommendation))
    }

    pub fn is_awaiting_move(&self) -> bool {
        self.validator.as_ref().is_some_and(Validator::is_awaiting_move)
    }

    /// The position on the learner's board: the frozen position right after
    /// an attempt starts or fails, the learner's own move after a mid-game
    /// success, otherwise the timeline's current index.
    pub fn display_fen(&self) -> Result<String, AppError> {
        match &self.pinned_fen {
            Some(fen) => Ok(fen.clone()),
            None => Ok(self.timeline.current_fen()?),
        }
    }

    /// Browse the game. An open attempt stays open and keeps its frozen
    /// position.
    pub fn navigate(&mut self, index: isize) -> Result<isize, AppError> {
        let index = self.timeline.navigate(index)?;
        self.pinned_fen = None;
        Ok(index)
    }

    pub fn set_report(&mut self, report: CoachingReport, active: Option<Recommendation>) {
        self.validator = active.map(Validator::new);
        self.report = report;
        self.pinned_fen = None;
    }

    pub fn start_attempt(&mut self) -> Result<(), AppError> {
        let Session {
            timeline,
            validator,
            pinned_fen,
            ..
        } = self;
        let validator = validator
            .as_mut()
            .ok_or(AppError::Core(chess_core::CoreError::NoRecommendation))?;
        *pinned_fen = Some(validator.start_attempt(timeline)?.to_string());
        Ok(())
    }

    pub fn submit_attempt(&mut self, attempt: &Attempt) -> Result<AttemptOutcome, AppError> {
        let Session {
            timeline,
            validator,
            pinned_fen,
            ..
        } = self;
        let validator = validator
            .as_mut()
            .ok_or(AppError::Core(chess_core::CoreError::NoRecommendation))?;
        let outcome = validator.validate(timeline, attempt)?;
        *pinned_fen = match &outcome {
            AttemptOutcome::Success { appended: true, .. } => None,
            AttemptOutcome::Success { fen_after, .. } => Some(fen_after.clone()),
            AttemptOutcome::Suboptimal { .. } | AttemptOutcome::Illegal { .. } => {
                validator.frozen_fen().map(String::from)
            }
        };
        Ok(outcome)
    }

    pub fn cancel_attempt(&mut self) -> Result<(), AppError> {
        self.validator_mut()?.cancel();
        self.pinned_fen = None;
        Ok(())
    }

    pub fn snapshot(&self, id: u64) -> Result<SessionSnapshot<'_>, AppError> {
        let record = self.timeline.record();
        Ok(SessionSnapshot {
            id,
            metadata: record.metadata(),
            start_fen: record.initial_fen(),
            moves: record.moves(),
            index: self.timeline.index(),
            fen: self.display_fen()?,
            frozen_fen: self.validator.as_ref().and_then(Validator::frozen_fen),
            overview: self.report.overview.as_deref(),
            recommendations: &self.report.recommendations,
            coaching: self.validator.as_ref().map(|v| CoachingSnapshot {
                recommendation: v.recommendation(),
                state: v.state(),
                hints: v.hints(),
                hints_remaining: v.hints_remaining(),
            }),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSnapshot<'a> {
    pub id: u64,
    pub metadata: &'a GameMetadata,
    pub start_fen: &'a str,
    pub moves: &'a [MoveRecord],
    pub index: isize,
    pub fen: String,
    /// Position attempts are judged against, while one is open.
    pub frozen_fen: Option<&'a str>,
    pub overview: Option<&'a str>,
    pub recommendations: &'a [Recommendation],
    pub coaching: Option<CoachingSnapshot<'a>>,
}

#[derive(Debug, Serialize)]
pub struct CoachingSnapshot<'a> {
    pub recommendation: &'a Recommendation,
    pub state: &'a chess_core::ValidationState,
    pub hints: &'a [String],
    pub hints_remaining: usize,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    next_id: AtomicU64,
    sessions: RwLock<HashMap<u64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(id, session);
        tracing::info!(id, "Session created");
        id
    }

    /// Run `f` against session `id` under the write lock.
    pub fn with_session<R>(
        &self,
        id: u64,
        f: impl FnOnce(&mut Session) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        f(session)
    }

    pub fn remove(&self, id: u64) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::{parse_game, parse_recommendation};

    const ITALIAN: &str = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Nf6";
    const BEFORE_NF6: &str = "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3";

    fn coached(top_moves: &str) -> Session {
        let mut s = Session::new(Timeline::new(parse_game(ITALIAN).unwrap()));
        let payload = format!(
            "<move_recommendation><move_number>3</move_number><ply>6</ply>\
             <advice>Develop.</advice><top_moves>{top_moves}</top_moves></move_recommendation>"
        );
        let rec = parse_recommendation(&payload).unwrap();
        s.set_report(CoachingReport::default(), Some(rec));
        s
    }

    fn session() -> Session {
        Session::new(Timeline::new(parse_game("1. e4 e5").unwrap()))
    }

    #[test]
    fn test_store_lifecycle() {
        let store = SessionStore::new();
        let a = store.insert(session());
        let b = store.insert(session());
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);

        let index = store
            .with_session(a, |s| Ok(s.timeline.navigate(1)?))
            .unwrap();
        assert_eq!(index, 1);

        assert!(store.remove(a));
        assert!(!store.remove(a));
        assert!(matches!(
            store.with_session(a, |_| Ok(())),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_without_recommendation() {
        let s = session();
        let snap = s.snapshot(7).unwrap();
        assert_eq!(snap.id, 7);
        assert_eq!(snap.index, -1);
        assert_eq!(snap.moves.len(), 2);
        assert_eq!(snap.fen, chess_core::oracle::STANDARD_START_FEN);
        assert!(snap.frozen_fen.is_none());
        assert!(snap.coaching.is_none());

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["moves"][1]["san"], "e5");
    }

    #[test]
    fn test_mid_game_success_shows_learner_move_until_navigation() {
        let mut s = coached("<move>g6</move>");
        s.start_attempt().unwrap();
        assert_eq!(s.display_fen().unwrap(), BEFORE_NF6);

        let outcome = s.submit_attempt(&Attempt::new("g7", "g6")).unwrap();
        let AttemptOutcome::Success { fen_after, appended, .. } = outcome else {
            panic!("expected success");
        };
        assert!(!appended);
        assert_eq!(s.timeline.index(), 5);
        // The game's Nf6 is at index 5; the board shows ...g6 instead.
        assert_ne!(fen_after, s.timeline.current_fen().unwrap());
        let snap = s.snapshot(1).unwrap();
        assert_eq!(snap.fen, fen_after);
        assert!(snap.fen.contains("2n3p1"));
        assert!(snap.frozen_fen.is_none());

        s.navigate(5).unwrap();
        assert_eq!(s.display_fen().unwrap(), s.timeline.fen_at(5).unwrap());
    }

    #[test]
    fn test_navigation_during_attempt_keeps_frozen_position() {
        let mut s = coached("<move>Nh6</move>");
        s.start_attempt().unwrap();

        assert_eq!(s.navigate(1).unwrap(), 1);
        let snap = s.snapshot(1).unwrap();
        assert_eq!(snap.fen, s.timeline.fen_at(1).unwrap());
        assert_eq!(snap.frozen_fen, Some(BEFORE_NF6));
        assert!(s.is_awaiting_move());

        // A failed attempt brings the frozen position back on the board.
        let outcome = s.submit_attempt(&Attempt::new("g8", "f6")).unwrap();
        assert!(matches!(outcome, AttemptOutcome::Suboptimal { .. }));
        assert_eq!(s.display_fen().unwrap(), BEFORE_NF6);

        s.cancel_attempt().unwrap();
        assert_eq!(s.display_fen().unwrap(), s.timeline.fen_at(1).unwrap());
        assert!(s.snapshot(1).unwrap().frozen_fen.is_none());
    }
}
