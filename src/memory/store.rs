//! Short-term turn history, session statistics and long-term knowledge

use crate::core::config::MemoryConfig;
use crate::core::error::Result;
use crate::memory::knowledge::{KnowledgeBase, KnowledgeCategory};
use crate::memory::records::{GameSummary, SessionStats, TurnRecord};
use chrono::Utc;
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

/// Returned by [`MemoryStore::recent_summary`] when nothing has been recorded
pub const NO_HISTORY: &str = "No recent history.";

const GAME_HISTORY_FILE: &str = "game_history.jsonl";
const SESSIONS_DIR: &str = "sessions";

/// Lessons appended to the patterns file by end-of-game analysis
pub const LESSON_ECONOMY: &str = "Need to focus more on economy early game";
pub const LESSON_ARMY_SIZE: &str = "Attacks failing - build larger army before attacking";
pub const LESSON_TRAINING: &str = "Not training enough units - need more workers and military";

#[derive(Debug)]
pub struct MemoryStore {
    knowledge: KnowledgeBase,
    window: usize,
    flush_every: usize,
    short_term: VecDeque<TurnRecord>,
    /// Recorded but not yet written to the session log
    unflushed: Vec<TurnRecord>,
    stats: SessionStats,
    initial_strategy: String,
    strategy: String,
    session_id: Uuid,
    analyzed: bool,
    span: tracing::Span,
}

impl MemoryStore {
    pub fn open(config: &MemoryConfig, initial_strategy: &str) -> Result<Self> {
        let knowledge = KnowledgeBase::open(&config.dir)?;
        let session_id = Uuid::new_v4();

        Ok(Self {
            knowledge,
            window: config.short_term_window.max(1),
            flush_every: config.flush_every.max(1) as usize,
            short_term: VecDeque::with_capacity(config.short_term_window * 2 + 1),
            unflushed: Vec::new(),
            stats: SessionStats::default(),
            initial_strategy: initial_strategy.to_lowercase(),
            strategy: initial_strategy.to_lowercase(),
            session_id,
            analyzed: false,
            span: tracing::info_span!("component", name = "memory_store"),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.short_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.short_term.is_empty()
    }

    pub fn current_strategy(&self) -> &str {
        &self.strategy
    }

    pub fn session_log_path(&self) -> PathBuf {
        self.knowledge
            .dir()
            .join(SESSIONS_DIR)
            .join(format!("{}.jsonl", self.session_id))
    }

    pub fn game_history_path(&self) -> PathBuf {
        self.knowledge.dir().join(GAME_HISTORY_FILE)
    }

    /// Append a turn, fold it into the session stats and evict old entries.
    ///
    /// Once the history grows past twice the window it is cut back to the
    /// most recent `window` records. The unflushed tail goes to the session
    /// log every `flush_every` turns.
    pub fn record_turn(&mut self, record: TurnRecord) -> Result<()> {
        self.stats.observe(&record, self.short_term.back());
        self.unflushed.push(record.clone());
        self.short_term.push_back(record);

        if self.short_term.len() > self.window * 2 {
            let excess = self.short_term.len() - self.window;
            self.short_term.drain(..excess);
        }

        if self.unflushed.len() >= self.flush_every {
            self.flush_history()?;
        }
        Ok(())
    }

    /// The last `n` records, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &TurnRecord> {
        let skip = self.short_term.len().saturating_sub(n);
        self.short_term.iter().skip(skip)
    }

    pub fn recent_summary(&self, n: usize) -> String {
        if self.short_term.is_empty() {
            return NO_HISTORY.to_string();
        }
        let mut lines = vec!["Recent turns:".to_string()];
        lines.extend(self.recent(n).map(|r| format!("  {}", r.summary_line())));
        lines.join("\n")
    }

    pub fn set_strategy(&mut self, strategy: &str) {
        let _guard = self.span.enter();
        self.strategy = strategy.to_lowercase();
        tracing::info!("Strategy set to: {}", strategy);
    }

    pub fn strategy_context(&self) -> String {
        format!("Current Strategy: {}", self.strategy.to_uppercase())
    }

    /// One category in full, or the combined overview when `None`
    pub fn knowledge(&self, category: Option<KnowledgeCategory>) -> Result<String> {
        match category {
            Some(category) => self.knowledge.read(category),
            None => self.knowledge.overview(),
        }
    }

    pub fn add_learned_tip(&self, tip: &str, category: KnowledgeCategory) -> Result<()> {
        let _guard = self.span.enter();
        self.knowledge.append(category, tip, Utc::now().date_naive())
    }

    /// Rule checks over the session stats; triggered lessons go to the
    /// patterns file. Runs at most once per session and never on an empty one.
    pub fn end_of_game_analysis(&mut self) -> Result<Vec<&'static str>> {
        if self.analyzed || self.stats.total_turns == 0 {
            return Ok(Vec::new());
        }
        self.analyzed = true;

        let mut lessons = Vec::new();
        if self.stats.peak_resources < 500 {
            lessons.push(LESSON_ECONOMY);
        }
        if let Some(rate) = self.stats.attack_success_rate() {
            if rate < 0.3 {
                lessons.push(LESSON_ARMY_SIZE);
            }
        }
        if self.stats.peak_units < 15 {
            lessons.push(LESSON_TRAINING);
        }

        for lesson in &lessons {
            self.add_learned_tip(lesson, KnowledgeCategory::Patterns)?;
        }
        Ok(lessons)
    }

    /// Write unflushed records to `sessions/<session_id>.jsonl`
    pub fn flush_history(&mut self) -> Result<()> {
        if self.unflushed.is_empty() {
            return Ok(());
        }

        let path = self.session_log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        for record in &self.unflushed {
            writeln!(file, "{}", serde_json::to_string(record)?)?;
        }

        let _guard = self.span.enter();
        tracing::debug!("Flushed {} turns to {}", self.unflushed.len(), path.display());
        self.unflushed.clear();
        Ok(())
    }

    /// Append this game's summary to `game_history.jsonl`
    pub fn save_game_summary(&self, outcome: &str) -> Result<GameSummary> {
        let summary = GameSummary {
            timestamp: Utc::now(),
            turns: self.stats.total_turns,
            total_reward: self.stats.total_reward,
            peak_units: self.stats.peak_units,
            outcome: outcome.to_string(),
            strategy: self.strategy.clone(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.game_history_path())?;
        writeln!(file, "{}", serde_json::to_string(&summary)?)?;

        let _guard = self.span.enter();
        tracing::info!("Saved game summary: {}", outcome);
        Ok(summary)
    }

    /// End the session: flush history, learn lessons and log the outcome
    pub fn finalize(&mut self, outcome: &str) -> Result<GameSummary> {
        self.flush_history()?;
        self.end_of_game_analysis()?;
        self.save_game_summary(outcome)
    }

    /// Start a new game. The previous session is analyzed before anything is
    /// cleared.
    pub fn reset(&mut self) -> Result<()> {
        self.end_of_game_analysis()?;
        self.flush_history()?;

        self.short_term.clear();
        self.stats = SessionStats::default();
        self.strategy = self.initial_strategy.clone();
        self.session_id = Uuid::new_v4();
        self.analyzed = false;

        let _guard = self.span.enter();
        tracing::info!("Memory reset for new game (session {})", self.session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResourceCounts;
    use tempfile::TempDir;

    fn store(tmp: &TempDir, window: usize) -> MemoryStore {
        let config = MemoryConfig {
            dir: tmp.path().to_path_buf(),
            short_term_window: window,
            flush_every: 1000,
        };
        MemoryStore::open(&config, "economy").unwrap()
    }

    #[test]
    fn test_empty_summary_is_sentinel() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(store(&tmp, 5).recent_summary(5), NO_HISTORY);
    }

    #[test]
    fn test_recent_summary_renders_last_n() {
        let tmp = TempDir::new().unwrap();
        let mut mem = store(&tmp, 5);
        for turn in 1..=7 {
            mem.record_turn(TurnRecord::new(turn, format!("Action {}", turn)))
                .unwrap();
        }
        let summary = mem.recent_summary(2);
        assert_eq!(
            summary,
            "Recent turns:\n  Turn 6: Action 6 → ok\n  Turn 7: Action 7 → ok"
        );
    }

    #[test]
    fn test_eviction_keeps_most_recent_window() {
        let tmp = TempDir::new().unwrap();
        let mut mem = store(&tmp, 4);
        for turn in 1..=8 {
            mem.record_turn(TurnRecord::new(turn, "x")).unwrap();
        }
        assert_eq!(mem.len(), 8);

        mem.record_turn(TurnRecord::new(9, "x")).unwrap();
        let turns: Vec<u32> = mem.recent(100).map(|r| r.turn).collect();
        assert_eq!(turns, vec![6, 7, 8, 9]);
        assert_eq!(mem.stats().total_turns, 9);
    }

    #[test]
    fn test_analysis_runs_once_and_writes_patterns() {
        let tmp = TempDir::new().unwrap();
        let mut mem = store(&tmp, 5);
        let mut record = TurnRecord::new(1, "Wait");
        record.resources = ResourceCounts::new(100, 100, 0, 0);
        record.my_units = 3;
        mem.record_turn(record).unwrap();

        let lessons = mem.end_of_game_analysis().unwrap();
        assert_eq!(lessons, vec![LESSON_ECONOMY, LESSON_TRAINING]);
        assert!(mem.end_of_game_analysis().unwrap().is_empty());

        let patterns = mem.knowledge(Some(KnowledgeCategory::Patterns)).unwrap();
        assert!(patterns.contains(LESSON_ECONOMY));
        assert_eq!(patterns.matches("## Learned").count(), 2);
    }

    #[test]
    fn test_analysis_skipped_for_empty_session() {
        let tmp = TempDir::new().unwrap();
        let mut mem = store(&tmp, 5);
        assert!(mem.end_of_game_analysis().unwrap().is_empty());
        mem.reset().unwrap();
        let patterns = mem.knowledge(Some(KnowledgeCategory::Patterns)).unwrap();
        assert!(!patterns.contains("## Learned"));
    }

    #[test]
    fn test_reset_clears_state_and_rotates_session() {
        let tmp = TempDir::new().unwrap();
        let mut mem = store(&tmp, 5);
        let first = mem.session_id();
        mem.set_strategy("MILITARY");
        mem.record_turn(TurnRecord::new(1, "Wait")).unwrap();

        mem.reset().unwrap();

        assert!(mem.is_empty());
        assert_eq!(mem.stats(), &SessionStats::default());
        assert_eq!(mem.current_strategy(), "economy");
        assert_ne!(mem.session_id(), first);
        let log = fs::read_to_string(tmp.path().join("sessions").join(format!("{}.jsonl", first)))
            .unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[test]
    fn test_finalize_appends_game_summary() {
        let tmp = TempDir::new().unwrap();
        let mut mem = store(&tmp, 5);
        let mut record = TurnRecord::new(1, "Gather Food");
        record.reward = 2.5;
        mem.record_turn(record).unwrap();

        let summary = mem.finalize("completed").unwrap();
        assert_eq!(summary.turns, 1);
        assert_eq!(summary.strategy, "economy");

        let history = fs::read_to_string(mem.game_history_path()).unwrap();
        let parsed: GameSummary = serde_json::from_str(history.trim()).unwrap();
        assert_eq!(parsed.outcome, "completed");
        assert!((parsed.total_reward - 2.5).abs() < 1e-9);
    }
}
