//! Long-term knowledge: markdown files that persist across games
//!
//! Three categories, one file each. Files are seeded with default notes the
//! first time a directory is used and are only ever appended to afterwards.

use crate::core::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Lines per category included in the combined view
pub const SUMMARY_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeCategory {
    Tips,
    Strategies,
    Patterns,
}

impl KnowledgeCategory {
    pub const ALL: [KnowledgeCategory; 3] = [
        KnowledgeCategory::Tips,
        KnowledgeCategory::Strategies,
        KnowledgeCategory::Patterns,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            KnowledgeCategory::Tips => "tips.md",
            KnowledgeCategory::Strategies => "strategies.md",
            KnowledgeCategory::Patterns => "patterns.md",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            KnowledgeCategory::Tips => "Tips",
            KnowledgeCategory::Strategies => "Strategies",
            KnowledgeCategory::Patterns => "Patterns",
        }
    }

    fn seed(&self) -> &'static str {
        match self {
            KnowledgeCategory::Tips => DEFAULT_TIPS,
            KnowledgeCategory::Strategies => DEFAULT_STRATEGIES,
            KnowledgeCategory::Patterns => DEFAULT_PATTERNS,
        }
    }
}

const DEFAULT_TIPS: &str = "# 0 AD Tips & Tricks

## Economy
- Always keep workers busy gathering resources
- Idle workers = wasted potential
- Balance resource gathering based on what you need

## Military
- Don't attack until you have a decent army
- Mixed unit compositions work better
- Protect your workers from raids

## General
- Build houses before hitting population cap
- Scout to find enemies early
- Defend your economy first
";

const DEFAULT_STRATEGIES: &str = "# Strategies Learned

## Early Game
- Focus on economy first
- Train 10-15 workers before military
- Build houses proactively

## Mid Game
- Build barracks and start military
- Maintain resource income
- Scout enemy positions

## Late Game
- Full army push when ready
- Protect your base while attacking
";

const DEFAULT_PATTERNS: &str = "# Game Patterns Observed

## Enemy Behavior
- AI enemies often rush with infantry
- Watch for early raids on workers

## Resource Locations
- Food: Usually near starting location
- Wood: Forest around map edges
- Stone/Metal: Scattered, often contested
";

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    dir: PathBuf,
}

impl KnowledgeBase {
    /// Open `dir`, creating it and seeding any missing category file
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        for category in KnowledgeCategory::ALL {
            let path = dir.join(category.file_name());
            if !path.exists() {
                fs::write(&path, category.seed())?;
                tracing::info!("Created knowledge file: {}", path.display());
            }
        }

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, category: KnowledgeCategory) -> PathBuf {
        self.dir.join(category.file_name())
    }

    /// Full text of one category; empty if the file has gone missing
    pub fn read(&self, category: KnowledgeCategory) -> Result<String> {
        let path = self.path(category);
        if !path.exists() {
            return Ok(String::new());
        }
        Ok(fs::read_to_string(path)?)
    }

    /// The first lines of every category, each under a `## <Category>` heading
    pub fn overview(&self) -> Result<String> {
        let mut sections = Vec::new();
        for category in KnowledgeCategory::ALL {
            let path = self.path(category);
            if !path.exists() {
                continue;
            }
            let content = fs::read_to_string(path)?;
            let head: Vec<&str> = content.split('\n').take(SUMMARY_LINES).collect();
            sections.push(format!("## {}\n{}", category.title(), head.join("\n")));
        }
        Ok(sections.join("\n\n"))
    }

    /// Append a dated tip. Never rewrites existing text.
    pub fn append(&self, category: KnowledgeCategory, tip: &str, date: NaiveDate) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(category))?;
        write!(file, "\n\n## Learned {}\n- {}", date.format("%Y-%m-%d"), tip)?;

        let preview: String = tip.chars().take(50).collect();
        tracing::info!("Added tip to {}: {}...", category.file_name(), preview);
        Ok(())
    }
}
