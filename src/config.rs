use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::notes::dedupe::DedupeConfig;
use crate::planner::allocate::{Allocator, DEFAULT_FOCUS_BOOST, MIN_BLOCK_MINUTES};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: String,
    pub dedupe: DedupeConfig,
    pub topics: TopicSettings,
    pub plan: PlanSettings,
    pub quiz: QuizSettings,
    pub llm: LlmSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: "data/studyplan.sqlite".into(),
            dedupe: DedupeConfig::default(),
            topics: TopicSettings::default(),
            plan: PlanSettings::default(),
            quiz: QuizSettings::default(),
            llm: LlmSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicSettings {
    pub cap: usize,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self { cap: 8 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlanSettings {
    pub default_minutes: u32,
    pub focus_boost: f64,
    pub min_block_minutes: u32,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            default_minutes: 30,
            focus_boost: DEFAULT_FOCUS_BOOST,
            min_block_minutes: MIN_BLOCK_MINUTES,
        }
    }
}

impl PlanSettings {
    pub fn allocator(&self) -> Allocator {
        Allocator {
            focus_boost: self.focus_boost,
            min_block_minutes: self.min_block_minutes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    pub count: usize,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self { count: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            timeout_secs: 30,
        }
    }
}

/// Defaults, then `studyplan.toml` if present, then `STUDYPLAN_*` env vars
/// (`STUDYPLAN_DEDUPE__THRESHOLD=0.8`).
pub fn load() -> Result<Settings> {
    let settings = Config::builder()
        .add_source(File::with_name("studyplan").required(false))
        .add_source(Environment::with_prefix("STUDYPLAN").separator("__"))
        .build()?;
    Ok(settings.try_deserialize()?)
}
