//! Hand-written fakes for the collaborator traits, shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::clients::embeddings::EmbeddingClient;
use crate::clients::fatsecret::{NutritionFacts, NutritionLookup};
use crate::clients::llm::{ChatMessage, LlmClient};
use crate::error::PipelineError;
use crate::foods::dto::{normalize_name, FoodSource, ReferenceFoodRow};
use crate::foods::repo::ReferenceStore;
use crate::index::record_key;
use crate::meals::dto::MealEntry;
use crate::meals::replies::ReplySink;
use crate::meals::repo::MealLog;
use crate::meals::worker::{BoxTask, MealWorker};

/// Polls `check` for up to 200 ms, letting detached tasks run in between.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
    check()
}

pub fn reference_row(name: &str, unit: &str, quantity: f64, calories: f64, protein: f64) -> ReferenceFoodRow {
    ReferenceFoodRow {
        name: name.into(),
        unit: unit.into(),
        base_quantity: quantity,
        calories,
        protein,
        fat: 0.0,
        carbs: 0.0,
        vitamins: None,
        source: FoodSource::Curated,
    }
}

/// Replays canned answers in order; `None` entries fail. Once the script
/// runs out the fallback answer (or a failure) repeats.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Option<String>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    fn new(script: Vec<Option<String>>, fallback: Option<String>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(replies: &[&str]) -> Self {
        Self::new(
            replies.iter().map(|r| Some(r.to_string())).collect(),
            replies.last().map(|r| r.to_string()),
        )
    }

    pub fn failing() -> Self {
        Self::new(vec![], None)
    }

    pub fn failing_then(replies: &[&str]) -> Self {
        let mut script = vec![None];
        script.extend(replies.iter().map(|r| Some(r.to_string())));
        Self::new(script, replies.last().map(|r| r.to_string()))
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn run(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.ok_or_else(|| PipelineError::dependency("llm", "unavailable").into())
    }
}

/// Fixed vectors by normalized text; unknown text embeds to zeros.
pub struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    failing: bool,
}

impl StaticEmbedder {
    pub fn new(vectors: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: vectors
                .iter()
                .map(|(text, v)| (normalize_name(text), v.clone()))
                .collect(),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            vectors: HashMap::new(),
            failing: true,
        }
    }
}

#[async_trait]
impl EmbeddingClient for StaticEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if self.failing {
            return Err(PipelineError::dependency("embeddings", "unavailable").into());
        }
        Ok(self
            .vectors
            .get(&normalize_name(text))
            .cloned()
            .unwrap_or_else(|| vec![0.0; 3]))
    }
}

enum LookupBehavior {
    NotFound,
    Failing,
    Found(NutritionFacts),
}

pub struct FakeLookup {
    behavior: LookupBehavior,
    calls: AtomicU32,
}

impl FakeLookup {
    fn with(behavior: LookupBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicU32::new(0),
        }
    }

    pub fn not_found() -> Self {
        Self::with(LookupBehavior::NotFound)
    }

    pub fn failing() -> Self {
        Self::with(LookupBehavior::Failing)
    }

    pub fn found(facts: NutritionFacts) -> Self {
        Self::with(LookupBehavior::Found(facts))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NutritionLookup for FakeLookup {
    async fn search(&self, _food_name: &str) -> anyhow::Result<Option<NutritionFacts>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            LookupBehavior::NotFound => Ok(None),
            LookupBehavior::Failing => Err(PipelineError::dependency("fatsecret", "unavailable").into()),
            LookupBehavior::Found(facts) => Ok(Some(facts.clone())),
        }
    }
}

#[derive(Default)]
pub struct MemoryReferenceStore {
    curated: Mutex<Vec<ReferenceFoodRow>>,
    learned: Mutex<Vec<ReferenceFoodRow>>,
    append_attempts: AtomicU32,
    fail_appends: bool,
}

impl MemoryReferenceStore {
    pub fn with_curated(rows: Vec<ReferenceFoodRow>) -> Self {
        Self {
            curated: Mutex::new(rows),
            ..Self::default()
        }
    }

    pub fn failing_appends() -> Self {
        Self {
            fail_appends: true,
            ..Self::default()
        }
    }

    pub fn curated(&self) -> Vec<ReferenceFoodRow> {
        self.curated.lock().unwrap().clone()
    }

    pub fn learned(&self) -> Vec<ReferenceFoodRow> {
        self.learned.lock().unwrap().clone()
    }

    pub fn append_attempts(&self) -> u32 {
        self.append_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn read_curated(&self) -> anyhow::Result<Vec<ReferenceFoodRow>> {
        Ok(self.curated())
    }

    async fn read_learned(&self) -> anyhow::Result<Vec<ReferenceFoodRow>> {
        Ok(self.learned())
    }

    async fn append_learned(&self, row: &ReferenceFoodRow) -> anyhow::Result<()> {
        self.append_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_appends {
            anyhow::bail!("learned table is read-only");
        }
        let key = record_key(&row.name, &row.unit);
        let mut learned = self.learned.lock().unwrap();
        learned.retain(|r| record_key(&r.name, &r.unit) != key);
        learned.push(row.clone());
        Ok(())
    }

    async fn insert_curated(&self, rows: &[ReferenceFoodRow]) -> anyhow::Result<u64> {
        self.curated.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}

#[derive(Default)]
pub struct MemoryMealLog {
    entries: Mutex<Vec<MealEntry>>,
    failing: bool,
}

impl MemoryMealLog {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<MealEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MealLog for MemoryMealLog {
    async fn append(&self, entries: &[MealEntry]) -> anyhow::Result<u64> {
        if self.failing {
            anyhow::bail!("meal log unavailable");
        }
        self.entries.lock().unwrap().extend_from_slice(entries);
        Ok(entries.len() as u64)
    }
}

#[derive(Default)]
pub struct RecordingReplySink {
    sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingReplySink {
    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for RecordingReplySink {
    async fn send(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

/// Holds spawned tasks until the test drives them.
#[derive(Default)]
pub struct RecordingWorker {
    tasks: Mutex<Vec<(&'static str, BoxTask)>>,
}

impl RecordingWorker {
    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.lock().unwrap().iter().map(|(name, _)| *name).collect()
    }

    pub async fn run_all(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap());
        for (_, task) in tasks {
            task.await;
        }
    }
}

impl MealWorker for RecordingWorker {
    fn spawn_detached(&self, name: &'static str, task: BoxTask) {
        self.tasks.lock().unwrap().push((name, task));
    }
}
