use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, error, info};

use crate::emotion;
use crate::error::{DiaryError, Result};
use crate::metrics;
use crate::models::{DiaryEntry, EmotionEntry, NewDiaryEntry};
use crate::report::{build_entry_prompt, build_weekly_prompt, AnalysisKind, AnalysisOutcome, EmotionAnalyst, ReportTask};
use crate::repository::DiaryRepository;
use crate::week::{active_days, entries_in_week};

/// Entry point for every diary screen
///
/// Built once by the application and handed to consumers; clones share the
/// same repository and analyst.
#[derive(Clone)]
pub struct DiaryService {
    repository: Arc<dyn DiaryRepository>,
    analyst: Option<Arc<dyn EmotionAnalyst>>,
}

impl DiaryService {
    /// Service over `repository` without report support
    pub fn new(repository: Arc<dyn DiaryRepository>) -> Self {
        Self {
            repository,
            analyst: None,
        }
    }

    /// Enable weekly and per-entry reports
    #[must_use]
    pub fn with_analyst(mut self, analyst: Arc<dyn EmotionAnalyst>) -> Self {
        self.analyst = Some(analyst);
        self
    }

    fn analyst(&self) -> Result<&Arc<dyn EmotionAnalyst>> {
        self.analyst.as_ref().ok_or_else(|| {
            DiaryError::InvalidConfig("emotion analysis is not configured; set an API key".to_string())
        })
    }

    /// Save a new entry; returns once it is durable
    pub async fn save_entry(&self, entry: NewDiaryEntry) -> Result<DiaryEntry> {
        let saved = self.repository.insert(entry).await?;
        metrics::record_entry_saved();
        info!(id = saved.id, emotion = %saved.selected_emotion, "Saved diary entry");
        Ok(saved)
    }

    /// All entries, oldest first
    pub async fn entries(&self) -> Result<Vec<DiaryEntry>> {
        self.repository.get_all().await
    }

    /// One entry for the detail screen
    pub async fn entry(&self, id: i64) -> Result<Option<DiaryEntry>> {
        self.repository.get_by_id(id).await
    }

    /// Delete any entry by id
    pub async fn delete_entry(&self, id: i64) -> Result<bool> {
        self.repository.delete_by_id(id).await
    }

    /// Undo the most recent save
    ///
    /// The removed entry is returned so the caller can release its image.
    pub async fn undo_last_save(&self) -> Result<Option<DiaryEntry>> {
        self.repository.delete_latest().await
    }

    /// Emotion distribution over every entry
    pub async fn emotion_distribution(&self) -> Result<Vec<EmotionEntry>> {
        let entries = self.repository.get_all().await?;
        Ok(emotion::aggregate(&entries))
    }

    /// Days of the week containing `today` that have entries
    pub async fn week_overview(&self, today: NaiveDate) -> Result<Vec<NaiveDate>> {
        let entries = self.repository.get_all().await?;
        Ok(active_days(&entries, today, &Local))
    }

    /// Weekly emotion report for the week containing `today`
    ///
    /// An empty week resolves to [`AnalysisOutcome::NoEntries`] without
    /// contacting the analyst.
    pub async fn weekly_report(&self, today: NaiveDate) -> Result<AnalysisOutcome> {
        let analyst = self.analyst()?;
        let entries = self.repository.get_all().await?;

        let in_week = entries_in_week(&entries, today, &Local).len();
        if in_week == 0 {
            debug!(%today, "No entries this week, skipping analysis");
            return Ok(AnalysisOutcome::NoEntries);
        }

        let prompt = build_weekly_prompt(&entries, today);
        info!(%today, entries = in_week, "Requesting weekly emotion report");
        let outcome = analyst.analyze(AnalysisKind::Weekly, &prompt).await;
        if let Some(text) = outcome.text() {
            debug!(chars = text.chars().count(), "Weekly report received");
        }
        Ok(outcome)
    }

    /// [`Self::weekly_report`] in the background, cancelled when the task is dropped
    pub fn spawn_weekly_report(&self, today: NaiveDate) -> ReportTask {
        let service = self.clone();
        ReportTask::spawn(async move {
            let result = service.weekly_report(today).await;
            if let Err(e) = &result {
                error!(error = %e, "Weekly report failed");
            }
            result
        })
    }

    /// Emotion analysis of a single entry; `None` if the id does not exist
    pub async fn analyze_entry(&self, id: i64) -> Result<Option<AnalysisOutcome>> {
        let analyst = self.analyst()?;
        let Some(entry) = self.repository.get_by_id(id).await? else {
            return Ok(None);
        };

        let prompt = build_entry_prompt(&entry);
        let outcome = analyst.analyze(AnalysisKind::Entry, &prompt).await;
        if let Some(text) = outcome.text() {
            debug!(id, chars = text.chars().count(), "Entry analysis received");
        }
        Ok(Some(outcome))
    }
}
