//! Turns validated records into store rows and webhook calls, one record at a
//! time, and folds the outcomes into a [`SubmissionReport`].

use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::csv::{CsvRow, RowWarning};
use crate::errors::{PublishError, StoreError};
use crate::models::{Media, MediaType, NewPost, Page, Post, PostDraft, PublishRequest, StatusUpdate};
use crate::publisher::Publisher;
use crate::repositories::PostStore;
use crate::resolver;
use crate::schedule::{self, DispatchPath};
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Aggregate outcome of a multi-record submission. Partial success is normal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmissionReport {
    pub success_count: usize,
    /// `"name (reason)"`, one per failed page or row
    pub failures: Vec<String>,
    pub posts: Vec<Post>,
    /// Rows that went through but not quite as written
    pub warnings: Vec<RowWarning>,
}

impl SubmissionReport {
    fn record(&mut self, name: &str, outcome: Result<Post, DispatchError>) {
        match outcome {
            Ok(post) => {
                self.success_count += 1;
                self.posts.push(post);
            }
            Err(err) => self.fail(name, err),
        }
    }

    fn fail(&mut self, name: &str, reason: impl std::fmt::Display) {
        self.failures.push(format!("{name} ({reason})"));
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sends one record on its way for one page.
pub struct Dispatcher<'a, S, P> {
    store: &'a S,
    publisher: &'a P,
}

impl<'a, S: PostStore, P: Publisher> Dispatcher<'a, S, P> {
    pub fn new(store: &'a S, publisher: &'a P) -> Self {
        Self { store, publisher }
    }

    /// Stores the record as pending, then publishes it if `path` says so.
    pub async fn dispatch(
        &self,
        page: &Page,
        draft: &PostDraft,
        path: DispatchPath,
    ) -> Result<Post, DispatchError> {
        let post = self
            .store
            .create_post(&NewPost::for_page(page, draft))
            .await?;
        debug!(post_id = %post.id, page = %page.name, ?path, "Post stored");

        match path {
            DispatchPath::Immediate => self.publish(page, post).await,
            DispatchPath::Scheduled | DispatchPath::Draft => Ok(post),
        }
    }

    /// Calls the webhook for a stored pending post and records the outcome.
    pub async fn publish(&self, page: &Page, post: Post) -> Result<Post, DispatchError> {
        let request = PublishRequest::immediate(page, &post);

        match self.publisher.publish(&request).await {
            Ok(()) => {
                let published = self
                    .store
                    .update_status(post.id, &StatusUpdate::published(Utc::now()))
                    .await?;
                info!(post_id = %post.id, page = %page.name, "Post published");
                Ok(published)
            }
            Err(err) => {
                let update = StatusUpdate::failed(err.to_string());
                if let Err(mark_err) = self.store.update_status(post.id, &update).await {
                    warn!(post_id = %post.id, error = %mark_err, "Could not mark post as failed");
                }
                Err(err.into())
            }
        }
    }
}

/// Builds the post body a CSV row describes. Schedule text is read in `tz`.
pub fn row_draft<Tz: TimeZone>(row: &CsvRow, tz: &Tz) -> Result<PostDraft, ValidationError> {
    let kind = MediaType::parse(&row.media_type)?;
    let media = Media::from_parts(kind, Some(&row.media_url))?;
    let scheduled_for = schedule::parse_scheduled_for_in(&row.scheduled_for, tz);

    PostDraft::new(
        &row.post_content,
        Some(&row.link),
        media,
        scheduled_for,
        false,
    )
}

/// Set when a row carries schedule text that could not be read, which
/// turns the row into a draft.
fn unread_schedule(row: &CsvRow, draft: &PostDraft) -> Option<String> {
    let text = row.scheduled_for.trim();
    if text.is_empty() || draft.scheduled_for.is_some() {
        return None;
    }
    Some(format!(
        "scheduled_for {text:?} is not a recognised date, stored as draft"
    ))
}

/// One post addressed to many pages. Pages are dispatched concurrently and
/// all of them settle before the report is built; successes are kept even
/// when other pages fail.
#[instrument(skip_all, fields(pages = page_ids.len(), publish_now = draft.publish_now))]
pub async fn submit_to_pages<S, P, Tz>(
    store: &S,
    publisher: &P,
    draft: &PostDraft,
    page_ids: &[Uuid],
    now: &DateTime<Tz>,
) -> Result<SubmissionReport, StoreError>
where
    S: PostStore,
    P: Publisher,
    Tz: TimeZone,
{
    let pages = store.list_pages().await?;
    let path = schedule::decide(draft.publish_now, draft.scheduled_for, now);
    let dispatcher = Dispatcher::new(store, publisher);
    let mut report = SubmissionReport::default();

    let mut targets = Vec::with_capacity(page_ids.len());
    for id in page_ids {
        match pages.iter().find(|page| page.id == *id) {
            Some(page) => targets.push(page),
            None => report.fail(&id.to_string(), "Page not found"),
        }
    }

    let dispatcher = &dispatcher;
    let mut pending = Vec::with_capacity(targets.len());
    for page in targets {
        pending.push(async move { (page, dispatcher.dispatch(page, draft, path).await) });
    }
    let outcomes = join_all(pending).await;

    for (page, outcome) in outcomes {
        report.record(&page.name, outcome);
    }

    info!(
        ?path,
        succeeded = report.success_count,
        failed = report.failures.len(),
        "Fan-out submission finished"
    );
    Ok(report)
}

/// Bulk CSV submission. Rows go out one after another; a row that cannot be
/// resolved or validated is reported and never dispatched.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn submit_rows<S, P, Tz>(
    store: &S,
    publisher: &P,
    rows: &[CsvRow],
    now: &DateTime<Tz>,
) -> Result<SubmissionReport, StoreError>
where
    S: PostStore,
    P: Publisher,
    Tz: TimeZone,
{
    let pages = store.list_pages().await?;
    let dispatcher = Dispatcher::new(store, publisher);
    let mut report = SubmissionReport::default();

    for row in rows {
        let page = match resolver::resolve(row, &pages) {
            Ok(page) => page,
            Err(unresolved) => {
                debug!(line = row.line, identifier = %unresolved.identifier, "Row not resolved");
                report.fail(&unresolved.identifier, "Location not found");
                continue;
            }
        };

        let outcome = match row_draft(row, &now.timezone()) {
            Ok(draft) => {
                if let Some(reason) = unread_schedule(row, &draft) {
                    debug!(line = row.line, %reason, "Schedule not understood");
                    report.warnings.push(RowWarning {
                        line: row.line,
                        reason,
                    });
                }
                let path = schedule::decide(draft.publish_now, draft.scheduled_for, now);
                dispatcher.dispatch(page, &draft, path).await
            }
            Err(invalid) => Err(invalid.into()),
        };
        report.record(&page.name, outcome);
    }

    info!(
        succeeded = report.success_count,
        failed = report.failures.len(),
        "Bulk submission finished"
    );
    Ok(report)
}

/// What a CSV row would do if submitted.
#[derive(Debug, Clone, Serialize)]
pub struct RowPreview {
    pub line: usize,
    pub identifier: String,
    pub page_id: Option<Uuid>,
    pub page_name: Option<String>,
    pub content: String,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub path: Option<DispatchPath>,
    pub error: Option<String>,
    pub warning: Option<String>,
}

/// Resolves and validates rows without touching the store or the webhook.
pub fn preview_rows<Tz: TimeZone>(rows: &[CsvRow], pages: &[Page], now: &DateTime<Tz>) -> Vec<RowPreview> {
    rows.iter()
        .map(|row| {
            let mut preview = RowPreview {
                line: row.line,
                identifier: row.identifier().to_string(),
                page_id: None,
                page_name: None,
                content: row.post_content.clone(),
                scheduled_for: None,
                path: None,
                error: None,
                warning: None,
            };

            match resolver::resolve(row, pages) {
                Ok(page) => {
                    preview.page_id = Some(page.id);
                    preview.page_name = Some(page.name.clone());
                    match row_draft(row, &now.timezone()) {
                        Ok(draft) => {
                            preview.warning = unread_schedule(row, &draft);
                            preview.scheduled_for = draft.scheduled_for;
                            preview.path =
                                Some(schedule::decide(false, draft.scheduled_for, now));
                        }
                        Err(err) => preview.error = Some(err.to_string()),
                    }
                }
                Err(err) => preview.error = Some(err.to_string()),
            }

            preview
        })
        .collect()
}
