//! In-process job tracker: submit a question, poll for its answer.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dispatcher::QueryDispatcher;
use crate::envelope::Envelope;
use crate::error::{InsightsError, Result};
use crate::metrics::MetricsCollector;
use crate::validation::InputValidator;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Opaque identifier of a submitted question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(Uuid);

impl QueryId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for QueryId {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| InsightsError::InvalidQuery(format!("bad query id '{s}': {e}")))
    }
}

/// Lifecycle of a submitted question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryStatus {
    /// Accepted, not started
    Pending,
    /// Running
    Processing,
    /// Answered
    Complete {
        /// The answer
        result: Envelope,
    },
    /// The job itself broke down
    Error {
        /// What happened
        message: String,
    },
}

impl QueryStatus {
    /// True once no further transition can happen
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// One answered line of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    /// Record id, absent when the question was rejected on submit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<QueryId>,
    /// Question as submitted
    pub query: String,
    /// Final status
    #[serde(flatten)]
    pub status: QueryStatus,
}

#[derive(Debug, Default)]
struct JobTable {
    statuses: HashMap<QueryId, QueryStatus>,
    order: VecDeque<QueryId>,
}

impl JobTable {
    fn insert(&mut self, id: QueryId, retention: usize) {
        self.statuses.insert(id, QueryStatus::Pending);
        self.order.push_back(id);
        while self.order.len() > retention {
            if let Some(oldest) = self.order.pop_front() {
                self.statuses.remove(&oldest);
                debug!(query_id = %oldest, "Evicted query record");
            }
        }
    }

    /// Move a live record forward; terminal records are never overwritten
    fn advance(&mut self, id: QueryId, status: QueryStatus) {
        if let Some(current) = self.statuses.get_mut(&id) {
            if !current.is_terminal() {
                *current = status;
            }
        }
    }
}

/// Accepts questions and runs them on the blocking pool
#[derive(Clone)]
pub struct QueryService {
    dispatcher: Arc<QueryDispatcher>,
    jobs: Arc<RwLock<JobTable>>,
    max_query_length: usize,
    retention: usize,
    metrics: MetricsCollector,
}

impl fmt::Debug for QueryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryService")
            .field("max_query_length", &self.max_query_length)
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl QueryService {
    /// Service over a shared dispatcher. Keeps at most `retention` records,
    /// never fewer than one.
    pub fn new(dispatcher: Arc<QueryDispatcher>, max_query_length: usize, retention: usize) -> Self {
        Self {
            dispatcher,
            jobs: Arc::new(RwLock::new(JobTable::default())),
            max_query_length,
            retention: retention.max(1),
            metrics: MetricsCollector::default(),
        }
    }

    /// Queue a question. Must be called from within a tokio runtime.
    pub async fn submit(&self, text: &str) -> Result<QueryId> {
        InputValidator::validate_query(text, self.max_query_length)
            .map_err(|e| InsightsError::InvalidQuery(e.to_string()))?;

        let id = QueryId::new();
        let retained = {
            let mut jobs = self.jobs.write().await;
            jobs.insert(id, self.retention);
            jobs.statuses.len()
        };
        self.metrics.record_job_submitted(retained);
        info!(query_id = %id, "Query submitted");

        let dispatcher = Arc::clone(&self.dispatcher);
        let jobs = Arc::clone(&self.jobs);
        let text = text.to_string();
        tokio::spawn(async move {
            jobs.write().await.advance(id, QueryStatus::Processing);

            let status = match tokio::task::spawn_blocking(move || dispatcher.process_query(&text)).await {
                Ok(result) => QueryStatus::Complete { result },
                Err(e) => {
                    error!(query_id = %id, error = %e, "Query task failed");
                    QueryStatus::Error {
                        message: format!("query task failed: {e}"),
                    }
                },
            };

            jobs.write().await.advance(id, status);
            debug!(query_id = %id, "Query finished");
        });

        Ok(id)
    }

    /// Current status, `None` for unknown or evicted ids
    pub async fn status(&self, id: QueryId) -> Option<QueryStatus> {
        self.jobs.read().await.statuses.get(&id).cloned()
    }

    /// Poll until the job reaches a terminal state
    pub async fn wait(&self, id: QueryId) -> Option<QueryStatus> {
        loop {
            let status = self.status(id).await?;
            if status.is_terminal() {
                return Some(status);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Answer every question, in order.
    ///
    /// Questions go in chunks no larger than the retention so every record
    /// is still held when it is collected.
    pub async fn run_batch<S: AsRef<str>>(&self, questions: &[S]) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(questions.len());
        for chunk in questions.chunks(self.retention) {
            let mut submitted = Vec::with_capacity(chunk.len());
            for question in chunk {
                let query = question.as_ref().to_string();
                let id = self.submit(&query).await;
                submitted.push((query, id));
            }

            for (query, id) in submitted {
                let item = match id {
                    Ok(id) => {
                        let status = self.wait(id).await.unwrap_or_else(|| QueryStatus::Error {
                            message: format!("query record {id} is no longer held"),
                        });
                        BatchItem { id: Some(id), query, status }
                    },
                    Err(e) => {
                        warn!(error = %e, "Question rejected");
                        BatchItem {
                            id: None,
                            query,
                            status: QueryStatus::Error { message: e.to_string() },
                        }
                    },
                };
                items.push(item);
            }
        }
        items
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.jobs.read().await.statuses.len()
    }

    /// True when no records are held
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.statuses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_table_evicts_oldest() {
        let mut table = JobTable::default();
        let ids: Vec<QueryId> = (0..3).map(|_| QueryId::new()).collect();
        for id in &ids {
            table.insert(*id, 2);
        }
        assert!(!table.statuses.contains_key(&ids[0]));
        assert!(table.statuses.contains_key(&ids[1]));
        assert!(table.statuses.contains_key(&ids[2]));
    }

    #[test]
    fn test_terminal_status_is_written_once() {
        let mut table = JobTable::default();
        let id = QueryId::new();
        table.insert(id, 10);
        table.advance(id, QueryStatus::Complete {
            result: Envelope::text("first"),
        });
        table.advance(id, QueryStatus::Complete {
            result: Envelope::text("second"),
        });
        assert_eq!(
            table.statuses.get(&id),
            Some(&QueryStatus::Complete {
                result: Envelope::text("first")
            })
        );
    }

    #[test]
    fn test_query_id_round_trips_through_display() {
        let id = QueryId::new();
        let parsed: QueryId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<QueryId>().is_err());
    }
}
