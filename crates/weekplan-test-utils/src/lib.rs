//! Shared test utilities for weekplan integration tests.
//!
//! Provides a scripted [`GenerativeBackend`] that replays queued replies and
//! records every request it sees, plus plan and document fixtures.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use weekplan_core::backend::{BackendError, GenerationRequest, GenerativeBackend};
use weekplan_core::record::{DAY_LABELS, WeeklyPlanRecord, placeholder_record};
use weekplan_core::{CredentialResolver, GenerationInvoker, SourceDocument};

/// API key used by [`scripted_invoker`].
pub const TEST_API_KEY: &str = "test-key";

/// Class string carried by every fixture record.
pub const SAMPLE_CLASS: &str = "中（2）班";

type Reply = Result<Option<String>, BackendError>;

/// A backend that replays queued replies in order.
///
/// When the queue is empty it answers `Ok(None)`. With a gate installed,
/// each call waits for [`ScriptedBackend::release`] before answering, so
/// tests can observe a request while it is in flight.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
    keys: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A backend whose calls block until released.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Arc::new(Notify::new())),
            ..Self::default()
        })
    }

    /// Queue a successful payload.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Ok(Some(text.into())));
    }

    /// Queue a record, serialized as the backend would return it.
    pub fn push_record(&self, record: &WeeklyPlanRecord) {
        self.push_text(serde_json::to_string(record).expect("serialize record"));
    }

    /// Queue an empty answer.
    pub fn push_empty(&self) {
        self.push(Ok(None));
    }

    pub fn push_error(&self, err: BackendError) {
        self.push(Err(err));
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Let one gated call answer. No-op for ungated backends.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request seen, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Keys passed to each call.
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        api_key: &str,
        request: &GenerationRequest,
    ) -> Result<Option<String>, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        self.keys.lock().unwrap().push(api_key.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

/// Invoker over `backend` with [`TEST_API_KEY`].
pub fn scripted_invoker(backend: Arc<ScriptedBackend>) -> GenerationInvoker {
    GenerationInvoker::new(backend, CredentialResolver::fixed(TEST_API_KEY))
}

/// Invoker over `backend` with no credential at all.
pub fn keyless_invoker(backend: Arc<ScriptedBackend>) -> GenerationInvoker {
    GenerationInvoker::new(backend, CredentialResolver::none())
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const THEMES: [&str; 5] = ["秋叶", "南瓜", "稻谷", "苹果", "菊花"];

/// A lint-clean five-day record for the week of 2025-10-13.
pub fn sample_record() -> WeeklyPlanRecord {
    let mut record = placeholder_record();
    let monday = record.daily_plans[0].clone();
    record.daily_plans = DAY_LABELS
        .iter()
        .zip(THEMES)
        .enumerate()
        .map(|(i, (label, theme))| {
            let mut day = monday.clone();
            day.day = label.to_string();
            day.date = format!("2025.10.{}", 13 + i);
            day.collective_activity.title = format!("科学活动《{theme}的秘密》");
            day.game_activity.title = format!("角色游戏：{theme}小铺");
            day.outdoor_activity.title = format!("体育游戏：{theme}接力");
            day.dismissal.reflection =
                "★大部分幼儿整理有序。\n▲个别幼儿遗漏水杯。\n◎家长群同步通知任务。".to_string();
            day
        })
        .collect();
    record
}

/// [`sample_record`] as backend JSON.
pub fn sample_record_json() -> String {
    serde_json::to_string(&sample_record()).expect("serialize sample record")
}

/// `record` with Tuesday's physical activities made easier, leaving every
/// other section untouched.
pub fn easier_tuesday(record: &WeeklyPlanRecord) -> WeeklyPlanRecord {
    let mut refined = record.clone();
    let tuesday = &mut refined.daily_plans[1];
    tuesday.morning_exercise.activity =
        "1. 自主签到：选择运动手环。\n2. 体锻活动（平衡木）：在低矮平衡木上慢走。\n3. 放松活动：互相拍打肌肉。"
            .to_string();
    tuesday.outdoor_activity.content =
        "1. 教师扮风，幼儿扮落叶。\n2. 慢走代替奔跑。\n3. 减少方向指令。".to_string();
    refined
}

/// A PNG-typed document of exactly `size` bytes.
pub fn sample_png(size: usize) -> SourceDocument {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let mut bytes = vec![0u8; size];
    let n = size.min(SIGNATURE.len());
    bytes[..n].copy_from_slice(&SIGNATURE[..n]);
    SourceDocument::from_bytes(&bytes, "image/png", "weekly-schedule.png")
        .expect("fixture document within limits")
}

/// A small PNG document.
pub fn small_png() -> SourceDocument {
    sample_png(1024)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weekplan_core::lint_record;

    #[test]
    fn sample_record_is_lint_clean() {
        let report = lint_record(&sample_record());
        assert!(report.is_clean(), "{report}");
    }

    #[test]
    fn sample_record_parses() {
        let parsed = weekplan_core::parse_record(&sample_record_json()).unwrap();
        assert_eq!(parsed, sample_record());
        assert_eq!(parsed.weekly_info.class_str, SAMPLE_CLASS);
    }

    #[test]
    fn easier_tuesday_touches_only_tuesday() {
        let before = sample_record();
        let diff = weekplan_core::diff_records(&before, &easier_tuesday(&before));
        assert_eq!(diff.changed_days(), vec![1]);
    }

    #[tokio::test]
    async fn scripted_backend_replays_in_order() {
        let backend = ScriptedBackend::new();
        backend.push_text("a");
        backend.push_empty();
        let doc = small_png();
        let request = GenerationRequest::initial(doc, &Default::default());
        assert_eq!(backend.generate("k", &request).await.unwrap().as_deref(), Some("a"));
        assert!(backend.generate("k", &request).await.unwrap().is_none());
        assert_eq!(backend.calls(), 2);
        assert_eq!(backend.keys(), vec!["k", "k"]);
    }
}
