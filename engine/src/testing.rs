//! Fakes shared by the engine's unit tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nexus_providers::{ChatModel, ProviderError, TextFut};
use nexus_tools::{DataPaths, MemoryClipboard, Os, RecordingPlatform, ToolCtx, ToolRegistry};
use nexus_types::ChatMessage;
use nexus_voice::RecordingSpeaker;

use crate::dispatch::Dispatcher;
use crate::narrator::Narrator;

/// Chat model that plays back canned replies and records every request.
#[derive(Clone, Default)]
pub(crate) struct ScriptedModel {
    replies: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedModel {
    pub(crate) fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::default();
        if let Ok(mut queue) = model.replies.lock() {
            queue.extend(replies.into_iter().map(|r| Ok(r.into())));
        }
        model
    }

    pub(crate) fn failing(error: ProviderError) -> Self {
        let model = Self::default();
        if let Ok(mut queue) = model.replies.lock() {
            queue.push_back(Err(error));
        }
        model
    }

    pub(crate) fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ChatModel for ScriptedModel {
    fn complete<'a>(&'a self, messages: &'a [ChatMessage]) -> TextFut<'a> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or(Err(ProviderError::EmptyResponse));
        Box::pin(async move { next })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub(crate) fn linux_ctx(dir: &Path) -> (ToolCtx, Arc<RecordingPlatform>) {
    let platform = Arc::new(RecordingPlatform::new(Os::Linux));
    let ctx = ToolCtx::new(
        DataPaths::new(dir),
        platform.clone(),
        Arc::new(MemoryClipboard::default()),
    );
    (ctx, platform)
}

pub(crate) fn dispatcher_with(registry: ToolRegistry, ctx: ToolCtx) -> (Dispatcher, RecordingSpeaker) {
    let speaker = RecordingSpeaker::new();
    let dispatcher = Dispatcher::new(
        Arc::new(registry),
        ctx,
        Narrator::new(Arc::new(speaker.clone())),
        Duration::from_secs(5),
    );
    (dispatcher, speaker)
}
