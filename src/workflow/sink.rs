//! 观察者通道：WorkflowSink trait 及三种实现
//!
//! - NullSink：丢弃事件
//! - ChannelSink：通过 tokio mpsc 转发给前端任务
//! - RecordingSink：记录全部事件，供测试断言

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::workflow::WorkflowEvent;

pub trait WorkflowSink: Send + Sync {
    fn emit(&self, event: WorkflowEvent);
}

#[derive(Debug, Default)]
pub struct NullSink;

impl WorkflowSink for NullSink {
    fn emit(&self, _event: WorkflowEvent) {}
}

/// 转发到无界通道；接收端关闭后静默丢弃
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<WorkflowEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl WorkflowSink for ChannelSink {
    fn emit(&self, event: WorkflowEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 产物更新事件数
    pub fn artifact_updates(&self) -> usize {
        self.count(|e| matches!(e, WorkflowEvent::Artifacts { .. }))
    }

    /// 终止错误事件中的消息
    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WorkflowEvent::Error { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&WorkflowEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| pred(e))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl WorkflowSink for RecordingSink {
    fn emit(&self, event: WorkflowEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(WorkflowEvent::Reset);
        assert!(matches!(rx.recv().await, Some(WorkflowEvent::Reset)));

        drop(rx);
        sink.emit(WorkflowEvent::Reset);
    }

    #[test]
    fn test_recording_sink_collects_errors() {
        let sink = RecordingSink::new();
        sink.emit(WorkflowEvent::Error {
            message: "boom".into(),
        });
        sink.emit(WorkflowEvent::Reset);
        assert_eq!(sink.errors(), vec!["boom".to_string()]);
        assert_eq!(sink.events().len(), 2);
        sink.clear();
        assert!(sink.events().is_empty());
    }
}
