//! 任务同步事件
//!
//! 每次刷新成功后，对比前后两次快照得出的变化

use crate::remote::types::{DownloadTask, TaskStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// 同步事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// 任务状态变化（新出现的任务 old_status 为 None）
    StatusChanged {
        task_id: String,
        old_status: Option<TaskStatus>,
        new_status: TaskStatus,
        task: DownloadTask,
    },
    /// 任务已不在远端列表中
    TaskRemoved { task_id: String },
    /// 任务列表刷新
    TaskListRefreshed { tasks: Vec<DownloadTask> },
}

impl SyncEvent {
    /// 获取事件类型名称
    pub fn event_type_name(&self) -> &'static str {
        match self {
            SyncEvent::StatusChanged { .. } => "status_changed",
            SyncEvent::TaskRemoved { .. } => "task_removed",
            SyncEvent::TaskListRefreshed { .. } => "task_list_refreshed",
        }
    }

    /// 获取任务 ID（如果有）
    pub fn task_id(&self) -> Option<&str> {
        match self {
            SyncEvent::StatusChanged { task_id, .. } => Some(task_id),
            SyncEvent::TaskRemoved { task_id } => Some(task_id),
            SyncEvent::TaskListRefreshed { .. } => None,
        }
    }
}

/// 事件回调函数类型
pub type EventCallback = Arc<dyn Fn(SyncEvent) + Send + Sync>;

/// 对比两次快照，生成事件列表
///
/// 顺序：状态变化（按新快照顺序）→ 移除的任务（按旧快照顺序）→ 列表刷新
pub fn diff_snapshots(previous: &[DownloadTask], current: &[DownloadTask]) -> Vec<SyncEvent> {
    let last_states: HashMap<&str, TaskStatus> = previous
        .iter()
        .map(|t| (t.id.as_str(), t.status))
        .collect();

    let mut events = Vec::new();

    for task in current {
        match last_states.get(task.id.as_str()) {
            Some(&last_status) if last_status == task.status => {}
            last_status => events.push(SyncEvent::StatusChanged {
                task_id: task.id.clone(),
                old_status: last_status.copied(),
                new_status: task.status,
                task: task.clone(),
            }),
        }
    }

    for task in previous {
        if !current.iter().any(|t| t.id == task.id) {
            events.push(SyncEvent::TaskRemoved {
                task_id: task.id.clone(),
            });
        }
    }

    events.push(SyncEvent::TaskListRefreshed {
        tasks: current.to_vec(),
    });
    events
}
