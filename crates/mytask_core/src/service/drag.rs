//! Drag and touch interaction state for board cards and columns.
//!
//! # Responsibility
//! - Carry the dragged task id and its current status in the transfer data.
//! - Turn a drop on a column into a move intent for the store.
//! - Expose explicit move actions on touch devices, where cards are not
//!   draggable.
//!
//! # Invariants
//! - A drop never produces an intent when the payload is missing, cannot be
//!   parsed, or already has the column's status.
//! - A card enters `Dragging` only on the tick after drag start.

use crate::model::task::{Task, TaskId, TaskStatus};
use std::collections::HashMap;

pub const TRANSFER_TASK_ID: &str = "taskId";
pub const TRANSFER_CURRENT_STATUS: &str = "currentStatus";

/// Key/value data attached to a drag gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferData {
    entries: HashMap<String, String>,
}

impl TransferData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// What a dragged card carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

impl DragPayload {
    pub fn write_to(&self, transfer: &mut TransferData) {
        transfer.set(TRANSFER_TASK_ID, self.task_id.clone());
        transfer.set(TRANSFER_CURRENT_STATUS, self.status.as_str());
    }

    pub fn read_from(transfer: &TransferData) -> Option<Self> {
        let task_id = transfer
            .get(TRANSFER_TASK_ID)
            .map(str::trim)
            .filter(|id| !id.is_empty())?;
        let status = TaskStatus::parse(transfer.get(TRANSFER_CURRENT_STATUS)?)?;
        Some(Self {
            task_id: task_id.to_string(),
            status,
        })
    }
}

/// Request to move a task into another column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveIntent {
    pub task_id: TaskId,
    pub to: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    /// Drag started; the visual state flips on the next tick.
    Pending,
    Dragging,
}

/// Action offered on an expanded card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    MoveTo(TaskStatus),
    Delete,
}

/// Interaction state of one rendered card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCard {
    task_id: TaskId,
    status: TaskStatus,
    touch_mode: bool,
    drag: DragState,
    expanded: bool,
}

impl TaskCard {
    pub fn new(task: &Task, touch_mode: bool) -> Self {
        Self {
            task_id: task.id.clone(),
            status: task.status,
            touch_mode,
            drag: DragState::Idle,
            expanded: false,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag == DragState::Dragging
    }

    pub fn is_draggable(&self) -> bool {
        !self.touch_mode
    }

    /// Starts a drag and writes the payload. Touch cards do not drag.
    pub fn drag_start(&mut self, transfer: &mut TransferData) -> bool {
        if !self.is_draggable() {
            return false;
        }
        DragPayload {
            task_id: self.task_id.clone(),
            status: self.status,
        }
        .write_to(transfer);
        self.drag = DragState::Pending;
        true
    }

    /// Zero-delay tick after drag start.
    pub fn tick(&mut self) {
        if self.drag == DragState::Pending {
            self.drag = DragState::Dragging;
        }
    }

    pub fn drag_end(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Toggles the detail view on touch devices.
    pub fn tap(&mut self) {
        if self.touch_mode {
            self.expanded = !self.expanded;
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Pointer devices always show details; touch devices only when expanded.
    pub fn details_visible(&self) -> bool {
        !self.touch_mode || self.expanded
    }

    /// One move per other status, in board order, then delete.
    pub fn actions(&self) -> Vec<CardAction> {
        TaskStatus::ALL
            .iter()
            .copied()
            .filter(|&status| status != self.status)
            .map(CardAction::MoveTo)
            .chain(std::iter::once(CardAction::Delete))
            .collect()
    }

    /// Intent for a move button; `None` for the card's own status.
    pub fn move_to(&self, status: TaskStatus) -> Option<MoveIntent> {
        (status != self.status).then(|| MoveIntent {
            task_id: self.task_id.clone(),
            to: status,
        })
    }
}

/// Drop target state of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropColumn {
    status: TaskStatus,
    hover: bool,
}

impl DropColumn {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            hover: false,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// True while a drag hovers over the column.
    pub fn is_drop_target(&self) -> bool {
        self.hover
    }

    pub fn drag_over(&mut self) {
        self.hover = true;
    }

    pub fn drag_leave(&mut self) {
        self.hover = false;
    }

    pub fn drop(&mut self, transfer: &TransferData) -> Option<MoveIntent> {
        self.hover = false;
        let payload = DragPayload::read_from(transfer)?;
        (payload.status != self.status).then(|| MoveIntent {
            task_id: payload.task_id,
            to: self.status,
        })
    }
}
