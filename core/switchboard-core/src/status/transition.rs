//! Maps Claude hook events to runtime status.
//! Only the event type matters; tool names and messages are never inspected.
//!
//! ```text
//! PreToolUse / PostToolUse / PreCompact          -> running
//! Notification permission_prompt                 -> stuck
//! Notification idle_prompt                       -> complete
//! Notification user_cancelled_tool_use           -> running
//! Notification (any other type, or none)         -> complete
//! Stop                                           -> complete
//! SessionEnd                                     -> idle
//! anything else (SessionStart, unknown names)    -> idle
//! ```

use crate::events::{EventName, HookEvent, NotificationType};

use super::types::RuntimeStatus;

/// Computes the status a directory moves to when `event` arrives.
///
/// Every row is absolute: the prior status never changes the outcome, so a
/// late event simply overwrites whatever came before it.
pub fn next_status(_prior: RuntimeStatus, event: &HookEvent) -> RuntimeStatus {
    match event.event_name {
        EventName::PreToolUse | EventName::PostToolUse | EventName::PreCompact => {
            RuntimeStatus::Running
        }
        EventName::Notification => match event.notification_type {
            Some(NotificationType::PermissionPrompt) => RuntimeStatus::Stuck,
            Some(NotificationType::IdlePrompt) => RuntimeStatus::Complete,
            Some(NotificationType::UserCancelledToolUse) => RuntimeStatus::Running,
            Some(NotificationType::Message) | Some(NotificationType::Other) | None => {
                RuntimeStatus::Complete
            }
        },
        EventName::Stop => RuntimeStatus::Complete,
        EventName::SessionEnd => RuntimeStatus::Idle,
        EventName::SessionStart | EventName::Unknown => RuntimeStatus::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: EventName) -> HookEvent {
        HookEvent::new("/work/api", name)
    }

    fn notification(kind: Option<NotificationType>) -> HookEvent {
        let mut e = event(EventName::Notification);
        e.notification_type = kind;
        e
    }

    #[test]
    fn test_tool_events_yield_running() {
        for name in [EventName::PreToolUse, EventName::PostToolUse, EventName::PreCompact] {
            assert_eq!(
                next_status(RuntimeStatus::Idle, &event(name)),
                RuntimeStatus::Running
            );
        }
    }

    #[test]
    fn test_permission_prompt_yields_stuck() {
        assert_eq!(
            next_status(
                RuntimeStatus::Running,
                &notification(Some(NotificationType::PermissionPrompt))
            ),
            RuntimeStatus::Stuck
        );
    }

    #[test]
    fn test_idle_prompt_yields_complete() {
        assert_eq!(
            next_status(
                RuntimeStatus::Running,
                &notification(Some(NotificationType::IdlePrompt))
            ),
            RuntimeStatus::Complete
        );
    }

    #[test]
    fn test_cancelled_tool_use_resumes_running() {
        assert_eq!(
            next_status(
                RuntimeStatus::Stuck,
                &notification(Some(NotificationType::UserCancelledToolUse))
            ),
            RuntimeStatus::Running
        );
    }

    #[test]
    fn test_other_or_absent_notification_yields_complete() {
        for kind in [
            Some(NotificationType::Message),
            Some(NotificationType::Other),
            None,
        ] {
            assert_eq!(
                next_status(RuntimeStatus::Running, &notification(kind)),
                RuntimeStatus::Complete
            );
        }
    }

    #[test]
    fn test_stop_yields_complete() {
        assert_eq!(
            next_status(RuntimeStatus::Running, &event(EventName::Stop)),
            RuntimeStatus::Complete
        );
    }

    #[test]
    fn test_session_end_yields_idle() {
        assert_eq!(
            next_status(RuntimeStatus::Complete, &event(EventName::SessionEnd)),
            RuntimeStatus::Idle
        );
    }

    #[test]
    fn test_unrecognized_events_yield_idle_from_every_state() {
        for prior in RuntimeStatus::ALL {
            assert_eq!(
                next_status(prior, &event(EventName::Unknown)),
                RuntimeStatus::Idle
            );
            assert_eq!(
                next_status(prior, &event(EventName::SessionStart)),
                RuntimeStatus::Idle
            );
        }
    }

    #[test]
    fn test_out_of_order_running_overwrites_complete() {
        assert_eq!(
            next_status(RuntimeStatus::Complete, &event(EventName::PostToolUse)),
            RuntimeStatus::Running
        );
    }
}
