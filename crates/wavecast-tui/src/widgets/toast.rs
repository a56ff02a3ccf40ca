//! Transient status messages in the top-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO};

pub const ERROR_TTL: Duration = Duration::from_secs(5);
pub const INFO_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Info,
    Error,
}

struct Toast {
    message: String,
    severity: Severity,
    expires: Instant,
}

pub struct ToastManager {
    toasts: VecDeque<Toast>,
    max_visible: usize,
}

/// Message plus icon and padding, capped to `max_width` and the area.
fn toast_width(message: &str, max_width: u16, area_width: u16) -> u16 {
    let msg_len = u16::try_from(message.chars().count()).unwrap_or(u16::MAX);
    msg_len.saturating_add(4).min(max_width).min(area_width)
}

impl ToastManager {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            max_visible: 3,
        }
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity, ttl: Duration) {
        self.push_at(message.into(), severity, Instant::now() + ttl);
    }

    fn push_at(&mut self, message: String, severity: Severity, expires: Instant) {
        // same message again just refreshes its expiry
        self.toasts.retain(|t| t.message != message);
        self.toasts.push_back(Toast {
            message,
            severity,
            expires,
        });
        while self.toasts.len() > self.max_visible * 2 {
            self.toasts.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Info, INFO_TTL);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Error, ERROR_TTL);
    }

    /// Drop expired toasts.  Returns true if anything changed.
    pub fn tick(&mut self) -> bool {
        self.expire(Instant::now())
    }

    fn expire(&mut self, now: Instant) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.expires > now);
        before != self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    /// Newest error still on screen.
    pub fn latest_error(&self) -> Option<&str> {
        self.toasts
            .iter()
            .rev()
            .find(|t| t.severity == Severity::Error)
            .map(|t| t.message.as_str())
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if self.is_empty() {
            return;
        }
        let max_width = (area.width / 2).clamp(30, 60);
        let mut y = area.y + 1;

        for toast in self.toasts.iter().rev().take(self.max_visible) {
            if y >= area.y + area.height {
                break;
            }
            let w = toast_width(&toast.message, max_width, area.width);
            let x = area.x + area.width.saturating_sub(w + 1);
            let (color, icon) = match toast.severity {
                Severity::Info => (C_TOAST_INFO, "·"),
                Severity::Error => (C_TOAST_ERROR, "✗"),
            };

            let toast_area = Rect {
                x,
                y,
                width: w,
                height: 1,
            };
            frame.render_widget(Clear, toast_area);
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    format!(" {} {} ", icon, toast.message),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))),
                toast_area,
            );
            y += 1;
        }
    }
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_expire() {
        let mut toasts = ToastManager::new();
        let now = Instant::now();
        toasts.push_at("stream failed".into(), Severity::Error, now + ERROR_TTL);
        assert_eq!(toasts.latest_error(), Some("stream failed"));

        assert!(!toasts.expire(now + Duration::from_secs(4)));
        assert!(toasts.expire(now + Duration::from_secs(6)));
        assert!(toasts.is_empty());
    }

    #[test]
    fn test_duplicate_message_replaced() {
        let mut toasts = ToastManager::new();
        toasts.error("same");
        toasts.error("same");
        toasts.info("other");
        assert_eq!(toasts.toasts.len(), 2);
        assert_eq!(toasts.latest_error(), Some("same"));
    }

    #[test]
    fn test_toast_width_saturates_on_huge_messages() {
        assert_eq!(toast_width("short", 60, 100), 9);
        assert_eq!(toast_width("short", 60, 6), 6);
        let huge = "x".repeat(usize::from(u16::MAX) + 10);
        assert_eq!(toast_width(&huge, 60, 100), 60);
    }
}
