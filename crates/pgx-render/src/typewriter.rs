//! 逐字显示时间线
//!
//! 每个tick多显示一个字符，全部显示后标记完成并不再前进。
//! 更换文本会清空已显示部分并重新开始。

use std::time::Duration;

/// 默认每个字符的显示间隔
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(15);

/// 单次tick的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 多显示了一个字符
    Advanced,
    /// 本次tick使时间线完成，对每段文本只出现一次
    Completed,
    /// 已完成，不再前进
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealTimeline {
    text: String,
    total: usize,
    shown: usize,
    complete: bool,
}

impl RevealTimeline {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            total: text.chars().count(),
            text,
            shown: 0,
            complete: false,
        }
    }

    /// 更换文本；文本不同则从头开始，返回是否重新开始
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        *self = Self::new(text);
        true
    }

    /// 回到起点，文本不变
    pub fn restart(&mut self) {
        self.shown = 0;
        self.complete = false;
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.complete {
            return TickOutcome::Idle;
        }

        if self.shown < self.total {
            self.shown += 1;
        }

        if self.shown == self.total {
            self.complete = true;
            TickOutcome::Completed
        } else {
            TickOutcome::Advanced
        }
    }

    /// 当前已显示的前缀
    pub fn visible(&self) -> &str {
        let end = self
            .text
            .char_indices()
            .nth(self.shown)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        &self.text[..end]
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 已显示的字符数
    pub fn displayed_len(&self) -> usize {
        self.shown
    }

    pub fn total_len(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}
