//! 结果视图
//!
//! 每个结果条目拥有独立的展示状态（摘要时间线、机制时间线、展开与原始数据开关），
//! 按稳定的条目键存放在视图中。结果列表变化时旧条目的展示状态随之丢弃。

use crate::export;
use crate::summary::RiskSummary;
use crate::typewriter::{RevealTimeline, TickOutcome};
use pgx_core::{ResultItem, Result};
use std::collections::HashMap;
use tracing::debug;

/// 条目键：`<序号>:<药物>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(index: usize, item: &ResultItem) -> Self {
        Self(format!("{}:{}", index, item.drug))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 条目的展开阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisclosureStage {
    /// 折叠，摘要可能仍在显示中
    Collapsed,
    /// 已展开，摘要尚未显示完，机制部分隐藏
    AwaitingSummary,
    /// 已展开，摘要完成，机制正在显示
    RevealingMechanism,
    /// 已展开，全部显示完成
    Settled,
}

/// 单个条目的展示状态
#[derive(Debug, Clone)]
pub struct ItemDisplay {
    key: ItemKey,
    summary: RevealTimeline,
    mechanism: Option<RevealTimeline>,
    expanded: bool,
    show_raw: bool,
}

impl ItemDisplay {
    pub fn new(key: ItemKey, item: &ResultItem) -> Self {
        let explanation = &item.llm_generated_explanation;
        Self {
            key,
            summary: RevealTimeline::new(explanation.summary.clone()),
            mechanism: explanation.mechanism.clone().map(RevealTimeline::new),
            expanded: false,
            show_raw: false,
        }
    }

    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    /// 同步新的解释文本；文本变化的时间线从头开始
    fn sync_text(&mut self, item: &ResultItem) {
        let explanation = &item.llm_generated_explanation;
        self.summary.set_text(&explanation.summary);
        match (&mut self.mechanism, &explanation.mechanism) {
            (Some(timeline), Some(text)) => {
                timeline.set_text(text);
            }
            (slot, text) => *slot = text.clone().map(RevealTimeline::new),
        }
    }

    /// 推进时间线
    ///
    /// 机制时间线只在展开且摘要已完成之后才开始，保证先摘要后机制。
    pub fn tick(&mut self) -> bool {
        let summary_was_complete = self.summary.is_complete();
        let mut advanced = self.summary.tick() != TickOutcome::Idle;

        if self.expanded && summary_was_complete {
            if let Some(mechanism) = self.mechanism.as_mut() {
                let outcome = mechanism.tick();
                if outcome == TickOutcome::Completed {
                    debug!("Mechanism reveal completed for {}", self.key);
                }
                advanced |= outcome != TickOutcome::Idle;
            }
        }

        advanced
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// 切换展开状态
    ///
    /// 折叠不会中断摘要，只会隐藏机制部分；机制在再次展开后从头显示。
    pub fn toggle_expanded(&mut self) {
        self.expanded = !self.expanded;
        if !self.expanded {
            if let Some(mechanism) = self.mechanism.as_mut() {
                mechanism.restart();
            }
        }
    }

    pub fn show_raw(&self) -> bool {
        self.show_raw
    }

    pub fn toggle_raw(&mut self) {
        self.show_raw = !self.show_raw;
    }

    pub fn summary(&self) -> &RevealTimeline {
        &self.summary
    }

    pub fn summary_text(&self) -> &str {
        self.summary.visible()
    }

    pub fn has_mechanism(&self) -> bool {
        self.mechanism.is_some()
    }

    /// 机制部分是否可见：必须展开且摘要已完整显示
    pub fn mechanism_visible(&self) -> bool {
        self.expanded && self.summary.is_complete() && self.mechanism.is_some()
    }

    pub fn mechanism(&self) -> Option<&RevealTimeline> {
        if self.mechanism_visible() {
            self.mechanism.as_ref()
        } else {
            None
        }
    }

    pub fn mechanism_text(&self) -> Option<&str> {
        self.mechanism().map(|m| m.visible())
    }

    pub fn stage(&self) -> DisclosureStage {
        if !self.expanded {
            return DisclosureStage::Collapsed;
        }
        if !self.summary.is_complete() {
            return DisclosureStage::AwaitingSummary;
        }
        match &self.mechanism {
            Some(m) if !m.is_complete() => DisclosureStage::RevealingMechanism,
            _ => DisclosureStage::Settled,
        }
    }

    /// 所有可见时间线是否都已完成
    pub fn is_settled(&self) -> bool {
        if !self.summary.is_complete() {
            return false;
        }
        if !self.expanded {
            return true;
        }
        self.mechanism.as_ref().map_or(true, |m| m.is_complete())
    }
}

/// 结果视图
#[derive(Debug, Default)]
pub struct ResultView {
    items: Vec<ResultItem>,
    displays: Vec<ItemDisplay>,
    index: HashMap<ItemKey, usize>,
}

impl ResultView {
    pub fn new(items: Vec<ResultItem>) -> Self {
        let mut view = Self::default();
        view.replace(items);
        view
    }

    /// 替换结果列表
    ///
    /// 键仍然存在的条目保留其开关状态，其余展示状态被丢弃。
    pub fn replace(&mut self, items: Vec<ResultItem>) {
        let mut previous: HashMap<ItemKey, ItemDisplay> = self
            .displays
            .drain(..)
            .map(|d| (d.key.clone(), d))
            .collect();

        self.index.clear();
        for (i, item) in items.iter().enumerate() {
            let key = ItemKey::new(i, item);
            let display = match previous.remove(&key) {
                Some(mut display) => {
                    display.sync_text(item);
                    display
                }
                None => ItemDisplay::new(key.clone(), item),
            };
            self.index.insert(key, i);
            self.displays.push(display);
        }
        self.items = items;
    }

    pub fn items(&self) -> &[ResultItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn summary(&self) -> RiskSummary {
        RiskSummary::from_results(&self.items)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ItemKey> {
        self.displays.iter().map(|d| &d.key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ResultItem, &ItemDisplay)> {
        self.items.iter().zip(self.displays.iter())
    }

    pub fn get(&self, key: &ItemKey) -> Option<(&ResultItem, &ItemDisplay)> {
        let i = *self.index.get(key)?;
        Some((&self.items[i], &self.displays[i]))
    }

    pub fn display_mut(&mut self, key: &ItemKey) -> Option<&mut ItemDisplay> {
        let i = *self.index.get(key)?;
        self.displays.get_mut(i)
    }

    pub fn toggle_expanded(&mut self, key: &ItemKey) -> bool {
        match self.display_mut(key) {
            Some(display) => {
                display.toggle_expanded();
                true
            }
            None => false,
        }
    }

    pub fn toggle_raw(&mut self, key: &ItemKey) -> bool {
        match self.display_mut(key) {
            Some(display) => {
                display.toggle_raw();
                true
            }
            None => false,
        }
    }

    pub fn expand_all(&mut self) {
        for display in &mut self.displays {
            if !display.expanded {
                display.toggle_expanded();
            }
        }
    }

    /// 推进所有时间线
    pub fn tick_all(&mut self) {
        for display in &mut self.displays {
            display.tick();
        }
    }

    pub fn is_settled(&self) -> bool {
        self.displays.iter().all(|d| d.is_settled())
    }

    /// 单条结果的导出内容
    pub fn export_item(&self, key: &ItemKey) -> Option<Result<Vec<u8>>> {
        self.get(key).map(|(item, _)| export::export_item(item))
    }

    /// 全部结果的导出内容
    pub fn export_all(&self) -> Result<Vec<u8>> {
        export::export_all(&self.items)
    }
}
