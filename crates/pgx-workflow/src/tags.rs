//! 药物标签输入
//!
//! 维护有序且去重的药物名称集合，并基于静态药物表提供输入建议。

use pgx_core::utils::{join_drugs, normalize_token};
use std::time::{Duration, Instant};
use tracing::debug;

/// 远端服务具备CPIC指南覆盖的药物
pub const DRUG_VOCABULARY: &[&str] = &[
    // CYP2D6
    "CODEINE",
    "TRAMADOL",
    "ONDANSETRON",
    "TAMOXIFEN",
    "HYDROCODONE",
    "OXYCODONE",
    "ATOMOXETINE",
    "DEXTROMETHORPHAN",
    // CYP2C19
    "CLOPIDOGREL",
    "OMEPRAZOLE",
    "PANTOPRAZOLE",
    "LANSOPRAZOLE",
    "ESOMEPRAZOLE",
    "VORICONAZOLE",
    "CITALOPRAM",
    "ESCITALOPRAM",
    "SERTRALINE",
    // CYP2C9
    "WARFARIN",
    "PHENYTOIN",
    "CELECOXIB",
    "FLURBIPROFEN",
    // DPYD
    "FLUOROURACIL",
    "CAPECITABINE",
    "TEGAFUR",
    // TPMT
    "AZATHIOPRINE",
    "MERCAPTOPURINE",
    "THIOGUANINE",
    // CYP3A5
    "TACROLIMUS",
    // SLCO1B1
    "SIMVASTATIN",
    "ATORVASTATIN",
    "LOVASTATIN",
    "PRAVASTATIN",
    "ROSUVASTATIN",
    "FLUVASTATIN",
];

pub const MAX_SUGGESTIONS: usize = 6;

/// 失焦后延迟关闭建议列表，给指针点选留出时间
pub const BLUR_GRACE: Duration = Duration::from_millis(150);

/// 键盘输入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Enter,
    Backspace,
    Char(char),
}

/// 药物标签收集器
#[derive(Debug, Clone)]
pub struct TagCollector {
    tokens: Vec<String>,
    buffer: String,
    vocabulary: &'static [&'static str],
    suggestions_open: bool,
    close_at: Option<Instant>,
}

impl Default for TagCollector {
    fn default() -> Self {
        Self::new(DRUG_VOCABULARY)
    }
}

impl TagCollector {
    pub fn new(vocabulary: &'static [&'static str]) -> Self {
        Self {
            tokens: Vec::new(),
            buffer: String::new(),
            vocabulary,
            suggestions_open: false,
            close_at: None,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// 表单中 `drugs` 字段的值
    pub fn drugs_field(&self) -> String {
        join_drugs(&self.tokens)
    }

    /// 添加标签，规范化后为空或已存在时不做任何事
    pub fn add_token(&mut self, raw: &str) -> bool {
        let token = normalize_token(raw);
        if token.is_empty() || self.contains(&token) {
            return false;
        }
        debug!("Adding drug token {}", token);
        self.tokens.push(token);
        true
    }

    /// 移除标签，不存在时不做任何事
    pub fn remove_token(&mut self, token: &str) -> bool {
        match self.tokens.iter().position(|t| t == token) {
            Some(index) => {
                self.tokens.remove(index);
                true
            }
            None => false,
        }
    }

    /// 移除最近添加的标签
    pub fn remove_last(&mut self) -> Option<String> {
        self.tokens.pop()
    }

    /// 替换输入缓冲区内容（粘贴、输入法提交等）
    pub fn set_buffer(&mut self, text: &str) {
        self.buffer = text.to_string();
        self.open_suggestions();
    }

    /// 处理一次按键
    ///
    /// Enter 与逗号等价，提交当前缓冲区；缓冲区为空时静默忽略。
    /// 缓冲区为空时 Backspace 移除最后一个标签。
    pub fn handle_key(&mut self, key: KeyInput) {
        match key {
            KeyInput::Enter | KeyInput::Char(',') => self.commit_buffer(),
            KeyInput::Backspace => {
                if self.buffer.is_empty() {
                    if let Some(removed) = self.remove_last() {
                        debug!("Backspace removed drug token {}", removed);
                    }
                } else {
                    self.buffer.pop();
                }
            }
            KeyInput::Char(c) => {
                self.buffer.push(c);
                self.open_suggestions();
            }
        }
    }

    fn commit_buffer(&mut self) {
        let raw = std::mem::take(&mut self.buffer);
        self.add_token(&raw);
    }

    /// 当前缓冲区对应的建议
    ///
    /// 惰性迭代器，每次调用都从头开始。
    pub fn suggestions(&self) -> impl Iterator<Item = &'static str> + '_ {
        let needle = self.buffer.trim().to_lowercase();
        self.vocabulary
            .iter()
            .copied()
            .filter(move |candidate| candidate.to_lowercase().contains(&needle))
            .filter(move |candidate| !self.contains(candidate))
            .take(MAX_SUGGESTIONS)
    }

    /// 选中一条建议
    pub fn select_suggestion(&mut self, suggestion: &str) -> bool {
        let added = self.add_token(suggestion);
        self.buffer.clear();
        self.close_suggestions();
        added
    }

    pub fn focus(&mut self) {
        self.open_suggestions();
    }

    /// 失焦：建议列表在宽限期后关闭
    pub fn blur(&mut self, now: Instant) {
        self.close_at = Some(now + BLUR_GRACE);
    }

    /// 宽限期到期时关闭建议列表
    pub fn poll_blur(&mut self, now: Instant) {
        if matches!(self.close_at, Some(deadline) if now >= deadline) {
            self.close_suggestions();
        }
    }

    pub fn suggestions_visible(&self) -> bool {
        self.suggestions_open
    }

    /// 清空所有标签与输入
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.buffer.clear();
        self.close_suggestions();
    }

    fn open_suggestions(&mut self) {
        self.suggestions_open = true;
        self.close_at = None;
    }

    fn close_suggestions(&mut self) {
        self.suggestions_open = false;
        self.close_at = None;
    }
}
