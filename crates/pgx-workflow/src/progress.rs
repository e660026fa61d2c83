//! 分析进度提示
//!
//! 纯展示用途的阶段标签轮播，与服务端真实进度无关。

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// 远端分析流水线的各个阶段
pub const ANALYSIS_PHASES: &[&str] = &[
    "Parsing VCF file",
    "Extracting pharmacogenomic variants",
    "Matching star allele haplotypes",
    "Applying CPIC guidelines",
    "Retrieving clinical knowledge",
    "Generating AI explanations",
];

pub const DEFAULT_PHASE_INTERVAL: Duration = Duration::from_millis(800);

/// 阶段标签轮播器
///
/// 每个间隔前进一个阶段，到达最后一个阶段后保持不动。
/// 定时任务由本实例独占，`stop` 与 `Drop` 保证只取消一次。
#[derive(Debug)]
pub struct PhaseTicker {
    phases: &'static [&'static str],
    current: watch::Receiver<usize>,
    handle: Option<JoinHandle<()>>,
}

impl PhaseTicker {
    /// 启动轮播，必须在tokio运行时内调用
    pub fn start(phases: &'static [&'static str], interval: Duration) -> Self {
        let (tx, rx) = watch::channel(0usize);
        let last = phases.len().saturating_sub(1);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 第一次tick立即完成
            ticker.tick().await;

            let mut index = 0;
            while index < last {
                ticker.tick().await;
                index += 1;
                debug!("Analysis phase advanced to {}", index);
                if tx.send(index).is_err() {
                    break;
                }
            }
        });

        Self {
            phases,
            current: rx,
            handle: Some(handle),
        }
    }

    /// 当前阶段序号
    pub fn index(&self) -> usize {
        *self.current.borrow()
    }

    /// 当前阶段标签
    pub fn label(&self) -> &'static str {
        self.phases.get(self.index()).copied().unwrap_or_default()
    }

    pub fn phases(&self) -> &'static [&'static str] {
        self.phases
    }

    /// 订阅阶段变化
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.current.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// 停止轮播，返回本次调用是否真正取消了定时任务
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for PhaseTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_and_holds_on_last_phase() {
        let ticker = PhaseTicker::start(ANALYSIS_PHASES, DEFAULT_PHASE_INTERVAL);
        assert_eq!(ticker.label(), "Parsing VCF file");

        advance(850).await;
        assert_eq!(ticker.index(), 1);

        advance(800 * 10).await;
        assert_eq!(ticker.index(), ANALYSIS_PHASES.len() - 1);
        assert_eq!(ticker.label(), "Generating AI explanations");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_exactly_once() {
        let mut ticker = PhaseTicker::start(ANALYSIS_PHASES, DEFAULT_PHASE_INTERVAL);
        assert!(ticker.is_running());
        assert!(ticker.stop());
        assert!(!ticker.stop());

        advance(5_000).await;
        // 取消后不再前进
        assert_eq!(ticker.index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_sees_changes() {
        let ticker = PhaseTicker::start(ANALYSIS_PHASES, DEFAULT_PHASE_INTERVAL);
        let mut rx = ticker.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }
}
