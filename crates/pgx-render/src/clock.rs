//! 显示时钟
//!
//! 以固定周期推进视图中的所有时间线，直到全部完成。

use crate::view::ResultView;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// 推进视图直到稳定，每帧之后调用 `on_frame`；返回推进的帧数
pub async fn run_until_settled<F>(view: &mut ResultView, period: Duration, mut on_frame: F) -> usize
where
    F: FnMut(&ResultView),
{
    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // 第一次tick立即返回
    ticker.tick().await;

    let mut frames = 0;
    while !view.is_settled() {
        ticker.tick().await;
        view.tick_all();
        frames += 1;
        on_frame(view);
    }

    debug!("Result view settled after {} frames", frames);
    frames
}

/// 不做动画，直接推进到稳定
pub fn settle_now(view: &mut ResultView) -> usize {
    let mut frames = 0;
    while !view.is_settled() {
        view.tick_all();
        frames += 1;
    }
    frames
}
