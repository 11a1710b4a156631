//! Search Debouncing
//! 顧客名サジェストなど、入力のたびに走る検索の発火を間引く。
//!
//! 世代カウンタ方式。入力ごとに世代を進め、待機明けと取得完了後の
//! 2 回とも自分の世代が最新であることを確かめる。古い応答が遅れて
//! 返ってきても結果は捨てられ、画面に届くのは常に最後の入力の結果だけ。

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer { delay, generation: Arc::new(AtomicU64::new(0)) }
    }

    /// 入力 1 回につき 1 回呼ぶ。遅延中に次の入力が来なければ fetch を
    /// 実行して Some を返す。追い越された呼び出しは None（fetch 自体を
    /// 省くか、完了後に結果を破棄する）。
    pub async fn run<F, Fut, T>(&self, fetch: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.delay).await;
        if self.generation.load(Ordering::SeqCst) != my_generation {
            return None;
        }

        let result = fetch().await;
        // 取得中にも追い越されうる
        if self.generation.load(Ordering::SeqCst) != my_generation {
            return None;
        }
        Some(result)
    }

    /// 進行中の待機・取得をすべて無効化する（入力欄クリアなど）
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
