use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// 默认计时时长
pub const DEFAULT_HOLD_TIMEOUT: Duration = Duration::from_millis(3000);

type FireCallback = Arc<dyn Fn() + Send + Sync>;

struct Armed {
    generation: u64,
    token: CancellationToken,
}

/// 单次触发的可取消计时器
///
/// 每次 `start` 都是一次新的计时，旧的计时被取消。
/// 同一次计时最多触发一次回调；计时器被丢弃时所有计时一并取消。
pub struct HoldTimer {
    duration: Duration,
    on_fire: FireCallback,
    armed: Arc<Mutex<Option<Armed>>>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

impl HoldTimer {
    pub fn new(duration: Duration, on_fire: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            duration,
            on_fire: Arc::new(on_fire),
            armed: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// 开始计时（已在计时则重新开始）
    pub async fn start(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.shutdown.child_token();

        {
            let mut armed = self.armed.lock().await;
            if let Some(previous) = armed.replace(Armed {
                generation,
                token: token.clone(),
            }) {
                previous.token.cancel();
            }
        }

        let armed = self.armed.clone();
        let on_fire = self.on_fire.clone();
        let duration = self.duration;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    {
                        let mut armed = armed.lock().await;
                        match armed.as_ref() {
                            Some(current) if current.generation == generation => {
                                armed.take();
                            }
                            _ => return,
                        }
                    }
                    tracing::debug!("[HoldTimer] Fired after {:?}", duration);
                    on_fire();
                }
            }
        });

        tracing::trace!("[HoldTimer] Armed ({:?})", self.duration);
    }

    /// 重新开始计时
    pub async fn reset(&self) {
        self.start().await;
    }

    /// 取消计时，返回是否有正在进行的计时
    pub async fn cancel(&self) -> bool {
        match self.armed.lock().await.take() {
            Some(armed) => {
                armed.token.cancel();
                tracing::trace!("[HoldTimer] Cancelled");
                true
            }
            None => false,
        }
    }

    pub async fn is_armed(&self) -> bool {
        self.armed.lock().await.is_some()
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
