use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 实时快照订阅
///
/// 丢弃订阅即取消监听，生产端任务随之退出
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    cancel: CancellationToken,
}

impl<T> Subscription<T> {
    pub fn new(receiver: mpsc::UnboundedReceiver<T>, cancel: CancellationToken) -> Self {
        Self { receiver, cancel }
    }

    /// 等待下一个快照，生产端结束时返回 None
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// 取出已到达的快照（不等待）
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// 显式取消订阅
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<T: Send + 'static> Subscription<T> {
    /// 转换快照类型，`f` 返回 None 的快照会被跳过
    pub fn filter_map<U, F>(self, mut f: F) -> Subscription<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut upstream = self;

        tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    _ = token.cancelled() => break,
                    item = upstream.recv() => item,
                };
                let Some(item) = item else { break };
                if let Some(mapped) = f(item) {
                    if tx.send(mapped).is_err() {
                        break;
                    }
                }
            }
        });

        Subscription::new(rx, cancel)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
