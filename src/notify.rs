//! エントリーが変更されたことを購読者に伝える仕組み。
//!
//! 通知はペイロードを持たない。受け取った側はリポジトリから全件を読み直す。

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use log::debug;

/// データが変更されたことを表すシグナル。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataChanged;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: HashMap<u64, Sender<DataChanged>>,
}

/// 変更通知の送り元。
///
/// cloneしたものは同じ購読者の一覧を共有する。
#[derive(Clone, Default)]
pub struct ChangeBridge {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl ChangeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// 購読を開始する。返り値をdropすると購読は解除される。
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let mut subscribers = lock(&self.subscribers);
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.senders.insert(id, sender);
        debug!("Subscriber {} attached", id);

        Subscription {
            id,
            receiver,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// 全ての購読者に変更を通知する。
    ///
    /// 受信側が既に無くなっている購読は取り除く。
    pub fn broadcast(&self) {
        let mut subscribers = lock(&self.subscribers);
        subscribers
            .senders
            .retain(|_, sender| sender.send(DataChanged).is_ok());
        debug!(
            "Broadcast data change to {} subscriber(s)",
            subscribers.senders.len()
        );
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).senders.len()
    }
}

/// 変更通知の購読。
pub struct Subscription {
    id: u64,
    receiver: Receiver<DataChanged>,
    subscribers: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    /// 前回の確認以降に通知があったかどうか。溜まっている通知はまとめて消費する。
    pub fn poll(&self) -> bool {
        let mut changed = false;
        loop {
            match self.receiver.try_recv() {
                Ok(DataChanged) => changed = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return changed,
            }
        }
    }

    /// 通知が来るまで最大`timeout`だけ待つ。
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(DataChanged) => {
                self.poll();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            lock(&subscribers).senders.remove(&self.id);
            debug!("Subscriber {} detached", self.id);
        }
    }
}

// 通知中にパニックしても購読者の一覧自体は壊れないので、poisonは無視する
fn lock(subscribers: &Mutex<Subscribers>) -> MutexGuard<'_, Subscribers> {
    subscribers
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::ChangeBridge;

    #[test]
    fn test_broadcast_reaches_all_subscribers() {
        let bridge = ChangeBridge::new();
        let first = bridge.subscribe();
        let second = bridge.subscribe();

        bridge.broadcast();

        assert!(first.poll());
        assert!(second.poll());
        assert!(!first.poll());
    }

    #[test]
    fn test_poll_coalesces_signals() {
        let bridge = ChangeBridge::new();
        let subscription = bridge.subscribe();

        bridge.broadcast();
        bridge.broadcast();

        assert!(subscription.poll());
        assert!(!subscription.poll());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bridge = ChangeBridge::new();
        let subscription = bridge.subscribe();
        assert_eq!(bridge.subscriber_count(), 1);

        drop(subscription);

        assert_eq!(bridge.subscriber_count(), 0);
        bridge.broadcast();
    }

    #[test]
    fn test_clone_shares_subscribers() {
        let bridge = ChangeBridge::new();
        let subscription = bridge.subscribe();

        bridge.clone().broadcast();

        assert!(subscription.poll());
    }

    #[test]
    fn test_no_signal_before_subscribe() {
        let bridge = ChangeBridge::new();
        bridge.broadcast();

        let subscription = bridge.subscribe();

        assert!(!subscription.poll());
    }

    #[test]
    fn test_wait_timeout_across_threads() {
        let bridge = ChangeBridge::new();
        let subscription = bridge.subscribe();
        let sender = bridge.clone();

        let handle = thread::spawn(move || sender.broadcast());
        handle.join().unwrap();

        assert!(subscription.wait_timeout(Duration::from_secs(1)));
        assert!(!subscription.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_subscription_outlives_bridge() {
        let bridge = ChangeBridge::new();
        let subscription = bridge.subscribe();

        drop(bridge);

        assert!(!subscription.poll());
    }
}
