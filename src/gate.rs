//! 共有コンソール接続への排他アクセス
//!
//! ゲートがコンソールを所有し、[`GateHandle`] を通してのみ触れる。ハンドルは常に高々1つ。
//! 建築リクエストはコマンド列の送信が終わるまでハンドルを保持するため、
//! 2つのリクエストのコマンドが接続上で混ざることはない。
//! ハンドルを drop すれば（タイムアウトで future ごと破棄された場合も）ゲートは解放される。

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {0:?} waiting for the console connection")]
pub struct GateTimeout(pub Duration);

pub struct ConnectionGate<C> {
    inner: Arc<Mutex<C>>,
}

impl<C> Clone for ConnectionGate<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C> ConnectionGate<C> {
    pub fn new(console: C) -> Self {
        Self { inner: Arc::new(Mutex::new(console)) }
    }

    /// 接続が空くまで待つ。待機者は FIFO 順
    pub async fn acquire(&self) -> GateHandle<C> {
        let started = Instant::now();
        let guard = Arc::clone(&self.inner).lock_owned().await;
        debug!(target: "gate", waited_ms = started.elapsed().as_millis() as u64, "gate_acquired");
        GateHandle { guard }
    }

    pub async fn acquire_timeout(&self, limit: Duration) -> Result<GateHandle<C>, GateTimeout> {
        tokio::time::timeout(limit, self.acquire())
            .await
            .map_err(|_| GateTimeout(limit))
    }

    /// 待たずに取得を試みる。他のハンドルが生きていれば `None`
    pub fn try_acquire(&self) -> Option<GateHandle<C>> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .ok()
            .map(|guard| GateHandle { guard })
    }
}

/// コンソールへの排他アクセス。Deref でコンソールとして使える
pub struct GateHandle<C> {
    guard: OwnedMutexGuard<C>,
}

impl<C> GateHandle<C> {
    /// 明示的に解放する（drop と同じ）
    pub fn release(self) {
        debug!(target: "gate", "gate_released");
    }
}

impl<C> Deref for GateHandle<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.guard
    }
}

impl<C> DerefMut for GateHandle<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.guard
    }
}
