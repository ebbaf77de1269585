use crate::core::logging::log_ctx;
use crate::core::{Result, SourceError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::thread::{self, JoinHandle};

/// 工作项：在某个工作线程上恰好执行一次
pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// 异步工作队列
///
/// `submit` 立即返回，工作项稍后在未指定的线程上执行。
/// 两个独立提交的工作项之间没有顺序保证
pub trait WorkQueue: Send + Sync {
    fn submit(&self, item: WorkItem) -> Result<()>;
}

/// 线程池工作队列
/// - 工作项通过无界 channel 分发给 N 个工作线程
/// - drop 时关闭发送端，工作线程执行完剩余工作项后退出
pub struct ThreadPoolWorkQueue {
    sender: Mutex<Option<Sender<WorkItem>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPoolWorkQueue {
    /// 启动工作线程
    pub fn new(worker_threads: usize) -> Result<Self> {
        if worker_threads == 0 {
            return Err(SourceError::InvalidRequest(
                "工作线程数必须大于 0".to_string(),
            ));
        }

        let (sender, receiver) = unbounded::<WorkItem>();
        let mut workers = Vec::with_capacity(worker_threads);

        for index in 0..worker_threads {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("myy-source-worker-{}", index))
                .spawn(move || Self::worker_loop(index, receiver))?;
            workers.push(handle);
        }

        info!("{} 🧵 工作队列启动: {} 个工作线程", log_ctx(), worker_threads);

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// 工作线程循环：recv() 在发送端全部关闭后返回 Err，线程退出
    fn worker_loop(index: usize, receiver: Receiver<WorkItem>) {
        debug!("{} 工作线程 #{} 启动", log_ctx(), index);
        let mut executed: usize = 0;

        while let Ok(item) = receiver.recv() {
            item();
            executed += 1;
        }

        debug!("{} 工作线程 #{} 退出（共执行 {} 个工作项）", log_ctx(), index, executed);
    }

    /// 停止工作队列：关闭发送端并等待工作线程退出
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_none() {
            return;
        }
        info!("{} 🛑 工作队列停止", log_ctx());

        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            // 最后一个引用可能在工作线程内部被释放，不能 join 自己
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("{} ❌ 工作线程异常退出", log_ctx());
            }
        }
    }
}

impl WorkQueue for ThreadPoolWorkQueue {
    fn submit(&self, item: WorkItem) -> Result<()> {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender.send(item).map_err(|_| SourceError::Shutdown),
            None => Err(SourceError::Shutdown),
        }
    }
}

impl Drop for ThreadPoolWorkQueue {
    fn drop(&mut self) {
        if self.sender.get_mut().is_some() {
            warn!("{} ⚠ ThreadPoolWorkQueue 被 drop，但未调用 shutdown()，正在尝试优雅停止", log_ctx());
            self.shutdown();
        }
    }
}

/// 手动工作队列 - 工作项在所有者调用 `run_pending` 时才执行
///
/// 适合嵌入到已有事件循环中，也让调度顺序完全确定
#[derive(Default)]
pub struct ManualWorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
}

impl ManualWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已提交但未执行的工作项数
    pub fn pending(&self) -> usize {
        self.items.lock().len()
    }

    /// 执行一个工作项，返回是否执行了
    pub fn run_one(&self) -> bool {
        // 先出队再执行，工作项内部可以继续提交
        let item = self.items.lock().pop_front();
        match item {
            Some(item) => {
                item();
                true
            }
            None => false,
        }
    }

    /// 执行直到队列为空（包括执行过程中新提交的工作项），返回执行数量
    pub fn run_pending(&self) -> usize {
        let mut executed = 0;
        while self.run_one() {
            executed += 1;
        }
        executed
    }
}

impl WorkQueue for ManualWorkQueue {
    fn submit(&self, item: WorkItem) -> Result<()> {
        self.items.lock().push_back(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_thread_pool_runs_every_item_once() {
        let pool = ThreadPoolWorkQueue::new(3).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = crossbeam_channel::unbounded();

        for _ in 0..50 {
            let counter = counter.clone();
            let done_tx = done_tx.clone();
            pool.submit(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = done_tx.send(());
            }))
            .unwrap();
        }

        for _ in 0..50 {
            done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let pool = ThreadPoolWorkQueue::new(1).unwrap();
        pool.shutdown();
        assert!(matches!(pool.submit(Box::new(|| {})), Err(SourceError::Shutdown)));
        assert!(ThreadPoolWorkQueue::new(0).is_err());
    }

    #[test]
    fn test_manual_queue_runs_nested_submissions() {
        let queue = Arc::new(ManualWorkQueue::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_queue = queue.clone();
        let inner_counter = counter.clone();
        queue
            .submit(Box::new(move || {
                inner_counter.fetch_add(1, Ordering::SeqCst);
                let nested_counter = inner_counter.clone();
                let _ = inner_queue.submit(Box::new(move || {
                    nested_counter.fetch_add(10, Ordering::SeqCst);
                }));
            }))
            .unwrap();

        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.run_pending(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert_eq!(queue.pending(), 0);
    }
}
