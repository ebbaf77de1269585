use crate::core::Result;
use std::collections::VecDeque;

/// 对象队列 - 先进先出的句柄队列
///
/// 同时用于缓冲的样本（等待请求）和挂起的令牌（等待样本）。
/// 队列本身不加锁，由媒体源锁保证互斥访问
#[derive(Debug)]
pub struct ObjectQueue<T> {
    items: VecDeque<T>,
}

impl<T> ObjectQueue<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// 追加到队尾，只有内存分配失败时才会出错
    pub fn push(&mut self, item: T) -> Result<()> {
        self.items.try_reserve(1)?;
        self.items.push_back(item);
        Ok(())
    }

    /// 取出队首；队列为空时返回 None（正常的"挂起"信号，不是错误）
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// 清空并释放所有对象（例如 seek 时丢弃旧数据）
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for ObjectQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fifo_order() {
        let mut queue = ObjectQueue::new();
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.push(3).unwrap();
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_clear_releases_references() {
        let shared = Arc::new(42);
        let mut queue = ObjectQueue::new();
        queue.push(Arc::clone(&shared)).unwrap();
        queue.push(Arc::clone(&shared)).unwrap();
        assert_eq!(Arc::strong_count(&shared), 3);

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn test_pop_transfers_reference() {
        let shared = Arc::new("sample");
        let mut queue = ObjectQueue::new();
        queue.push(Arc::clone(&shared)).unwrap();

        let popped = queue.pop().unwrap();
        assert_eq!(Arc::strong_count(&shared), 2);
        drop(popped);
        assert_eq!(Arc::strong_count(&shared), 1);
    }
}
