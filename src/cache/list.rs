//! 基于下标的双向链表
//!
//! 所有槽的链接存放在同一个 `[Link]` 数组中，下标即 [`SlotId`](super::SlotId)。
//! 一个槽在任一时刻只属于一条链表（某个桶或空闲池），其 `prev`/`next`
//! 由该链表所在的锁保护。持有 `&mut ListHead` 即证明已持有对应的锁，
//! 因此链接本身用 `Relaxed` 原子量读写即可，锁负责建立先行关系。

use crate::consts::NIL;
use core::sync::atomic::{AtomicUsize, Ordering};

/// 槽的链接
#[derive(Debug)]
pub(crate) struct Link {
    prev: AtomicUsize,
    next: AtomicUsize,
}

impl Link {
    pub(crate) const fn new() -> Self {
        Self {
            prev: AtomicUsize::new(NIL),
            next: AtomicUsize::new(NIL),
        }
    }

    fn prev(&self) -> usize {
        self.prev.load(Ordering::Relaxed)
    }

    fn next(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }

    fn set_prev(&self, idx: usize) {
        self.prev.store(idx, Ordering::Relaxed);
    }

    fn set_next(&self, idx: usize) {
        self.next.store(idx, Ordering::Relaxed);
    }
}

/// 链表头
#[derive(Debug)]
pub(crate) struct ListHead {
    first: usize,
    len: usize,
}

impl ListHead {
    pub(crate) const fn new() -> Self {
        Self { first: NIL, len: 0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// 头插
    pub(crate) fn push_front(&mut self, links: &[Link], idx: usize) {
        let link = &links[idx];
        link.set_prev(NIL);
        link.set_next(self.first);
        if self.first != NIL {
            links[self.first].set_prev(idx);
        }
        self.first = idx;
        self.len += 1;
    }

    /// 从链表中摘除 `idx`，`idx` 必须属于本链表
    pub(crate) fn remove(&mut self, links: &[Link], idx: usize) {
        let link = &links[idx];
        let (prev, next) = (link.prev(), link.next());
        if prev == NIL {
            debug_assert_eq!(self.first, idx);
            self.first = next;
        } else {
            links[prev].set_next(next);
        }
        if next != NIL {
            links[next].set_prev(prev);
        }
        link.set_prev(NIL);
        link.set_next(NIL);
        self.len -= 1;
    }

    /// 从表头开始遍历
    pub(crate) fn iter<'a>(&'a self, links: &'a [Link]) -> Iter<'a> {
        Iter {
            links,
            cur: self.first,
        }
    }
}

pub(crate) struct Iter<'a> {
    links: &'a [Link],
    cur: usize,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.cur == NIL {
            return None;
        }
        let idx = self.cur;
        self.cur = self.links[idx].next();
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn links(n: usize) -> Vec<Link> {
        (0..n).map(|_| Link::new()).collect()
    }

    fn collect(head: &ListHead, links: &[Link]) -> Vec<usize> {
        head.iter(links).collect()
    }

    #[test]
    fn test_push_front_order() {
        let links = links(4);
        let mut head = ListHead::new();
        assert_eq!(head.iter(&links).next(), None);

        for i in 0..4 {
            head.push_front(&links, i);
        }
        assert_eq!(collect(&head, &links), [3, 2, 1, 0]);
        assert_eq!(head.len(), 4);
    }

    #[test]
    fn test_remove_positions() {
        let links = links(5);
        let mut head = ListHead::new();
        for i in 0..5 {
            head.push_front(&links, i);
        }

        // 中间
        head.remove(&links, 2);
        assert_eq!(collect(&head, &links), [4, 3, 1, 0]);
        // 表头
        head.remove(&links, 4);
        assert_eq!(collect(&head, &links), [3, 1, 0]);
        // 表尾
        head.remove(&links, 0);
        assert_eq!(collect(&head, &links), [3, 1]);
        assert_eq!(head.len(), 2);
    }

    #[test]
    fn test_reinsert_goes_to_front() {
        let links = links(3);
        let mut head = ListHead::new();
        for i in 0..3 {
            head.push_front(&links, i);
        }

        head.remove(&links, 0);
        head.push_front(&links, 0);
        assert_eq!(collect(&head, &links), [0, 2, 1]);

        for i in 0..3 {
            head.remove(&links, i);
        }
        assert_eq!(head.len(), 0);
        assert_eq!(head.iter(&links).next(), None);
    }

    #[test]
    fn test_move_between_lists() {
        let links = links(3);
        let mut a = ListHead::new();
        let mut b = ListHead::new();
        for i in 0..3 {
            a.push_front(&links, i);
        }

        a.remove(&links, 1);
        b.push_front(&links, 1);

        assert_eq!(collect(&a, &links), [2, 0]);
        assert_eq!(collect(&b, &links), [1]);
    }
}
