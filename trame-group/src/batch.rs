//! Records of one batch, bucketed by key path before the output is touched.

use std::collections::HashMap;

use crate::scalar::ScalarKey;

/// One node of the bucket tree. Inner nodes use `children`, leaves use `records`.
pub(crate) struct Bucket<R> {
    pub children: HashMap<ScalarKey, Bucket<R>>,
    pub records: Vec<R>,
}

impl<R> Bucket<R> {
    pub(crate) fn new() -> Self {
        Self {
            children: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// File `record` under `keys`, outermost first. With `keep_last` a leaf holds only
    /// the latest record filed under it.
    pub(crate) fn file(&mut self, keys: Vec<ScalarKey>, record: R, keep_last: bool) {
        let mut node = self;
        for key in keys {
            node = node.children.entry(key).or_insert_with(Bucket::new);
        }
        if keep_last {
            node.records.clear();
        }
        node.records.push(record);
    }
}
