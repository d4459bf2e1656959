use std::collections::HashMap;

/// Disjoint-set forest over string keys, with path compression and union by rank.
///
/// Keys are interned to dense indices on first sight, so a key never seen
/// before is implicitly a singleton set until [`UnionFind::find`] or
/// [`UnionFind::union`] registers it. Sets only ever merge.
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    index: HashMap<String, usize>,
    keys: Vec<String>,
    parent: Vec<usize>,
    rank: Vec<u32>,
}

impl UnionFind {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys registered so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[cfg(test)]
    fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn intern(&mut self, key: &str) -> usize {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = self.keys.len();
        self.index.insert(key.to_string(), idx);
        self.keys.push(key.to_string());
        self.parent.push(idx);
        self.rank.push(0);
        idx
    }

    fn find_index(&mut self, idx: usize) -> usize {
        let mut root = idx;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = idx;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    /// Root key of the set containing `key`, registering it if unseen
    pub fn find(&mut self, key: &str) -> &str {
        let idx = self.intern(key);
        let root = self.find_index(idx);
        &self.keys[root]
    }

    /// Merge the sets containing `a` and `b`, returning the resulting root key.
    ///
    /// The lower-rank root is attached beneath the higher-rank one; on a tie
    /// the root of `a` wins and its rank grows by one.
    pub fn union(&mut self, a: &str, b: &str) -> &str {
        let a_idx = self.intern(a);
        let b_idx = self.intern(b);
        let a_root = self.find_index(a_idx);
        let b_root = self.find_index(b_idx);

        let root = if a_root == b_root {
            a_root
        } else if self.rank[a_root] < self.rank[b_root] {
            self.parent[a_root] = b_root;
            b_root
        } else if self.rank[a_root] > self.rank[b_root] {
            self.parent[b_root] = a_root;
            a_root
        } else {
            self.parent[b_root] = a_root;
            self.rank[a_root] += 1;
            a_root
        };

        &self.keys[root]
    }

    /// Whether `a` and `b` are in the same set. Unseen keys are registered.
    #[cfg(test)]
    fn same_set(&mut self, a: &str, b: &str) -> bool {
        let a_idx = self.intern(a);
        let b_idx = self.intern(b);
        self.find_index(a_idx) == self.find_index(b_idx)
    }

    /// Rank of a registered key's node
    #[cfg(test)]
    fn rank(&self, key: &str) -> Option<u32> {
        self.index.get(key).map(|&idx| self.rank[idx])
    }

    /// All sets, each listing its members in registration order.
    /// Sets are ordered by their earliest-registered member.
    pub fn groups(&mut self) -> Vec<Vec<String>> {
        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<String>> = Vec::new();

        for idx in 0..self.keys.len() {
            let root = self.find_index(idx);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(self.keys[idx].clone());
        }

        groups
    }
}
