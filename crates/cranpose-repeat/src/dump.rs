//! Human-readable cache state for debugging. The format is not stable.

use std::fmt::{self, Write};

use crate::caches::RepeatCaches;
use crate::source::{ItemSource, RecyclableNode};

impl<S: ItemSource> RepeatCaches<S> {
    /// Active and previous ranges.
    pub fn dump_ranges(&self) -> String {
        let mut out = String::new();
        let _ = self.write_ranges(&mut out);
        out
    }

    /// L1 members with their index, node and validity.
    pub fn dump_l1(&self) -> String {
        let mut out = String::new();
        let _ = self.write_l1(&mut out);
        out
    }

    /// Spares per template type with their distance and the type's quota.
    pub fn dump_l2(&self) -> String {
        let mut out = String::new();
        let _ = self.write_l2(&mut out);
        out
    }

    /// Resolved index → key / template type pairs.
    pub fn dump_keys(&self) -> String {
        let mut out = String::new();
        let _ = self.write_keys(&mut out);
        out
    }

    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = self
            .write_ranges(&mut out)
            .and_then(|_| self.write_l1(&mut out))
            .and_then(|_| self.write_l2(&mut out))
            .and_then(|_| self.write_keys(&mut out));
        out
    }

    fn write_ranges(&self, out: &mut String) -> fmt::Result {
        match self.ranges.current() {
            Some(range) => writeln!(out, "active range: [{}, {}]", range.from, range.to)?,
            None => writeln!(out, "active range: none")?,
        }
        if let Some(range) = self.ranges.previous() {
            writeln!(out, "previous range: [{}, {}]", range.from, range.to)?;
        }
        writeln!(out, "scroll direction: {:?}", self.ranges.direction())
    }

    fn write_l1(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "L1 ({} keys):", self.active.len())?;
        let mut result = Ok(());
        self.for_each_l1_node(|index, key, node| {
            let valid = self
                .store
                .get(key)
                .is_some_and(|item| item.is_valid());
            let index = index.map_or_else(|| "-".to_string(), |index| index.to_string());
            result = result.and_then(|_| {
                writeln!(
                    out,
                    "  {index:>6} -> {key:?} node #{} valid={valid}",
                    node.node_id()
                )
            });
        });
        result
    }

    fn write_l2(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "L2:")?;
        for ttype in self.store.ttypes() {
            let spares = self.spare_keys(&ttype);
            writeln!(
                out,
                "  {ttype:?}: {} spares, quota {}",
                spares.len(),
                self.quota_for(&ttype)
            )?;
            for key in spares {
                let distance = self.distance_for_key(&key);
                let node = self.store.get(&key).map(|item| item.node().node_id());
                let recycled = node.is_some_and(|id| self.active.is_recycled(id));
                match distance {
                    usize::MAX => write!(out, "    {key:?} unindexed")?,
                    distance => write!(out, "    {key:?} distance {distance}")?,
                }
                if let Some(id) = node {
                    write!(out, " node #{id}")?;
                }
                writeln!(out, " recycled={recycled}")?;
            }
        }
        Ok(())
    }

    fn write_keys(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "keys ({} indexed):", self.resolver.len())?;
        for (index, key) in self.resolver.indexed_keys() {
            match self.resolver.ttype(index) {
                Some(ttype) => writeln!(out, "  {index:>6} -> {key:?} : {ttype:?}")?,
                None => writeln!(out, "  {index:>6} -> {key:?}")?,
            }
        }
        for ttype in self.store.ttypes() {
            if let Some(index) = self.resolver.last_index_for_ttype(&ttype) {
                writeln!(out, "  last {ttype:?} at {index}")?;
            }
        }
        let unindexed: Vec<_> = self
            .store
            .keys()
            .into_iter()
            .filter(|key| self.resolver.index_for_key(key).is_none())
            .collect();
        if !unindexed.is_empty() {
            writeln!(out, "  cached without index: {unindexed:?}")?;
        }
        Ok(())
    }
}
