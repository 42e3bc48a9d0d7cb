//! Job id interning.
//!
//! Vehicles arrive with string session ids; schedulers key their per-instant
//! rate maps by a compact integer instead.

use rustc_hash::FxHashMap;

/// Interned job id.
pub type JobKey = u32;

/// Bidirectional map between job id strings and `JobKey`s.
#[derive(Debug, Clone, Default)]
pub struct JobIdInterner {
    to_key: FxHashMap<String, JobKey>,
    from_key: Vec<String>,
}

impl JobIdInterner {
    /// Intern a job id, returning `None` if it was already interned.
    pub fn intern_new(&mut self, id: &str) -> Option<JobKey> {
        if self.to_key.contains_key(id) {
            return None;
        }
        let key = self.from_key.len() as JobKey;
        self.from_key.push(id.to_string());
        self.to_key.insert(id.to_string(), key);
        Some(key)
    }

    #[inline]
    pub fn resolve(&self, key: JobKey) -> Option<&str> {
        self.from_key.get(key as usize).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let mut interner = JobIdInterner::default();

        let a = interner.intern_new("session_a").unwrap();
        let b = interner.intern_new("session_b").unwrap();

        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), Some("session_a"));
        assert_eq!(interner.resolve(b), Some("session_b"));
        assert_eq!(interner.resolve(b + 1), None);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut interner = JobIdInterner::default();
        assert!(interner.intern_new("ev1").is_some());
        assert!(interner.intern_new("ev1").is_none());
        assert_eq!(interner.intern_new("ev2"), Some(1));
    }
}
