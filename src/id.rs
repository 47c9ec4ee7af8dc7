//! Layer identifier generation.
//!
//! Ids follow `layer_<sanitised name>_<base36 millis>_<seq>`. The wall-clock
//! suffix keeps ids recognisable across runs of the same document; the
//! per-run monotonic counter is what actually guarantees uniqueness — two
//! identically named layers processed in the same millisecond still get
//! distinct ids.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static RE_ID_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").unwrap());

/// Replace every character outside `[a-zA-Z0-9]` with `_` and lower-case.
///
/// Also used for asset filenames so ids and stored assets agree on naming.
pub fn sanitize(name: &str) -> String {
    RE_ID_UNSAFE.replace_all(name, "_").to_lowercase()
}

/// Per-run id generator. One instance lives for the duration of an
/// extraction run; ids from distinct generators may collide across runs,
/// ids from one generator never do.
#[derive(Debug, Default)]
pub struct LayerIdGenerator {
    seq: AtomicU64,
}

impl LayerIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the id for a layer with the given name.
    pub fn generate(&self, name: &str) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("layer_{}_{}_{}", sanitize(name), base36(millis), seq)
    }
}

fn base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sanitize_replaces_and_lowercases() {
        assert_eq!(sanitize("Hero Photo #2"), "hero_photo__2");
        assert_eq!(sanitize("logo"), "logo");
        assert_eq!(sanitize("ÜBER"), "_ber");
    }

    #[test]
    fn base36_round_values() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(36 * 36 + 1), "101");
    }

    #[test]
    fn generated_ids_carry_prefix_and_name() {
        let ids = LayerIdGenerator::new();
        let id = ids.generate("Title Layer");
        assert!(id.starts_with("layer_title_layer_"), "got: {id}");
    }

    #[test]
    fn same_name_same_millisecond_still_unique() {
        let ids = LayerIdGenerator::new();
        let generated: HashSet<String> = (0..1000).map(|_| ids.generate("dup")).collect();
        assert_eq!(generated.len(), 1000);
    }
}
