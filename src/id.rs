use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::Rng;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 7;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Returns a task id unique within this process.
///
/// Ids look like `<unix-millis>-<random base36><sequence>`. They are not
/// guaranteed to sort in creation order.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{millis}-{suffix}{sequence:x}")
}
