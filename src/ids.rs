use std::time::{SystemTime, UNIX_EPOCH};

/// Source of action ids. Injected wherever actions are created so batch
/// generation can be made deterministic.
pub trait IdGenerator: Send {
    fn next_id(&mut self, prefix: &str) -> String;
}

/// `{prefix}_{millis}_{counter}{random}` ids, distinct within a process even
/// when several are minted in the same millisecond.
#[derive(Debug, Default)]
pub struct RandomIds {
    counter: u64,
}

impl RandomIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for RandomIds {
    fn next_id(&mut self, prefix: &str) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.counter += 1;
        let suffix: String = base36(rand::random::<u64>()).chars().take(9).collect();
        format!("{}_{}_{}{}", prefix, millis, base36(self.counter), suffix)
    }
}

/// `{prefix}_{n}` with `n` counting up from 1.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{}_{}", prefix, self.next)
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
