//! Unique test data
//!
//! [`UniqueIds`] hands out timestamp-based identifiers that never repeat for
//! the lifetime of the generator, plus domain names and email addresses
//! derived from them. Generation is serialized behind a mutex, so one
//! generator can be shared by every thread of a test process.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use chrono::{Local, Timelike};

/// `aaa`, the first three-letter label
const THREE_LETTER_OFFSET: u64 = 702;

/// Generator of identifiers that are unique for its own lifetime
#[derive(Debug, Default)]
pub struct UniqueIds {
    issued: Mutex<HashSet<String>>,
}

impl UniqueIds {
    /// A generator with no history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The next identifier, `[prefix-]yymmdd-HHMMSS-ffff`
    ///
    /// `ffff` is the current time in units of 100 microseconds within the
    /// second, zero padded.
    pub fn identifier(&self, prefix: &str) -> String {
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let candidate = stamp(prefix);
            if issued.insert(candidate.clone()) {
                return candidate;
            }
            std::thread::yield_now();
        }
    }

    /// Number of identifiers issued so far
    #[must_use]
    pub fn issued(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// A fresh domain name of three alphabetic labels, e.g. `gjpq.gyrm.bde`
    pub fn fqdn(&self) -> String {
        self.identifier("")
            .split('-')
            .enumerate()
            .map(|(i, part)| {
                let n: u64 = part.parse().unwrap_or_default();
                alphabetic(if i == 2 { n + THREE_LETTER_OFFSET } else { n })
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// A fresh email address, e.g. `gjpqgzpjlnu_gjpq@gzpj.lnw`
    pub fn email(&self) -> String {
        let local = self.fqdn().replace('.', "");
        let domain = self.fqdn().replacen('.', "@", 1);
        format!("{local}_{domain}")
    }
}

fn stamp(prefix: &str) -> String {
    let now = Local::now();
    let fraction = now.nanosecond() % 1_000_000_000 / 100_000;
    let body = format!("{}-{fraction:04}", now.format("%y%m%d-%H%M%S"));
    if prefix.is_empty() {
        body
    } else {
        format!("{prefix}-{body}")
    }
}

/// Bijective base-26: 0 is `a`, 25 is `z`, 26 is `aa`, 702 is `aaa`
fn alphabetic(n: u64) -> String {
    let mut out = Vec::new();
    let mut n = n + 1;
    while n > 0 {
        n -= 1;
        out.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
