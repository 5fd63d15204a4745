use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::debug;

use crate::blowfish;

/// Protocol version embedded in the encrypted token
pub const TOKEN_VERSION: u32 = 3;

const CHECKSUM_TABLE: [char; 16] = [
    'f', 'X', '1', 'p', 'G', 't', 'd', 'S', '5', 'C', 'A', 'P', '4', '_', 'V', 'L',
];

/// Millisecond counter used to derive the token key
pub trait TickSource: Send + Sync {
    fn ticks(&self) -> u32;
}

/// Milliseconds since the OS booted, wrapping at `u32::MAX`.
///
/// The game reads the same counter, so this has to be system uptime and not a
/// process-local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTicks;

impl TickSource for SystemTicks {
    fn ticks(&self) -> u32 {
        uptime_millis() as u32
    }
}

#[cfg(windows)]
fn uptime_millis() -> u64 {
    // SAFETY: GetTickCount takes no arguments and cannot fail
    u64::from(unsafe { windows::Win32::System::SystemInformation::GetTickCount() })
}

#[cfg(unix)]
fn uptime_millis() -> u64 {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    const CLOCK: libc::clockid_t = libc::CLOCK_BOOTTIME;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const CLOCK: libc::clockid_t = libc::CLOCK_MONOTONIC;

    // SAFETY: timespec is plain data and clock_gettime only writes into it
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    if unsafe { libc::clock_gettime(CLOCK, &mut ts) } != 0 {
        tracing::warn!("clock_gettime failed: {}", std::io::Error::last_os_error());
        return 0;
    }

    (ts.tv_sec as u64) * 1000 + (ts.tv_nsec as u64) / 1_000_000
}

#[cfg(not(any(windows, unix)))]
fn uptime_millis() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    ANCHOR.get_or_init(Instant::now).elapsed().as_millis() as u64
}

/// Always reports the same tick value
#[derive(Debug, Clone, Copy)]
pub struct FixedTicks(pub u32);

impl TickSource for FixedTicks {
    fn ticks(&self) -> u32 {
        self.0
    }
}

/// Ordered key/value arguments for the game executable.
///
/// Order is preserved verbatim and duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentBuilder {
    arguments: Vec<(String, String)>,
}

impl ArgumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.arguments.push((key.into(), value.into()));
    }

    pub fn extend<I, K, V>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.arguments
            .extend(items.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    pub fn arguments(&self) -> &[(String, String)] {
        &self.arguments
    }

    /// ` key=value` for every pair, leading space included
    pub fn build_plain(&self) -> String {
        self.arguments
            .iter()
            .map(|(k, v)| format!(" {}={}", k, v))
            .collect()
    }

    /// Encrypts with a key derived from `ticks`.
    ///
    /// The raw tick value is written into a `T` argument that always sits at
    /// position 0, replacing an existing leading `T`.
    pub fn build_encrypted(&mut self, ticks: &dyn TickSource) -> String {
        let key = self.derive_key(ticks.ticks());
        self.build_encrypted_with_key(key)
    }

    /// Encrypts with an explicit key; the argument list is used as is.
    pub fn build_encrypted_with_key(&self, key: u32) -> String {
        let plaintext = self.encryption_plaintext();
        let ciphertext = blowfish::encrypt(key_bytes(key).as_bytes(), plaintext.as_bytes());
        let encoded = to_token_base64(&ciphertext);
        let checksum = derive_checksum(key);

        debug!("Built encrypted arguments, checksum {}", checksum);

        format!("//**sqex{:04}{}{}**//", TOKEN_VERSION, encoded, checksum)
    }

    /// Text fed to the cipher: ` /key =value` with literal spaces doubled
    pub fn encryption_plaintext(&self) -> String {
        self.arguments
            .iter()
            .map(|(k, v)| format!(" /{} ={}", escape(k), escape(v)))
            .collect()
    }

    fn derive_key(&mut self, ticks: u32) -> u32 {
        let key = ticks & 0xFFFF_0000;
        debug!("Deriving argument key: ticks {} key {:08x}", ticks, key);

        let pair = ("T".to_string(), ticks.to_string());
        match self.arguments.first_mut() {
            Some(first) if first.0 == "T" => *first = pair,
            _ => self.arguments.insert(0, pair),
        }

        key
    }
}

/// Doubles literal spaces so separators stay unambiguous
pub fn escape(input: &str) -> String {
    input.replace(' ', "  ")
}

fn key_bytes(key: u32) -> String {
    format!("{:08x}", key)
}

fn to_token_base64(data: &[u8]) -> String {
    STANDARD.encode(data).replace('+', "-").replace('/', "_")
}

/// Checksum character for bits 16-19 of `key`
pub fn derive_checksum(key: u32) -> char {
    let index = ((key & 0x000F_0000) >> 16) as usize;
    CHECKSUM_TABLE.get(index).copied().unwrap_or('!')
}
