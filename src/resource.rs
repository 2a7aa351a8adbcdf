use std::{fmt::Display, time::Duration};

use crate::session::UserId;

/// Separator between lecturer entries in the cached payload.
pub const ENTRY_SEPARATOR: char = '~';

pub const PAYMENTS_HEADING: &str = "Riwayat pembayaran BPP:";
pub const SCHEDULE_HEADING: &str = "Jadwal mata kuliah:";

const PER_USER_TTL: Duration = Duration::from_secs(30 * 60);
const SHARED_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// A scrapeable portal page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Payments,
    Schedule,
    Lecturers,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Payments, Resource::Schedule, Resource::Lecturers];

    /// The `page` query value on the portal.
    pub fn page(&self) -> &'static str {
        match self {
            Resource::Payments => "vbpp",
            Resource::Schedule => "kelas",
            Resource::Lecturers => "vdosen",
        }
    }

    /// Whether the cached result is tied to one user.
    pub fn is_per_user(&self) -> bool {
        !matches!(self, Resource::Lecturers)
    }

    pub fn ttl(&self) -> Duration {
        if self.is_per_user() {
            PER_USER_TTL
        } else {
            SHARED_TTL
        }
    }

    pub fn cache_key(&self, user: UserId) -> String {
        match self {
            Resource::Payments => format!("{user}bpp"),
            Resource::Schedule => format!("{user}schedule"),
            Resource::Lecturers => "lecturer".to_string(),
        }
    }

    /// Shown while a live fetch is running.
    pub fn progress_notice(&self) -> &'static str {
        match self {
            Resource::Payments => "Memproses data BPP, mohon tunggu...",
            Resource::Schedule => "Memproses data mata kuliah, mohon tunggu...",
            Resource::Lecturers => "Memproses data dosen, mohon tunggu...",
        }
    }
}

/// `heading` followed by one blank-line separated block per record.
pub fn aggregate<T: Display>(heading: &str, records: &[T]) -> String {
    records.iter().fold(heading.to_string(), |mut text, record| {
        text.push_str("\n\n");
        text.push_str(&record.to_string());
        text
    })
}

/// Records rendered one entry each, joined with [`ENTRY_SEPARATOR`].
pub fn join_entries<T: Display>(records: &[T]) -> String {
    records
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(&ENTRY_SEPARATOR.to_string())
}

/// Splits a cached lecturer payload back into its entries.
pub fn split_entries(payload: &str) -> Vec<String> {
    if payload.is_empty() {
        return Vec::new();
    }
    payload.split(ENTRY_SEPARATOR).map(str::to_string).collect()
}
