//! Record extractors, one per portal page.
//!
//! Each extractor is a pure function of the parsed document. Rows whose first
//! field is empty are header/footer artifacts and are skipped; a page with an
//! empty table yields an empty list.

use std::{fmt, sync::LazyLock};

use scraper::{ElementRef, Html, Selector};

use crate::text_manipulators::{row_cells, strip_separators};

/// Shown when a lecturer has no phone number on record.
pub const NO_PHONE: &str = "Tidak ada";

static COMMON_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.table-common").expect("static selector"));
static FIRST_COMMON_TABLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table.table-common:nth-child(1)").expect("static selector")
});
static TBODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody").expect("static selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("static selector"));

/// One tuition (BPP) payment, page `?page=vbpp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEntry {
    pub semester: String,
    pub paid_on: String,
    pub amount: String,
}

/// One enrolled class, page `?page=kelas`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub course: String,
    pub class: String,
    pub day: String,
    pub time: String,
    pub room: String,
    pub lecturer: String,
}

/// One lecturer of the directory, page `?page=vdosen`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LecturerEntry {
    pub nidn: String,
    pub name: String,
    /// Third column. Not displayed.
    pub extra: String,
    /// Separators removed, or [`NO_PHONE`].
    pub phone: String,
}

fn rows<'a>(tables: impl Iterator<Item = ElementRef<'a>>) -> impl Iterator<Item = ElementRef<'a>> {
    tables.flat_map(|table| table.select(&ROW))
}

/// Reads only the first payment table; the page carries a second summary table
/// with the same class.
pub fn extract_payments(document: &Html) -> Vec<PaymentEntry> {
    rows(document.select(&FIRST_COMMON_TABLE).take(1))
        .map(|row| row_cells::<3>(row, 2))
        .filter(|[semester, ..]| !semester.is_empty())
        .map(|[semester, paid_on, amount]| PaymentEntry {
            semester,
            paid_on,
            amount,
        })
        .collect()
}

pub fn extract_schedule(document: &Html) -> Vec<ClassEntry> {
    rows(document.select(&COMMON_TABLE))
        .map(|row| row_cells::<6>(row, 2))
        .filter(|[course, ..]| !course.is_empty())
        .map(|[course, class, day, time, room, lecturer]| ClassEntry {
            course,
            class,
            day,
            time,
            room,
            lecturer,
        })
        .collect()
}

pub fn extract_lecturers(document: &Html) -> Vec<LecturerEntry> {
    rows(document.select(&TBODY))
        .map(|row| row_cells::<4>(row, 1))
        .filter(|[nidn, ..]| !nidn.is_empty())
        .map(|[nidn, name, extra, phone]| LecturerEntry {
            nidn,
            name,
            extra,
            phone: normalize_phone(&phone),
        })
        .collect()
}

pub fn normalize_phone(raw: &str) -> String {
    let phone = strip_separators(raw.trim());
    if phone.is_empty() {
        NO_PHONE.to_string()
    } else {
        phone
    }
}

impl fmt::Display for PaymentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Semester: {}\nTanggal Bayar: {}\nBPP (Rp.): {}",
            self.semester, self.paid_on, self.amount
        )
    }
}

impl fmt::Display for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Mata Kuliah: {}\nKelas: {}\nHari: {}\nJam: {}\nRuang: {}\nDosen: {}",
            self.course, self.class, self.day, self.time, self.room, self.lecturer
        )
    }
}

impl fmt::Display for LecturerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NIDN: {}\nNama: {}\nTelepon: {}", self.nidn, self.name, self.phone)
    }
}
