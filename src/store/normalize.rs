//! Legacy field spellings folded onto the canonical names.
//!
//! Older documents carry `userTag`, `userabout` and `userTutoringcenter`. The
//! canonical spelling wins whenever it holds a truthy value; the legacy key is
//! always removed so the core only ever sees one name per field.
//!
//! The precedence is the same for every consumer. A tutor stored with both
//! `userTutoringCenter: "c1"` and `userTutoringcenter: "c2"` belongs to c1 for
//! the `tutorCenter` filter, `centerId` lookups and center rating aggregation
//! alike. `userAbout` and `userTags` follow the same rule.

use crate::model::{fields, Record};
use crate::text::is_truthy;

const LEGACY_FIELDS: &[(&str, &str)] = &[
    (fields::USER_TAGS, "userTag"),
    (fields::USER_ABOUT, "userabout"),
    (fields::USER_TUTORING_CENTER, "userTutoringcenter"),
];

/// Field names an equality filter on `canonical` must also check in raw,
/// not yet normalized documents.
pub fn spellings(canonical: &str) -> Vec<&str> {
    let mut names = vec![canonical];
    names.extend(
        LEGACY_FIELDS
            .iter()
            .filter(|(c, _)| *c == canonical)
            .map(|(_, legacy)| *legacy),
    );
    names
}

pub fn normalize_record(mut record: Record) -> Record {
    for (canonical, legacy) in LEGACY_FIELDS {
        let Some(value) = record.remove(*legacy) else {
            continue;
        };
        let keep_canonical = record.get(*canonical).is_some_and(is_truthy);
        if !keep_canonical {
            record.insert(canonical.to_string(), value);
        }
    }
    record
}
