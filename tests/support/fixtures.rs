//! rstest fixtures for integration tests
//!
//! A small marketplace export shared by every test file: three tutors (one
//! stored with legacy field spellings), one learner, three tutor posts, a
//! handful of reviews and three centers.
//!
//! Expected aggregates:
//! - ana@x.io averages 4.5 over two reviews, ben@x.io 2.0, cy@x.io is unrated
//! - center c1 ("Bright Minds") has ana and cy, c2 ("Brush Strokes") has ben,
//!   c3 ("Quiet Hall") has nobody

use matutor_listings::store::{paths, DataStore, MemoryDocumentStore};
use rstest::fixture;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use super::helpers::{record, ScriptedOracle};

/// Relevance answer used by most tests: physics, then math, then art.
pub const PHYSICS_MATH_ART: &str = r#"["physics", "math", "art"]"#;

pub const LEARNER_EMAIL: &str = "lee@x.io";
pub const TUTOR_EMAIL: &str = "ana@x.io";

/// Marketplace export in the `{collection: {docId: body}}` seed format.
pub fn marketplace_seed() -> Value {
    json!({
        (paths::users(paths::LEARNER)): {
            "l1": {
                "userEmail": LEARNER_EMAIL,
                "userFirstname": "Lee",
                "userTag": ["Physics", "Math"],
                "fcmToken": "device-lee"
            }
        },
        (paths::users(paths::TUTOR)): {
            "t1": {
                "userEmail": TUTOR_EMAIL,
                "userFirstname": "Ana",
                "userLastname": "Reyes",
                "userTags": ["Math"],
                "userAbout": "Calculus coach",
                "userTutoringCenter": "c1",
                "userSessionPrice": "15"
            },
            "t2": {
                "userEmail": "ben@x.io",
                "userFirstname": "Ben",
                "userLastname": "Cruz",
                "userTag": ["Art", "Physics"],
                "userabout": "Painter and physicist",
                "userTutoringcenter": "c2",
                "userSessionPrice": 25
            },
            "t3": {
                "userEmail": "cy@x.io",
                "userFirstname": "Cy",
                "userLastname": "Lim",
                "userTags": ["Physics"],
                "userAbout": "Lab nerd",
                "userTutoringCenter": "c1",
                "userSessionPrice": ""
            }
        },
        (paths::posts(paths::TUTOR)): {
            // 2024-01-15T10:00:00Z
            "p1": {
                "postTitle": "Algebra drills",
                "postDescription": "Weekly problem sets",
                "postTags": ["Math"],
                "datePosted": { "_seconds": 1705312800, "_nanoseconds": 0 }
            },
            // 2024-01-16T10:00:00Z
            "p2": {
                "postTitle": "Watercolor basics",
                "postDescription": "Bring brushes",
                "postTags": ["Art"],
                "datePosted": { "_seconds": 1705399200, "_nanoseconds": 0 }
            },
            // 2024-01-15T20:00:00Z, already the 16th after the +8h shift
            "p3": {
                "postTitle": "Mechanics",
                "postDescription": "Physics for engineers",
                "postTags": ["Physics", "Math"],
                "datePosted": { "_seconds": 1705348800, "_nanoseconds": 0 }
            }
        },
        (paths::REVIEWS): {
            "r1": { "revieweeEmail": TUTOR_EMAIL, "userRating": 5 },
            "r2": { "revieweeEmail": TUTOR_EMAIL, "userRating": 4 },
            "r3": { "revieweeEmail": "ben@x.io", "userRating": 2 },
            "r4": { "userRating": 1 }
        },
        (paths::CENTERS): {
            "c1": { "name": "Bright Minds", "uuid": "c1" },
            "c2": { "name": "Brush Strokes", "uuid": "c2" },
            "c3": { "name": "Quiet Hall", "uuid": "c3" }
        }
    })
}

/// Load a seed export into a fresh in-memory store.
pub fn seeded_store(seed: &Value) -> Arc<MemoryDocumentStore> {
    let store = MemoryDocumentStore::new();
    let collections = seed.as_object().expect("seed is an object");
    for (path, docs) in collections {
        for (id, body) in docs.as_object().expect("collection is an object") {
            store
                .insert(path, id, record(body.clone()))
                .expect("insert seed document");
        }
    }
    Arc::new(store)
}

#[fixture]
pub fn marketplace() -> Arc<MemoryDocumentStore> {
    seeded_store(&marketplace_seed())
}

#[fixture]
pub fn marketplace_dyn(marketplace: Arc<MemoryDocumentStore>) -> Arc<dyn DataStore> {
    marketplace
}

#[fixture]
pub fn oracle() -> Arc<ScriptedOracle> {
    ScriptedOracle::answering(PHYSICS_MATH_ART)
}

#[fixture]
pub fn tmp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}
