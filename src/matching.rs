//! School-name matching against the reference division database.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::Division;

const NOISE_WORDS: &[&str] = &[
    "university",
    "college",
    "institute",
    "state",
    "campus",
    "technical",
    "polytechnic",
];

/// Containment only counts when both names are longer than this.
const MIN_CONTAINMENT_LEN: usize = 8;
const MAX_FUZZY_LEN_DIFF: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionMatch {
    pub division: Division,
    pub conference: Option<String>,
}

#[derive(Debug, Clone)]
struct ReferenceSchool {
    key: String,
    conference: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DivisionDatabase {
    d1: Vec<ReferenceSchool>,
    d2: Vec<ReferenceSchool>,
    d3: Vec<ReferenceSchool>,
}

impl DivisionDatabase {
    pub fn insert(&mut self, division: Division, name: &str, conference: Option<&str>) {
        let key = normalize(name);
        if key.is_empty() {
            return;
        }
        let school = ReferenceSchool {
            key,
            conference: conference.map(str::to_string),
        };
        match division {
            Division::D1 => self.d1.push(school),
            Division::D2 => self.d2.push(school),
            Division::D3 => self.d3.push(school),
        }
    }

    /// Load `division,name,conference` rows.
    pub fn from_csv(path: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        struct CsvRow {
            division: String,
            name: String,
            conference: Option<String>,
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut database = Self::default();
        for result in reader.deserialize::<CsvRow>() {
            let row = result?;
            let Some(division) = Division::parse(&row.division) else {
                debug!(division = %row.division, name = %row.name, "skipping unknown division");
                continue;
            };
            let conference = row.conference.as_deref().filter(|value| !value.is_empty());
            database.insert(division, &row.name, conference);
        }
        Ok(database)
    }

    pub fn len(&self) -> usize {
        self.d1.len() + self.d2.len() + self.d3.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn divisions(&self) -> [(Division, &[ReferenceSchool]); 3] {
        [
            (Division::D1, self.d1.as_slice()),
            (Division::D2, self.d2.as_slice()),
            (Division::D3, self.d3.as_slice()),
        ]
    }

    fn find(&self, key: &str) -> Option<DivisionMatch> {
        let strategies: [fn(&str, &str) -> bool; 3] = [exact_match, contains_match, fuzzy_match];
        for strategy in strategies {
            for (division, schools) in self.divisions() {
                if let Some(school) = schools.iter().find(|school| strategy(key, &school.key)) {
                    return Some(DivisionMatch {
                        division,
                        conference: school.conference.clone(),
                    });
                }
            }
        }
        None
    }
}

/// Session-scoped memo of resolved school names.
pub struct MatchingCache {
    reference: DivisionDatabase,
    entries: RwLock<HashMap<String, DivisionMatch>>,
    scans: AtomicUsize,
}

impl MatchingCache {
    pub fn new(reference: DivisionDatabase) -> Self {
        Self {
            reference,
            entries: RwLock::new(HashMap::new()),
            scans: AtomicUsize::new(0),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<DivisionMatch> {
        let key = normalize(name);
        if key.is_empty() {
            return None;
        }

        if let Some(hit) = self.read_entries().get(&key) {
            debug!(key = %key, "school match cache hit");
            return Some(hit.clone());
        }

        self.scans.fetch_add(1, Ordering::Relaxed);
        let found = self.reference.find(&key)?;
        self.write_entries().insert(key, found.clone());
        Some(found)
    }

    pub fn invalidate(&self, name: &str) -> bool {
        let key = normalize(name);
        self.write_entries().remove(&key).is_some()
    }

    pub fn clear(&self) {
        self.write_entries().clear();
    }

    /// Seed entries without touching the reference database.
    pub fn preload<I, S>(&self, entries: I)
    where
        I: IntoIterator<Item = (S, DivisionMatch)>,
        S: AsRef<str>,
    {
        let mut map = self.write_entries();
        for (name, found) in entries {
            let key = normalize(name.as_ref());
            if !key.is_empty() {
                map.insert(key, found);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times the reference database has been searched.
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, DivisionMatch>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, DivisionMatch>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn normalize(name: &str) -> String {
    let lowered = strip_parentheticals(&name.to_lowercase());

    let mut words: Vec<&str> = lowered.split_whitespace().collect();
    // "at <location>" never starts a name, so only look past the first word.
    if let Some(pos) = words.iter().skip(1).position(|word| *word == "at") {
        words.truncate(pos + 1);
    }

    for noise in NOISE_WORDS {
        if let Some(pos) = words.iter().position(|word| word == noise) {
            words.remove(pos);
        }
    }

    words.join(" ").trim().to_string()
}

fn strip_parentheticals(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut depth = 0usize;
    for ch in value.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => output.push(ch),
            _ => {}
        }
    }
    output
}

fn exact_match(key: &str, candidate: &str) -> bool {
    key == candidate
}

fn contains_match(key: &str, candidate: &str) -> bool {
    key.chars().count() > MIN_CONTAINMENT_LEN
        && candidate.chars().count() > MIN_CONTAINMENT_LEN
        && (key.contains(candidate) || candidate.contains(key))
}

fn fuzzy_match(key: &str, candidate: &str) -> bool {
    let key_len = key.chars().count();
    let candidate_len = candidate.chars().count();
    if key_len.abs_diff(candidate_len) > MAX_FUZZY_LEN_DIFF {
        return false;
    }
    let allowed = if key_len.max(candidate_len) > 6 { 2 } else { 1 };
    strsim::levenshtein(key, candidate) <= allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> DivisionDatabase {
        let mut database = DivisionDatabase::default();
        database.insert(Division::D1, "Florida State University", Some("ACC"));
        database.insert(Division::D1, "University of North Carolina at Chapel Hill", Some("ACC"));
        database.insert(Division::D1, "Stanford University", Some("ACC"));
        database.insert(Division::D2, "Grand Valley State University", Some("GLIAC"));
        database.insert(Division::D3, "Williams College", Some("NESCAC"));
        database.insert(Division::D3, "Amherst College", Some("NESCAC"));
        database
    }

    #[test]
    fn normalize_strips_noise_in_order() {
        assert_eq!(normalize("Florida State University"), "florida");
        assert_eq!(normalize("  florida state "), "florida");
        assert_eq!(normalize("Miami University (Ohio)"), "miami");
        assert_eq!(
            normalize("University of North Carolina at Chapel Hill"),
            "of north carolina"
        );
        assert_eq!(normalize("Georgia Institute of Technology"), "georgia of technology");
    }

    #[test]
    fn normalize_removes_each_noise_word_once() {
        assert_eq!(normalize("State College State"), "state");
    }

    #[test]
    fn equivalent_names_share_one_cache_entry() {
        let cache = MatchingCache::new(reference());

        let first = cache.lookup("Florida State University");
        let second = cache.lookup("florida state");
        let third = cache.lookup("Florida State");

        let expected = Some(DivisionMatch {
            division: Division::D1,
            conference: Some("ACC".to_string()),
        });
        assert_eq!(first, expected);
        assert_eq!(second, expected);
        assert_eq!(third, expected);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.scans(), 1);
    }

    #[test]
    fn blank_input_short_circuits() {
        let cache = MatchingCache::new(reference());
        assert_eq!(cache.lookup(""), None);
        assert_eq!(cache.lookup("   "), None);
        assert!(cache.is_empty());
        assert_eq!(cache.scans(), 0);
    }

    #[test]
    fn unknown_school_is_a_miss() {
        let cache = MatchingCache::new(reference());
        assert_eq!(cache.lookup("Hogwarts School of Witchcraft"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn containment_requires_long_names() {
        let cache = MatchingCache::new(reference());
        let found = cache.lookup("Grand Valley State Lakers").expect("should match by containment");
        assert_eq!(found.division, Division::D2);

        // "amherst" is too short for containment against "amherst"-prefixed names.
        let mut database = DivisionDatabase::default();
        database.insert(Division::D3, "Amherst Regional", None);
        let cache = MatchingCache::new(database);
        assert_eq!(cache.lookup("Amherst"), None);
    }

    #[test]
    fn fuzzy_match_tolerates_typos() {
        let cache = MatchingCache::new(reference());
        let found = cache.lookup("Standford").expect("typo should still match");
        assert_eq!(found.division, Division::D1);

        let found = cache.lookup("Wiliams College").expect("typo should still match");
        assert_eq!(found.division, Division::D3);
    }

    #[test]
    fn invalidate_and_clear_drop_entries() {
        let cache = MatchingCache::new(reference());
        cache.lookup("Stanford");
        cache.lookup("Amherst College");
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate("STANFORD UNIVERSITY"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn preload_skips_reference_scan() {
        let cache = MatchingCache::new(DivisionDatabase::default());
        cache.preload([(
            "Boise State University",
            DivisionMatch {
                division: Division::D1,
                conference: Some("Mountain West".to_string()),
            },
        )]);

        let found = cache.lookup("boise state").expect("preloaded entry");
        assert_eq!(found.conference.as_deref(), Some("Mountain West"));
        assert_eq!(cache.scans(), 0);
    }

    #[test]
    fn containment_boundary_is_exclusive_at_eight() {
        assert!(!contains_match("westport", "westport mariners"));
        assert!(contains_match("westfield", "westfield owls"));
        assert!(contains_match("westfield owls", "westfield"));

        let mut database = DivisionDatabase::default();
        database.insert(Division::D3, "Westport Mariners", None);
        database.insert(Division::D3, "Westfield Owls", None);
        let cache = MatchingCache::new(database);
        assert_eq!(cache.lookup("Westport"), None);
        assert_eq!(
            cache.lookup("Westfield").map(|found| found.division),
            Some(Division::D3)
        );
    }

    #[test]
    fn short_names_allow_one_edit() {
        assert!(fuzzy_match("brown", "brawn"));
        assert!(!fuzzy_match("brown", "brawl"));
        assert!(!fuzzy_match("purdue", "pardie"));
        assert!(fuzzy_match("baylors", "bailers"));
    }

    #[test]
    fn length_gap_over_three_blocks_fuzzy() {
        assert!(fuzzy_match("grand valley", "grand valleys"));
        assert!(fuzzy_match("grand valley", "grand valley s"));
        assert!(!fuzzy_match("grand valley", "grand valley st"));
        assert!(!fuzzy_match("grand valley", "grand valley sta"));
    }
}
