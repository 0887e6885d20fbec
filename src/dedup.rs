//! # Deduplication Registry Module
//!
//! Mappa fingerprint → claim registrati. Il primo claim per un
//! fingerprint autorizza il trasferimento fisico; tutti i successivi
//! vengono comunque registrati, solo per il report dei duplicati a fine
//! batch. Il registro vive dentro il lock di coordinamento del batch:
//! check-and-record è quindi un singolo passo atomico.

use std::collections::HashMap;
use std::path::PathBuf;

/// A registered intent to transfer one source to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// First-claimant-wins bookkeeping for a batch run.
#[derive(Debug, Default)]
pub struct DedupRegistry {
    claims: HashMap<String, Vec<Claim>>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the claim and reports whether it was the first one for
    /// this fingerprint. Callers must only move bytes when this is true.
    pub fn claim(&mut self, fingerprint: &str, claim: Claim) -> bool {
        let entry = self.claims.entry(fingerprint.to_string()).or_default();
        entry.push(claim);
        entry.len() == 1
    }

    /// Fingerprints that attracted more than one claim, in claim order
    /// within each group. Diagnostic only, never an error.
    pub fn duplicates(&self) -> Vec<(String, Vec<Claim>)> {
        let mut groups: Vec<(String, Vec<Claim>)> = self
            .claims
            .iter()
            .filter(|(_, claims)| claims.len() > 1)
            .map(|(fingerprint, claims)| (fingerprint.clone(), claims.clone()))
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(source: &str) -> Claim {
        Claim {
            source: PathBuf::from(source),
            destination: PathBuf::from("/out/x.flac"),
        }
    }

    #[test]
    fn only_the_first_claim_wins() {
        let mut registry = DedupRegistry::new();
        assert!(registry.claim("abc", claim("/music/a.flac")));
        assert!(!registry.claim("abc", claim("/other/a.flac")));
        assert!(!registry.claim("abc", claim("/third/a.flac")));
        // an unrelated fingerprint is unaffected
        assert!(registry.claim("def", claim("/music/b.flac")));
    }

    #[test]
    fn all_claims_are_retained_for_reporting() {
        let mut registry = DedupRegistry::new();
        registry.claim("abc", claim("/music/a.flac"));
        registry.claim("abc", claim("/other/a.flac"));
        registry.claim("def", claim("/music/b.flac"));

        let duplicates = registry.duplicates();
        assert_eq!(duplicates.len(), 1);
        let (fingerprint, claims) = &duplicates[0];
        assert_eq!(fingerprint, "abc");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].source, PathBuf::from("/music/a.flac"));
        assert_eq!(claims[1].source, PathBuf::from("/other/a.flac"));
    }

    #[test]
    fn unique_fingerprints_produce_no_duplicates() {
        let mut registry = DedupRegistry::new();
        registry.claim("abc", claim("/music/a.flac"));
        registry.claim("def", claim("/music/b.flac"));
        assert!(registry.duplicates().is_empty());
    }
}
