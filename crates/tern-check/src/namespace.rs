//! Container-relative name candidate generation.
//!
//! Bare and qualified names are resolved against a dotted container by
//! trying progressively shorter container prefixes, outermost (longest)
//! first. Qualified names additionally walk a second axis over their own
//! qualifier prefixes, longest first, so that `a.b.c` in container `x`
//! yields `x.a.b.c`, `a.b.c`, `x.a.b`, `a.b`, `x.a`, `a`.

use std::collections::HashSet;

use tern_diag::CheckError;

/// Enumerates resolution candidates for names within a container.
#[derive(Debug, Clone)]
pub struct NamespaceGenerator {
    segments: Vec<String>,
}

impl NamespaceGenerator {
    /// Build a generator for `container`, validating its segments.
    pub fn new(container: &str) -> Result<Self, CheckError> {
        if container.is_empty() {
            return Ok(Self {
                segments: Vec::new(),
            });
        }
        let segments: Vec<String> = container.split('.').map(str::to_string).collect();
        for segment in &segments {
            if !is_valid_segment(segment) {
                return Err(CheckError::InvalidContainer(container.to_string()));
            }
        }
        Ok(Self { segments })
    }

    /// Visit candidates for a bare name, longest container prefix first.
    ///
    /// `visit` returns `true` to continue enumeration. The name itself may
    /// contain dots (struct type names); it is kept whole.
    pub fn generate_candidates(&self, name: &str, mut visit: impl FnMut(&str) -> bool) {
        for prefix_len in (0..=self.segments.len()).rev() {
            let candidate = if prefix_len == 0 {
                name.to_string()
            } else {
                format!("{}.{}", self.segments[..prefix_len].join("."), name)
            };
            if !visit(&candidate) {
                return;
            }
        }
    }

    /// Visit candidates for a qualified name.
    ///
    /// The outer axis walks qualifier prefixes longest-first; each runs the
    /// full container-prefix search. `visit` receives the candidate and the
    /// index of the last qualifier segment it covers; duplicates arising
    /// from overlapping container and qualifier segments are suppressed, so
    /// the first (longest-qualifier) occurrence wins.
    pub fn generate_qualified_candidates(
        &self,
        qualifiers: &[String],
        mut visit: impl FnMut(&str, usize) -> bool,
    ) {
        let mut seen = HashSet::new();
        for qual_len in (1..=qualifiers.len()).rev() {
            let qualified = qualifiers[..qual_len].join(".");
            for prefix_len in (0..=self.segments.len()).rev() {
                let candidate = if prefix_len == 0 {
                    qualified.clone()
                } else {
                    format!("{}.{}", self.segments[..prefix_len].join("."), qualified)
                };
                if !seen.insert(candidate.clone()) {
                    continue;
                }
                if !visit(&candidate, qual_len - 1) {
                    return;
                }
            }
        }
    }
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_candidates(generator: &NamespaceGenerator, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        generator.generate_candidates(name, |candidate| {
            out.push(candidate.to_string());
            true
        });
        out
    }

    fn all_qualified(generator: &NamespaceGenerator, qualifiers: &[&str]) -> Vec<(String, usize)> {
        let qualifiers: Vec<String> = qualifiers.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        generator.generate_qualified_candidates(&qualifiers, |candidate, index| {
            out.push((candidate.to_string(), index));
            true
        });
        out
    }

    #[test]
    fn bare_name_candidates_are_longest_prefix_first() {
        let generator = NamespaceGenerator::new("a.b").unwrap();
        assert_eq!(all_candidates(&generator, "c"), vec!["a.b.c", "a.c", "c"]);
    }

    #[test]
    fn empty_container_yields_only_the_name() {
        let generator = NamespaceGenerator::new("").unwrap();
        assert_eq!(all_candidates(&generator, "c"), vec!["c"]);
    }

    #[test]
    fn dotted_names_are_kept_whole() {
        let generator = NamespaceGenerator::new("a").unwrap();
        assert_eq!(
            all_candidates(&generator, "pkg.M"),
            vec!["a.pkg.M", "pkg.M"]
        );
    }

    #[test]
    fn qualified_candidates_walk_both_axes() {
        let generator = NamespaceGenerator::new("x").unwrap();
        assert_eq!(
            all_qualified(&generator, &["a", "b", "c"]),
            vec![
                ("x.a.b.c".to_string(), 2),
                ("a.b.c".to_string(), 2),
                ("x.a.b".to_string(), 1),
                ("a.b".to_string(), 1),
                ("x.a".to_string(), 0),
                ("a".to_string(), 0),
            ]
        );
    }

    #[test]
    fn overlapping_segments_never_repeat_a_candidate() {
        let generator = NamespaceGenerator::new("a").unwrap();
        let candidates = all_qualified(&generator, &["a", "a"]);
        assert_eq!(
            candidates,
            vec![
                ("a.a.a".to_string(), 1),
                ("a.a".to_string(), 1),
                ("a".to_string(), 0),
            ]
        );
    }

    #[test]
    fn enumeration_stops_when_the_callback_declines() {
        let generator = NamespaceGenerator::new("a.b").unwrap();
        let mut seen = Vec::new();
        generator.generate_candidates("c", |candidate| {
            seen.push(candidate.to_string());
            false
        });
        assert_eq!(seen, vec!["a.b.c"]);
    }

    #[test]
    fn invalid_containers_are_rejected() {
        assert!(NamespaceGenerator::new("a..b").is_err());
        assert!(NamespaceGenerator::new(".a").is_err());
        assert!(NamespaceGenerator::new("1a").is_err());
        assert!(NamespaceGenerator::new("a.b_2.c").is_ok());
    }
}
