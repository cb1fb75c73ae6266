//! Grouping of input addresses into per-domain buckets.
//!
//! Buckets are keyed by the IDNA-ASCII domain and preserve the first-seen
//! order of both domains and addresses, so one SMTP session can probe every
//! address of a domain in input order. Malformed input is dropped here, not
//! reported: a bucket is always non-empty.

use crate::address;

/// Ordered `domain -> addresses` buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainBuckets {
    entries: Vec<(String, Vec<String>)>,
}

impl DomainBuckets {
    fn push(&mut self, domain: String, email: String) {
        if let Some((_, bucket)) = self.entries.iter_mut().find(|(d, _)| *d == domain) {
            bucket.push(email);
        } else {
            self.entries.push((domain, vec![email]));
        }
    }

    /// Buckets in first-seen domain order.
    pub fn entries(&self) -> &[(String, Vec<String>)] {
        &self.entries
    }

    /// Addresses grouped under `domain`, if any.
    pub fn get(&self, domain: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(d, _)| d == domain)
            .map(|(_, bucket)| bucket.as_slice())
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(d, _)| d.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a DomainBuckets {
    type Item = &'a (String, Vec<String>);
    type IntoIter = std::slice::Iter<'a, (String, Vec<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Partition `emails` into per-domain buckets, dropping anything that fails
/// the address-shape check. The original address strings are kept verbatim
/// (only the bucket key is normalized), so callers can match results back
/// against their input.
pub fn group_by_domains<I, S>(emails: I) -> DomainBuckets
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut buckets = DomainBuckets::default();
    for email in emails {
        let email = email.as_ref();
        match address::split_valid(email) {
            Some((_, domain)) => buckets.push(domain, email.to_string()),
            None => {
                tracing::trace!(address = email, "dropping malformed address");
            }
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn groups_by_domain_preserving_order() {
        let buckets = group_by_domains([
            "a@one.example",
            "b@two.example",
            "c@one.example",
            "d@three.example",
        ]);
        let domains: Vec<&str> = buckets.domains().collect();
        assert_eq!(domains, ["one.example", "two.example", "three.example"]);
        assert_eq!(
            buckets.get("one.example"),
            Some(&["a@one.example".to_string(), "c@one.example".to_string()][..])
        );
    }

    #[test]
    fn drops_invalid_addresses_silently() {
        let buckets = group_by_domains(["not-an-email", "a@ok.example", "@bad", "b@@x.example"]);
        assert_eq!(buckets.len(), 1);
        assert_eq!(
            buckets.get("ok.example"),
            Some(&["a@ok.example".to_string()][..])
        );
    }

    #[test]
    fn bucket_key_is_ascii_domain_but_address_is_verbatim() {
        let buckets = group_by_domains(["A@Example.COM"]);
        assert_eq!(
            buckets.get("example.com"),
            Some(&["A@Example.COM".to_string()][..])
        );
    }

    #[test]
    fn empty_input_yields_empty_buckets() {
        let buckets = group_by_domains(Vec::<String>::new());
        assert!(buckets.is_empty());
    }

    proptest! {
        // Whatever the input, grouped addresses are a subset of the input
        // and each one still passes the shape check.
        #[test]
        fn grouped_addresses_come_from_input(input in proptest::collection::vec(".{0,40}", 0..20)) {
            let buckets = group_by_domains(&input);
            for (domain, bucket) in &buckets {
                prop_assert!(!bucket.is_empty());
                for email in bucket {
                    prop_assert!(input.contains(email));
                    let (_, d) = crate::address::split_valid(email).expect("bucketed address is valid");
                    prop_assert_eq!(&d, domain);
                }
            }
        }
    }
}
